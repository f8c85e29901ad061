use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::core::serialization::{
    load_state_from_json, save_state_to_json, SaveError, SaveState,
};
use crate::world::repository::{SaveRepository, SlotSummary};

const SAVE_DB_SCHEMA_VERSION: i64 = 1;

const SAVE_DB_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS save_meta (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  schema_version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS save_slots (
  slot TEXT PRIMARY KEY,
  handle TEXT NOT NULL,
  turn INTEGER NOT NULL,
  story_stage INTEGER NOT NULL,
  reputation INTEGER NOT NULL,
  ending TEXT,
  payload TEXT NOT NULL
);
"#;

/// Named save slots in a single SQLite file. Each slot stores the full JSON snapshot plus a
/// few columns for listing without deserializing.
pub struct SaveDb {
    conn: Connection,
}

impl SaveDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SaveError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, SaveError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, SaveError> {
        let mut db = Self { conn };
        db.conn.execute_batch(SAVE_DB_SCHEMA)?;
        db.ensure_meta()?;
        Ok(db)
    }

    fn ensure_meta(&mut self) -> Result<(), SaveError> {
        let version = self
            .conn
            .query_row(
                "SELECT schema_version FROM save_meta WHERE id = 1",
                [],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        match version {
            Some(version) if version == SAVE_DB_SCHEMA_VERSION => Ok(()),
            Some(version) => Err(SaveError::UnsupportedVersion {
                found: version as u32,
                supported: SAVE_DB_SCHEMA_VERSION as u32,
            }),
            None => {
                self.conn.execute(
                    "INSERT INTO save_meta (id, schema_version) VALUES (1, ?1)",
                    params![SAVE_DB_SCHEMA_VERSION],
                )?;
                Ok(())
            }
        }
    }
}

impl SaveRepository for SaveDb {
    fn list_slots(&self) -> Result<Vec<SlotSummary>, SaveError> {
        let mut stmt = self.conn.prepare(
            "SELECT slot, handle, turn, story_stage, reputation, ending FROM save_slots ORDER BY slot",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SlotSummary {
                slot: row.get(0)?,
                handle: row.get(1)?,
                turn: row.get::<_, i64>(2)? as u64,
                story_stage: row.get::<_, i64>(3)? as u32,
                reputation: row.get::<_, i64>(4)? as u32,
                ending: row.get(5)?,
            })
        })?;
        let mut slots = Vec::new();
        for row in rows {
            slots.push(row?);
        }
        Ok(slots)
    }

    fn save_slot(&mut self, slot: &str, state: &SaveState) -> Result<(), SaveError> {
        let payload = save_state_to_json(state)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO save_slots (slot, handle, turn, story_stage, reputation, ending, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(slot) DO UPDATE SET
               handle = excluded.handle,
               turn = excluded.turn,
               story_stage = excluded.story_stage,
               reputation = excluded.reputation,
               ending = excluded.ending,
               payload = excluded.payload",
            params![
                slot,
                state.player.handle,
                state.time.turn as i64,
                state.player.story_stage() as i64,
                state.player.reputation as i64,
                state.player.ending,
                payload,
            ],
        )?;
        tx.commit()?;
        tracing::info!(slot, turn = state.time.turn, "game saved");
        Ok(())
    }

    fn load_slot(&self, slot: &str) -> Result<SaveState, SaveError> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM save_slots WHERE slot = ?1",
                params![slot],
                |row| row.get(0),
            )
            .optional()?;
        let payload = payload.ok_or_else(|| SaveError::MissingSlot(slot.to_string()))?;
        load_state_from_json(&payload)
    }

    fn delete_slot(&mut self, slot: &str) -> Result<bool, SaveError> {
        let removed = self
            .conn
            .execute("DELETE FROM save_slots WHERE slot = ?1", params![slot])?;
        Ok(removed > 0)
    }
}
