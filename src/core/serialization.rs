use std::fs;
use std::path::Path;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::error::GameError;
use crate::data::{CatalogKind, ContentCatalog};
use crate::simulation::missions::MissionBoard;
use crate::simulation::player::PlayerState;
use crate::simulation::story::StoryState;
use crate::simulation::time::GameTime;

pub const SAVE_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("save i/o failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("save data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("save version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("save database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("no save in slot {0}")]
    MissingSlot(String),
    #[error("save does not match the loaded content: {0}")]
    Content(#[from] GameError),
}

/// Snapshot of everything that changes during play. The catalog and config are not saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    #[serde(default = "default_save_version")]
    pub version: u32,
    pub seed: u64,
    pub time: GameTime,
    pub player: PlayerState,
    #[serde(default)]
    pub missions: MissionBoard,
    #[serde(default)]
    pub story: StoryState,
}

fn default_save_version() -> u32 {
    SAVE_VERSION
}

/// Extract a serializable snapshot of the world.
pub fn extract_state_from_world(world: &World, seed: u64) -> SaveState {
    SaveState {
        version: SAVE_VERSION,
        seed,
        time: world.resource::<GameTime>().clone(),
        player: world.resource::<PlayerState>().clone(),
        missions: world.resource::<MissionBoard>().clone(),
        story: world.resource::<StoryState>().clone(),
    }
}

/// Checks that every catalog id the snapshot mentions exists, so a save written against
/// other content is refused instead of half-applied.
pub fn check_state_against_catalog(
    state: &SaveState,
    catalog: &ContentCatalog,
) -> Result<(), GameError> {
    let player = &state.player;
    if let Some(faction) = &player.faction {
        catalog.faction(faction)?;
    }
    for faction in player.faction_reputation.keys() {
        catalog.faction(faction)?;
    }
    for item in player.items.keys() {
        catalog.item(item)?;
    }
    for contact in &player.contacts {
        catalog.contact(contact)?;
    }
    for mission in player
        .completed_missions
        .iter()
        .chain(state.missions.active.keys())
        .chain(state.missions.timed_out.keys())
    {
        catalog.mission(mission)?;
    }
    for achievement in &player.achievements {
        catalog.achievement(achievement)?;
    }
    for event in player.active_events.keys() {
        catalog.event(event)?;
    }
    if let Some(ending) = &player.ending {
        catalog.ending(ending)?;
    }
    for beat in &state.story.fired {
        if !catalog.story.iter().any(|known| &known.id == beat) {
            return Err(GameError::unknown(CatalogKind::StoryBeat, beat.clone()));
        }
    }
    Ok(())
}

/// Replace the world's mutable resources with the snapshot's.
pub fn apply_state_to_world(state: SaveState, world: &mut World) {
    let mut player = state.player;
    player.normalize();
    world.insert_resource(state.time);
    world.insert_resource(player);
    world.insert_resource(state.missions);
    world.insert_resource(state.story);
}

/// Serialize a save state into JSON for persistence.
pub fn save_state_to_json(state: &SaveState) -> Result<String, SaveError> {
    Ok(serde_json::to_string_pretty(state)?)
}

/// Deserialize JSON back into a save state, rejecting saves from a newer format.
pub fn load_state_from_json(data: &str) -> Result<SaveState, SaveError> {
    let state: SaveState = serde_json::from_str(data)?;
    if state.version > SAVE_VERSION {
        return Err(SaveError::UnsupportedVersion {
            found: state.version,
            supported: SAVE_VERSION,
        });
    }
    Ok(state)
}

/// Write a save state to a file path.
pub fn save_state_to_path<P: AsRef<Path>>(state: &SaveState, path: P) -> Result<(), SaveError> {
    let path = path.as_ref();
    let json = save_state_to_json(state)?;
    fs::write(path, json).map_err(|source| SaveError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Read a save state from a file path.
pub fn load_state_from_path<P: AsRef<Path>>(path: P) -> Result<SaveState, SaveError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).map_err(|source| SaveError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_state_from_json(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::money::Btc;

    fn sample() -> SaveState {
        let mut player = PlayerState::default();
        player.btc = Btc::from_sats(123_456_789);
        player.adjust_heat(37);
        player.advance_story_to(2);
        player.active_events.insert("crypto_boom".to_string(), 2);
        SaveState {
            version: SAVE_VERSION,
            seed: 99,
            time: GameTime::default(),
            player,
            missions: MissionBoard::default(),
            story: StoryState::default(),
        }
    }

    #[test]
    fn json_round_trip_keeps_satoshis() {
        let state = sample();
        let json = save_state_to_json(&state).unwrap();
        assert!(json.contains("123456789"));
        let loaded = load_state_from_json(&json).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.player.heat(), 37);
        assert_eq!(loaded.player.story_stage(), 2);
    }

    #[test]
    fn newer_versions_are_rejected() {
        let mut state = sample();
        state.version = SAVE_VERSION + 1;
        let json = serde_json::to_string(&state).unwrap();
        assert!(matches!(
            load_state_from_json(&json),
            Err(SaveError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn builtin_ids_pass_the_catalog_check() {
        let catalog = ContentCatalog::builtin().unwrap();
        assert_eq!(check_state_against_catalog(&sample(), &catalog), Ok(()));
    }

    #[test]
    fn foreign_ids_fail_the_catalog_check() {
        let catalog = ContentCatalog::builtin().unwrap();

        let mut state = sample();
        state.player.faction = Some("red_hat".to_string());
        assert_eq!(
            check_state_against_catalog(&state, &catalog),
            Err(GameError::unknown(CatalogKind::Faction, "red_hat"))
        );

        let mut state = sample();
        state.player.contacts.insert("nobody".to_string());
        assert_eq!(
            check_state_against_catalog(&state, &catalog),
            Err(GameError::unknown(CatalogKind::Contact, "nobody"))
        );

        let mut state = sample();
        state.story.fired.insert("lost_chapter".to_string());
        assert_eq!(
            check_state_against_catalog(&state, &catalog),
            Err(GameError::unknown(CatalogKind::StoryBeat, "lost_chapter"))
        );
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slot.json");
        let state = sample();
        save_state_to_path(&state, &path).unwrap();
        assert_eq!(load_state_from_path(&path).unwrap(), state);
        assert!(matches!(
            load_state_from_path(dir.path().join("missing.json")),
            Err(SaveError::Io { .. })
        ));
    }
}
