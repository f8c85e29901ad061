use crate::core::serialization::{SaveError, SaveState};

/// Listing row for a save slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSummary {
    pub slot: String,
    pub handle: String,
    pub turn: u64,
    pub story_stage: u32,
    pub reputation: u32,
    pub ending: Option<String>,
}

pub trait SaveRepository {
    fn list_slots(&self) -> Result<Vec<SlotSummary>, SaveError>;
    fn save_slot(&mut self, slot: &str, state: &SaveState) -> Result<(), SaveError>;
    fn load_slot(&self, slot: &str) -> Result<SaveState, SaveError>;
    /// Returns false when the slot did not exist.
    fn delete_slot(&mut self, slot: &str) -> Result<bool, SaveError>;
}
