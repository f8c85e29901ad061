pub mod dialogue;
pub mod events;
pub mod faction;
pub mod market;
pub mod missions;
pub mod player;
pub mod progression;
pub mod queries;
pub mod story;
pub mod time;

pub use missions::{ChoiceResult, MissionBoard, MissionOutcome, MissionStatus, StageResult};
pub use player::PlayerState;
pub use progression::{Milestone, ProgressionLog};
pub use time::GameTime;
