pub mod repository;
pub mod sqlite;

pub use repository::{SaveRepository, SlotSummary};
pub use sqlite::SaveDb;
