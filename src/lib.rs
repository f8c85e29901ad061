// Re-export core modules for use by the binary or other consumers
pub mod core;
pub mod data;
pub mod rules;
pub mod simulation;
pub mod systems;
pub mod world;

// Expose the main Game wrapper and types needed for interaction
pub use crate::core::config::GameConfig;
pub use crate::core::error::GameError;
pub use crate::core::serialization::SaveState;
pub use crate::core::world::Game;
pub use crate::data::{CatalogKind, ContentCatalog};
pub use crate::systems::TickReport;
