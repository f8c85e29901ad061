pub mod config;
pub mod ecs;
pub mod error;
pub mod rng;
pub mod serialization;
pub mod world;
