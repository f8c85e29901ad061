use bevy_ecs::prelude::*;
use bevy_ecs::schedule::{ExecutorKind, SystemSet};

use crate::core::config::GameConfig;
use crate::core::rng::GameRng;
use crate::data::ContentCatalog;
use crate::simulation::missions::MissionBoard;
use crate::simulation::player::PlayerState;
use crate::simulation::progression::ProgressionLog;
use crate::simulation::story::StoryState;
use crate::simulation::time::{advance_time_system, GameTime};
use crate::systems::events::event_scheduler_system;
use crate::systems::heat::heat_decay_system;
use crate::systems::market::item_expiry_system;
use crate::systems::missions::mission_timer_system;
use crate::systems::progression::progression_system;
use crate::systems::{begin_tick_system, TickReport};

/// Canonical ordering of one turn.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum TickSet {
    Intake,
    Simulation,
    Time,
    Cleanup,
}

/// Build the ECS world with every resource the game reads or writes.
pub fn create_world(config: GameConfig, catalog: ContentCatalog, rng: GameRng) -> World {
    let mut world = World::new();
    world.insert_resource(PlayerState::new(&config.player));
    world.insert_resource(config);
    world.insert_resource(catalog);
    world.insert_resource(rng);
    world.insert_resource(GameTime::default());
    world.insert_resource(MissionBoard::default());
    world.insert_resource(StoryState::default());
    world.insert_resource(ProgressionLog::default());
    world.insert_resource(TickReport::default());
    world
}

/// Build the turn schedule. Systems run one at a time in a fixed order so a seeded game
/// replays identically.
pub fn create_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);

    schedule.configure_sets(
        (TickSet::Intake, TickSet::Simulation, TickSet::Time, TickSet::Cleanup).chain(),
    );

    schedule.add_systems((
        begin_tick_system.in_set(TickSet::Intake),
        (event_scheduler_system, mission_timer_system, heat_decay_system)
            .chain()
            .in_set(TickSet::Simulation),
        advance_time_system.in_set(TickSet::Time),
        (item_expiry_system, progression_system)
            .chain()
            .in_set(TickSet::Cleanup),
    ));

    schedule
}
