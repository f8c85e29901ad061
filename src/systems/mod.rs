pub mod events;
pub mod heat;
pub mod market;
pub mod missions;
pub mod progression;

use bevy_ecs::prelude::*;

use crate::simulation::missions::MissionOutcome;
use crate::simulation::progression::Milestone;
use crate::simulation::time::GameTime;

/// Everything one `advance_turn` changed, filled in by the tick systems.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Turn number after the tick.
    pub turn: u64,
    pub started_events: Vec<String>,
    pub expired_events: Vec<String>,
    pub expired_items: Vec<String>,
    pub timed_out: Vec<MissionOutcome>,
    pub heat_change: i32,
    pub milestones: Vec<Milestone>,
}

/// System: clears the previous turn's report.
pub fn begin_tick_system(mut report: ResMut<TickReport>, time: Res<GameTime>) {
    *report = TickReport {
        turn: time.turn,
        ..TickReport::default()
    };
}
