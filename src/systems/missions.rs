use bevy_ecs::prelude::*;

use crate::core::config::GameConfig;
use crate::data::ContentCatalog;
use crate::simulation::missions::{tick_mission_timers, MissionBoard, MissionContext};
use crate::simulation::player::PlayerState;
use crate::simulation::time::GameTime;
use crate::systems::TickReport;

/// System: ages open mission attempts and fails the ones past their time limit.
pub fn mission_timer_system(
    catalog: Res<ContentCatalog>,
    config: Res<GameConfig>,
    time: Res<GameTime>,
    mut board: ResMut<MissionBoard>,
    mut player: ResMut<PlayerState>,
    mut report: ResMut<TickReport>,
) {
    if board.active.is_empty() {
        return;
    }
    let ctx = MissionContext {
        catalog: &catalog,
        rules: &config.rules,
        turn: time.turn,
    };
    let timed_out = tick_mission_timers(&ctx, &mut board, &mut player);
    report.timed_out.extend(timed_out);
}
