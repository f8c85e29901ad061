use bevy_ecs::prelude::*;

use crate::core::config::GameConfig;
use crate::data::ContentCatalog;
use crate::simulation::player::PlayerState;
use crate::simulation::progression::{evaluate_progression, ProgressionLog};
use crate::simulation::story::StoryState;
use crate::simulation::time::GameTime;
use crate::systems::TickReport;

/// System: grants achievements, fires story beats and checks endings at the end of a turn.
pub fn progression_system(
    catalog: Res<ContentCatalog>,
    config: Res<GameConfig>,
    time: Res<GameTime>,
    mut player: ResMut<PlayerState>,
    mut story: ResMut<StoryState>,
    mut log: ResMut<ProgressionLog>,
    mut report: ResMut<TickReport>,
) {
    report.turn = time.turn;
    let milestones =
        evaluate_progression(&catalog, &config.rules, time.turn, &mut player, &mut story);
    report.milestones.extend(log.drain());
    report.milestones.extend(milestones);
}
