use bevy_ecs::prelude::*;

use crate::core::config::GameConfig;
use crate::simulation::player::PlayerState;
use crate::systems::TickReport;

/// System: heat cools by a fixed amount each turn. Being burned is permanent.
pub fn heat_decay_system(
    config: Res<GameConfig>,
    mut player: ResMut<PlayerState>,
    mut report: ResMut<TickReport>,
) {
    let decay = config.rules.heat_decay_per_turn;
    if decay <= 0 || player.heat() == 0 || player.is_burned() {
        return;
    }
    report.heat_change += player.adjust_heat(-decay);
}
