use bevy_ecs::prelude::*;

use crate::simulation::market::expire_items;
use crate::simulation::player::PlayerState;
use crate::simulation::time::GameTime;
use crate::systems::TickReport;

/// System: removes owned items whose validity ran out. Runs after the clock advances.
pub fn item_expiry_system(
    time: Res<GameTime>,
    mut player: ResMut<PlayerState>,
    mut report: ResMut<TickReport>,
) {
    if player.items.values().all(|owned| owned.expires_turn.is_none()) {
        return;
    }
    let expired = expire_items(&mut player, time.turn);
    report.expired_items.extend(expired);
}
