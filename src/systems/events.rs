use bevy_ecs::prelude::*;

use crate::core::rng::GameRng;
use crate::data::ContentCatalog;
use crate::simulation::events::tick_events;
use crate::simulation::player::PlayerState;
use crate::systems::TickReport;

/// System: counts down active world events and rolls for new ones.
pub fn event_scheduler_system(
    catalog: Res<ContentCatalog>,
    mut player: ResMut<PlayerState>,
    mut rng: ResMut<GameRng>,
    mut report: ResMut<TickReport>,
) {
    let tick = tick_events(&catalog, &mut player, rng.0.as_mut());
    report.started_events.extend(tick.started);
    report.expired_events.extend(tick.expired);
}
