use crate::core::error::GameError;
use crate::core::rng::RandomSource;
use crate::data::ContentCatalog;
use crate::simulation::player::PlayerState;

/// Events that changed state during one scheduler tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTick {
    pub started: Vec<String>,
    pub expired: Vec<String>,
}

/// One scheduler step. Durations count down first, so an event activated with duration 3
/// stays active through the next three turns; every inactive event then gets an
/// independent trial. Only `player.active_events` is touched.
pub fn tick_events(
    catalog: &ContentCatalog,
    player: &mut PlayerState,
    rng: &mut dyn RandomSource,
) -> EventTick {
    let mut tick = EventTick::default();

    for remaining in player.active_events.values_mut() {
        *remaining = remaining.saturating_sub(1);
    }
    player.active_events.retain(|id, remaining| {
        if *remaining == 0 {
            tick.expired.push(id.clone());
            false
        } else {
            true
        }
    });

    for event in &catalog.events {
        if player.is_event_active(&event.id) {
            continue;
        }
        if rng.chance(event.probability) {
            player.active_events.insert(event.id.clone(), event.duration);
            tick.started.push(event.id.clone());
        }
    }

    for id in &tick.expired {
        tracing::debug!(event = %id, "world event expired");
    }
    for id in &tick.started {
        tracing::info!(event = %id, "world event started");
    }
    tick
}

/// Activates an event immediately for its full duration, replacing any remaining time.
pub fn activate_event(
    catalog: &ContentCatalog,
    player: &mut PlayerState,
    event_id: &str,
) -> Result<u32, GameError> {
    let event = catalog.event(event_id)?;
    player.active_events.insert(event.id.clone(), event.duration);
    Ok(event.duration)
}
