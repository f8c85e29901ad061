use std::fmt;

use crate::core::config::RulesConfig;
use crate::core::rng::RandomSource;
use crate::data::ContentCatalog;
use crate::rules::effects::Multipliers;
use crate::simulation::player::PlayerState;

/// Every term that went into a mission or stage risk, kept so the CLI can explain a roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskBreakdown {
    pub base: f64,
    pub event_multiplier: f64,
    pub difficulty_multiplier: f64,
    pub faction_delta: f64,
    pub event_delta: f64,
    pub item_delta: f64,
    pub heat_penalty: f64,
}

impl RiskBreakdown {
    pub fn flat(base: u8) -> Self {
        Self {
            base: base as f64,
            event_multiplier: 1.0,
            difficulty_multiplier: 1.0,
            faction_delta: 0.0,
            event_delta: 0.0,
            item_delta: 0.0,
            heat_penalty: 0.0,
        }
    }

    /// Final risk percentage, always within `[0, 100]`.
    pub fn effective(&self) -> f64 {
        let scaled = self.base * self.event_multiplier * self.difficulty_multiplier;
        let total =
            scaled + self.faction_delta + self.event_delta + self.item_delta + self.heat_penalty;
        if total.is_nan() {
            return 100.0;
        }
        total.clamp(0.0, 100.0)
    }
}

impl fmt::Display for RiskBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}%", self.effective())?;
        if self.event_multiplier != 1.0 {
            write!(f, " (events x{:.2})", self.event_multiplier)?;
        }
        if self.heat_penalty > 0.0 {
            write!(f, " (heat +{:.0})", self.heat_penalty)?;
        }
        Ok(())
    }
}

pub fn effective_risk(
    base: u8,
    catalog: &ContentCatalog,
    player: &PlayerState,
    rules: &RulesConfig,
) -> RiskBreakdown {
    let mut breakdown = RiskBreakdown::flat(base);
    breakdown.difficulty_multiplier = rules.difficulty.risk_multiplier();

    for event in catalog.active_events(player) {
        breakdown.event_multiplier *= event.risk_multiplier();
        breakdown.event_delta += event.risk_delta() as f64;
    }
    if let Some(faction) = catalog.player_faction(player) {
        breakdown.faction_delta = faction.risk_delta() as f64;
    }
    breakdown.item_delta = catalog
        .owned_items(player)
        .map(|item| item.risk_delta() as f64)
        .sum();

    let heat = player.heat();
    if heat > rules.heat_risk_threshold {
        breakdown.heat_penalty =
            (heat - rules.heat_risk_threshold) as f64 * rules.heat_risk_per_point;
    }
    breakdown
}

/// Result of one risk check. `roll` is `None` when the outcome was certain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskRoll {
    pub risk: f64,
    pub roll: Option<f64>,
    pub success: bool,
}

/// Draws a uniform roll in `[0, 100)`; a roll below the risk fails.
pub fn roll_against(risk: f64, rng: &mut dyn RandomSource) -> RiskRoll {
    if risk <= 0.0 {
        return RiskRoll {
            risk,
            roll: None,
            success: true,
        };
    }
    if risk >= 100.0 {
        return RiskRoll {
            risk,
            roll: None,
            success: false,
        };
    }
    let roll = rng.roll_percent();
    RiskRoll {
        risk,
        roll: Some(roll),
        success: roll >= risk,
    }
}

/// Payout and heat scaling from the player's faction, active events and owned items.
pub fn reward_multipliers(catalog: &ContentCatalog, player: &PlayerState) -> Multipliers {
    let mut multipliers = Multipliers::neutral();
    if let Some(faction) = catalog.player_faction(player) {
        multipliers.reputation *= faction.reputation_multiplier();
        multipliers.currency *= faction.currency_multiplier();
        multipliers.heat *= faction.heat_gain_multiplier();
    }
    for event in catalog.active_events(player) {
        multipliers.currency *= event.reward_multiplier();
        multipliers.heat *= event.heat_gain_multiplier();
    }
    for item in catalog.owned_items(player) {
        multipliers.currency *= item.currency_multiplier();
        multipliers.heat *= item.heat_gain_multiplier();
    }
    multipliers
}

/// Scales a heat gain by the heat multiplier; cooling is never scaled.
pub fn scaled_heat_gain(heat_gain: i32, multipliers: &Multipliers) -> i32 {
    if heat_gain <= 0 {
        return heat_gain;
    }
    (heat_gain as f64 * multipliers.heat.max(0.0)).round() as i32
}
