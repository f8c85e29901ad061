use serde::{Deserialize, Serialize};

/// A world event that may switch on during a tick and stays active for `duration` turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomEvent {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: EventCategory,
    /// Chance per tick of activating while inactive, in `[0, 1]`.
    pub probability: f64,
    pub duration: u32,
    #[serde(default)]
    pub effects: Vec<EventModifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Law,
    Market,
    Technology,
    Underground,
    Media,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventModifier {
    RiskMultiplier { factor: f64 },
    RiskDelta { amount: i32 },
    /// Scales currency payouts.
    RewardMultiplier { factor: f64 },
    PriceMultiplier { factor: f64 },
    HeatGainMultiplier { factor: f64 },
}

impl RandomEvent {
    pub fn risk_multiplier(&self) -> f64 {
        self.product_of(|modifier| match modifier {
            EventModifier::RiskMultiplier { factor } => Some(*factor),
            _ => None,
        })
    }

    pub fn risk_delta(&self) -> i32 {
        self.effects
            .iter()
            .map(|modifier| match modifier {
                EventModifier::RiskDelta { amount } => *amount,
                _ => 0,
            })
            .sum()
    }

    pub fn reward_multiplier(&self) -> f64 {
        self.product_of(|modifier| match modifier {
            EventModifier::RewardMultiplier { factor } => Some(*factor),
            _ => None,
        })
    }

    pub fn price_multiplier(&self) -> f64 {
        self.product_of(|modifier| match modifier {
            EventModifier::PriceMultiplier { factor } => Some(*factor),
            _ => None,
        })
    }

    pub fn heat_gain_multiplier(&self) -> f64 {
        self.product_of(|modifier| match modifier {
            EventModifier::HeatGainMultiplier { factor } => Some(*factor),
            _ => None,
        })
    }

    fn product_of(&self, pick: impl Fn(&EventModifier) -> Option<f64>) -> f64 {
        self.effects.iter().filter_map(pick).product()
    }
}

impl EventModifier {
    pub fn describe(&self) -> String {
        match self {
            EventModifier::RiskMultiplier { factor } => format!("mission risk x{:.2}", factor),
            EventModifier::RiskDelta { amount } => format!("mission risk {:+}", amount),
            EventModifier::RewardMultiplier { factor } => format!("payouts x{:.2}", factor),
            EventModifier::PriceMultiplier { factor } => format!("market prices x{:.2}", factor),
            EventModifier::HeatGainMultiplier { factor } => format!("heat gain x{:.2}", factor),
        }
    }
}
