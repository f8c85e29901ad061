use serde::{Deserialize, Serialize};

/// One of the mutually exclusive allegiances a player can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub philosophy: String,
    #[serde(default)]
    pub bonuses: Vec<FactionBonus>,
    #[serde(default)]
    pub exclusive_missions: Vec<String>,
    #[serde(default)]
    pub enemies: Vec<String>,
    #[serde(default)]
    pub allies: Vec<String>,
}

/// Passive bonuses a faction grants its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactionBonus {
    /// Flat points added to (or removed from) mission risk.
    RiskDelta { amount: i32 },
    ReputationMultiplier { factor: f64 },
    CurrencyMultiplier { factor: f64 },
    HeatGainMultiplier { factor: f64 },
    /// Percentage off market prices.
    MarketDiscount { percent: u8 },
}

impl Faction {
    pub fn is_enemy_of(&self, other: &str) -> bool {
        self.enemies.iter().any(|id| id == other)
    }

    pub fn risk_delta(&self) -> i32 {
        self.bonuses
            .iter()
            .map(|bonus| match bonus {
                FactionBonus::RiskDelta { amount } => *amount,
                _ => 0,
            })
            .sum()
    }

    pub fn reputation_multiplier(&self) -> f64 {
        self.product_of(|bonus| match bonus {
            FactionBonus::ReputationMultiplier { factor } => Some(*factor),
            _ => None,
        })
    }

    pub fn currency_multiplier(&self) -> f64 {
        self.product_of(|bonus| match bonus {
            FactionBonus::CurrencyMultiplier { factor } => Some(*factor),
            _ => None,
        })
    }

    pub fn heat_gain_multiplier(&self) -> f64 {
        self.product_of(|bonus| match bonus {
            FactionBonus::HeatGainMultiplier { factor } => Some(*factor),
            _ => None,
        })
    }

    /// Combined discount as a fraction in `[0, 1]`.
    pub fn market_discount(&self) -> f64 {
        let percent: u32 = self
            .bonuses
            .iter()
            .map(|bonus| match bonus {
                FactionBonus::MarketDiscount { percent } => *percent as u32,
                _ => 0,
            })
            .sum();
        percent.min(100) as f64 / 100.0
    }

    fn product_of(&self, pick: impl Fn(&FactionBonus) -> Option<f64>) -> f64 {
        self.bonuses.iter().filter_map(pick).product()
    }
}

impl FactionBonus {
    pub fn describe(&self) -> String {
        match self {
            FactionBonus::RiskDelta { amount } => format!("mission risk {:+}", amount),
            FactionBonus::ReputationMultiplier { factor } => format!("reputation x{:.2}", factor),
            FactionBonus::CurrencyMultiplier { factor } => format!("payouts x{:.2}", factor),
            FactionBonus::HeatGainMultiplier { factor } => format!("heat gain x{:.2}", factor),
            FactionBonus::MarketDiscount { percent } => format!("{}% market discount", percent),
        }
    }
}
