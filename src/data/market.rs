use serde::{Deserialize, Serialize};

use crate::rules::money::Price;
use crate::rules::requirement::Requirement;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    pub category: ItemCategory,
    #[serde(default)]
    pub bonuses: Vec<ItemBonus>,
    #[serde(default)]
    pub requirement: Requirement,
    /// Turns the item stays usable after purchase; forever when absent.
    #[serde(default)]
    pub valid_for: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Tool,
    Hardware,
    Exploit,
    Intel,
    Service,
}

/// Passive bonuses an owned item grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemBonus {
    RiskDelta { amount: i32 },
    HeatGainMultiplier { factor: f64 },
    CurrencyMultiplier { factor: f64 },
}

impl MarketItem {
    pub fn risk_delta(&self) -> i32 {
        self.bonuses
            .iter()
            .map(|bonus| match bonus {
                ItemBonus::RiskDelta { amount } => *amount,
                _ => 0,
            })
            .sum()
    }

    pub fn heat_gain_multiplier(&self) -> f64 {
        self.bonuses
            .iter()
            .filter_map(|bonus| match bonus {
                ItemBonus::HeatGainMultiplier { factor } => Some(*factor),
                _ => None,
            })
            .product()
    }

    pub fn currency_multiplier(&self) -> f64 {
        self.bonuses
            .iter()
            .filter_map(|bonus| match bonus {
                ItemBonus::CurrencyMultiplier { factor } => Some(*factor),
                _ => None,
            })
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::money::Btc;

    #[test]
    fn parses_btc_priced_item() {
        let item: MarketItem = serde_json::from_str(
            r#"{
                "id": "zero_day",
                "name": "Zero-day exploit",
                "price": {"btc": 0.05},
                "category": "exploit",
                "bonuses": [{"kind": "risk_delta", "amount": -15}],
                "valid_for": 5
            }"#,
        )
        .unwrap();
        assert_eq!(item.price, Price::Btc(Btc::from_sats(5_000_000)));
        assert_eq!(item.risk_delta(), -15);
        assert_eq!(item.heat_gain_multiplier(), 1.0);
        assert_eq!(item.valid_for, Some(5));
    }
}
