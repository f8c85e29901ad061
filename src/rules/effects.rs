use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rules::money::{btc_decimal, format_usd, Btc};
use crate::simulation::player::PlayerState;

/// Every way content can change the player. Adding a kind here is a compile-time change
/// to `apply_effect`, never a silently ignored key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    Reputation {
        amount: i32,
    },
    Usd {
        amount: i64,
    },
    Btc {
        #[serde(with = "btc_decimal")]
        amount: Btc,
    },
    Skill {
        skill: String,
        amount: i32,
    },
    Heat {
        amount: i32,
    },
    FactionReputation {
        faction: String,
        amount: i32,
    },
    GrantItem {
        item: String,
    },
    UnlockContact {
        contact: String,
    },
    SetFlag {
        flag: String,
    },
    AdvanceStory {
        stage: u32,
    },
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Reputation { amount } => write!(f, "reputation {:+}", amount),
            Effect::Usd { amount } if *amount < 0 => write!(f, "{}", format_usd(*amount)),
            Effect::Usd { amount } => write!(f, "+{}", format_usd(*amount)),
            Effect::Btc { amount } if amount.sats() < 0 => write!(f, "{}", amount),
            Effect::Btc { amount } => write!(f, "+{}", amount),
            Effect::Skill { skill, amount } => write!(f, "{} {:+}", skill, amount),
            Effect::Heat { amount } => write!(f, "heat {:+}", amount),
            Effect::FactionReputation { faction, amount } => {
                write!(f, "{} standing {:+}", faction, amount)
            }
            Effect::GrantItem { item } => write!(f, "acquired {}", item),
            Effect::UnlockContact { contact } => write!(f, "new contact {}", contact),
            Effect::SetFlag { flag } => write!(f, "{}", flag),
            Effect::AdvanceStory { stage } => write!(f, "story stage {}", stage),
        }
    }
}

/// Scaling applied to positive gains while effects are applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Multipliers {
    pub reputation: f64,
    pub currency: f64,
    pub heat: f64,
}

impl Multipliers {
    pub fn neutral() -> Self {
        Self {
            reputation: 1.0,
            currency: 1.0,
            heat: 1.0,
        }
    }
}

impl Default for Multipliers {
    fn default() -> Self {
        Self::neutral()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EffectContext {
    pub turn: u64,
    pub faction_reputation_cap: i32,
    pub multipliers: Multipliers,
}

/// Applies one effect and returns what actually changed, or `None` when it was a no-op
/// (item already owned, contact already known, story already past that stage).
pub fn apply_effect(player: &mut PlayerState, effect: &Effect, ctx: &EffectContext) -> Option<Effect> {
    let applied = match effect {
        Effect::Reputation { amount } => {
            let amount = scale_gain(*amount as i64, ctx.multipliers.reputation) as i32;
            Effect::Reputation {
                amount: player.adjust_reputation(amount),
            }
        }
        // Balances floor at zero; the applied amount reports what was actually taken.
        Effect::Usd { amount } => {
            let amount = scale_gain(*amount, ctx.multipliers.currency);
            let balance = player.usd.saturating_add(amount).max(0);
            let applied = balance - player.usd;
            player.usd = balance;
            Effect::Usd { amount: applied }
        }
        Effect::Btc { amount } => {
            let amount = if amount.sats() > 0 {
                amount.scale(ctx.multipliers.currency)
            } else {
                *amount
            };
            let balance = Btc::from_sats(player.btc.add(amount).sats().max(0));
            let applied = balance.sub(player.btc);
            player.btc = balance;
            Effect::Btc { amount: applied }
        }
        Effect::Skill { skill, amount } => Effect::Skill {
            skill: skill.clone(),
            amount: player.adjust_skill(skill, *amount),
        },
        Effect::Heat { amount } => {
            let amount = scale_gain(*amount as i64, ctx.multipliers.heat) as i32;
            Effect::Heat {
                amount: player.adjust_heat(amount),
            }
        }
        Effect::FactionReputation { faction, amount } => Effect::FactionReputation {
            faction: faction.clone(),
            amount: player.adjust_faction_reputation(faction, *amount, ctx.faction_reputation_cap),
        },
        Effect::GrantItem { item } => {
            if !player.grant_item(item, ctx.turn, None) {
                return None;
            }
            effect.clone()
        }
        Effect::UnlockContact { contact } => {
            if !player.contacts.insert(contact.clone()) {
                return None;
            }
            effect.clone()
        }
        Effect::SetFlag { flag } => {
            if !player.flags.insert(flag.clone()) {
                return None;
            }
            effect.clone()
        }
        Effect::AdvanceStory { stage } => {
            if !player.advance_story_to(*stage) {
                return None;
            }
            effect.clone()
        }
    };
    Some(applied)
}

pub fn apply_effects(player: &mut PlayerState, effects: &[Effect], ctx: &EffectContext) -> Vec<Effect> {
    effects
        .iter()
        .filter_map(|effect| apply_effect(player, effect, ctx))
        .collect()
}

fn scale_gain(amount: i64, factor: f64) -> i64 {
    if amount <= 0 {
        return amount;
    }
    (amount as f64 * factor.max(0.0)).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(multipliers: Multipliers) -> EffectContext {
        EffectContext {
            turn: 4,
            faction_reputation_cap: 100,
            multipliers,
        }
    }

    #[test]
    fn parses_tagged_effects() {
        let effects: Vec<Effect> = serde_json::from_str(
            r#"[
                {"kind": "reputation", "amount": 3},
                {"kind": "btc", "amount": 0.002},
                {"kind": "skill", "skill": "scanning", "amount": 1},
                {"kind": "grant_item", "item": "vpn_basic"}
            ]"#,
        )
        .unwrap();
        assert_eq!(effects[1], Effect::Btc { amount: Btc::from_sats(200_000) });
        assert!(serde_json::from_str::<Effect>(r#"{"kind": "heat_gian", "amount": 3}"#).is_err());
    }

    #[test]
    fn costs_cannot_overdraw_balances() {
        let mut player = PlayerState::default();
        player.usd = 30;
        player.btc = Btc::from_sats(1_000);
        let neutral = ctx(Multipliers::neutral());

        let taken = apply_effect(&mut player, &Effect::Usd { amount: -50 }, &neutral);
        assert_eq!(taken, Some(Effect::Usd { amount: -30 }));
        assert_eq!(player.usd, 0);

        let taken = apply_effect(
            &mut player,
            &Effect::Btc {
                amount: Btc::from_sats(-5_000),
            },
            &neutral,
        );
        assert_eq!(
            taken,
            Some(Effect::Btc {
                amount: Btc::from_sats(-1_000)
            })
        );
        assert_eq!(player.btc, Btc::zero());
    }

    #[test]
    fn gains_are_scaled_losses_are_not() {
        let mut player = PlayerState::default();
        player.reputation = 10;
        let multipliers = Multipliers {
            reputation: 1.5,
            currency: 2.0,
            heat: 0.5,
        };
        let applied = apply_effects(
            &mut player,
            &[
                Effect::Reputation { amount: 4 },
                Effect::Usd { amount: 30 },
                Effect::Usd { amount: -10 },
                Effect::Heat { amount: 10 },
            ],
            &ctx(multipliers),
        );
        assert_eq!(player.reputation, 16);
        assert_eq!(player.usd, 100 + 60 - 10);
        assert_eq!(player.heat(), 5);
        assert_eq!(applied.len(), 4);
    }

    #[test]
    fn idempotent_grants_report_no_change() {
        let mut player = PlayerState::default();
        let grant = Effect::GrantItem {
            item: "vpn_basic".to_string(),
        };
        assert!(apply_effect(&mut player, &grant, &ctx(Multipliers::neutral())).is_some());
        assert!(apply_effect(&mut player, &grant, &ctx(Multipliers::neutral())).is_none());
        assert_eq!(player.items["vpn_basic"].acquired_turn, 4);
    }

    #[test]
    fn story_effect_is_monotonic() {
        let mut player = PlayerState::default();
        let ctx = ctx(Multipliers::neutral());
        apply_effect(&mut player, &Effect::AdvanceStory { stage: 2 }, &ctx);
        assert!(apply_effect(&mut player, &Effect::AdvanceStory { stage: 1 }, &ctx).is_none());
        assert_eq!(player.story_stage(), 2);
    }
}
