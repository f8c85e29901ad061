pub mod effects;
pub mod money;
pub mod requirement;
pub mod risk;

pub use effects::{apply_effect, apply_effects, Effect, EffectContext, Multipliers};
pub use money::{Btc, Price};
pub use requirement::{is_unlocked, unmet_clauses, FactionRequirement, Requirement, UnmetClause};
pub use risk::{effective_risk, reward_multipliers, roll_against, RiskBreakdown, RiskRoll};
