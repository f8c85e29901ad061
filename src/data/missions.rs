use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rules::effects::Effect;
use crate::rules::requirement::Requirement;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub requirement: Requirement,
    /// Applied on success of a single-roll mission.
    #[serde(default)]
    pub rewards: Vec<Effect>,
    pub risk: u8,
    /// Applied whether the mission succeeds or not. May be negative.
    #[serde(default)]
    pub heat_gain: i32,
    #[serde(default)]
    pub story_stage: u32,
    #[serde(default)]
    pub stages: Vec<MissionStage>,
    /// Applied once every started stage succeeded.
    #[serde(default)]
    pub final_rewards: Vec<Effect>,
    #[serde(default)]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub time_bonus: Vec<TimeBonusTier>,
    /// Contact role that must be on the team, e.g. `"social_engineer"`.
    #[serde(default)]
    pub team_role: Option<String>,
}

/// Absorbs rounding in fractions like 1/3 written as decimals.
const FRACTION_EPSILON: f64 = 1e-9;

impl Mission {
    pub fn is_multi_stage(&self) -> bool {
        !self.stages.is_empty()
    }

    pub fn stage(&self, index: usize) -> Option<&MissionStage> {
        self.stages.get(index)
    }

    /// Best tier met for `elapsed` turns: the one with the smallest qualifying fraction.
    pub fn time_bonus_for(&self, elapsed: u32) -> Option<&TimeBonusTier> {
        let limit = self.time_limit? as f64;
        self.time_bonus
            .iter()
            .filter(|tier| elapsed as f64 <= limit * tier.fraction + FRACTION_EPSILON)
            .min_by(|a, b| a.fraction.total_cmp(&b.fraction))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionStage {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_skills: BTreeMap<String, u32>,
    pub risk: u8,
    #[serde(default = "default_stage_duration")]
    pub duration: u32,
    #[serde(default)]
    pub heat_gain: i32,
    /// A failed non-blocking stage lets the mission continue.
    #[serde(default)]
    pub non_blocking: bool,
    #[serde(default)]
    pub moral_choice: Option<MoralChoice>,
}

fn default_stage_duration() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoralChoice {
    pub question: String,
    pub options: Vec<ChoiceOption>,
}

impl MoralChoice {
    pub fn option(&self, key: &str) -> Option<&ChoiceOption> {
        self.options.iter().find(|option| option.key == key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.options.iter().map(|option| option.key.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub key: String,
    pub text: String,
    #[serde(default)]
    pub consequences: Vec<Effect>,
}

/// Extra rewards for finishing within `fraction` of the time limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBonusTier {
    pub fraction: f64,
    #[serde(default)]
    pub label: String,
    pub rewards: Vec<Effect>,
}
