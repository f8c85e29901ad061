use serde::{Deserialize, Serialize};

use crate::rules::effects::Effect;
use crate::simulation::player::PlayerState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub trigger: AchievementTrigger,
    #[serde(default)]
    pub rewards: Vec<Effect>,
    #[serde(default)]
    pub rarity: Rarity,
    /// Hidden achievements are left out of listings until earned.
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub required_faction: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Legendary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AchievementTrigger {
    MissionCompleted { mission: String },
    MissionsCompleted { count: usize },
    Reputation { min: u32 },
    FactionChanges { min: u32 },
    StoryStage { min: u32 },
    UsdBalance { min: i64 },
    ItemsOwned { count: usize },
    ContactsKnown { count: usize },
    Flag { flag: String },
    HeatAtLeast { min: u8 },
    Warnings { min: u32 },
}

impl AchievementTrigger {
    pub fn is_met(&self, player: &PlayerState) -> bool {
        match self {
            AchievementTrigger::MissionCompleted { mission } => {
                player.completed_missions.contains(mission)
            }
            AchievementTrigger::MissionsCompleted { count } => {
                player.completed_missions.len() >= *count
            }
            AchievementTrigger::Reputation { min } => player.reputation >= *min,
            AchievementTrigger::FactionChanges { min } => player.faction_changes >= *min,
            AchievementTrigger::StoryStage { min } => player.story_stage() >= *min,
            AchievementTrigger::UsdBalance { min } => player.usd >= *min,
            AchievementTrigger::ItemsOwned { count } => player.items.len() >= *count,
            AchievementTrigger::ContactsKnown { count } => player.contacts.len() >= *count,
            AchievementTrigger::Flag { flag } => player.flags.contains(flag),
            AchievementTrigger::HeatAtLeast { min } => player.heat() >= *min,
            AchievementTrigger::Warnings { min } => player.warnings >= *min,
        }
    }
}

impl Achievement {
    /// Trigger met and, for faction-bound achievements, the player currently in that faction.
    pub fn is_earned_by(&self, player: &PlayerState) -> bool {
        if let Some(faction) = &self.required_faction {
            if player.faction.as_deref() != Some(faction.as_str()) {
                return false;
            }
        }
        self.trigger.is_met(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faction_changes_trigger() {
        let achievement: Achievement = serde_json::from_str(
            r#"{
                "id": "faction_traitor",
                "name": "Traitor",
                "description": "Switch sides twice.",
                "trigger": {"kind": "faction_changes", "min": 2},
                "rarity": "rare"
            }"#,
        )
        .unwrap();
        let mut player = PlayerState::default();
        player.faction_changes = 1;
        assert!(!achievement.is_earned_by(&player));
        player.faction_changes = 2;
        assert!(achievement.is_earned_by(&player));
        assert_eq!(achievement.rarity, Rarity::Rare);
    }

    #[test]
    fn required_faction_gates_trigger() {
        let achievement = Achievement {
            id: "saint".to_string(),
            name: "Saint".to_string(),
            description: String::new(),
            trigger: AchievementTrigger::Reputation { min: 0 },
            rewards: Vec::new(),
            rarity: Rarity::Common,
            hidden: false,
            required_faction: Some("white_hat".to_string()),
        };
        let mut player = PlayerState::default();
        assert!(!achievement.is_earned_by(&player));
        player.faction = Some("white_hat".to_string());
        assert!(achievement.is_earned_by(&player));
    }
}
