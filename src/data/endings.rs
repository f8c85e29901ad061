use serde::{Deserialize, Serialize};

use crate::simulation::player::PlayerState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ending {
    pub id: String,
    pub title: String,
    pub text: String,
    pub condition: EndingCondition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndingCondition {
    /// Heat reached the maximum.
    Burned,
    /// Story reached `stage`, optionally while in a given faction.
    StoryComplete {
        stage: u32,
        #[serde(default)]
        faction: Option<String>,
    },
    FactionChanges { min: u32 },
    Flag { flag: String },
}

impl EndingCondition {
    pub fn is_met(&self, player: &PlayerState) -> bool {
        match self {
            EndingCondition::Burned => player.is_burned(),
            EndingCondition::StoryComplete { stage, faction } => {
                player.story_stage() >= *stage
                    && faction
                        .as_deref()
                        .map_or(true, |id| player.faction.as_deref() == Some(id))
            }
            EndingCondition::FactionChanges { min } => player.faction_changes >= *min,
            EndingCondition::Flag { flag } => player.flags.contains(flag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_ending_respects_faction() {
        let condition = EndingCondition::StoryComplete {
            stage: 3,
            faction: Some("white_hat".to_string()),
        };
        let mut player = PlayerState::default();
        player.advance_story_to(3);
        assert!(!condition.is_met(&player));
        player.faction = Some("white_hat".to_string());
        assert!(condition.is_met(&player));
    }

    #[test]
    fn burned_follows_heat() {
        let mut player = PlayerState::default();
        assert!(!EndingCondition::Burned.is_met(&player));
        player.adjust_heat(100);
        assert!(EndingCondition::Burned.is_met(&player));
    }
}
