use bevy_ecs::prelude::*;

use crate::core::config::RulesConfig;
use crate::data::{ContentCatalog, EndingCondition};
use crate::rules::effects::{apply_effects, Effect, EffectContext};
use crate::rules::risk::reward_multipliers;
use crate::simulation::player::PlayerState;
use crate::simulation::story::StoryState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Milestone {
    Achievement {
        id: String,
        name: String,
        rewards: Vec<Effect>,
    },
    StoryBeat {
        id: String,
        title: String,
        text: String,
    },
    Ending {
        id: String,
        title: String,
        text: String,
    },
}

/// Milestones reached since the front end last drained them.
#[derive(Resource, Debug, Clone, Default)]
pub struct ProgressionLog(pub Vec<Milestone>);

impl ProgressionLog {
    pub fn drain(&mut self) -> Vec<Milestone> {
        std::mem::take(&mut self.0)
    }
}

/// Grants newly met achievements (repeating while rewards unlock more), fires story beats,
/// then checks endings. Burned is checked before the catalog's other endings.
pub fn evaluate_progression(
    catalog: &ContentCatalog,
    rules: &RulesConfig,
    turn: u64,
    player: &mut PlayerState,
    story: &mut StoryState,
) -> Vec<Milestone> {
    let mut milestones = Vec::new();

    loop {
        let newly_met: Vec<_> = catalog
            .achievements
            .iter()
            .filter(|achievement| !player.achievements.contains(&achievement.id))
            .filter(|achievement| achievement.is_earned_by(player))
            .collect();
        if newly_met.is_empty() {
            break;
        }
        for achievement in newly_met {
            player.achievements.insert(achievement.id.clone());
            let ctx = EffectContext {
                turn,
                faction_reputation_cap: rules.faction_reputation_cap,
                multipliers: reward_multipliers(catalog, player),
            };
            let rewards = apply_effects(player, &achievement.rewards, &ctx);
            tracing::info!(achievement = %achievement.id, "achievement unlocked");
            milestones.push(Milestone::Achievement {
                id: achievement.id.clone(),
                name: achievement.name.clone(),
                rewards,
            });
        }
    }

    for beat in story.fire_reached(catalog, player) {
        milestones.push(Milestone::StoryBeat {
            id: beat.id.clone(),
            title: beat.title.clone(),
            text: beat.text.clone(),
        });
    }

    if player.ending.is_none() {
        let burned = catalog
            .endings
            .iter()
            .filter(|ending| ending.condition == EndingCondition::Burned);
        let others = catalog
            .endings
            .iter()
            .filter(|ending| ending.condition != EndingCondition::Burned);
        if let Some(ending) = burned.chain(others).find(|ending| ending.condition.is_met(player)) {
            player.ending = Some(ending.id.clone());
            tracing::info!(ending = %ending.id, "ending reached");
            milestones.push(Milestone::Ending {
                id: ending.id.clone(),
                title: ending.title.clone(),
                text: ending.text.clone(),
            });
        }
    }

    milestones
}
