use std::collections::BTreeSet;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{ContentCatalog, StoryBeat};
use crate::simulation::player::PlayerState;

/// Story beats already shown, so each fires exactly once.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryState {
    #[serde(default)]
    pub fired: BTreeSet<String>,
}

impl StoryState {
    /// Fires every unseen beat at or below the player's stage, lowest stage first.
    /// Because the stage only grows, this is exactly the beats in `(previous, current]`.
    pub fn fire_reached<'a>(
        &mut self,
        catalog: &'a ContentCatalog,
        player: &PlayerState,
    ) -> Vec<&'a StoryBeat> {
        let stage = player.story_stage();
        let mut fired = Vec::new();
        for beat in &catalog.story {
            if beat.stage > stage {
                break;
            }
            if self.fired.insert(beat.id.clone()) {
                tracing::info!(beat = %beat.id, stage = beat.stage, "story beat reached");
                fired.push(beat);
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beats_fire_once_in_stage_order() {
        let catalog = ContentCatalog::builtin().unwrap();
        let mut story = StoryState::default();
        let mut player = PlayerState::default();

        let opening: Vec<_> = story.fire_reached(&catalog, &player);
        assert!(opening.iter().all(|beat| beat.stage == 0));

        player.advance_story_to(2);
        let fired = story.fire_reached(&catalog, &player);
        assert!(!fired.is_empty());
        assert!(fired.iter().all(|beat| beat.stage >= 1 && beat.stage <= 2));
        assert!(fired.windows(2).all(|pair| pair[0].stage <= pair[1].stage));
        assert!(story.fire_reached(&catalog, &player).is_empty());
    }
}
