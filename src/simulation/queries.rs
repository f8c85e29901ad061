use crate::data::{CatalogEntry, CatalogKind, ContentCatalog};
use crate::rules::requirement::{unmet_clauses, UnmetClause};
use crate::simulation::missions::mission_unmet;
use crate::simulation::player::PlayerState;

/// A catalog entry with its lock status for the current player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub entry: CatalogEntry,
    pub unmet: Vec<UnmetClause>,
}

impl Listing {
    pub fn is_unlocked(&self) -> bool {
        self.unmet.is_empty()
    }
}

/// Every entry of `kind` in catalog order, locked ones included with their unmet clauses.
/// Hidden achievements stay out until earned.
pub fn listing(catalog: &ContentCatalog, player: &PlayerState, kind: CatalogKind) -> Vec<Listing> {
    catalog
        .entries(kind)
        .into_iter()
        .filter_map(|entry| {
            let unmet = match kind {
                CatalogKind::Faction => Vec::new(),
                CatalogKind::Mission => {
                    let mission = catalog.mission(&entry.id).ok()?;
                    mission_unmet(catalog, player, mission)
                }
                CatalogKind::Item => unmet_clauses(&catalog.item(&entry.id).ok()?.requirement, player),
                CatalogKind::Event => {
                    if player.is_event_active(&entry.id) {
                        Vec::new()
                    } else {
                        vec![UnmetClause::Event {
                            event: entry.id.clone(),
                        }]
                    }
                }
                CatalogKind::Achievement => {
                    let earned = player.achievements.contains(&entry.id);
                    if !earned && catalog.achievement(&entry.id).ok()?.hidden {
                        return None;
                    }
                    if earned {
                        Vec::new()
                    } else {
                        vec![UnmetClause::Achievement {
                            achievement: entry.id.clone(),
                        }]
                    }
                }
                CatalogKind::Ending => {
                    if player.ending.as_deref() == Some(entry.id.as_str()) {
                        Vec::new()
                    } else {
                        vec![UnmetClause::Ending {
                            ending: entry.id.clone(),
                        }]
                    }
                }
                CatalogKind::Contact => {
                    let contact = catalog.contact(&entry.id).ok()?;
                    let mut unmet = Vec::new();
                    if !player.contacts.contains(&contact.id) {
                        unmet.push(UnmetClause::Contact {
                            contact: contact.id.clone(),
                        });
                    }
                    unmet.extend(unmet_clauses(&contact.requirement, player));
                    unmet
                }
                CatalogKind::ForumPost => {
                    unmet_clauses(&catalog.post(&entry.id).ok()?.requirement, player)
                }
                CatalogKind::StoryBeat => {
                    let beat = catalog.story.iter().find(|beat| beat.id == entry.id)?;
                    if beat.stage <= player.story_stage() {
                        Vec::new()
                    } else {
                        vec![UnmetClause::StoryStage {
                            required: beat.stage,
                            actual: player.story_stage(),
                        }]
                    }
                }
            };
            Some(Listing { entry, unmet })
        })
        .collect()
}

/// Only the unlocked entries of `kind`, in catalog order.
pub fn query_unlocked(
    catalog: &ContentCatalog,
    player: &PlayerState,
    kind: CatalogKind,
) -> Vec<CatalogEntry> {
    listing(catalog, player, kind)
        .into_iter()
        .filter(Listing::is_unlocked)
        .map(|listing| listing.entry)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_player_sees_port_scan_but_not_web_vuln() {
        let catalog = ContentCatalog::builtin().unwrap();
        let player = PlayerState::default();
        let unlocked: Vec<_> = query_unlocked(&catalog, &player, CatalogKind::Mission)
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        assert!(unlocked.contains(&"port_scan".to_string()));
        assert!(!unlocked.contains(&"web_vuln".to_string()));

        let web_vuln = listing(&catalog, &player, CatalogKind::Mission)
            .into_iter()
            .find(|listing| listing.entry.id == "web_vuln")
            .unwrap();
        assert!(web_vuln.unmet.contains(&UnmetClause::Reputation {
            required: 25,
            actual: 10
        }));
    }

    #[test]
    fn unlocked_missions_keep_catalog_order() {
        let catalog = ContentCatalog::builtin().unwrap();
        let mut player = PlayerState::default();
        player.reputation = 500;
        for level in player.skills.values_mut() {
            *level = 10;
        }
        let unlocked = query_unlocked(&catalog, &player, CatalogKind::Mission);
        let positions: Vec<_> = unlocked
            .iter()
            .map(|entry| catalog.missions.iter().position(|m| m.id == entry.id).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn faction_exclusive_access_is_not_cached() {
        let catalog = ContentCatalog::builtin().unwrap();
        let faction = catalog
            .factions
            .iter()
            .find(|f| !f.exclusive_missions.is_empty())
            .unwrap();
        let mission_id = faction.exclusive_missions[0].clone();
        let mut player = PlayerState::default();
        player.reputation = 1_000;
        for level in player.skills.values_mut() {
            *level = 10;
        }
        player.advance_story_to(10);
        for mission in &catalog.missions {
            player.completed_missions.insert(mission.id.clone());
        }
        let visible = |player: &PlayerState| {
            query_unlocked(&catalog, player, CatalogKind::Mission)
                .iter()
                .any(|entry| entry.id == mission_id)
        };
        player.faction = Some(faction.id.clone());
        let in_faction = visible(&player);
        player.faction = None;
        assert!(!visible(&player));
        player.faction = Some(faction.id.clone());
        assert_eq!(visible(&player), in_faction);
    }

    #[test]
    fn hidden_achievements_stay_hidden_until_earned() {
        let catalog = ContentCatalog::builtin().unwrap();
        let hidden = catalog.achievements.iter().find(|a| a.hidden).unwrap();
        let mut player = PlayerState::default();
        let ids = |player: &PlayerState| -> Vec<String> {
            listing(&catalog, player, CatalogKind::Achievement)
                .into_iter()
                .map(|l| l.entry.id)
                .collect()
        };
        assert!(!ids(&player).contains(&hidden.id));
        player.achievements.insert(hidden.id.clone());
        assert!(ids(&player).contains(&hidden.id));
    }
}
