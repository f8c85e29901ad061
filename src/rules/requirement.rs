use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::GameError;
use crate::simulation::player::PlayerState;

/// Faction clause of a requirement. Written as `"any"` or a faction id in catalog files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FactionRequirement {
    Any,
    Specific(String),
}

impl From<String> for FactionRequirement {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("any") {
            FactionRequirement::Any
        } else {
            FactionRequirement::Specific(value)
        }
    }
}

impl From<FactionRequirement> for String {
    fn from(value: FactionRequirement) -> Self {
        match value {
            FactionRequirement::Any => "any".to_string(),
            FactionRequirement::Specific(id) => id,
        }
    }
}

impl FactionRequirement {
    pub fn is_met_by(&self, faction: Option<&str>) -> bool {
        match self {
            FactionRequirement::Any => faction.is_some(),
            FactionRequirement::Specific(id) => faction == Some(id.as_str()),
        }
    }
}

impl fmt::Display for FactionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactionRequirement::Any => write!(f, "any faction"),
            FactionRequirement::Specific(id) => write!(f, "{}", id),
        }
    }
}

/// Conjunction of access clauses. The empty requirement always passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Requirement {
    pub min_reputation: Option<u32>,
    pub skills: BTreeMap<String, u32>,
    /// Threshold applied to every skill the player tracks.
    pub all_skills: Option<u32>,
    pub faction: Option<FactionRequirement>,
    pub completed_missions: BTreeSet<String>,
    pub active_event: Option<String>,
    pub achievements: BTreeSet<String>,
    pub min_story_stage: Option<u32>,
    pub flags: BTreeSet<String>,
}

impl Requirement {
    pub fn is_empty(&self) -> bool {
        self == &Requirement::default()
    }

    /// The specific faction this requirement is exclusive to, if any.
    pub fn exclusive_faction(&self) -> Option<&str> {
        match &self.faction {
            Some(FactionRequirement::Specific(id)) => Some(id.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnmetClause {
    Reputation { required: u32, actual: u32 },
    Skill { skill: String, required: u32, actual: u32 },
    Faction { required: FactionRequirement, actual: Option<String> },
    Mission { mission: String },
    Event { event: String },
    Achievement { achievement: String },
    StoryStage { required: u32, actual: u32 },
    Flag { flag: String },
    TeamRole { role: String },
    Contact { contact: String },
    Ending { ending: String },
}

impl UnmetClause {
    /// How far short the player is on numeric clauses.
    pub fn deficit(&self) -> Option<u32> {
        match self {
            UnmetClause::Reputation { required, actual }
            | UnmetClause::Skill {
                required, actual, ..
            }
            | UnmetClause::StoryStage { required, actual } => Some(required - actual),
            _ => None,
        }
    }
}

impl fmt::Display for UnmetClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmetClause::Reputation { required, actual } => write!(
                f,
                "reputation {}/{} (deficit {})",
                actual,
                required,
                required - actual
            ),
            UnmetClause::Skill {
                skill,
                required,
                actual,
            } => write!(f, "{} {}/{}", skill, actual, required),
            UnmetClause::Faction { required, actual } => match actual {
                Some(current) => write!(f, "requires {} (currently {})", required, current),
                None => write!(f, "requires {} (unaffiliated)", required),
            },
            UnmetClause::Mission { mission } => write!(f, "complete {} first", mission),
            UnmetClause::Event { event } => write!(f, "only during {}", event),
            UnmetClause::Achievement { achievement } => write!(f, "earn {} first", achievement),
            UnmetClause::StoryStage { required, actual } => {
                write!(f, "story stage {}/{}", actual, required)
            }
            UnmetClause::Flag { flag } => write!(f, "needs {}", flag),
            UnmetClause::TeamRole { role } => write!(f, "needs a {} on the team", role),
            UnmetClause::Contact { contact } => write!(f, "you don't know {} yet", contact),
            UnmetClause::Ending { ending } => write!(f, "ending {} not reached", ending),
        }
    }
}

pub fn is_unlocked(requirement: &Requirement, player: &PlayerState) -> bool {
    unmet_clauses(requirement, player).is_empty()
}

/// Every clause of `requirement` the player does not satisfy, in a stable order.
pub fn unmet_clauses(requirement: &Requirement, player: &PlayerState) -> Vec<UnmetClause> {
    let mut unmet = Vec::new();

    if let Some(required) = requirement.min_reputation {
        if player.reputation < required {
            unmet.push(UnmetClause::Reputation {
                required,
                actual: player.reputation,
            });
        }
    }

    for (skill, required) in skill_thresholds(requirement, player) {
        let actual = player.skill(&skill);
        if actual < required {
            unmet.push(UnmetClause::Skill {
                skill,
                required,
                actual,
            });
        }
    }

    if let Some(required) = &requirement.faction {
        if !required.is_met_by(player.faction.as_deref()) {
            unmet.push(UnmetClause::Faction {
                required: required.clone(),
                actual: player.faction.clone(),
            });
        }
    }

    for mission in &requirement.completed_missions {
        if !player.completed_missions.contains(mission) {
            unmet.push(UnmetClause::Mission {
                mission: mission.clone(),
            });
        }
    }

    if let Some(event) = &requirement.active_event {
        if !player.is_event_active(event) {
            unmet.push(UnmetClause::Event {
                event: event.clone(),
            });
        }
    }

    for achievement in &requirement.achievements {
        if !player.achievements.contains(achievement) {
            unmet.push(UnmetClause::Achievement {
                achievement: achievement.clone(),
            });
        }
    }

    if let Some(required) = requirement.min_story_stage {
        if player.story_stage() < required {
            unmet.push(UnmetClause::StoryStage {
                required,
                actual: player.story_stage(),
            });
        }
    }

    for flag in &requirement.flags {
        if !player.flags.contains(flag) {
            unmet.push(UnmetClause::Flag { flag: flag.clone() });
        }
    }

    unmet
}

/// Turns unmet clauses into the matching refusal. A clause naming a specific faction wins,
/// since no amount of grinding unlocks faction-exclusive content.
pub fn ensure_unlocked(subject: &str, unmet: Vec<UnmetClause>) -> Result<(), GameError> {
    if unmet.is_empty() {
        return Ok(());
    }
    let exclusive = unmet.iter().find_map(|clause| match clause {
        UnmetClause::Faction {
            required: FactionRequirement::Specific(faction),
            ..
        } => Some(faction.clone()),
        _ => None,
    });
    match exclusive {
        Some(faction) => Err(GameError::FactionLocked {
            subject: subject.to_string(),
            faction,
        }),
        None => Err(GameError::Ineligible {
            subject: subject.to_string(),
            unmet,
        }),
    }
}

/// Only the skill clauses; stages re-check these when they start.
pub fn unmet_skills(skills: &BTreeMap<String, u32>, player: &PlayerState) -> Vec<UnmetClause> {
    skills
        .iter()
        .filter_map(|(skill, required)| {
            let actual = player.skill(skill);
            (actual < *required).then(|| UnmetClause::Skill {
                skill: skill.clone(),
                required: *required,
                actual,
            })
        })
        .collect()
}

fn skill_thresholds(requirement: &Requirement, player: &PlayerState) -> BTreeMap<String, u32> {
    let mut thresholds = BTreeMap::new();
    if let Some(all) = requirement.all_skills {
        for skill in player.skills.keys() {
            thresholds.insert(skill.clone(), all);
        }
    }
    for (skill, required) in &requirement.skills {
        let entry = thresholds.entry(skill.clone()).or_insert(0);
        *entry = (*entry).max(*required);
    }
    thresholds
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn player() -> PlayerState {
        let mut player = PlayerState::default();
        player.reputation = 10;
        player.skills.insert("scanning".to_string(), 1);
        player
    }

    #[test]
    fn empty_requirement_passes() {
        assert!(is_unlocked(&Requirement::default(), &PlayerState::default()));
    }

    #[test]
    fn reputation_deficit_is_reported() {
        let requirement = Requirement {
            min_reputation: Some(25),
            ..Default::default()
        };
        let unmet = unmet_clauses(&requirement, &player());
        assert_eq!(
            unmet,
            vec![UnmetClause::Reputation {
                required: 25,
                actual: 10
            }]
        );
        assert_eq!(unmet[0].deficit(), Some(15));
    }

    #[test]
    fn all_skills_applies_to_every_tracked_skill() {
        let mut player = player();
        player.skills.insert("stealth".to_string(), 3);
        let requirement = Requirement {
            all_skills: Some(2),
            skills: [("stealth".to_string(), 4)].into_iter().collect(),
            ..Default::default()
        };
        let unmet = unmet_clauses(&requirement, &player);
        let skills: Vec<_> = unmet
            .iter()
            .filter_map(|clause| match clause {
                UnmetClause::Skill { skill, required, .. } => Some((skill.as_str(), *required)),
                _ => None,
            })
            .collect();
        assert!(skills.contains(&("scanning", 2)));
        assert!(skills.contains(&("stealth", 4)));
        assert!(skills.contains(&("forensics", 2)));
        assert_eq!(skills.len(), player.skills.len());
    }

    #[test]
    fn faction_any_needs_some_faction() {
        let requirement = Requirement {
            faction: Some(FactionRequirement::Any),
            ..Default::default()
        };
        let mut player = player();
        assert!(!is_unlocked(&requirement, &player));
        player.faction = Some("grey_hat".to_string());
        assert!(is_unlocked(&requirement, &player));
    }

    #[test]
    fn faction_access_follows_current_faction() {
        let requirement = Requirement {
            faction: Some(FactionRequirement::Specific("white_hat".to_string())),
            ..Default::default()
        };
        let mut player = player();
        player.faction = Some("white_hat".to_string());
        assert!(is_unlocked(&requirement, &player));
        player.faction = Some("black_hat".to_string());
        assert!(!is_unlocked(&requirement, &player));
        assert_eq!(requirement.exclusive_faction(), Some("white_hat"));
    }

    #[test]
    fn set_clauses_are_subset_checks() {
        let requirement = Requirement {
            completed_missions: ["port_scan".to_string()].into_iter().collect(),
            achievements: ["first_blood".to_string()].into_iter().collect(),
            active_event: Some("crypto_boom".to_string()),
            min_story_stage: Some(1),
            flags: ["broker_access".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let mut player = player();
        assert_eq!(unmet_clauses(&requirement, &player).len(), 5);
        player.completed_missions.insert("port_scan".to_string());
        player.completed_missions.insert("extra".to_string());
        player.achievements.insert("first_blood".to_string());
        player.active_events.insert("crypto_boom".to_string(), 2);
        player.advance_story_to(1);
        player.flags.insert("broker_access".to_string());
        assert!(is_unlocked(&requirement, &player));
    }

    #[test]
    fn exclusive_faction_clause_becomes_faction_locked() {
        let requirement = Requirement {
            faction: Some(FactionRequirement::Specific("black_hat".to_string())),
            min_reputation: Some(50),
            ..Default::default()
        };
        let err = ensure_unlocked("ransomware_op", unmet_clauses(&requirement, &player())).unwrap_err();
        assert_eq!(
            err,
            GameError::FactionLocked {
                subject: "ransomware_op".to_string(),
                faction: "black_hat".to_string(),
            }
        );
        assert!(ensure_unlocked("port_scan", Vec::new()).is_ok());
    }

    #[test]
    fn faction_requirement_parses_any_and_ids() {
        let requirement: Requirement =
            serde_json::from_str(r#"{"faction": "any", "min_reputation": 5}"#).unwrap();
        assert_eq!(requirement.faction, Some(FactionRequirement::Any));
        let requirement: Requirement = serde_json::from_str(r#"{"faction": "black_hat"}"#).unwrap();
        assert_eq!(requirement.exclusive_faction(), Some("black_hat"));
        assert!(serde_json::from_str::<Requirement>(r#"{"min_reputaton": 5}"#).is_err());
    }

    proptest! {
        #[test]
        fn evaluation_is_deterministic_and_pure(
            reputation in 0u32..200,
            scanning in 0u32..10,
            min_reputation in proptest::option::of(0u32..200),
            min_scanning in 0u32..10,
            all_skills in proptest::option::of(0u32..5),
        ) {
            let mut player = PlayerState::default();
            player.reputation = reputation;
            player.skills.insert("scanning".to_string(), scanning);
            let requirement = Requirement {
                min_reputation,
                all_skills,
                skills: [("scanning".to_string(), min_scanning)].into_iter().collect(),
                ..Default::default()
            };
            let before = player.clone();
            let first = is_unlocked(&requirement, &player);
            let second = is_unlocked(&requirement, &player);
            prop_assert_eq!(first, second);
            prop_assert_eq!(unmet_clauses(&requirement, &player), unmet_clauses(&requirement, &player));
            prop_assert_eq!(before, player);
        }
    }
}
