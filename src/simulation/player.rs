use std::collections::{BTreeMap, BTreeSet};

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::config::StartingProfile;
use crate::rules::money::{Btc, Price};

pub const MAX_HEAT: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedItem {
    pub acquired_turn: u64,
    #[serde(default)]
    pub expires_turn: Option<u64>,
}

/// The single mutable record of the player's run.
///
/// Only the mission engine, the event scheduler and explicit player actions write to it;
/// listings and renderers take it by shared reference.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub handle: String,
    pub reputation: u32,
    #[serde(default)]
    pub btc: Btc,
    #[serde(default)]
    pub usd: i64,
    #[serde(default)]
    pub skills: BTreeMap<String, u32>,
    #[serde(default)]
    pub faction: Option<String>,
    #[serde(default)]
    pub faction_reputation: BTreeMap<String, i32>,
    #[serde(default)]
    heat: u8,
    #[serde(default)]
    pub warnings: u32,
    #[serde(default)]
    pub items: BTreeMap<String, OwnedItem>,
    #[serde(default)]
    pub contacts: BTreeSet<String>,
    #[serde(default)]
    pub completed_missions: BTreeSet<String>,
    #[serde(default)]
    pub achievements: BTreeSet<String>,
    #[serde(default)]
    pub flags: BTreeSet<String>,
    #[serde(default)]
    pub faction_changes: u32,
    #[serde(default)]
    pub last_faction_switch: Option<u64>,
    /// Active world events mapped to their remaining duration in turns.
    #[serde(default)]
    pub active_events: BTreeMap<String, u32>,
    #[serde(default)]
    story_stage: u32,
    #[serde(default)]
    burned: bool,
    #[serde(default)]
    pub ending: Option<String>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new(&StartingProfile::default())
    }
}

impl PlayerState {
    pub fn new(profile: &StartingProfile) -> Self {
        Self {
            handle: profile.handle.clone(),
            reputation: profile.reputation,
            btc: Btc::from_btc(profile.btc),
            usd: profile.usd,
            skills: profile.skills.clone(),
            faction: None,
            faction_reputation: BTreeMap::new(),
            heat: 0,
            warnings: 0,
            items: BTreeMap::new(),
            contacts: profile.contacts.iter().cloned().collect(),
            completed_missions: BTreeSet::new(),
            achievements: BTreeSet::new(),
            flags: BTreeSet::new(),
            faction_changes: 0,
            last_faction_switch: None,
            active_events: BTreeMap::new(),
            story_stage: 0,
            burned: false,
            ending: None,
        }
    }

    pub fn heat(&self) -> u8 {
        self.heat
    }

    pub fn is_burned(&self) -> bool {
        self.burned
    }

    /// Adds `delta` heat, clamped to 0..=100. Returns the change actually applied.
    pub fn adjust_heat(&mut self, delta: i32) -> i32 {
        let before = self.heat as i32;
        let after = (before + delta).clamp(0, MAX_HEAT as i32);
        self.heat = after as u8;
        if self.heat >= MAX_HEAT {
            self.burned = true;
        }
        after - before
    }

    pub fn story_stage(&self) -> u32 {
        self.story_stage
    }

    /// Moves the story forward to `stage`. Returns false when the player is already there.
    pub fn advance_story_to(&mut self, stage: u32) -> bool {
        if stage <= self.story_stage {
            return false;
        }
        self.story_stage = stage;
        true
    }

    pub fn adjust_reputation(&mut self, delta: i32) -> i32 {
        let before = self.reputation as i64;
        let after = (before + delta as i64).clamp(0, u32::MAX as i64);
        self.reputation = after as u32;
        (after - before) as i32
    }

    pub fn skill(&self, skill: &str) -> u32 {
        self.skills.get(skill).copied().unwrap_or(0)
    }

    pub fn adjust_skill(&mut self, skill: &str, delta: i32) -> i32 {
        let entry = self.skills.entry(skill.to_string()).or_insert(0);
        let before = *entry as i64;
        let after = (before + delta as i64).max(0).min(u32::MAX as i64);
        *entry = after as u32;
        (after - before) as i32
    }

    pub fn faction_standing(&self, faction: &str) -> i32 {
        self.faction_reputation.get(faction).copied().unwrap_or(0)
    }

    pub fn adjust_faction_reputation(&mut self, faction: &str, delta: i32, cap: i32) -> i32 {
        let cap = cap.max(0);
        let entry = self.faction_reputation.entry(faction.to_string()).or_insert(0);
        let before = *entry;
        *entry = before.saturating_add(delta).clamp(-cap, cap);
        *entry - before
    }

    pub fn owns_item(&self, item: &str) -> bool {
        self.items.contains_key(item)
    }

    pub fn grant_item(&mut self, item: &str, turn: u64, valid_for: Option<u32>) -> bool {
        if self.items.contains_key(item) {
            return false;
        }
        self.items.insert(
            item.to_string(),
            OwnedItem {
                acquired_turn: turn,
                expires_turn: valid_for.map(|turns| turn + turns as u64),
            },
        );
        true
    }

    pub fn is_event_active(&self, event: &str) -> bool {
        self.active_events.contains_key(event)
    }

    pub fn can_afford(&self, price: Price) -> bool {
        match price {
            Price::Btc(cost) => self.btc >= cost,
            Price::Usd(cost) => self.usd >= cost,
        }
    }

    pub fn balance_in(&self, price: Price) -> Price {
        match price {
            Price::Btc(_) => Price::Btc(self.btc),
            Price::Usd(_) => Price::Usd(self.usd),
        }
    }

    pub fn spend(&mut self, price: Price) {
        match price {
            Price::Btc(cost) => self.btc = self.btc.sub(cost),
            Price::Usd(cost) => self.usd = self.usd.saturating_sub(cost),
        }
    }

    /// Re-establishes the heat invariant on state that came from outside (e.g. a save file).
    pub fn normalize(&mut self) {
        self.heat = self.heat.min(MAX_HEAT);
        if self.heat >= MAX_HEAT {
            self.burned = true;
        }
    }
}
