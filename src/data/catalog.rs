use std::collections::HashSet;
use std::fs;
use std::path::Path;

use bevy_ecs::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::core::error::GameError;
use crate::data::{
    Achievement, AchievementTrigger, CatalogKind, Contact, Ending, EndingCondition, Faction,
    FactionBonus, ForumPost, ForumSection, ItemBonus, MarketItem, Mission, RandomEvent, StoryBeat,
};
use crate::data::events::EventModifier;
use crate::rules::effects::Effect;
use crate::rules::requirement::{FactionRequirement, Requirement};
use crate::simulation::player::PlayerState;

pub const CATALOG_SCHEMA_VERSION: u32 = 1;

const FACTIONS_FILE: &str = "factions.json";
const MISSIONS_FILE: &str = "missions.json";
const MARKET_FILE: &str = "market.json";
const EVENTS_FILE: &str = "events.json";
const ACHIEVEMENTS_FILE: &str = "achievements.json";
const ENDINGS_FILE: &str = "endings.json";
const CONTACTS_FILE: &str = "contacts.json";
const FORUM_FILE: &str = "forum.json";
const STORY_FILE: &str = "story.json";

#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Validation(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile<T> {
    schema_version: u32,
    entries: Vec<T>,
}

/// Raw text of every catalog file, keyed the same way on disk and when embedded.
struct CatalogSources<'a> {
    factions: (&'a str, String),
    missions: (&'a str, String),
    market: (&'a str, String),
    events: (&'a str, String),
    achievements: (&'a str, String),
    endings: (&'a str, String),
    contacts: (&'a str, String),
    forum: (&'a str, String),
    story: (&'a str, String),
}

/// Immutable content tables. Loaded and validated once; never mutated during play.
#[derive(Resource, Debug, Clone, Default)]
pub struct ContentCatalog {
    pub factions: Vec<Faction>,
    pub missions: Vec<Mission>,
    pub items: Vec<MarketItem>,
    pub events: Vec<RandomEvent>,
    pub achievements: Vec<Achievement>,
    pub endings: Vec<Ending>,
    pub contacts: Vec<Contact>,
    pub forum: Vec<ForumPost>,
    pub story: Vec<StoryBeat>,
}

/// Display summary of one catalog record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub kind: CatalogKind,
    pub id: String,
    pub name: String,
}

impl ContentCatalog {
    /// Reads every catalog file from `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, DataError> {
        let dir = dir.as_ref();
        let read = |name: &'static str| -> Result<(&'static str, String), DataError> {
            let path = dir.join(name);
            let raw = fs::read_to_string(&path).map_err(|source| DataError::Io {
                path: path.display().to_string(),
                source,
            })?;
            Ok((name, raw))
        };
        let sources = CatalogSources {
            factions: read(FACTIONS_FILE)?,
            missions: read(MISSIONS_FILE)?,
            market: read(MARKET_FILE)?,
            events: read(EVENTS_FILE)?,
            achievements: read(ACHIEVEMENTS_FILE)?,
            endings: read(ENDINGS_FILE)?,
            contacts: read(CONTACTS_FILE)?,
            forum: read(FORUM_FILE)?,
            story: read(STORY_FILE)?,
        };
        let catalog = Self::from_sources(sources)?;
        tracing::info!(
            dir = %dir.display(),
            missions = catalog.missions.len(),
            items = catalog.items.len(),
            events = catalog.events.len(),
            "content catalog loaded"
        );
        Ok(catalog)
    }

    /// The content shipped with the binary.
    pub fn builtin() -> Result<Self, DataError> {
        let embedded = |name: &'static str, raw: &str| (name, raw.to_string());
        Self::from_sources(CatalogSources {
            factions: embedded(FACTIONS_FILE, include_str!("../../assets/data/factions.json")),
            missions: embedded(MISSIONS_FILE, include_str!("../../assets/data/missions.json")),
            market: embedded(MARKET_FILE, include_str!("../../assets/data/market.json")),
            events: embedded(EVENTS_FILE, include_str!("../../assets/data/events.json")),
            achievements: embedded(
                ACHIEVEMENTS_FILE,
                include_str!("../../assets/data/achievements.json"),
            ),
            endings: embedded(ENDINGS_FILE, include_str!("../../assets/data/endings.json")),
            contacts: embedded(CONTACTS_FILE, include_str!("../../assets/data/contacts.json")),
            forum: embedded(FORUM_FILE, include_str!("../../assets/data/forum.json")),
            story: embedded(STORY_FILE, include_str!("../../assets/data/story.json")),
        })
    }

    fn from_sources(sources: CatalogSources<'_>) -> Result<Self, DataError> {
        let catalog = ContentCatalog {
            factions: parse_file(&sources.factions)?,
            missions: parse_file(&sources.missions)?,
            items: parse_file(&sources.market)?,
            events: parse_file(&sources.events)?,
            achievements: parse_file(&sources.achievements)?,
            endings: parse_file(&sources.endings)?,
            contacts: parse_file(&sources.contacts)?,
            forum: parse_file(&sources.forum)?,
            story: parse_file(&sources.story)?,
        };
        catalog.prepare()
    }

    /// Normalizes derived fields, then validates. Used by loaders and by hand-built catalogs.
    pub fn prepare(mut self) -> Result<Self, DataError> {
        self.normalize()?;
        self.validate()?;
        self.story.sort_by_key(|beat| beat.stage);
        Ok(self)
    }

    /// Folds a mission's story-stage tag and its faction's exclusivity list into its
    /// requirement, so eligibility only ever has to look at one predicate.
    fn normalize(&mut self) -> Result<(), DataError> {
        for mission in &mut self.missions {
            if mission.story_stage > 0 {
                let min = mission.requirement.min_story_stage.unwrap_or(0);
                mission.requirement.min_story_stage = Some(min.max(mission.story_stage));
            }
        }
        for faction in &self.factions {
            for mission_id in &faction.exclusive_missions {
                let Some(mission) = self.missions.iter_mut().find(|m| &m.id == mission_id) else {
                    return Err(DataError::Validation(format!(
                        "faction {} lists unknown exclusive mission {}",
                        faction.id, mission_id
                    )));
                };
                match &mission.requirement.faction {
                    None => {
                        mission.requirement.faction =
                            Some(FactionRequirement::Specific(faction.id.clone()));
                    }
                    Some(FactionRequirement::Specific(id)) if id == &faction.id => {}
                    Some(other) => {
                        return Err(DataError::Validation(format!(
                            "mission {} is exclusive to {} but requires {}",
                            mission.id, faction.id, other
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), DataError> {
        unique_ids("faction", self.factions.iter().map(|f| f.id.as_str()))?;
        unique_ids("mission", self.missions.iter().map(|m| m.id.as_str()))?;
        unique_ids("item", self.items.iter().map(|i| i.id.as_str()))?;
        unique_ids("event", self.events.iter().map(|e| e.id.as_str()))?;
        unique_ids("achievement", self.achievements.iter().map(|a| a.id.as_str()))?;
        unique_ids("ending", self.endings.iter().map(|e| e.id.as_str()))?;
        unique_ids("contact", self.contacts.iter().map(|c| c.id.as_str()))?;
        unique_ids("forum post", self.forum.iter().map(|p| p.id.as_str()))?;
        unique_ids("story beat", self.story.iter().map(|b| b.id.as_str()))?;

        for faction in &self.factions {
            self.validate_faction(faction)?;
        }
        for mission in &self.missions {
            self.validate_mission(mission)?;
        }
        for item in &self.items {
            self.validate_item(item)?;
        }
        for event in &self.events {
            validate_event(event)?;
        }
        for achievement in &self.achievements {
            let context = format!("achievement {}", achievement.id);
            if let Some(faction) = &achievement.required_faction {
                self.expect_faction(&context, faction)?;
            }
            if let AchievementTrigger::MissionCompleted { mission } = &achievement.trigger {
                self.expect_mission(&context, mission)?;
            }
            self.validate_effects(&context, &achievement.rewards)?;
        }
        for ending in &self.endings {
            if let EndingCondition::StoryComplete {
                faction: Some(faction),
                ..
            } = &ending.condition
            {
                self.expect_faction(&format!("ending {}", ending.id), faction)?;
            }
        }
        for contact in &self.contacts {
            let context = format!("contact {}", contact.id);
            if contact.messages.is_empty() {
                return Err(DataError::Validation(format!("{} has no messages", context)));
            }
            if let Some(faction) = &contact.faction {
                self.expect_faction(&context, faction)?;
            }
            self.validate_requirement(&context, &contact.requirement)?;
            for message in &contact.messages {
                self.validate_requirement(&context, &message.requirement)?;
            }
        }
        for post in &self.forum {
            let context = format!("forum post {}", post.id);
            if post.section == ForumSection::Private && post.requirement.is_empty() {
                return Err(DataError::Validation(format!(
                    "{} is private but has no access requirement",
                    context
                )));
            }
            self.validate_requirement(&context, &post.requirement)?;
        }
        Ok(())
    }

    fn validate_faction(&self, faction: &Faction) -> Result<(), DataError> {
        let context = format!("faction {}", faction.id);
        for other in faction.enemies.iter().chain(&faction.allies) {
            self.expect_faction(&context, other)?;
            if other == &faction.id {
                return Err(DataError::Validation(format!(
                    "{} lists itself as ally or enemy",
                    context
                )));
            }
        }
        for bonus in &faction.bonuses {
            let factor = match bonus {
                FactionBonus::ReputationMultiplier { factor }
                | FactionBonus::CurrencyMultiplier { factor }
                | FactionBonus::HeatGainMultiplier { factor } => *factor,
                FactionBonus::MarketDiscount { percent } if *percent > 100 => {
                    return Err(DataError::Validation(format!(
                        "{} market discount {}% exceeds 100",
                        context, percent
                    )));
                }
                _ => continue,
            };
            expect_factor(&context, factor)?;
        }
        Ok(())
    }

    fn validate_mission(&self, mission: &Mission) -> Result<(), DataError> {
        let context = format!("mission {}", mission.id);
        if mission.name.trim().is_empty() {
            return Err(DataError::Validation(format!("{} missing name", context)));
        }
        expect_risk(&context, mission.risk)?;
        self.validate_requirement(&context, &mission.requirement)?;
        self.validate_effects(&context, &mission.rewards)?;
        self.validate_effects(&context, &mission.final_rewards)?;

        if mission.is_multi_stage() {
            if !mission.rewards.is_empty() {
                return Err(DataError::Validation(format!(
                    "{} has stages; use final_rewards instead of rewards",
                    context
                )));
            }
        } else if !mission.final_rewards.is_empty() || mission.time_limit.is_some() {
            return Err(DataError::Validation(format!(
                "{} has final_rewards or a time_limit but no stages",
                context
            )));
        }

        if !mission.time_bonus.is_empty() && mission.time_limit.is_none() {
            return Err(DataError::Validation(format!(
                "{} has a time bonus but no time_limit",
                context
            )));
        }
        if mission.time_limit == Some(0) {
            return Err(DataError::Validation(format!("{} time_limit must be positive", context)));
        }
        for tier in &mission.time_bonus {
            if !(tier.fraction > 0.0 && tier.fraction <= 1.0) {
                return Err(DataError::Validation(format!(
                    "{} time bonus fraction {} outside (0, 1]",
                    context, tier.fraction
                )));
            }
            self.validate_effects(&context, &tier.rewards)?;
        }

        if let Some(role) = &mission.team_role {
            if !self.contacts.iter().any(|contact| contact.offers_role(role)) {
                return Err(DataError::Validation(format!(
                    "{} needs team role {} but no contact offers it",
                    context, role
                )));
            }
        }

        for (index, stage) in mission.stages.iter().enumerate() {
            let context = format!("{} stage {} ({})", context, index, stage.name);
            expect_risk(&context, stage.risk)?;
            if let Some(choice) = &stage.moral_choice {
                if choice.options.is_empty() {
                    return Err(DataError::Validation(format!("{} moral choice has no options", context)));
                }
                unique_ids(&context, choice.options.iter().map(|o| o.key.as_str()))?;
                for option in &choice.options {
                    self.validate_effects(&context, &option.consequences)?;
                }
            }
        }
        Ok(())
    }

    fn validate_item(&self, item: &MarketItem) -> Result<(), DataError> {
        let context = format!("item {}", item.id);
        if item.price.is_negative() {
            return Err(DataError::Validation(format!("{} has a negative price", context)));
        }
        if item.valid_for == Some(0) {
            return Err(DataError::Validation(format!("{} valid_for must be positive", context)));
        }
        for bonus in &item.bonuses {
            match bonus {
                ItemBonus::HeatGainMultiplier { factor } | ItemBonus::CurrencyMultiplier { factor } => {
                    expect_factor(&context, *factor)?
                }
                ItemBonus::RiskDelta { .. } => {}
            }
        }
        self.validate_requirement(&context, &item.requirement)
    }

    fn validate_requirement(&self, context: &str, requirement: &Requirement) -> Result<(), DataError> {
        if let Some(faction) = requirement.exclusive_faction() {
            self.expect_faction(context, faction)?;
        }
        for mission in &requirement.completed_missions {
            self.expect_mission(context, mission)?;
        }
        if let Some(event) = &requirement.active_event {
            if !self.events.iter().any(|e| &e.id == event) {
                return Err(unknown_reference(context, CatalogKind::Event, event));
            }
        }
        for achievement in &requirement.achievements {
            if !self.achievements.iter().any(|a| &a.id == achievement) {
                return Err(unknown_reference(context, CatalogKind::Achievement, achievement));
            }
        }
        Ok(())
    }

    fn validate_effects(&self, context: &str, effects: &[Effect]) -> Result<(), DataError> {
        for effect in effects {
            match effect {
                Effect::GrantItem { item } if !self.items.iter().any(|i| &i.id == item) => {
                    return Err(unknown_reference(context, CatalogKind::Item, item));
                }
                Effect::UnlockContact { contact }
                    if !self.contacts.iter().any(|c| &c.id == contact) =>
                {
                    return Err(unknown_reference(context, CatalogKind::Contact, contact));
                }
                Effect::FactionReputation { faction, .. } => self.expect_faction(context, faction)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn expect_faction(&self, context: &str, faction: &str) -> Result<(), DataError> {
        if self.factions.iter().any(|f| f.id == faction) {
            Ok(())
        } else {
            Err(unknown_reference(context, CatalogKind::Faction, faction))
        }
    }

    fn expect_mission(&self, context: &str, mission: &str) -> Result<(), DataError> {
        if self.missions.iter().any(|m| m.id == mission) {
            Ok(())
        } else {
            Err(unknown_reference(context, CatalogKind::Mission, mission))
        }
    }

    pub fn faction(&self, id: &str) -> Result<&Faction, GameError> {
        find(&self.factions, CatalogKind::Faction, id, |f| &f.id)
    }

    pub fn mission(&self, id: &str) -> Result<&Mission, GameError> {
        find(&self.missions, CatalogKind::Mission, id, |m| &m.id)
    }

    pub fn item(&self, id: &str) -> Result<&MarketItem, GameError> {
        find(&self.items, CatalogKind::Item, id, |i| &i.id)
    }

    pub fn event(&self, id: &str) -> Result<&RandomEvent, GameError> {
        find(&self.events, CatalogKind::Event, id, |e| &e.id)
    }

    pub fn achievement(&self, id: &str) -> Result<&Achievement, GameError> {
        find(&self.achievements, CatalogKind::Achievement, id, |a| &a.id)
    }

    pub fn ending(&self, id: &str) -> Result<&Ending, GameError> {
        find(&self.endings, CatalogKind::Ending, id, |e| &e.id)
    }

    pub fn contact(&self, id: &str) -> Result<&Contact, GameError> {
        find(&self.contacts, CatalogKind::Contact, id, |c| &c.id)
    }

    pub fn post(&self, id: &str) -> Result<&ForumPost, GameError> {
        find(&self.forum, CatalogKind::ForumPost, id, |p| &p.id)
    }

    /// Catalog events currently active for the player, in catalog order.
    pub fn active_events<'a>(
        &'a self,
        player: &'a PlayerState,
    ) -> impl Iterator<Item = &'a RandomEvent> + 'a {
        self.events
            .iter()
            .filter(move |event| player.is_event_active(&event.id))
    }

    /// Owned items whose bonuses currently apply, in catalog order. Gear tied to a faction
    /// goes dormant while the player is outside it.
    pub fn owned_items<'a>(
        &'a self,
        player: &'a PlayerState,
    ) -> impl Iterator<Item = &'a MarketItem> + 'a {
        self.items.iter().filter(move |item| {
            player.owns_item(&item.id)
                && item
                    .requirement
                    .faction
                    .as_ref()
                    .map_or(true, |faction| faction.is_met_by(player.faction.as_deref()))
        })
    }

    /// The player's current faction record, if they have one.
    pub fn player_faction(&self, player: &PlayerState) -> Option<&Faction> {
        let id = player.faction.as_deref()?;
        self.factions.iter().find(|f| f.id == id)
    }

    pub fn entries(&self, kind: CatalogKind) -> Vec<CatalogEntry> {
        let entry = |id: &str, name: &str| CatalogEntry {
            kind,
            id: id.to_string(),
            name: name.to_string(),
        };
        match kind {
            CatalogKind::Faction => self.factions.iter().map(|f| entry(&f.id, &f.name)).collect(),
            CatalogKind::Mission => self.missions.iter().map(|m| entry(&m.id, &m.name)).collect(),
            CatalogKind::Item => self.items.iter().map(|i| entry(&i.id, &i.name)).collect(),
            CatalogKind::Event => self.events.iter().map(|e| entry(&e.id, &e.name)).collect(),
            CatalogKind::Achievement => self
                .achievements
                .iter()
                .map(|a| entry(&a.id, &a.name))
                .collect(),
            CatalogKind::Ending => self.endings.iter().map(|e| entry(&e.id, &e.title)).collect(),
            CatalogKind::Contact => self.contacts.iter().map(|c| entry(&c.id, &c.name)).collect(),
            CatalogKind::ForumPost => self.forum.iter().map(|p| entry(&p.id, &p.title)).collect(),
            CatalogKind::StoryBeat => self.story.iter().map(|b| entry(&b.id, &b.title)).collect(),
        }
    }
}

fn parse_file<T: DeserializeOwned>(source: &(&str, String)) -> Result<Vec<T>, DataError> {
    let (path, raw) = source;
    let file: CatalogFile<T> = serde_json::from_str(raw).map_err(|source| DataError::Json {
        path: path.to_string(),
        source,
    })?;
    if file.schema_version != CATALOG_SCHEMA_VERSION {
        return Err(DataError::Validation(format!(
            "{} has schema_version {}, expected {}",
            path, file.schema_version, CATALOG_SCHEMA_VERSION
        )));
    }
    Ok(file.entries)
}

fn find<'a, T>(
    records: &'a [T],
    kind: CatalogKind,
    id: &str,
    key: impl Fn(&T) -> &String,
) -> Result<&'a T, GameError> {
    records
        .iter()
        .find(|record| key(record) == id)
        .ok_or_else(|| GameError::unknown(kind, id))
}

fn unique_ids<'a>(label: &str, ids: impl Iterator<Item = &'a str>) -> Result<(), DataError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(DataError::Validation(format!("{} id cannot be empty", label)));
        }
        if !seen.insert(id) {
            return Err(DataError::Validation(format!("duplicate {} id {}", label, id)));
        }
    }
    Ok(())
}

fn validate_event(event: &RandomEvent) -> Result<(), DataError> {
    let context = format!("event {}", event.id);
    if !(0.0..=1.0).contains(&event.probability) {
        return Err(DataError::Validation(format!(
            "{} probability {} outside [0, 1]",
            context, event.probability
        )));
    }
    if event.duration == 0 {
        return Err(DataError::Validation(format!("{} duration must be positive", context)));
    }
    for modifier in &event.effects {
        match modifier {
            EventModifier::RiskMultiplier { factor }
            | EventModifier::RewardMultiplier { factor }
            | EventModifier::PriceMultiplier { factor }
            | EventModifier::HeatGainMultiplier { factor } => expect_factor(&context, *factor)?,
            EventModifier::RiskDelta { .. } => {}
        }
    }
    Ok(())
}

fn expect_risk(context: &str, risk: u8) -> Result<(), DataError> {
    if risk > 100 {
        return Err(DataError::Validation(format!("{} risk {} exceeds 100", context, risk)));
    }
    Ok(())
}

fn expect_factor(context: &str, factor: f64) -> Result<(), DataError> {
    if !factor.is_finite() || factor < 0.0 {
        return Err(DataError::Validation(format!(
            "{} has invalid multiplier {}",
            context, factor
        )));
    }
    Ok(())
}

fn unknown_reference(context: &str, kind: CatalogKind, id: &str) -> DataError {
    DataError::Validation(format!("{} references unknown {} {}", context, kind, id))
}
