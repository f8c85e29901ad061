pub mod achievements;
pub mod catalog;
pub mod contacts;
pub mod endings;
pub mod events;
pub mod factions;
pub mod market;
pub mod missions;
pub mod story;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use achievements::{Achievement, AchievementTrigger, Rarity};
pub use catalog::{CatalogEntry, ContentCatalog, DataError};
pub use contacts::{Contact, ContactMessage, ForumPost, ForumSection, Mood};
pub use endings::{Ending, EndingCondition};
pub use events::{EventCategory, EventModifier, RandomEvent};
pub use factions::{Faction, FactionBonus};
pub use market::{ItemBonus, ItemCategory, MarketItem};
pub use missions::{ChoiceOption, Mission, MissionStage, MoralChoice, TimeBonusTier};
pub use story::StoryBeat;

/// The kinds of record the catalog holds; used for lookups, listings and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Faction,
    Mission,
    Item,
    Event,
    Achievement,
    Ending,
    Contact,
    ForumPost,
    StoryBeat,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 9] = [
        CatalogKind::Faction,
        CatalogKind::Mission,
        CatalogKind::Item,
        CatalogKind::Event,
        CatalogKind::Achievement,
        CatalogKind::Ending,
        CatalogKind::Contact,
        CatalogKind::ForumPost,
        CatalogKind::StoryBeat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CatalogKind::Faction => "faction",
            CatalogKind::Mission => "mission",
            CatalogKind::Item => "item",
            CatalogKind::Event => "event",
            CatalogKind::Achievement => "achievement",
            CatalogKind::Ending => "ending",
            CatalogKind::Contact => "contact",
            CatalogKind::ForumPost => "forum post",
            CatalogKind::StoryBeat => "story beat",
        }
    }

    /// Parses the plural or singular names the CLI accepts (`missions`, `item`, `forum`).
    pub fn parse(raw: &str) -> Option<Self> {
        let kind = match raw.trim().to_ascii_lowercase().as_str() {
            "faction" | "factions" => CatalogKind::Faction,
            "mission" | "missions" => CatalogKind::Mission,
            "item" | "items" | "market" => CatalogKind::Item,
            "event" | "events" => CatalogKind::Event,
            "achievement" | "achievements" => CatalogKind::Achievement,
            "ending" | "endings" => CatalogKind::Ending,
            "contact" | "contacts" => CatalogKind::Contact,
            "post" | "posts" | "forum" => CatalogKind::ForumPost,
            "story" | "beats" => CatalogKind::StoryBeat,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
