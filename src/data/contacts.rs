use serde::{Deserialize, Serialize};

use crate::rules::requirement::Requirement;

/// An NPC the player can message once their handle is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub handle: String,
    #[serde(default)]
    pub faction: Option<String>,
    pub messages: Vec<ContactMessage>,
    /// Flags set on the player after talking to this contact.
    #[serde(default)]
    pub unlocks: Vec<String>,
    /// Team roles this contact can fill.
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub requirement: Requirement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub text: String,
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub requirement: Requirement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Friendly,
    #[default]
    Neutral,
    Hostile,
}

impl Contact {
    pub fn offers_role(&self, role: &str) -> bool {
        self.roles.iter().any(|offered| offered == role)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumPost {
    pub id: String,
    pub section: ForumSection,
    pub author: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub requirement: Requirement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForumSection {
    Public,
    Private,
}
