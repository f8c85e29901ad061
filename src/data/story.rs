use serde::{Deserialize, Serialize};

/// Narrative text fired once when the story reaches `stage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryBeat {
    pub stage: u32,
    pub id: String,
    pub title: String,
    pub text: String,
}
