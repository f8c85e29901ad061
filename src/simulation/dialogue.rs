use crate::core::error::GameError;
use crate::core::rng::RandomSource;
use crate::data::{Contact, ContentCatalog, ForumPost, ForumSection, Mood};
use crate::rules::requirement::{ensure_unlocked, is_unlocked, unmet_clauses};
use crate::simulation::player::PlayerState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub contact_id: String,
    pub name: String,
    pub handle: String,
    pub mood: Mood,
    pub line: String,
    /// Flags this conversation set for the first time.
    pub flags_set: Vec<String>,
}

/// Friendly to members of the contact's own faction, hostile to its enemies.
pub fn mood_for(catalog: &ContentCatalog, player: &PlayerState, contact: &Contact) -> Mood {
    let (Some(theirs), Some(ours)) = (contact.faction.as_deref(), player.faction.as_deref()) else {
        return Mood::Neutral;
    };
    if theirs == ours {
        return Mood::Friendly;
    }
    match catalog.faction(theirs) {
        Ok(faction) if faction.is_enemy_of(ours) => Mood::Hostile,
        _ => Mood::Neutral,
    }
}

pub fn talk_to(
    catalog: &ContentCatalog,
    player: &mut PlayerState,
    rng: &mut dyn RandomSource,
    contact_id: &str,
) -> Result<Conversation, GameError> {
    let contact = catalog.contact(contact_id)?;
    if !player.contacts.contains(&contact.id) {
        return Err(GameError::ContactUnavailable {
            contact: contact.id.clone(),
        });
    }
    ensure_unlocked(&contact.id, unmet_clauses(&contact.requirement, player))?;

    let mood = mood_for(catalog, player, contact);
    let available: Vec<_> = contact
        .messages
        .iter()
        .filter(|message| is_unlocked(&message.requirement, player))
        .collect();
    let matching: Vec<_> = available
        .iter()
        .copied()
        .filter(|message| message.mood == mood)
        .collect();
    let pool = if matching.is_empty() { &available } else { &matching };
    let line = if pool.is_empty() {
        format!("{} has nothing to say right now.", contact.handle)
    } else {
        pool[rng.pick_index(pool.len()).min(pool.len() - 1)].text.clone()
    };

    let flags_set = contact
        .unlocks
        .iter()
        .filter(|flag| player.flags.insert((*flag).clone()))
        .cloned()
        .collect();
    tracing::debug!(contact = %contact.id, mood = ?mood, "conversation");

    Ok(Conversation {
        contact_id: contact.id.clone(),
        name: contact.name.clone(),
        handle: contact.handle.clone(),
        mood,
        line,
        flags_set,
    })
}

pub fn is_post_visible(post: &ForumPost, player: &PlayerState) -> bool {
    is_unlocked(&post.requirement, player)
}

/// Posts the player can see, in catalog order, optionally limited to one section.
pub fn visible_posts<'a>(
    catalog: &'a ContentCatalog,
    player: &PlayerState,
    section: Option<ForumSection>,
) -> Vec<&'a ForumPost> {
    catalog
        .forum
        .iter()
        .filter(|post| section.map_or(true, |section| post.section == section))
        .filter(|post| is_post_visible(post, player))
        .collect()
}

pub fn read_post<'a>(
    catalog: &'a ContentCatalog,
    player: &PlayerState,
    post_id: &str,
) -> Result<&'a ForumPost, GameError> {
    let post = catalog.post(post_id)?;
    ensure_unlocked(&post.id, unmet_clauses(&post.requirement, player))?;
    Ok(post)
}
