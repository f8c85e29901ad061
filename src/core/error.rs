use thiserror::Error;

use crate::data::CatalogKind;
use crate::rules::money::Price;
use crate::rules::requirement::UnmetClause;

/// Errors surfaced by player-facing operations.
///
/// Everything except `UnknownId` is a normal gameplay refusal: the operation left state
/// untouched and the message can be shown to the player as-is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    #[error("{subject} is locked: {}", join_clauses(.unmet))]
    Ineligible {
        subject: String,
        unmet: Vec<UnmetClause>,
    },

    #[error("cannot afford {item}: costs {required}, balance {available}")]
    InsufficientFunds {
        item: String,
        required: Price,
        available: Price,
    },

    #[error("{subject} is exclusive to {faction} members")]
    FactionLocked { subject: String, faction: String },

    #[error("faction switch on cooldown for {remaining} more turns")]
    Cooldown { remaining: u64 },

    #[error("mission {mission} ran past its {limit}-turn time limit")]
    TimedOut { mission: String, limit: u32 },

    #[error("unknown {kind} id `{id}`")]
    UnknownId { kind: CatalogKind, id: String },

    #[error("{item} is already in your kit")]
    AlreadyOwned { item: String },

    #[error("already a member of {faction}")]
    AlreadyInFaction { faction: String },

    #[error("mission {mission} is already underway")]
    MissionInProgress { mission: String },

    #[error("mission {mission} is not underway")]
    MissionNotStarted { mission: String },

    #[error("mission {mission} has no decision waiting at stage {stage}")]
    NoPendingChoice { mission: String, stage: usize },

    #[error("`{choice}` is not an option for mission {mission}")]
    InvalidChoice { mission: String, choice: String },

    #[error("{contact} is not in your contact list")]
    ContactUnavailable { contact: String },

    #[error("the run is over: {ending}")]
    GameOver { ending: String },
}

impl GameError {
    pub fn unknown(kind: CatalogKind, id: impl Into<String>) -> Self {
        GameError::UnknownId {
            kind,
            id: id.into(),
        }
    }

    /// `false` only for content defects that a player cannot cause or fix.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GameError::UnknownId { .. })
    }
}

fn join_clauses(unmet: &[UnmetClause]) -> String {
    unmet
        .iter()
        .map(|clause| clause.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
