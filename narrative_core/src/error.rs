//! Engine errors and the expected, recoverable rejection outcomes.

use story_world::{CharacterId, WorldError};
use thiserror::Error;

/// Conditions that abort a generation run: corrupt inputs or configuration.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    World(#[from] WorldError),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("opening action {action} cannot be told: {rejection}")]
    OpeningRejected { action: String, rejection: Rejection },

    #[error("failed to export trace: {0}")]
    TraceExport(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Why a candidate action could not be placed in the story right now.
///
/// Rejections are ordinary search backtracking; the caller moves on to the
/// next candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no eligible character assignment")]
    Instantiation,

    #[error("character {0} is dead")]
    DeadCharacter(CharacterId),

    #[error("{performer} and {receiver} are in different places")]
    LocationConflict {
        performer: CharacterId,
        receiver: CharacterId,
    },

    #[error("filtered: {0}")]
    Filter(FilterReason),

    #[error("ruled out by active guidelines")]
    Guideline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    /// Nothing in any participant's context would change.
    NoNewInformation,
    /// The action contradicts the story, e.g. endangering the dead.
    Illogical,
    /// The same characters already did this as often as allowed.
    UsageCap,
    /// Identical to the action just told.
    Repeat,
}

impl std::fmt::Display for FilterReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            FilterReason::NoNewInformation => "adds no new information",
            FilterReason::Illogical => "illogical",
            FilterReason::UsageCap => "usage cap reached",
            FilterReason::Repeat => "repeats the previous action",
        };
        f.write_str(text)
    }
}

/// Outcome of one placement attempt.
pub type Attempt<T> = std::result::Result<T, Rejection>;
