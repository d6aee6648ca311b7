//! Errors raised when contract data is inconsistent.

use thiserror::Error;

use crate::entities::{CharacterId, LocationId};

/// Corrupt or inconsistent story data. These abort a generation run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("unknown tension abbreviation: {0}")]
    UnknownTension(String),

    #[error("unknown action template: {0}")]
    UnknownAction(String),

    #[error("unknown character: {0}")]
    UnknownCharacter(CharacterId),

    #[error("unknown location: {0}")]
    UnknownLocation(LocationId),

    #[error("action {action} takes {expected} character(s), got {actual}")]
    ArityMismatch {
        action: String,
        expected: usize,
        actual: usize,
    },

    #[error("proportional intensity outside policy table (link strength {strength}, base {base})")]
    ProportionalOutOfDomain { strength: i8, base: i8 },
}
