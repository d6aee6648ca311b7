//! Action instances - templates bound to concrete characters.

use serde::{Deserialize, Serialize};

use crate::entities::CharacterId;
use crate::facts::BoundFact;

/// How a committed action stands against the social norms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SocialStatus {
    #[default]
    Regular,
    BreaksNorm,
    /// Breaks a norm, but the performer had reason to.
    Justified,
    /// Breaks a norm in a situation the norm excepts.
    Exception,
    /// Both justified and excepted.
    Ambiguous,
}

impl SocialStatus {
    /// Counts towards the story's norm violations.
    pub fn is_violation(self) -> bool {
        self == SocialStatus::BreaksNorm
    }
}

/// Where an action instance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ActionOrigin {
    /// Bound from a catalog template.
    #[default]
    Template,
    /// A character learning of the action committed at `step`.
    Realized { step: usize },
}

/// An action with its roles bound to characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInstance {
    pub name: String,
    /// Performer first, receiver second.
    pub characters: Vec<CharacterId>,
    pub preconditions: Vec<BoundFact>,
    pub effects: Vec<BoundFact>,
    pub social: SocialStatus,
    pub origin: ActionOrigin,
    pub secret: bool,
}

impl ActionInstance {
    pub fn performer(&self) -> Option<CharacterId> {
        self.characters.first().copied()
    }

    pub fn receiver(&self) -> Option<CharacterId> {
        self.characters.get(1).copied()
    }

    pub fn involves(&self, id: CharacterId) -> bool {
        self.characters.contains(&id)
    }

    /// Same action name performed by the same characters.
    pub fn same_as(&self, other: &ActionInstance) -> bool {
        self.name == other.name && self.characters == other.characters
    }

    pub fn is_realization(&self) -> bool {
        matches!(self.origin, ActionOrigin::Realized { .. })
    }
}

impl std::fmt::Display for ActionInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.characters.iter().map(|c| c.to_string()).collect();
        match self.origin {
            ActionOrigin::Template => write!(f, "{}({})", self.name, names.join(", ")),
            ActionOrigin::Realized { step } => {
                write!(f, "{} realised #{} {}", names.join(", "), step, self.name)
            }
        }
    }
}
