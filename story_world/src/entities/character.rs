//! Character definitions.

use serde::{Deserialize, Serialize};

use super::{CharacterId, LocationId};

/// A member of the cast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    /// Where the character currently is.
    pub location: LocationId,
    pub alive: bool,
}

impl Character {
    /// Create a living character at the given location.
    pub fn new(id: CharacterId, name: impl Into<String>, location: LocationId) -> Self {
        Self {
            id,
            name: name.into(),
            location,
            alive: true,
        }
    }

    /// Check if the character is alive.
    pub fn is_alive(&self) -> bool {
        self.alive
    }
}
