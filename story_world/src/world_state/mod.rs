//! The cast arena - characters and locations of one story run.

use serde::{Deserialize, Serialize};

use crate::entities::{Character, CharacterId, LocationId};
use crate::error::WorldError;

/// A named place characters can be at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
}

/// All characters and locations available to a story.
///
/// Characters live in an arena indexed by [`CharacterId`]; relations between
/// characters are always stored as id pairs, never as references.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoryWorld {
    characters: Vec<Character>,
    locations: Vec<Location>,
}

impl StoryWorld {
    /// Create a new empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a location to the world.
    pub fn add_location(&mut self, name: impl Into<String>) -> LocationId {
        let id = LocationId(self.locations.len() as u32);
        self.locations.push(Location {
            id,
            name: name.into(),
        });
        id
    }

    /// Add a living character at `location`.
    pub fn add_character(&mut self, name: impl Into<String>, location: LocationId) -> CharacterId {
        let id = CharacterId(self.characters.len() as u32);
        self.characters.push(Character::new(id, name, location));
        id
    }

    /// Get character by ID.
    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(id.index())
    }

    /// Get character by ID or fail with [`WorldError::UnknownCharacter`].
    pub fn require(&self, id: CharacterId) -> Result<&Character, WorldError> {
        self.character(id).ok_or(WorldError::UnknownCharacter(id))
    }

    /// Get location by ID.
    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(id.index())
    }

    /// Iterate over the whole cast in id order.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.iter()
    }

    /// Number of characters in the cast.
    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    pub fn is_alive(&self, id: CharacterId) -> bool {
        self.character(id).is_some_and(Character::is_alive)
    }

    pub fn location_of(&self, id: CharacterId) -> Option<LocationId> {
        self.character(id).map(|c| c.location)
    }

    /// Living characters at a specific location, in id order.
    pub fn characters_at(&self, location: LocationId) -> Vec<CharacterId> {
        self.characters
            .iter()
            .filter(|c| c.alive && c.location == location)
            .map(|c| c.id)
            .collect()
    }

    /// Move a character to a location.
    pub fn move_character(&mut self, id: CharacterId, location: LocationId) -> Result<(), WorldError> {
        if self.location(location).is_none() {
            return Err(WorldError::UnknownLocation(location));
        }
        let character = self
            .characters
            .get_mut(id.index())
            .ok_or(WorldError::UnknownCharacter(id))?;
        character.location = location;
        Ok(())
    }

    /// Mark a character as dead. Returns whether they were alive before.
    pub fn kill(&mut self, id: CharacterId) -> Result<bool, WorldError> {
        let character = self
            .characters
            .get_mut(id.index())
            .ok_or(WorldError::UnknownCharacter(id))?;
        Ok(std::mem::replace(&mut character.alive, false))
    }
}
