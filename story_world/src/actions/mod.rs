//! Action templates and the catalog the engine draws them from.

mod instance;

pub use instance::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entities::CharacterId;
use crate::error::WorldError;
use crate::facts::{Condition, Fact, Slot};

/// How many characters an action takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arity {
    One,
    Two,
}

impl Arity {
    pub fn count(self) -> usize {
        match self {
            Arity::One => 1,
            Arity::Two => 2,
        }
    }
}

/// An action with anonymized roles (`A` performs, `B` receives).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionTemplate {
    pub name: String,
    pub arity: Arity,

    /// What should already hold for the performer before the action.
    #[serde(default)]
    pub preconditions: Vec<Condition>,

    #[serde(default)]
    pub emotion_effects: Vec<Condition>,

    #[serde(default)]
    pub tension_effects: Vec<Condition>,

    #[serde(default)]
    pub position_effects: Vec<Condition>,

    /// Candidate surface texts, rendered outside the engine.
    #[serde(default)]
    pub texts: Vec<String>,

    /// Only the participants witness a secret action.
    #[serde(default)]
    pub secret: bool,
}

impl ActionTemplate {
    /// Create a template with no conditions.
    pub fn new(name: impl Into<String>, arity: Arity) -> Self {
        Self {
            name: name.into(),
            arity,
            preconditions: Vec::new(),
            emotion_effects: Vec::new(),
            tension_effects: Vec::new(),
            position_effects: Vec::new(),
            texts: Vec::new(),
            secret: false,
        }
    }

    pub fn with_precondition(mut self, condition: Condition) -> Self {
        self.preconditions.push(condition);
        self
    }

    /// Add a postcondition, filed under its fact type.
    pub fn with_effect(mut self, condition: Condition) -> Self {
        match condition {
            Fact::Emotion(_) => self.emotion_effects.push(condition),
            Fact::Tension(_) => self.tension_effects.push(condition),
            Fact::Position(_) => self.position_effects.push(condition),
        }
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.texts.push(text.into());
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// All postconditions: emotions, then tensions, then positions.
    pub fn effects(&self) -> impl Iterator<Item = &Condition> {
        self.emotion_effects
            .iter()
            .chain(&self.tension_effects)
            .chain(&self.position_effects)
    }

    /// Moves a character somewhere.
    pub fn is_position_changing(&self) -> bool {
        !self.position_effects.is_empty()
    }

    /// Introduces a retained tension.
    pub fn triggers_tension(&self) -> bool {
        self.tension_effects
            .iter()
            .any(|c| c.tension_kind().is_some_and(|k| k.is_retained()))
    }

    /// Resolves a tension.
    pub fn deactivates_tension(&self) -> bool {
        self.tension_effects
            .iter()
            .any(|c| c.tension_kind().is_some_and(|k| !k.is_retained()))
    }

    /// Postconditions that could produce a fact of the same kind as `fact`.
    pub fn effects_like<'a, S>(&'a self, fact: &'a Fact<S>) -> impl Iterator<Item = &'a Condition> {
        self.effects().filter(move |effect| effect.same_kind(fact))
    }

    /// Bind the template's roles to concrete characters.
    pub fn bind(&self, characters: &[CharacterId]) -> Result<ActionInstance, WorldError> {
        if characters.len() != self.arity.count() {
            return Err(WorldError::ArityMismatch {
                action: self.name.clone(),
                expected: self.arity.count(),
                actual: characters.len(),
            });
        }
        Ok(ActionInstance {
            name: self.name.clone(),
            characters: characters.to_vec(),
            preconditions: self.preconditions.iter().map(|c| c.bind(characters)).collect(),
            effects: self.effects().map(|c| c.bind(characters)).collect(),
            social: SocialStatus::Regular,
            origin: ActionOrigin::Template,
            secret: self.secret,
        })
    }
}

/// Catalog actions with a fixed role in the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecialActions {
    /// Performer goes to where the receiver is.
    pub move_to_character: Option<String>,
    /// Applied by witnesses to a norm-breaking performer.
    pub social_complaint: Option<String>,
}

/// All action templates available to a story.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionCatalog {
    templates: Vec<ActionTemplate>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
    pub special: SpecialActions,
}

impl ActionCatalog {
    pub fn new(templates: Vec<ActionTemplate>, special: SpecialActions) -> Self {
        let by_name = templates
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        Self {
            templates,
            by_name,
            special,
        }
    }

    /// Get template by name.
    pub fn get(&self, name: &str) -> Option<&ActionTemplate> {
        match self.by_name.get(name) {
            Some(&i) => self.templates.get(i),
            // Catalogs deserialized without the index fall back to a scan.
            None => self.templates.iter().find(|t| t.name == name),
        }
    }

    /// Get template by name or fail with [`WorldError::UnknownAction`].
    pub fn require(&self, name: &str) -> Result<&ActionTemplate, WorldError> {
        self.get(name)
            .ok_or_else(|| WorldError::UnknownAction(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// The "go to the other character" action, if the catalog defines one.
    pub fn move_action(&self) -> Option<&ActionTemplate> {
        self.special.move_to_character.as_deref().and_then(|n| self.get(n))
    }

    /// The default reaction to a broken social norm, if defined.
    pub fn complaint_action(&self) -> Option<&ActionTemplate> {
        self.special.social_complaint.as_deref().and_then(|n| self.get(n))
    }
}

/// Shorthand used by loaders and tests: `A` and `B` as condition slots.
pub const PERFORMER: Slot = Slot::A;
pub const RECEIVER: Slot = Slot::B;
