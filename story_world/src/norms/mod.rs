//! Social norms - which actions break a norm and when that is excused.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::actions::SocialStatus;
use crate::entities::CharacterId;
use crate::facts::{BoundFact, Condition};

/// A norm forbidding one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialNorm {
    pub action: String,
    /// Any of these holding for the performer justifies the action.
    #[serde(default)]
    pub justified_if: Vec<Condition>,
    /// Any of these holding makes the situation an exception to the norm.
    #[serde(default)]
    pub exception_if: Vec<Condition>,
}

impl SocialNorm {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            justified_if: Vec::new(),
            exception_if: Vec::new(),
        }
    }

    pub fn justified_if(mut self, condition: Condition) -> Self {
        self.justified_if.push(condition);
        self
    }

    pub fn exception_if(mut self, condition: Condition) -> Self {
        self.exception_if.push(condition);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialNorms {
    norms: HashMap<String, SocialNorm>,
}

impl SocialNorms {
    pub fn new(norms: impl IntoIterator<Item = SocialNorm>) -> Self {
        Self {
            norms: norms.into_iter().map(|n| (n.action.clone(), n)).collect(),
        }
    }

    pub fn norm_for(&self, action: &str) -> Option<&SocialNorm> {
        self.norms.get(action)
    }

    pub fn is_empty(&self) -> bool {
        self.norms.is_empty()
    }

    /// Classify `action` performed by `characters`. `holds` answers whether a
    /// bound condition is currently true from the performer's point of view.
    pub fn evaluate(
        &self,
        action: &str,
        characters: &[CharacterId],
        holds: impl Fn(&BoundFact) -> bool,
    ) -> SocialStatus {
        let Some(norm) = self.norm_for(action) else {
            return SocialStatus::Regular;
        };
        let any_hold = |conditions: &[Condition]| {
            conditions.iter().any(|c| holds(&c.bind(characters)))
        };
        match (any_hold(&norm.justified_if), any_hold(&norm.exception_if)) {
            (true, true) => SocialStatus::Ambiguous,
            (true, false) => SocialStatus::Justified,
            (false, true) => SocialStatus::Exception,
            (false, false) => SocialStatus::BreaksNorm,
        }
    }
}
