//! Atoms - anonymized story situations paired with what happened next.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use story_world::{AbstractFact, FactStatus, Role, SocialStatus, StoryId};

use super::connectivity::Connectivity;

/// A fact inside an atom, with how it changed in the situation it was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AtomFact {
    pub fact: AbstractFact,
    pub status: FactStatus,
}

impl AtomFact {
    pub fn new(fact: AbstractFact) -> Self {
        Self {
            fact,
            status: FactStatus::Inserted,
        }
    }

    pub fn with_status(mut self, status: FactStatus) -> Self {
        self.status = status;
        self
    }
}

/// An action suggested by (or preceding) an atom, with its roles in atom terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAction {
    pub action: String,
    /// Atom role of the performer, then the receiver.
    pub roles: Vec<Role>,
}

impl NextAction {
    pub fn new(action: impl Into<String>, roles: &[Role]) -> Self {
        Self {
            action: action.into(),
            roles: roles.to_vec(),
        }
    }
}

/// Shape of an atom: how many tension and emotion facts it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub tensions: usize,
    pub emotions: usize,
}

impl CellKey {
    pub fn new(tensions: usize, emotions: usize) -> Self {
        Self { tensions, emotions }
    }

    /// Tension and emotion counts each differ by at most one.
    pub fn is_adjacent(self, other: CellKey) -> bool {
        self.tensions.abs_diff(other.tensions) <= 1 && self.emotions.abs_diff(other.emotions) <= 1
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}E{}", self.tensions, self.emotions)
    }
}

/// Fields shared by every atom variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomCore {
    /// Sorted by fact and unique per fact; the status is the first one seen.
    facts: Vec<AtomFact>,
    pub previous_actions: Vec<NextAction>,
    pub next_actions: Vec<NextAction>,
    pub provenance: BTreeSet<StoryId>,
    #[serde(default)]
    pub connectivity: Connectivity,
}

impl AtomCore {
    /// Build from emotion and tension facts; position facts are not kept.
    pub fn new(facts: impl IntoIterator<Item = AtomFact>) -> Self {
        let mut facts: Vec<AtomFact> = facts
            .into_iter()
            .filter(|f| f.fact.is_emotion() || f.fact.is_tension())
            .collect();
        facts.sort_by(|a, b| a.fact.cmp(&b.fact));
        facts.dedup_by(|later, earlier| later.fact == earlier.fact);
        Self {
            facts,
            previous_actions: Vec::new(),
            next_actions: Vec::new(),
            provenance: BTreeSet::new(),
            connectivity: Connectivity::default(),
        }
    }

    pub fn facts(&self) -> &[AtomFact] {
        &self.facts
    }

    pub fn shape(&self) -> CellKey {
        CellKey::new(
            self.facts.iter().filter(|f| f.fact.is_tension()).count(),
            self.facts.iter().filter(|f| f.fact.is_emotion()).count(),
        )
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Fact-set equality; statuses are not compared.
    pub fn same_facts(&self, other: &AtomCore) -> bool {
        self.facts.len() == other.facts.len() && self.facts.iter().zip(&other.facts).all(|(a, b)| a.fact == b.fact)
    }
}

/// An atom, optionally carrying the social situation it was mined from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Atom {
    Plain(AtomCore),
    Social {
        core: AtomCore,
        /// Norm status of the action that led into this situation.
        status: SocialStatus,
        action: String,
    },
}

impl Atom {
    pub fn new(facts: impl IntoIterator<Item = AtomFact>) -> Self {
        Atom::Plain(AtomCore::new(facts))
    }

    /// Mark the atom as arising from a norm-relevant action.
    pub fn social(self, action: impl Into<String>, status: SocialStatus) -> Self {
        Atom::Social {
            core: self.into_core(),
            status,
            action: action.into(),
        }
    }

    pub fn with_next(mut self, action: impl Into<String>, roles: &[Role]) -> Self {
        self.core_mut().next_actions.push(NextAction::new(action, roles));
        self
    }

    pub fn with_previous(mut self, action: impl Into<String>, roles: &[Role]) -> Self {
        self.core_mut().previous_actions.push(NextAction::new(action, roles));
        self
    }

    pub fn from_story(mut self, story: StoryId) -> Self {
        self.core_mut().provenance.insert(story);
        self
    }

    pub fn core(&self) -> &AtomCore {
        match self {
            Atom::Plain(core) => core,
            Atom::Social { core, .. } => core,
        }
    }

    pub fn core_mut(&mut self) -> &mut AtomCore {
        match self {
            Atom::Plain(core) => core,
            Atom::Social { core, .. } => core,
        }
    }

    pub fn into_core(self) -> AtomCore {
        match self {
            Atom::Plain(core) => core,
            Atom::Social { core, .. } => core,
        }
    }

    pub fn is_social(&self) -> bool {
        matches!(self, Atom::Social { .. })
    }

    pub fn facts(&self) -> &[AtomFact] {
        self.core().facts()
    }

    pub fn next_actions(&self) -> &[NextAction] {
        &self.core().next_actions
    }

    pub fn shape(&self) -> CellKey {
        self.core().shape()
    }

    /// Fold another fact-set-equal atom into this one.
    pub(crate) fn absorb(&mut self, other: Atom) {
        let other = other.into_core();
        let core = self.core_mut();
        core.next_actions.extend(other.next_actions);
        core.provenance.extend(other.provenance);
    }
}
