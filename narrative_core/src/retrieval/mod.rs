//! Retrieval - finding atoms that resemble the current story situation.
//!
//! Queries run per representative character and cascade through three
//! precision tiers; a tier is only tried when every earlier one came back
//! empty for all queried characters.

mod matcher;

pub use matcher::*;

use serde::{Deserialize, Serialize};

use story_world::{BoundFact, CharacterId};

use crate::config::RetrievalConfig;
use crate::knowledge_base::{AtomIndex, AtomRef, CharacterContext};

/// Precision tier of a retrieval query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// The whole context.
    Full,
    /// Facts about the owner plus every life/health risk.
    Focused,
    /// The owner's tensions plus every life/health risk.
    Coarse,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Full, Tier::Focused, Tier::Coarse];

    pub fn threshold(self, config: &RetrievalConfig) -> u8 {
        config.tier_thresholds[self as usize]
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tier {}", *self as usize + 1)
    }
}

/// One retrieved atom, seen from one character's context.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomMatch {
    pub atom: AtomRef,
    /// Whose context matched.
    pub owner: CharacterId,
    pub similarity: Similarity,
    pub tier: Tier,
}

impl AtomMatch {
    pub fn score(&self) -> u8 {
        self.similarity.score
    }
}

#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    /// Tier that produced the matches, if any did.
    pub tier: Option<Tier>,
    /// Tiers queried, in order.
    pub tried: Vec<Tier>,
    /// Best score first; ties keep arrival order.
    pub matches: Vec<AtomMatch>,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Characters whose context holds at least half as many facts as the
/// richest one. Contexts without facts are never representative.
pub fn representative_characters(contexts: &[&CharacterContext]) -> Vec<CharacterId> {
    let max = contexts.iter().map(|c| c.fact_count()).max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }
    contexts
        .iter()
        .filter(|c| c.fact_count() * 2 >= max)
        .map(|c| c.owner())
        .collect()
}

/// Life and health risks known to any of `contexts`, deduplicated.
pub fn global_risks(contexts: &[&CharacterContext]) -> Vec<BoundFact> {
    let mut risks: Vec<BoundFact> = Vec::new();
    for fact in contexts.iter().flat_map(|c| c.facts()) {
        if fact.tension_kind().is_some_and(|k| k.is_risk()) && !risks.contains(fact) {
            risks.push(*fact);
        }
    }
    risks
}

/// The facts of `context` a query at `tier` uses.
pub fn tier_facts(context: &CharacterContext, risks: &[BoundFact], tier: Tier) -> Vec<BoundFact> {
    let owner = context.owner();
    let mut facts: Vec<BoundFact> = match tier {
        Tier::Full => return context.facts().to_vec(),
        Tier::Focused => context
            .facts()
            .iter()
            .filter(|f| f.involves(owner))
            .copied()
            .collect(),
        Tier::Coarse => context
            .facts()
            .iter()
            .filter(|f| f.is_tension() && f.involves(owner))
            .copied()
            .collect(),
    };
    for risk in risks {
        if !facts.contains(risk) {
            facts.push(*risk);
        }
    }
    facts
}

/// Queries the atom index on behalf of a story.
pub struct Retriever<'a> {
    index: &'a AtomIndex,
    config: &'a RetrievalConfig,
    social_analysis: bool,
}

impl<'a> Retriever<'a> {
    pub fn new(index: &'a AtomIndex, config: &'a RetrievalConfig, social_analysis: bool) -> Self {
        Self {
            index,
            config,
            social_analysis,
        }
    }

    /// Retrieve candidates for the representative characters among `active`.
    pub fn retrieve(&self, active: &[&CharacterContext]) -> Retrieval {
        let representatives = representative_characters(active);
        let risks = global_risks(active);
        let mut retrieval = Retrieval::default();

        for tier in Tier::ALL {
            retrieval.tried.push(tier);
            let mut matches = Vec::new();
            for context in active.iter().filter(|c| representatives.contains(&c.owner())) {
                let facts = tier_facts(context, &risks, tier);
                matches.extend(self.query(context.owner(), &facts, tier));
            }
            tracing::debug!(%tier, candidates = matches.len(), "retrieval tier queried");
            if !matches.is_empty() {
                matches.sort_by(|a, b| b.score().cmp(&a.score()));
                retrieval.tier = Some(tier);
                retrieval.matches = matches;
                break;
            }
        }
        retrieval
    }

    /// Score every eligible atom against one set of facts.
    ///
    /// Every cell is scanned: an atom with more facts than the query can
    /// still reach the threshold on the facts it shares.
    pub fn query(&self, owner: CharacterId, facts: &[BoundFact], tier: Tier) -> Vec<AtomMatch> {
        let threshold = tier.threshold(self.config);

        let mut found = Vec::new();
        for cell in self.index.cells() {
            for (id, atom) in cell.atoms().iter().enumerate() {
                if atom.next_actions().is_empty() || (atom.is_social() && !self.social_analysis) {
                    continue;
                }
                let Some(similarity) = matcher::similarity(facts, atom.core()) else {
                    continue;
                };
                if similarity.matched > 0 && similarity.score >= threshold {
                    found.push(AtomMatch {
                        atom: AtomRef { cell: cell.key(), id },
                        owner,
                        similarity,
                        tier,
                    });
                }
            }
        }
        found
    }
}
