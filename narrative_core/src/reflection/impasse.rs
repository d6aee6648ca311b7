//! Impasse breaking from the exemplar corpus.
//!
//! Every exemplar occurrence of the story's last action suggests the step
//! that followed it. The exemplar's characters are mapped onto the story's
//! through the shared action, so a continuation either resolves fully or
//! needs fresh characters for the roles left open.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use story_world::{ActionInstance, CharacterId, ExemplarCorpus, StoryId};

use crate::error::Result;
use crate::instantiation::{Instantiator, Strictness};
use crate::story::{StoryRules, StoryState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolvability {
    /// Every role maps to a story character.
    Full,
    /// Some roles need instantiating.
    Partial,
}

/// A candidate next step mined from one exemplar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    pub action: String,
    /// Per role, the story character the exemplar mapping gives.
    pub characters: Vec<Option<CharacterId>>,
    pub source: StoryId,
    pub resolvability: Resolvability,
}

/// Continuations of `last` found in `corpus`, in corpus order.
pub fn continuations(corpus: &ExemplarCorpus, last: &ActionInstance) -> Vec<Continuation> {
    corpus
        .successors(&last.name)
        .map(|(exemplar, i)| {
            let mapping: BTreeMap<u32, CharacterId> = exemplar.steps[i]
                .characters
                .iter()
                .copied()
                .zip(last.characters.iter().copied())
                .collect();
            let next = &exemplar.steps[i + 1];
            let characters: Vec<Option<CharacterId>> =
                next.characters.iter().map(|c| mapping.get(c).copied()).collect();
            let resolvability = if characters.iter().all(Option::is_some) {
                Resolvability::Full
            } else {
                Resolvability::Partial
            };
            Continuation {
                action: next.action.clone(),
                characters,
                source: exemplar.id,
                resolvability,
            }
        })
        .collect()
}

/// A committed continuation, labelled by the characters actually told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpasseBreak {
    pub step: usize,
    pub source: StoryId,
    pub resolvability: Resolvability,
}

/// Tell one continuation of the story's last told action. Fully resolvable
/// continuations go first, each group in random order.
pub fn break_impasse<R: Rng>(
    story: &mut StoryState,
    rules: &StoryRules<'_>,
    corpus: &ExemplarCorpus,
    rng: &mut R,
) -> Result<Option<ImpasseBreak>> {
    let Some(last) = story.actions().filter(|a| !a.is_realization()).last().cloned() else {
        return Ok(None);
    };
    let (mut full, mut partial): (Vec<Continuation>, Vec<Continuation>) = continuations(corpus, &last)
        .into_iter()
        .partition(|c| c.resolvability == Resolvability::Full);
    full.shuffle(rng);
    partial.shuffle(rng);
    tracing::debug!(last = %last, full = full.len(), partial = partial.len(), "breaking impasse");

    for continuation in full.into_iter().chain(partial) {
        let template = rules.catalog.require(&continuation.action)?;
        if template.is_position_changing() && !rules.config.allow_position_actions {
            continue;
        }
        let Ok(characters) = Instantiator::new(story, rules.config).instantiate(
            template,
            &continuation.characters,
            None,
            Strictness::Strict,
            rng,
        ) else {
            continue;
        };
        // The exemplar mapping may have given way to other characters.
        let resolvability = if continuation
            .characters
            .iter()
            .zip(&characters)
            .all(|(mapped, chosen)| *mapped == Some(*chosen))
        {
            Resolvability::Full
        } else {
            Resolvability::Partial
        };
        match story.commit(rules, template.bind(&characters)?)? {
            Ok(step) => {
                tracing::info!(step, source = %continuation.source, ?resolvability, "impasse broken");
                return Ok(Some(ImpasseBreak {
                    step,
                    source: continuation.source,
                    resolvability,
                }));
            }
            Err(rejection) => {
                tracing::debug!(action = %continuation.action, %rejection, "continuation rejected");
            }
        }
    }
    Ok(None)
}
