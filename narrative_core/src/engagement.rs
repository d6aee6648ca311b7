//! Engagement - telling the next action an atom suggests.
//!
//! Retrieved atoms are tried best score first. Each atom's next actions are
//! rotated by a random offset, reordered by the active guidelines and then
//! instantiated one by one. The first action that commits ends the phase.

use rand::Rng;
use serde::{Deserialize, Serialize};

use story_world::{CharacterId, Role};

use crate::error::Result;
use crate::guidelines::GuidelineSet;
use crate::instantiation::{Instantiator, Strictness};
use crate::knowledge_base::{AtomIndex, AtomRef, NextAction};
use crate::retrieval::{AtomMatch, Retriever, Tier};
use crate::story::{StoryRules, StoryState};

/// How one engagement phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngagementOutcome {
    Committed {
        step: usize,
        atom: AtomRef,
        score: u8,
        tier: Tier,
    },
    /// Nothing any retrieved atom suggests can be told now.
    Impasse,
}

pub struct Engagement<'a> {
    index: &'a AtomIndex,
    rules: StoryRules<'a>,
}

impl<'a> Engagement<'a> {
    pub fn new(index: &'a AtomIndex, rules: StoryRules<'a>) -> Self {
        Self { index, rules }
    }

    /// Run one engagement phase.
    ///
    /// Each attempt retrieves afresh and sweeps every candidate. Retrieval
    /// coming back empty ends the phase at once.
    pub fn run<R: Rng>(
        &self,
        story: &mut StoryState,
        guidelines: &GuidelineSet,
        rng: &mut R,
    ) -> Result<EngagementOutcome> {
        let config = self.rules.config;
        for attempt in 0..config.budgets.max_engagement_attempts {
            let retrieval = Retriever::new(self.index, &config.retrieval, config.guidance.social_analysis)
                .retrieve(&story.active_contexts());
            let Some(tier) = retrieval.tier else {
                tracing::debug!(attempt, "no atom retrieved");
                return Ok(EngagementOutcome::Impasse);
            };
            let strictness = if tier == Tier::Coarse {
                Strictness::Relaxed
            } else {
                Strictness::Strict
            };

            for candidate in &retrieval.matches {
                if let Some(step) = self.try_match(story, candidate, guidelines, strictness, rng)? {
                    return Ok(EngagementOutcome::Committed {
                        step,
                        atom: candidate.atom,
                        score: candidate.score(),
                        tier,
                    });
                }
            }
            tracing::debug!(attempt, candidates = retrieval.matches.len(), "engagement attempt failed");
        }
        Ok(EngagementOutcome::Impasse)
    }

    /// Try the next actions of one matched atom. Returns the committed step.
    fn try_match<R: Rng>(
        &self,
        story: &mut StoryState,
        candidate: &AtomMatch,
        guidelines: &GuidelineSet,
        strictness: Strictness,
        rng: &mut R,
    ) -> Result<Option<usize>> {
        let Some(atom) = self.index.get(candidate.atom) else {
            return Ok(None);
        };
        for next in self.ordered(story, atom.next_actions(), guidelines, rng) {
            let template = self.rules.catalog.require(&next.action)?;
            if template.is_position_changing() && !self.rules.config.allow_position_actions {
                continue;
            }

            let preset = preset_characters(&next.roles, candidate);
            let characters = match Instantiator::new(story, self.rules.config).instantiate(
                template,
                &preset,
                Some(candidate.owner),
                strictness,
                rng,
            ) {
                Ok(characters) => characters,
                Err(_) => continue,
            };
            let instance = template.bind(&characters)?;
            if let Err(rejection) = guidelines.check(template, story.social_status(&self.rules, &instance)) {
                tracing::debug!(action = %instance, %rejection, "candidate rejected");
                continue;
            }
            match story.commit(&self.rules, instance)? {
                Ok(step) => {
                    tracing::debug!(atom = %candidate.atom, score = candidate.score(), step, "atom engaged");
                    return Ok(Some(step));
                }
                Err(rejection) => {
                    tracing::debug!(action = %next.action, %rejection, "candidate rejected");
                }
            }
        }
        Ok(None)
    }

    /// The order in which an atom's next actions are tried.
    fn ordered<'n, R: Rng>(
        &self,
        story: &StoryState,
        actions: &'n [NextAction],
        guidelines: &GuidelineSet,
        rng: &mut R,
    ) -> Vec<&'n NextAction> {
        let mut ordered: Vec<&NextAction> = actions.iter().collect();
        if ordered.is_empty() {
            return ordered;
        }
        let offset = rng.gen_range(0..ordered.len());
        ordered.rotate_left(offset);

        if guidelines.novelty().is_some_and(|band| band.prefers_fresh()) {
            ordered.sort_by_key(|next| story.template_uses(&next.action));
        }
        if guidelines.seeks_violations() {
            ordered.sort_by_key(|next| self.rules.norms.norm_for(&next.action).is_none());
        }
        ordered
    }
}

/// Characters the atom mapping already gives each role of `roles`.
fn preset_characters(roles: &[Role], candidate: &AtomMatch) -> Vec<Option<CharacterId>> {
    roles
        .iter()
        .map(|role| candidate.similarity.mapping.get(role).copied())
        .collect()
}
