//! Coherence repair - making unmet preconditions true after the fact.
//!
//! A missing condition is first borrowed: if another character already
//! learned a fact meeting it from an earlier action, the owner realizes that
//! action. Otherwise a catalog action whose effects can meet it is told.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use story_world::{
    ActionInstance, ActionOrigin, ActionTemplate, BoundFact, CharacterId, Condition, Fact, Intensity, Participant,
    SocialStatus, Slot,
};

use crate::error::Result;
use crate::guidelines::GuidelineSet;
use crate::instantiation::{Instantiator, Strictness};
use crate::knowledge_base::MissingCondition;
use crate::story::{StoryRules, StoryState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairKind {
    /// The owner learned of an earlier action.
    Realization,
    /// A catalog action was told.
    Catalog,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repair {
    pub step: usize,
    pub condition: BoundFact,
    pub kind: RepairKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepairReport {
    pub repairs: Vec<Repair>,
    pub attempts: u32,
    /// The budget ran out with the owner still missing conditions.
    pub unresolved: bool,
}

/// Repair the missing conditions of the last told action's performer,
/// oldest first, until none remain or the reflection budget is spent.
pub fn repair<R: Rng>(
    story: &mut StoryState,
    rules: &StoryRules<'_>,
    guidelines: &GuidelineSet,
    rng: &mut R,
) -> Result<RepairReport> {
    let mut report = RepairReport::default();
    let Some(owner) = story
        .actions()
        .filter(|a| !a.is_realization())
        .last()
        .and_then(|a| a.performer())
    else {
        return Ok(report);
    };

    let budget = rules.config.budgets.max_reflection_attempts;
    // A failed attempt is retried with unused characters allowed.
    let mut strictness = Strictness::Strict;
    while report.attempts < budget {
        let Some(missing) = story.context(owner).and_then(|c| c.oldest_missing()).cloned() else {
            break;
        };
        report.attempts += 1;

        if let Some(realization) = realization(story, owner, &missing) {
            if let Ok(step) = story.commit(rules, realization)? {
                report.repairs.push(Repair {
                    step,
                    condition: missing.condition,
                    kind: RepairKind::Realization,
                });
                strictness = Strictness::Strict;
                continue;
            }
        }
        match tell_from_catalog(story, rules, guidelines, &missing, strictness, rng)? {
            Some(step) => {
                report.repairs.push(Repair {
                    step,
                    condition: missing.condition,
                    kind: RepairKind::Catalog,
                });
                strictness = Strictness::Strict;
            }
            None => {
                tracing::debug!(%owner, condition = ?missing.condition, attempt = report.attempts, "repair attempt failed");
                strictness = Strictness::Relaxed;
            }
        }
    }

    report.unresolved = story.context(owner).is_some_and(|c| c.has_missing());
    if report.unresolved {
        tracing::warn!(%owner, attempts = report.attempts, "reflection budget exhausted");
    }
    Ok(report)
}

/// `owner` learning of the latest earlier action another character saw
/// produce a fact meeting `missing`.
///
/// The realization is secret and only affects `owner`. It carries the
/// borrowed fact, the action's tensions, and the emotions that involve
/// `owner` or are aimed at someone `owner` likes.
pub fn realization(story: &StoryState, owner: CharacterId, missing: &MissingCondition) -> Option<ActionInstance> {
    let entry = story
        .contexts()
        .filter(|c| c.owner() != owner)
        .flat_map(|c| c.history())
        .filter(|h| h.step < missing.step && h.fact.satisfies(&missing.condition))
        .max_by_key(|h| h.step)?;
    let told = &story.steps().get(entry.step)?.action;

    let mut effects: Vec<BoundFact> = Vec::new();
    for effect in told.effects.iter().filter(|e| e.is_concrete()) {
        let keep = match effect {
            Fact::Emotion(emotion) => {
                matches!(emotion.intensity, Intensity::Level(_))
                    && (effect.involves(owner)
                        || emotion
                            .to
                            .character()
                            .and_then(|to| story.link_strength(owner, to))
                            .is_some_and(|s| s > 0))
            }
            Fact::Tension(_) => true,
            Fact::Position(_) => false,
        };
        if keep && !effects.contains(effect) {
            effects.push(*effect);
        }
    }
    if !effects.contains(&entry.fact) {
        effects.push(entry.fact);
    }

    Some(ActionInstance {
        name: told.name.clone(),
        characters: vec![owner],
        preconditions: Vec::new(),
        effects,
        social: SocialStatus::Regular,
        origin: ActionOrigin::Realized { step: entry.step },
        secret: true,
    })
}

/// Tell some catalog action with an effect meeting `missing`.
fn tell_from_catalog<R: Rng>(
    story: &mut StoryState,
    rules: &StoryRules<'_>,
    guidelines: &GuidelineSet,
    missing: &MissingCondition,
    strictness: Strictness,
    rng: &mut R,
) -> Result<Option<usize>> {
    let need = missing.condition;
    let mut templates: Vec<&ActionTemplate> = rules
        .catalog
        .iter()
        .filter(|t| t.effects_like(&need).next().is_some())
        .collect();
    templates.shuffle(rng);

    for template in templates {
        for effect in template.effects_like(&need) {
            let preset = prebind(template, effect, &need);
            let Ok(characters) =
                Instantiator::new(story, rules.config).instantiate(template, &preset, None, strictness, rng)
            else {
                continue;
            };
            let instance = template.bind(&characters)?;
            if !instance.effects.iter().any(|e| e.satisfies(&need)) {
                continue;
            }
            if let Err(rejection) = guidelines.check(template, story.social_status(rules, &instance)) {
                tracing::debug!(action = %template.name, %rejection, "repair candidate rejected");
                continue;
            }
            match story.commit(rules, instance)? {
                Ok(step) => return Ok(Some(step)),
                Err(rejection) => {
                    tracing::debug!(action = %template.name, %rejection, "repair candidate rejected");
                }
            }
        }
    }
    Ok(None)
}

/// Roles of `template` fixed by lining `effect` up with `need`.
fn prebind(template: &ActionTemplate, effect: &Condition, need: &BoundFact) -> Vec<Option<CharacterId>> {
    let mut preset = vec![None; template.arity.count()];
    for (slot, participant) in effect.slots().into_iter().zip(need.slots()) {
        if let (Slot::Role(role), Participant::Character(id)) = (slot, participant) {
            if let Some(entry) = preset.get_mut(role.index()) {
                *entry = Some(*id);
            }
        }
    }
    preset
}
