//! Reflection - the critic phase run after every engagement.
//!
//! 1. **Impasse recovery**: if engagement got stuck, continue the story the
//!    way an exemplar continued the same action
//! 2. **Coherence repair**: make the last performer's unmet preconditions true
//! 3. **Guidance**: recompute the guideline set for the next engagement
//!
//! Reflection only asks for the story to end; the generator decides when.

mod coherence;
mod impasse;

pub use coherence::*;
pub use impasse::*;

use rand::Rng;

use crate::error::Result;
use crate::guidelines::{AnalyzerState, Guidance, Guideline, GuidelineEngine, GuidelineSet};
use crate::story::{StoryRules, StoryState};

/// What one reflection phase did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReflectionReport {
    /// Set when an impasse was broken.
    pub impasse_break: Option<ImpasseBreak>,
    /// An impasse was reported and nothing could continue the story.
    pub impasse_unbroken: bool,
    pub repair: RepairReport,
    pub guidance: Guidance,
}

pub struct Reflection<'a> {
    rules: StoryRules<'a>,
    guidelines: &'a GuidelineEngine<'a>,
}

impl<'a> Reflection<'a> {
    pub fn new(rules: StoryRules<'a>, guidelines: &'a GuidelineEngine<'a>) -> Self {
        Self { rules, guidelines }
    }

    /// Run one reflection phase. `impasse` is whether the engagement that
    /// preceded it committed nothing.
    pub fn run<R: Rng>(
        &self,
        story: &mut StoryState,
        set: &mut GuidelineSet,
        state: &mut AnalyzerState,
        impasse: bool,
        rng: &mut R,
    ) -> Result<ReflectionReport> {
        let mut report = ReflectionReport::default();

        if impasse {
            report.impasse_break = break_impasse(story, &self.rules, self.guidelines.corpus(), rng)?;
            report.impasse_unbroken = report.impasse_break.is_none();
            if report.impasse_unbroken {
                tracing::debug!(step = story.len(), "impasse not broken");
            }
        }

        report.repair = repair(story, &self.rules, set, rng)?;

        report.guidance = self.guidelines.recompute(story, set, state, rng);
        if report.repair.unresolved {
            set.insert(Guideline::EndStory);
        }
        Ok(report)
    }
}
