//! Guidelines - steering constraints recomputed once per reflection cycle.
//!
//! Three analyzers compare the story told so far with the exemplar corpus:
//!
//! - **tension**: active-tension curve, qualitative and quantitative ranking
//! - **social**: cumulative norm violations, quantitative ranking only
//! - **novelty**: repeated action bigrams, banded by percentage
//!
//! Their verdicts land in a [`GuidelineSet`] holding at most one tag per
//! category. The end-story tag is separate and never cleared.

mod novelty;
mod social;
mod tension;

pub use novelty::NoveltyReport;

use rand::Rng;
use serde::{Deserialize, Serialize};

use story_world::{ActionTemplate, ExemplarCorpus, SocialStatus, StoryId};

use crate::config::{GuidanceConfig, NoveltyBreakpoints};
use crate::error::{Attempt, Rejection};
use crate::story::StoryState;

/// Where a curve should head next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tendency {
    Up,
    Down,
    #[default]
    Neutral,
}

/// How strongly the story should avoid retelling its closest exemplar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NoveltyBand {
    Low,
    Medium,
    Strict,
    High,
}

impl NoveltyBand {
    pub fn from_score(score: u8, breakpoints: &NoveltyBreakpoints) -> Self {
        if score >= breakpoints.high {
            NoveltyBand::High
        } else if score >= breakpoints.strict {
            NoveltyBand::Strict
        } else if score >= breakpoints.medium {
            NoveltyBand::Medium
        } else {
            NoveltyBand::Low
        }
    }

    /// Rarely used actions should be tried first.
    pub fn prefers_fresh(self) -> bool {
        matches!(self, NoveltyBand::Strict | NoveltyBand::High)
    }
}

/// One active steering tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Guideline {
    Tension(Tendency),
    Social(Tendency),
    Novelty(NoveltyBand),
    EndStory,
}

impl std::fmt::Display for Guideline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Guideline::Tension(t) => write!(f, "tension:{:?}", t),
            Guideline::Social(t) => write!(f, "social:{:?}", t),
            Guideline::Novelty(b) => write!(f, "novelty:{:?}", b),
            Guideline::EndStory => write!(f, "end-story"),
        }
    }
}

/// The active guidelines of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuidelineSet {
    tension: Option<Tendency>,
    social: Option<Tendency>,
    novelty: Option<NoveltyBand>,
    end_story: bool,
}

impl GuidelineSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag, replacing any tag of the same category.
    pub fn insert(&mut self, guideline: Guideline) {
        match guideline {
            Guideline::Tension(t) => self.tension = Some(t),
            Guideline::Social(t) => self.social = Some(t),
            Guideline::Novelty(b) => self.novelty = Some(b),
            Guideline::EndStory => self.end_story = true,
        }
    }

    /// Drop the per-cycle tags. End-story stays.
    pub fn clear_guidance(&mut self) {
        self.tension = None;
        self.social = None;
        self.novelty = None;
    }

    pub fn is_empty(&self) -> bool {
        self.tension.is_none() && self.social.is_none() && self.novelty.is_none() && !self.end_story
    }

    pub fn tension(&self) -> Option<Tendency> {
        self.tension
    }

    pub fn social(&self) -> Option<Tendency> {
        self.social
    }

    pub fn novelty(&self) -> Option<NoveltyBand> {
        self.novelty
    }

    pub fn wants_end(&self) -> bool {
        self.end_story
    }

    pub fn tags(&self) -> Vec<Guideline> {
        let mut tags = Vec::new();
        tags.extend(self.tension.map(Guideline::Tension));
        tags.extend(self.social.map(Guideline::Social));
        tags.extend(self.novelty.map(Guideline::Novelty));
        if self.end_story {
            tags.push(Guideline::EndStory);
        }
        tags
    }

    /// Rising tension bans resolutions, falling tension bans new tensions.
    pub fn admits_tension(&self, template: &ActionTemplate) -> bool {
        match self.tension {
            Some(Tendency::Up) => !template.deactivates_tension(),
            Some(Tendency::Down) => !template.triggers_tension(),
            Some(Tendency::Neutral) | None => true,
        }
    }

    /// A falling social curve bans norm violations.
    pub fn admits_social(&self, status: SocialStatus) -> bool {
        !(self.social == Some(Tendency::Down) && status.is_violation())
    }

    /// Screen an instantiated candidate against both curve tendencies.
    pub fn check(&self, template: &ActionTemplate, status: SocialStatus) -> Attempt<()> {
        if self.admits_tension(template) && self.admits_social(status) {
            Ok(())
        } else {
            Err(Rejection::Guideline)
        }
    }

    /// Norm-breaking candidates should be tried first.
    pub fn seeks_violations(&self) -> bool {
        self.social == Some(Tendency::Up)
    }
}

/// Analyzer state carried across the cycles of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerState {
    /// Which tension ranking to draw from when the rankings disagree.
    pub prefer_qualitative: bool,
}

impl Default for AnalyzerState {
    fn default() -> Self {
        Self { prefer_qualitative: true }
    }
}

/// What one recompute found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Guidance {
    pub tension: Option<Tendency>,
    pub social: Option<Tendency>,
    pub novelty: Option<NoveltyReport>,
    /// The tension exemplar followed this cycle.
    pub exemplar: Option<StoryId>,
    /// No exemplar goes further and every tension is resolved.
    pub natural_end: bool,
}

/// Runs the analyzers over a shared, read-only corpus.
pub struct GuidelineEngine<'c> {
    corpus: &'c ExemplarCorpus,
    config: GuidanceConfig,
}

impl<'c> GuidelineEngine<'c> {
    pub fn new(corpus: &'c ExemplarCorpus, config: GuidanceConfig) -> Self {
        Self { corpus, config }
    }

    pub fn corpus(&self) -> &'c ExemplarCorpus {
        self.corpus
    }

    pub fn config(&self) -> &GuidanceConfig {
        &self.config
    }

    /// Replace the per-cycle tags of `set` with fresh guidance for `story`.
    pub fn recompute<R: Rng>(
        &self,
        story: &StoryState,
        set: &mut GuidelineSet,
        state: &mut AnalyzerState,
        rng: &mut R,
    ) -> Guidance {
        set.clear_guidance();
        let mut guidance = Guidance::default();

        let curve = story.tension_curve();
        let pool = tension::candidates(self.corpus, curve.len());
        if pool.is_empty() {
            guidance.natural_end = curve.len() >= 2 && story.current_tension() == 0;
        } else if let Some(now) = curve.len().checked_sub(1) {
            if let Some(exemplar) =
                tension::select_exemplar(&curve, &pool, &mut state.prefer_qualitative, rng)
            {
                let tendency = tension::tendency_at(&exemplar.tension_curve(), now, self.config.tension_lookahead);
                guidance.exemplar = Some(exemplar.id);
                guidance.tension = Some(tendency);
                set.insert(Guideline::Tension(tendency));
            }
        }

        if self.config.social_analysis {
            guidance.social = social::analyze(self.corpus, &story.social_curve(), self.config.social_lookahead, rng);
            if let Some(tendency) = guidance.social {
                set.insert(Guideline::Social(tendency));
            }
        }

        guidance.novelty = novelty::analyze(self.corpus, &story.action_names(), &self.config.novelty_breakpoints);
        if let Some(report) = guidance.novelty {
            set.insert(Guideline::Novelty(report.band));
        }

        if guidance.natural_end {
            set.insert(Guideline::EndStory);
        }
        tracing::debug!(
            step = story.len(),
            tags = ?set.tags(),
            exemplar = ?guidance.exemplar,
            "guidelines recomputed"
        );
        guidance
    }
}
