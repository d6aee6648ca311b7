//! The generator - alternates engagement and reflection until the story ends.

use std::ops::Range;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use story_world::{ActionCatalog, ActionInstance, CharacterId, SocialNorms, StoryWorld};

use crate::config::EngineConfig;
use crate::engagement::{Engagement, EngagementOutcome};
use crate::error::{EngineError, Result};
use crate::guidelines::{AnalyzerState, Guideline, GuidelineEngine, GuidelineSet};
use crate::knowledge_base::{AtomIndex, AtomRef};
use crate::reflection::{Reflection, ReflectionReport, RepairKind};
use crate::retrieval::Tier;
use crate::story::{StoryRules, StoryState};

/// Identifies one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a story stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    NaturalEnd,
    UnbreakableImpasse,
    BudgetExhausted,
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Committed(ActionInstance),
    Impasse,
    Finished(FinishReason),
}

/// The initial situation and the action that opens the story.
#[derive(Debug, Clone)]
pub struct StoryStart {
    pub world: StoryWorld,
    pub opening: String,
    pub characters: Vec<CharacterId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TracePhase {
    Opening,
    Engagement,
    ImpasseBreak,
    CoherenceRepair,
    Realization,
    LocationFiller,
}

/// How one step came to be told.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub step: usize,
    pub action: String,
    pub phase: TracePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atom: Option<AtomRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    pub guidelines: Vec<Guideline>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub run_id: RunId,
    pub actions: Vec<ActionInstance>,
    pub reason: FinishReason,
    pub trace: Vec<TraceEntry>,
    pub tension_curve: Vec<u32>,
    pub social_curve: Vec<u32>,
    pub cycles: u32,
}

impl GenerationResult {
    /// The step trace as JSON.
    pub fn trace_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.trace)?)
    }
}

/// Everything one story run mutates.
#[derive(Debug)]
pub struct StoryRun {
    pub id: RunId,
    pub story: StoryState,
    pub guidelines: GuidelineSet,
    analyzer: AnalyzerState,
    impasses: u32,
    cycles: u32,
    end_reason: Option<FinishReason>,
    trace: Vec<TraceEntry>,
}

impl StoryRun {
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn impasses(&self) -> u32 {
        self.impasses
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    fn request_end(&mut self, reason: FinishReason) {
        self.guidelines.insert(Guideline::EndStory);
        self.end_reason.get_or_insert(reason);
    }
}

/// Generates stories from shared, read-only knowledge.
pub struct StoryGenerator<'a> {
    catalog: &'a ActionCatalog,
    index: &'a AtomIndex,
    norms: &'a SocialNorms,
    guidelines: &'a GuidelineEngine<'a>,
    config: &'a EngineConfig,
}

impl<'a> StoryGenerator<'a> {
    pub fn new(
        catalog: &'a ActionCatalog,
        index: &'a AtomIndex,
        norms: &'a SocialNorms,
        guidelines: &'a GuidelineEngine<'a>,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            catalog,
            index,
            norms,
            guidelines,
            config,
        }
    }

    fn rules(&self) -> StoryRules<'a> {
        StoryRules {
            catalog: self.catalog,
            norms: self.norms,
            config: self.config,
        }
    }

    /// Tell a whole story.
    pub fn generate<R: Rng>(&self, start: StoryStart, rng: &mut R) -> Result<GenerationResult> {
        let mut run = self.start(start)?;
        let reason = loop {
            if let StepOutcome::Finished(reason) = self.step(&mut run, rng)? {
                break reason;
            }
        };
        tracing::info!(run = %run.id, ?reason, steps = run.story.len(), cycles = run.cycles, "story finished");

        Ok(GenerationResult {
            run_id: run.id,
            actions: run.story.actions().cloned().collect(),
            reason,
            tension_curve: run.story.tension_curve(),
            social_curve: run.story.social_curve(),
            cycles: run.cycles,
            trace: run.trace,
        })
    }

    /// Set up a run and tell its opening action.
    pub fn start(&self, start: StoryStart) -> Result<StoryRun> {
        self.config.validate()?;
        let mut run = StoryRun {
            id: RunId::new(),
            story: StoryState::new(start.world),
            guidelines: GuidelineSet::new(),
            analyzer: AnalyzerState::default(),
            impasses: 0,
            cycles: 0,
            end_reason: None,
            trace: Vec::new(),
        };

        let opening = self.catalog.require(&start.opening)?.bind(&start.characters)?;
        if let Err(rejection) = run.story.commit(&self.rules(), opening)? {
            return Err(EngineError::OpeningRejected {
                action: start.opening,
                rejection,
            });
        }
        let told = run.story.len();
        self.record(&mut run, 0..told, TracePhase::Opening, None);
        tracing::info!(run = %run.id, opening = %start.opening, "story started");
        Ok(run)
    }

    /// Run one engagement/reflection cycle.
    pub fn step<R: Rng>(&self, run: &mut StoryRun, rng: &mut R) -> Result<StepOutcome> {
        if let Some(reason) = self.finish_reason(run) {
            return Ok(StepOutcome::Finished(reason));
        }
        run.cycles += 1;
        run.story.snapshot_contexts();

        let before = run.story.len();
        let engaged = Engagement::new(self.index, self.rules()).run(&mut run.story, &run.guidelines, rng)?;
        let impasse = match engaged {
            EngagementOutcome::Committed { atom, score, tier, .. } => {
                let after = run.story.len();
                self.record(run, before..after, TracePhase::Engagement, Some((atom, score, tier)));
                false
            }
            EngagementOutcome::Impasse => {
                run.impasses += 1;
                tracing::debug!(impasses = run.impasses, "engagement reached an impasse");
                true
            }
        };

        let before = run.story.len();
        let report = Reflection::new(self.rules(), self.guidelines).run(
            &mut run.story,
            &mut run.guidelines,
            &mut run.analyzer,
            impasse,
            rng,
        )?;
        self.record_reflection(run, before, &report);

        if report.guidance.natural_end {
            run.request_end(FinishReason::NaturalEnd);
        }
        if report.repair.unresolved {
            run.request_end(FinishReason::BudgetExhausted);
        }
        if report.impasse_unbroken && run.impasses > self.config.budgets.max_impasses {
            tracing::warn!(impasses = run.impasses, "impasse cannot be broken");
            run.request_end(FinishReason::UnbreakableImpasse);
        }

        Ok(match (engaged, report.impasse_break) {
            (EngagementOutcome::Committed { step, .. }, _) => StepOutcome::Committed(run.story.steps()[step].action.clone()),
            (EngagementOutcome::Impasse, Some(broken)) => {
                StepOutcome::Committed(run.story.steps()[broken.step].action.clone())
            }
            (EngagementOutcome::Impasse, None) => StepOutcome::Impasse,
        })
    }

    fn finish_reason(&self, run: &StoryRun) -> Option<FinishReason> {
        if run.guidelines.wants_end() {
            return Some(run.end_reason.unwrap_or(FinishReason::NaturalEnd));
        }
        if run.cycles >= self.config.max_cycles() {
            tracing::warn!(cycles = run.cycles, "cycle budget exhausted");
            return Some(FinishReason::BudgetExhausted);
        }
        if run.story.len() >= self.config.budgets.max_story_length {
            tracing::warn!(steps = run.story.len(), "story length budget exhausted");
            return Some(FinishReason::BudgetExhausted);
        }
        None
    }

    /// Trace the steps in `steps`. Filler steps are marked as such.
    fn record(&self, run: &mut StoryRun, steps: Range<usize>, phase: TracePhase, atom: Option<(AtomRef, u8, Tier)>) {
        if !self.config.record_trace {
            return;
        }
        let tags = run.guidelines.tags();
        for step in steps {
            let Some(told) = run.story.steps().get(step) else {
                continue;
            };
            let engaged = atom.filter(|_| !told.filler);
            run.trace.push(TraceEntry {
                step,
                action: told.action.to_string(),
                phase: if told.filler { TracePhase::LocationFiller } else { phase },
                atom: engaged.map(|(atom, _, _)| atom),
                score: engaged.map(|(_, score, _)| score),
                tier: engaged.map(|(_, _, tier)| tier),
                guidelines: tags.clone(),
            });
        }
    }

    fn record_reflection(&self, run: &mut StoryRun, from: usize, report: &ReflectionReport) {
        for step in from..run.story.len() {
            let phase = if report.impasse_break.is_some_and(|b| b.step == step) {
                TracePhase::ImpasseBreak
            } else {
                match report.repair.repairs.iter().find(|r| r.step == step).map(|r| r.kind) {
                    Some(RepairKind::Realization) => TracePhase::Realization,
                    _ => TracePhase::CoherenceRepair,
                }
            };
            self.record(run, step..step + 1, phase, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Fixture, ENEMY, KNIGHT, PRIEST};
    use story_world::{ExemplarCorpus, ExemplarStory, StoryId, WorldError};

    fn start(fx: &Fixture, opening: &str, characters: &[CharacterId]) -> StoryStart {
        StoryStart {
            world: fx.world.clone(),
            opening: opening.to_string(),
            characters: characters.to_vec(),
        }
    }

    fn generate(fx: &Fixture, corpus: &ExemplarCorpus, opening: &str, characters: &[CharacterId], seed: u64) -> GenerationResult {
        let engine = GuidelineEngine::new(corpus, fx.config.guidance.clone());
        StoryGenerator::new(&fx.catalog, &fx.index, &fx.norms, &engine, &fx.config)
            .generate(start(fx, opening, characters), &mut testing::rng(seed))
            .unwrap()
    }

    #[test]
    fn test_runs_terminate_within_cycle_budget() {
        let fx = Fixture::new();
        for seed in 0..20 {
            let result = generate(&fx, &fx.corpus, "Met", &[KNIGHT, PRIEST], seed);
            assert!(result.cycles <= fx.config.max_cycles());
            assert_eq!(result.actions[0].name, "Met");
            assert_eq!(result.tension_curve.len(), result.actions.len());
        }
    }

    #[test]
    fn test_natural_end() {
        let fx = Fixture::new();
        let corpus = ExemplarCorpus::new(vec![ExemplarStory::new(StoryId(1), "Friendship")
            .with_step("Met", &[0, 1], 0, 0)
            .with_step("Befriended", &[0, 1], 0, 0)]);

        let result = generate(&fx, &corpus, "Met", &[KNIGHT, PRIEST], 1);
        assert_eq!(result.reason, FinishReason::NaturalEnd);
        let names: Vec<_> = result.actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Met", "Befriended"]);
        assert_eq!(result.cycles, 1);
    }

    #[test]
    fn test_story_length_budget() {
        let mut fx = Fixture::new();
        fx.config.budgets.max_story_length = 2;
        let result = generate(&fx, &fx.corpus, "Met", &[KNIGHT, PRIEST], 2);
        assert_eq!(result.reason, FinishReason::BudgetExhausted);
        assert_eq!(result.actions.len(), 2);
    }

    #[test]
    fn test_unbreakable_impasse() {
        let mut fx = Fixture::new();
        fx.index = AtomIndex::new();
        // Nothing in the corpus ever follows a prayer.
        let result = generate(&fx, &fx.corpus, "Prayed", &[KNIGHT], 3);
        assert_eq!(result.reason, FinishReason::UnbreakableImpasse);
        assert_eq!(result.cycles, fx.config.budgets.max_impasses + 1);
        assert_eq!(result.actions.len(), 1);
    }

    #[test]
    fn test_impasse_broken_from_corpus() {
        let mut fx = Fixture::new();
        fx.index = AtomIndex::new();
        let engine = GuidelineEngine::new(&fx.corpus, fx.config.guidance.clone());
        let generator = StoryGenerator::new(&fx.catalog, &fx.index, &fx.norms, &engine, &fx.config);
        let mut rng = testing::rng(4);

        let mut run = generator.start(start(&fx, "Met", &[KNIGHT, PRIEST])).unwrap();
        let outcome = generator.step(&mut run, &mut rng).unwrap();
        let StepOutcome::Committed(told) = outcome else {
            panic!("expected a commit, got {outcome:?}");
        };
        assert_eq!(told.name, "Befriended");
        assert_eq!(run.impasses(), 1);

        let phases: Vec<_> = run.trace().iter().map(|t| t.phase).collect();
        assert_eq!(phases, vec![TracePhase::Opening, TracePhase::ImpasseBreak]);
    }

    #[test]
    fn test_engagement_trace() {
        let fx = Fixture::new();
        let engine = GuidelineEngine::new(&fx.corpus, fx.config.guidance.clone());
        let generator = StoryGenerator::new(&fx.catalog, &fx.index, &fx.norms, &engine, &fx.config);
        let mut run = generator.start(start(&fx, "Met", &[KNIGHT, PRIEST])).unwrap();
        generator.step(&mut run, &mut testing::rng(5)).unwrap();

        let entry = &run.trace()[1];
        assert_eq!(entry.phase, TracePhase::Engagement);
        assert_eq!(entry.score, Some(100));
        assert_eq!(entry.tier, Some(Tier::Full));
        assert!(entry.atom.is_some());
    }

    #[test]
    fn test_trace_export() {
        let fx = Fixture::new();
        let result = generate(&fx, &fx.corpus, "Met", &[KNIGHT, PRIEST], 6);
        let json = result.trace_json().unwrap();
        assert!(json.contains("\"Opening\""));
        let parsed: Vec<TraceEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result.trace);
    }

    #[test]
    fn test_trace_can_be_disabled() {
        let mut fx = Fixture::new();
        fx.config.record_trace = false;
        let result = generate(&fx, &fx.corpus, "Met", &[KNIGHT, PRIEST], 7);
        assert!(result.trace.is_empty());
    }

    #[test]
    fn test_bad_openings() {
        let fx = Fixture::new();
        let engine = GuidelineEngine::new(&fx.corpus, fx.config.guidance.clone());
        let generator = StoryGenerator::new(&fx.catalog, &fx.index, &fx.norms, &engine, &fx.config);

        let err = generator.start(start(&fx, "Met", &[ENEMY, ENEMY])).unwrap_err();
        assert!(matches!(err, EngineError::OpeningRejected { .. }));

        let err = generator.start(start(&fx, "Danced", &[ENEMY, KNIGHT])).unwrap_err();
        assert!(matches!(err, EngineError::World(WorldError::UnknownAction(_))));
    }
}
