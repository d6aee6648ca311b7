//! Exemplar stories - previously told stories used to steer generation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Identifier of an exemplar story; also recorded as atom provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoryId(pub u32);

impl std::fmt::Display for StoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "story-{}", self.0)
    }
}

/// One action of an exemplar story, with the curve values after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExemplarStep {
    pub action: String,
    /// Story-local character numbers, performer first.
    pub characters: Vec<u32>,
    /// Active tensions once this step is told.
    #[serde(default)]
    pub tension: u32,
    /// Cumulative social-norm violations once this step is told.
    #[serde(default)]
    pub norm_violations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExemplarStory {
    pub id: StoryId,
    #[serde(default)]
    pub title: String,
    pub steps: Vec<ExemplarStep>,
}

impl ExemplarStory {
    pub fn new(id: StoryId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step.
    pub fn with_step(
        mut self,
        action: impl Into<String>,
        characters: &[u32],
        tension: u32,
        norm_violations: u32,
    ) -> Self {
        self.steps.push(ExemplarStep {
            action: action.into(),
            characters: characters.to_vec(),
            tension,
            norm_violations,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn tension_curve(&self) -> Vec<u32> {
        self.steps.iter().map(|s| s.tension).collect()
    }

    pub fn social_curve(&self) -> Vec<u32> {
        self.steps.iter().map(|s| s.norm_violations).collect()
    }

    /// Consecutive action-name pairs.
    pub fn bigrams(&self) -> HashSet<(&str, &str)> {
        self.steps
            .windows(2)
            .map(|pair| (pair[0].action.as_str(), pair[1].action.as_str()))
            .collect()
    }
}

/// The exemplar stories available to one process. Read-only once loaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExemplarCorpus {
    stories: Vec<ExemplarStory>,
}

impl ExemplarCorpus {
    pub fn new(stories: Vec<ExemplarStory>) -> Self {
        Self { stories }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExemplarStory> {
        self.stories.iter()
    }

    pub fn get(&self, id: StoryId) -> Option<&ExemplarStory> {
        self.stories.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    /// Every step telling `action` that is followed by another step, as
    /// `(story, index)` pairs in corpus order.
    pub fn successors<'a>(&'a self, action: &'a str) -> impl Iterator<Item = (&'a ExemplarStory, usize)> {
        self.stories.iter().flat_map(move |story| {
            story
                .steps
                .iter()
                .enumerate()
                .filter(move |(i, step)| step.action == action && i + 1 < story.steps.len())
                .map(move |(i, _)| (story, i))
        })
    }
}
