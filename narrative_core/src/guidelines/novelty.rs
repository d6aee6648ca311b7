//! Novelty analysis: how much of the story retells an exemplar.

use serde::{Deserialize, Serialize};

use story_world::{ExemplarCorpus, ExemplarStory, StoryId};

use super::NoveltyBand;
use crate::config::NoveltyBreakpoints;

/// The exemplar the story repeats most.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoveltyReport {
    pub best_match: StoryId,
    /// Percentage of the story's action bigrams found in `best_match`.
    pub score: u8,
    pub band: NoveltyBand,
}

/// Percentage of consecutive action pairs of `story` that `exemplar` also tells.
pub fn repetition_percentage(story: &[&str], exemplar: &ExemplarStory) -> u8 {
    let pairs: Vec<(&str, &str)> = story.windows(2).map(|w| (w[0], w[1])).collect();
    if pairs.is_empty() {
        return 0;
    }
    let known = exemplar.bigrams();
    let repeated = pairs.iter().filter(|pair| known.contains(*pair)).count();
    (repeated * 100 / pairs.len()) as u8
}

/// Score the story against every exemplar and band the highest score.
///
/// Stories shorter than two actions have no bigrams and get no report.
pub fn analyze(
    corpus: &ExemplarCorpus,
    story: &[&str],
    breakpoints: &NoveltyBreakpoints,
) -> Option<NoveltyReport> {
    if story.len() < 2 {
        return None;
    }
    let mut best: Option<(StoryId, u8)> = None;
    for exemplar in corpus.iter() {
        let score = repetition_percentage(story, exemplar);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((exemplar.id, score));
        }
    }
    best.map(|(best_match, score)| NoveltyReport {
        best_match,
        score,
        band: NoveltyBand::from_score(score, breakpoints),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_repetition_percentage() {
        let corpus = testing::corpus();
        let friendship = corpus.get(StoryId(1)).unwrap();
        assert_eq!(repetition_percentage(&["Met", "Befriended", "Met"], friendship), 50);
        assert_eq!(repetition_percentage(&["Met", "Befriended"], friendship), 100);
        assert_eq!(repetition_percentage(&["Met"], friendship), 0);
    }

    #[test]
    fn test_best_match_is_banded() {
        let corpus = testing::corpus();
        let report = analyze(
            &corpus,
            &["Met", "Befriended", "Met"],
            &NoveltyBreakpoints::default(),
        )
        .unwrap();
        assert_eq!(report.best_match, StoryId(1));
        assert_eq!(report.score, 50);
        assert_eq!(report.band, NoveltyBand::Medium);
    }

    #[test]
    fn test_fresh_story_is_low() {
        let corpus = testing::corpus();
        let report = analyze(&corpus, &["Prayed", "Kidnapped"], &NoveltyBreakpoints::default()).unwrap();
        assert_eq!(report.score, 0);
        assert_eq!(report.band, NoveltyBand::Low);
        assert!(analyze(&corpus, &["Prayed"], &NoveltyBreakpoints::default()).is_none());
    }
}
