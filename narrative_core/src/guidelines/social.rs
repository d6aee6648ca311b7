//! Social-norm analysis over cumulative violation counts.

use rand::seq::SliceRandom;
use rand::Rng;

use story_world::{ExemplarCorpus, ExemplarStory};

use super::tension::{quantitative_distance, tendency_at};
use super::Tendency;

/// Exemplars closest to the story's violation curve, among those longer
/// than the story. One is picked at random.
pub fn select_exemplar<'c, R: Rng>(
    corpus: &'c ExemplarCorpus,
    story: &[u32],
    rng: &mut R,
) -> Option<&'c ExemplarStory> {
    let scored: Vec<(&ExemplarStory, u32)> = corpus
        .iter()
        .filter(|s| s.len() > story.len())
        .map(|s| (s, quantitative_distance(story, &s.social_curve())))
        .collect();
    let best = scored.iter().map(|(_, d)| *d).min()?;
    let top: Vec<&ExemplarStory> = scored
        .into_iter()
        .filter(|(_, d)| *d == best)
        .map(|(s, _)| s)
        .collect();
    top.choose(rng).copied()
}

/// Whether the story should break more norms, fewer, or carry on.
pub fn analyze<R: Rng>(
    corpus: &ExemplarCorpus,
    story: &[u32],
    lookahead: usize,
    rng: &mut R,
) -> Option<Tendency> {
    let now = story.len().checked_sub(1)?;
    let exemplar = select_exemplar(corpus, story, rng)?;
    Some(tendency_at(&exemplar.social_curve(), now, lookahead))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use story_world::StoryId;

    #[test]
    fn test_closest_violation_curve() {
        let corpus = testing::corpus();
        // Revenge is [0, 0, 1, 2, 2]; Ambush is [0, 1, 1].
        let picked = select_exemplar(&corpus, &[0, 0], &mut testing::rng(1)).unwrap();
        assert_eq!(picked.id, StoryId(3));
    }

    #[test]
    fn test_guidance_follows_lookahead() {
        let corpus = testing::corpus();
        assert_eq!(analyze(&corpus, &[0, 0], 2, &mut testing::rng(1)), Some(Tendency::Up));
        // Only Revenge outlasts a four-step story, and it has levelled off.
        assert_eq!(analyze(&corpus, &[0, 0, 1, 2], 2, &mut testing::rng(1)), Some(Tendency::Neutral));
    }

    #[test]
    fn test_no_guidance_without_story_or_exemplar() {
        let corpus = testing::corpus();
        assert_eq!(analyze(&corpus, &[], 2, &mut testing::rng(1)), None);
        assert_eq!(analyze(&corpus, &[0; 6], 2, &mut testing::rng(1)), None);
    }
}
