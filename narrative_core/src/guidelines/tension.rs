//! Tension-curve analysis.
//!
//! Exemplars are ranked two ways against the story's curve so far:
//! qualitatively (does each step rise, fall or stay flat the same way) and
//! quantitatively (sum of absolute differences). Only exemplars that extend
//! beyond the current step can give guidance.

use rand::seq::SliceRandom;
use rand::Rng;

use story_world::{ExemplarCorpus, ExemplarStory};

use super::Tendency;

/// +1 per step moving the same way, -1 per step moving the opposite way,
/// 0 when exactly one of the two stays flat.
pub fn qualitative_score(story: &[u32], exemplar: &[u32]) -> i32 {
    let steps = story.len().min(exemplar.len());
    (1..steps)
        .map(|i| {
            let ours = step_direction(story[i - 1], story[i]);
            let theirs = step_direction(exemplar[i - 1], exemplar[i]);
            if ours == theirs {
                1
            } else if ours == 0 || theirs == 0 {
                0
            } else {
                -1
            }
        })
        .sum()
}

/// Sum of absolute differences over the story's length.
pub fn quantitative_distance(story: &[u32], exemplar: &[u32]) -> u32 {
    story
        .iter()
        .zip(exemplar)
        .map(|(a, b)| a.abs_diff(*b))
        .sum()
}

fn step_direction(from: u32, to: u32) -> i8 {
    match to.cmp(&from) {
        std::cmp::Ordering::Greater => 1,
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
    }
}

/// Direction of `curve` from `now` to `now + lookahead` (clamped to its end).
pub fn tendency_at(curve: &[u32], now: usize, lookahead: usize) -> Tendency {
    let Some(current) = curve.get(now) else {
        return Tendency::Neutral;
    };
    let ahead = (now + lookahead).min(curve.len().saturating_sub(1));
    match step_direction(*current, curve[ahead]) {
        1 => Tendency::Up,
        -1 => Tendency::Down,
        _ => Tendency::Neutral,
    }
}

/// Exemplars that extend beyond a story of `length` steps.
pub fn candidates(corpus: &ExemplarCorpus, length: usize) -> Vec<&ExemplarStory> {
    corpus.iter().filter(|s| s.len() > length).collect()
}

/// Pick the exemplar closest to `story`.
///
/// The top sets of both rankings are intersected. If they share nothing,
/// `prefer_qualitative` decides which ranking to draw from and is flipped
/// for the next call.
pub fn select_exemplar<'c, R: Rng>(
    story: &[u32],
    candidates: &[&'c ExemplarStory],
    prefer_qualitative: &mut bool,
    rng: &mut R,
) -> Option<&'c ExemplarStory> {
    if candidates.is_empty() {
        return None;
    }
    let curves: Vec<Vec<u32>> = candidates.iter().map(|s| s.tension_curve()).collect();
    let qualitative: Vec<i32> = curves.iter().map(|c| qualitative_score(story, c)).collect();
    let quantitative: Vec<u32> = curves.iter().map(|c| quantitative_distance(story, c)).collect();

    let best_qual = qualitative.iter().max().copied().unwrap_or(0);
    let best_quant = quantitative.iter().min().copied().unwrap_or(0);
    let qual_top: Vec<usize> = (0..candidates.len()).filter(|i| qualitative[*i] == best_qual).collect();
    let quant_top: Vec<usize> = (0..candidates.len()).filter(|i| quantitative[*i] == best_quant).collect();

    let both: Vec<usize> = qual_top.iter().copied().filter(|i| quant_top.contains(i)).collect();
    let pool = if !both.is_empty() {
        both
    } else {
        let pool = if *prefer_qualitative { qual_top } else { quant_top };
        *prefer_qualitative = !*prefer_qualitative;
        pool
    };
    pool.choose(rng).map(|i| candidates[*i])
}
