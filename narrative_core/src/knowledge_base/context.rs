//! Character context - one character's working memory of the story.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use story_world::{BoundFact, CharacterId, Fact, FactStatus, Participant};

/// A fact that was accepted into a context at some step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub fact: BoundFact,
    pub step: usize,
}

/// An unmet precondition of an action the owner performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingCondition {
    pub condition: BoundFact,
    /// Step of the action that needed it.
    pub step: usize,
}

/// What [`CharacterContext::add_fact`] did with a fact.
#[derive(Debug, Clone, PartialEq)]
pub enum FactInsertion {
    Added,
    /// The new emotion replaced a weaker one on the same link.
    Replaced(BoundFact),
    /// An equal or stronger fact is already known.
    Dropped,
    /// A resolution tension cancelled these facts and was not stored.
    Defeated(Vec<BoundFact>),
    /// Not something working memory holds.
    Ignored,
}

/// The facts one character currently knows, plus what it has ever known.
///
/// Linked characters are kept as id-to-id lookups: `links[y][x]` is the
/// strength of `x`'s positive emotion towards `y`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterContext {
    owner: CharacterId,
    facts: Vec<BoundFact>,
    previous: Vec<BoundFact>,
    history: Vec<HistoryEntry>,
    links: BTreeMap<CharacterId, BTreeMap<CharacterId, i8>>,
    known: BTreeSet<CharacterId>,
    missing: VecDeque<MissingCondition>,
}

impl CharacterContext {
    /// Create an empty context for a character who just became active.
    pub fn new(owner: CharacterId) -> Self {
        Self {
            owner,
            facts: Vec::new(),
            previous: Vec::new(),
            history: Vec::new(),
            links: BTreeMap::new(),
            known: BTreeSet::new(),
            missing: VecDeque::new(),
        }
    }

    pub fn owner(&self) -> CharacterId {
        self.owner
    }

    /// Current working memory, oldest first.
    pub fn facts(&self) -> &[BoundFact] {
        &self.facts
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    pub fn tension_count(&self) -> usize {
        self.facts.iter().filter(|f| f.is_tension()).count()
    }

    pub fn emotion_count(&self) -> usize {
        self.facts.iter().filter(|f| f.is_emotion()).count()
    }

    /// Every fact ever accepted, including ones later retracted.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn known_characters(&self) -> impl Iterator<Item = CharacterId> + '_ {
        self.known.iter().copied()
    }

    /// Characters this context has seen feel positively towards `to`, with
    /// the strongest such emotion.
    pub fn linked_to(&self, to: CharacterId) -> impl Iterator<Item = (CharacterId, i8)> + '_ {
        self.links
            .get(&to)
            .into_iter()
            .flat_map(|from| from.iter().map(|(id, strength)| (*id, *strength)))
    }

    /// How strongly `from` likes `to`, as far as this context knows.
    pub fn link_strength(&self, from: CharacterId, to: CharacterId) -> Option<i8> {
        self.links.get(&to).and_then(|m| m.get(&from)).copied()
    }

    /// Whether some current fact meets `need`.
    pub fn holds(&self, need: &BoundFact) -> bool {
        self.facts.iter().any(|f| f.satisfies(need))
    }

    /// Apply the insertion rules for one fact observed at `step`.
    pub fn add_fact(&mut self, fact: BoundFact, step: usize) -> FactInsertion {
        let outcome = match &fact {
            Fact::Emotion(emotion) => {
                if emotion.intensity.level().map_or(true, |level| level == 0) {
                    return FactInsertion::Ignored;
                }
                if self.facts.iter().any(|f| *f == fact || f.dominates(&fact)) {
                    return FactInsertion::Dropped;
                }
                match self.facts.iter().position(|f| fact.dominates(f)) {
                    Some(i) => {
                        let old = self.facts.remove(i);
                        self.facts.push(fact);
                        FactInsertion::Replaced(old)
                    }
                    None => {
                        self.facts.push(fact);
                        FactInsertion::Added
                    }
                }
            }
            Fact::Tension(tension) => {
                let defeated: Vec<BoundFact> = self
                    .facts
                    .iter()
                    .filter(|f| fact.defeats(f))
                    .copied()
                    .collect();
                if !defeated.is_empty() {
                    self.facts.retain(|f| !fact.defeats(f));
                    return FactInsertion::Defeated(defeated);
                }
                if !tension.kind.is_retained() {
                    return FactInsertion::Ignored;
                }
                if self.facts.contains(&fact) {
                    return FactInsertion::Dropped;
                }
                self.facts.push(fact);
                FactInsertion::Added
            }
            Fact::Position(_) => return FactInsertion::Ignored,
        };

        self.history.push(HistoryEntry { fact, step });
        self.known.extend(fact.characters());
        if let Fact::Emotion(emotion) = &fact {
            if let (Participant::Character(from), Participant::Character(to), Some(level)) =
                (emotion.from, emotion.to, emotion.intensity.level())
            {
                if level > 0 {
                    let strength = self.links.entry(to).or_default().entry(from).or_insert(level);
                    *strength = (*strength).max(level);
                }
            }
        }
        outcome
    }

    /// Remember the current facts as the previous-cycle snapshot.
    pub fn snapshot(&mut self) {
        self.previous = self.facts.clone();
    }

    /// Facts with their status relative to the last snapshot.
    pub fn diff(&self) -> Vec<(BoundFact, FactStatus)> {
        let mut changes: Vec<(BoundFact, FactStatus)> = self
            .facts
            .iter()
            .map(|f| {
                let status = if self.previous.contains(f) {
                    FactStatus::Remained
                } else {
                    FactStatus::Inserted
                };
                (*f, status)
            })
            .collect();
        changes.extend(
            self.previous
                .iter()
                .filter(|f| !self.facts.contains(f))
                .map(|f| (*f, FactStatus::Removed)),
        );
        changes
    }

    pub fn push_missing(&mut self, condition: BoundFact, step: usize) {
        if self.missing.iter().any(|m| m.condition == condition) {
            return;
        }
        self.missing.push_back(MissingCondition { condition, step });
    }

    /// Missing conditions, oldest first.
    pub fn missing_conditions(&self) -> impl Iterator<Item = &MissingCondition> {
        self.missing.iter()
    }

    pub fn oldest_missing(&self) -> Option<&MissingCondition> {
        self.missing.front()
    }

    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }

    /// Keep only the missing conditions `unmet` still reports as unmet.
    pub fn retain_missing(&mut self, mut unmet: impl FnMut(&BoundFact) -> bool) {
        self.missing.retain(|m| unmet(&m.condition));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use story_world::{EmotionKind, Intensity, TensionKind};

    fn c(n: u32) -> Participant {
        Participant::Character(CharacterId(n))
    }

    fn emo(from: u32, to: u32, level: i8) -> BoundFact {
        Fact::emotion(c(from), c(to), EmotionKind::Brotherly, Intensity::Level(level))
    }

    #[test]
    fn test_stronger_emotion_replaces_weaker() {
        let mut ctx = CharacterContext::new(CharacterId(0));
        assert_eq!(ctx.add_fact(emo(0, 1, 1), 0), FactInsertion::Added);
        assert_eq!(ctx.add_fact(emo(0, 1, 3), 1), FactInsertion::Replaced(emo(0, 1, 1)));
        assert_eq!(ctx.facts(), &[emo(0, 1, 3)]);
    }

    #[test]
    fn test_weaker_emotion_is_dropped() {
        let mut ctx = CharacterContext::new(CharacterId(0));
        ctx.add_fact(emo(0, 1, 3), 0);
        assert_eq!(ctx.add_fact(emo(0, 1, 1), 1), FactInsertion::Dropped);
        assert_eq!(ctx.add_fact(emo(0, 1, 3), 2), FactInsertion::Dropped);
        assert_eq!(ctx.facts(), &[emo(0, 1, 3)]);
        assert_eq!(ctx.history().len(), 1);
    }

    #[test]
    fn test_opposite_polarity_coexists() {
        let mut ctx = CharacterContext::new(CharacterId(0));
        ctx.add_fact(emo(0, 1, 2), 0);
        assert_eq!(ctx.add_fact(emo(0, 1, -2), 1), FactInsertion::Added);
        assert_eq!(ctx.emotion_count(), 2);
    }

    #[test]
    fn test_prisoner_free_defeats_prisoner() {
        let mut ctx = CharacterContext::new(CharacterId(0));
        let prisoner = Fact::tension(TensionKind::Prisoner, c(0), Some(c(1)));
        let free = Fact::tension(TensionKind::PrisonerFree, c(0), Some(c(1)));

        ctx.add_fact(prisoner, 0);
        assert_eq!(ctx.add_fact(free, 1), FactInsertion::Defeated(vec![prisoner]));
        assert_eq!(ctx.tension_count(), 0);
        // The defeated fact stays in history.
        assert_eq!(ctx.history()[0].fact, prisoner);
    }

    #[test]
    fn test_resolution_without_target_is_not_stored() {
        let mut ctx = CharacterContext::new(CharacterId(0));
        let normal = Fact::tension(TensionKind::LifeNormal, c(2), None);
        assert_eq!(ctx.add_fact(normal, 0), FactInsertion::Ignored);
        assert!(ctx.facts().is_empty());
        assert!(ctx.history().is_empty());
    }

    #[test]
    fn test_positive_emotion_links_characters() {
        let mut ctx = CharacterContext::new(CharacterId(0));
        ctx.add_fact(emo(1, 2, 2), 0);
        ctx.add_fact(emo(3, 2, -2), 1);

        let linked: Vec<_> = ctx.linked_to(CharacterId(2)).collect();
        assert_eq!(linked, vec![(CharacterId(1), 2)]);
        assert_eq!(ctx.link_strength(CharacterId(1), CharacterId(2)), Some(2));
        assert_eq!(ctx.link_strength(CharacterId(2), CharacterId(1)), None);

        let known: Vec<_> = ctx.known_characters().collect();
        assert_eq!(known, vec![CharacterId(1), CharacterId(2), CharacterId(3)]);
    }

    #[test]
    fn test_position_facts_are_ignored() {
        let mut ctx = CharacterContext::new(CharacterId(0));
        let moved = Fact::position(c(0), story_world::Place::With(c(1)));
        assert_eq!(ctx.add_fact(moved, 0), FactInsertion::Ignored);
        assert_eq!(ctx.fact_count(), 0);
    }

    #[test]
    fn test_snapshot_diff() {
        let mut ctx = CharacterContext::new(CharacterId(0));
        let risk = Fact::tension(TensionKind::LifeAtRisk, c(1), None);
        ctx.add_fact(emo(0, 1, 1), 0);
        ctx.add_fact(risk, 0);
        ctx.snapshot();
        ctx.add_fact(emo(0, 1, 2), 1);

        let diff = ctx.diff();
        assert!(diff.contains(&(risk, FactStatus::Remained)));
        assert!(diff.contains(&(emo(0, 1, 2), FactStatus::Inserted)));
        assert!(diff.contains(&(emo(0, 1, 1), FactStatus::Removed)));
    }

    #[test]
    fn test_missing_queue_is_fifo() {
        let mut ctx = CharacterContext::new(CharacterId(0));
        ctx.push_missing(emo(0, 1, 1), 2);
        ctx.push_missing(emo(0, 2, -1), 3);
        ctx.push_missing(emo(0, 1, 1), 4);
        assert_eq!(ctx.missing_conditions().count(), 2);
        assert_eq!(ctx.oldest_missing().map(|m| m.step), Some(2));

        ctx.add_fact(emo(0, 1, 2), 5);
        let facts = ctx.facts().to_vec();
        ctx.retain_missing(|need| !facts.iter().any(|f| f.satisfies(need)));
        assert_eq!(ctx.oldest_missing().map(|m| m.condition), Some(emo(0, 2, -1)));
    }
}
