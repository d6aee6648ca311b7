//! Similarity matcher - best-covering partial role assignment between an
//! atom and a set of context facts.
//!
//! Characters are nodes and facts are edges. The search looks for one
//! injective role -> character mapping under which as many atom facts as
//! possible find a compatible context fact.

use std::collections::BTreeMap;

use story_world::{AbstractFact, BoundFact, CharacterId, Participant, Role};

use crate::knowledge_base::AtomCore;

/// Node expansions after which the best assignment found so far is kept.
const MAX_EXPANSIONS: usize = 50_000;

/// Score of one atom against one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Similarity {
    /// Percentage of atom facts matched, 0-100.
    pub score: u8,
    pub matched: usize,
    /// Atom role -> concrete character under the best assignment.
    pub mapping: BTreeMap<Role, CharacterId>,
}

/// Match `context` against `atom`. `None` for atoms without facts.
pub fn similarity(context: &[BoundFact], atom: &AtomCore) -> Option<Similarity> {
    let atom_facts: Vec<&AbstractFact> = atom.facts().iter().map(|f| &f.fact).collect();
    if atom_facts.is_empty() {
        return None;
    }
    let context: Vec<&BoundFact> = context.iter().filter(|f| f.is_concrete()).collect();

    let mut search = Search {
        atom: &atom_facts,
        context: &context,
        used: vec![false; context.len()],
        mapping: BTreeMap::new(),
        reverse: BTreeMap::new(),
        best: 0,
        best_mapping: BTreeMap::new(),
        expansions: 0,
    };
    search.run(0, 0);

    let matched = search.best;
    Some(Similarity {
        score: (matched * 100 / atom_facts.len()) as u8,
        matched,
        mapping: search.best_mapping,
    })
}

struct Search<'a> {
    atom: &'a [&'a AbstractFact],
    context: &'a [&'a BoundFact],
    used: Vec<bool>,
    mapping: BTreeMap<Role, CharacterId>,
    reverse: BTreeMap<CharacterId, Role>,
    best: usize,
    best_mapping: BTreeMap<Role, CharacterId>,
    expansions: usize,
}

impl Search<'_> {
    fn run(&mut self, index: usize, matched: usize) {
        self.expansions += 1;
        if matched > self.best {
            self.best = matched;
            self.best_mapping = self.mapping.clone();
        }
        let remaining = self.atom.len() - index;
        if index == self.atom.len()
            || matched + remaining <= self.best
            || self.best == self.atom.len()
            || self.expansions > MAX_EXPANSIONS
        {
            return;
        }

        let wanted = self.atom[index];
        for j in 0..self.context.len() {
            if self.used[j] || !wanted.same_kind(self.context[j]) {
                continue;
            }
            if let Some(added) = self.bind(wanted, self.context[j]) {
                self.used[j] = true;
                self.run(index + 1, matched + 1);
                self.used[j] = false;
                self.unbind(&added);
            }
        }
        // Leave this atom fact unmatched.
        self.run(index + 1, matched);
    }

    /// Extend the mapping so `wanted`'s roles land on `have`'s characters.
    /// Returns the roles newly bound, or `None` if inconsistent.
    fn bind(&mut self, wanted: &AbstractFact, have: &BoundFact) -> Option<Vec<Role>> {
        let roles = wanted.slots();
        let characters = have.slots();
        if roles.len() != characters.len() {
            return None;
        }
        let mut added = Vec::new();
        for (role, participant) in roles.into_iter().zip(characters) {
            let Participant::Character(id) = *participant else {
                self.unbind(&added);
                return None;
            };
            let bound = self.mapping.get(role).copied();
            let holder = self.reverse.get(&id).copied();
            let consistent = match (bound, holder) {
                (Some(bound), _) => bound == id,
                (None, Some(_)) => false,
                (None, None) => {
                    self.mapping.insert(*role, id);
                    self.reverse.insert(id, *role);
                    added.push(*role);
                    true
                }
            };
            if !consistent {
                self.unbind(&added);
                return None;
            }
        }
        Some(added)
    }

    fn unbind(&mut self, roles: &[Role]) {
        for role in roles {
            if let Some(id) = self.mapping.remove(role) {
                self.reverse.remove(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::{Atom, AtomFact};
    use story_world::{EmotionKind, Fact, Intensity, TensionKind};

    fn c(n: u32) -> Participant {
        Participant::Character(CharacterId(n))
    }

    fn emo(from: Participant, to: Participant, level: i8) -> BoundFact {
        Fact::emotion(from, to, EmotionKind::Brotherly, Intensity::Level(level))
    }

    fn atom_emo(from: Role, to: Role, level: i8) -> AtomFact {
        AtomFact::new(Fact::emotion(from, to, EmotionKind::Brotherly, Intensity::Level(level)))
    }

    fn atom_risk(role: Role) -> AtomFact {
        AtomFact::new(Fact::tension(TensionKind::LifeAtRisk, role, None))
    }

    #[test]
    fn test_full_match_with_consistent_roles() {
        let atom = Atom::new([atom_emo(Role::A, Role::B, 2), atom_risk(Role::B)]);
        let context = vec![
            emo(c(4), c(7), 3),
            Fact::tension(TensionKind::LifeAtRisk, c(7), None),
        ];

        let result = similarity(&context, atom.core()).unwrap();
        assert_eq!(result.score, 100);
        assert_eq!(result.mapping.get(&Role::A), Some(&CharacterId(4)));
        assert_eq!(result.mapping.get(&Role::B), Some(&CharacterId(7)));
    }

    #[test]
    fn test_inconsistent_roles_match_partially() {
        // Risk is on the wrong character for a single consistent assignment.
        let atom = Atom::new([atom_emo(Role::A, Role::B, 2), atom_risk(Role::B)]);
        let context = vec![
            emo(c(4), c(7), 3),
            Fact::tension(TensionKind::LifeAtRisk, c(4), None),
        ];
        assert_eq!(similarity(&context, atom.core()).unwrap().score, 50);
    }

    #[test]
    fn test_polarity_must_agree() {
        let atom = Atom::new([atom_emo(Role::A, Role::B, 2)]);
        let context = vec![emo(c(1), c(2), -2)];
        assert_eq!(similarity(&context, atom.core()).unwrap().score, 0);
    }

    #[test]
    fn test_mapping_is_injective() {
        let atom = Atom::new([atom_risk(Role::A), atom_risk(Role::B)]);
        let context = vec![Fact::tension(TensionKind::LifeAtRisk, c(1), None)];
        let result = similarity(&context, atom.core()).unwrap();
        assert_eq!(result.score, 50);
        assert_eq!(result.mapping.len(), 1);
    }

    #[test]
    fn test_more_facts_never_lower_the_score() {
        let atom = Atom::new([
            atom_emo(Role::A, Role::B, 1),
            atom_emo(Role::B, Role::C, -1),
            atom_risk(Role::C),
        ]);
        let additions = [
            emo(c(1), c(2), 2),
            Fact::tension(TensionKind::LifeAtRisk, c(3), None),
            emo(c(5), c(6), 1),
            emo(c(2), c(3), -3),
            Fact::tension(TensionKind::LifeAtRisk, c(1), None),
        ];

        let mut context = Vec::new();
        let mut last = similarity(&context, atom.core()).unwrap().score;
        for fact in additions {
            context.push(fact);
            let score = similarity(&context, atom.core()).unwrap().score;
            assert!(score >= last, "score dropped from {} to {}", last, score);
            last = score;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn test_pseudo_characters_never_match() {
        let atom = Atom::new([atom_risk(Role::A)]);
        let context = vec![Fact::tension(TensionKind::LifeAtRisk, Participant::Any, None)];
        assert_eq!(similarity(&context, atom.core()).unwrap().score, 0);
    }

    #[test]
    fn test_empty_atom() {
        let atom = Atom::new(Vec::new());
        assert!(similarity(&[], atom.core()).is_none());
    }
}
