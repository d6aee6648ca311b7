//! Fact definitions - the emotion, tension and position statements stories are made of.
//!
//! A fact is generic over what fills its character slots:
//! - [`AbstractFact`] (`Fact<Role>`): anonymized roles, used by atoms
//! - [`Condition`] (`Fact<Slot>`): roles or pseudo-characters, used by action templates
//! - [`BoundFact`] (`Fact<Participant>`): bound to concrete characters, held in contexts

mod intensity;
mod tension;

pub use intensity::*;
pub use tension::*;

use serde::{Deserialize, Serialize};

use crate::entities::{CharacterId, LocationId};

/// Anonymized character slot. `A`, `B` and `C` are the action roles; atoms
/// may use higher indices for larger casts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Role(pub u8);

impl Role {
    pub const A: Role = Role(0);
    pub const B: Role = Role(1);
    pub const C: Role = Role(2);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            0 => f.write_str("A"),
            1 => f.write_str("B"),
            2 => f.write_str("C"),
            n => write!(f, "R{}", n),
        }
    }
}

/// A character slot in an action template condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    Role(Role),
    /// Any character at all.
    Any,
    /// Every character linked to (positively disposed towards) the role.
    LinkedTo(Role),
}

impl Slot {
    pub const A: Slot = Slot::Role(Role::A);
    pub const B: Slot = Slot::Role(Role::B);
    pub const C: Slot = Slot::Role(Role::C);

    /// Bind this slot to the characters an action was instantiated with.
    pub fn bind(self, characters: &[CharacterId]) -> Participant {
        match self {
            Slot::Role(role) => characters
                .get(role.index())
                .map_or(Participant::Undefined, |id| Participant::Character(*id)),
            Slot::Any => Participant::Any,
            Slot::LinkedTo(role) => characters
                .get(role.index())
                .map_or(Participant::Undefined, |id| Participant::LinkedTo(*id)),
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Role(role) => write!(f, "{}", role),
            Slot::Any => f.write_str("*"),
            Slot::LinkedTo(role) => write!(f, "linked({})", role),
        }
    }
}

/// A concrete character or one of the pseudo-characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Participant {
    Character(CharacterId),
    Any,
    LinkedTo(CharacterId),
    Undefined,
}

impl Participant {
    pub fn character(self) -> Option<CharacterId> {
        match self {
            Participant::Character(id) => Some(id),
            _ => None,
        }
    }

    /// Equal, or either side is "any character".
    pub fn matches(self, other: Participant) -> bool {
        self == other || self == Participant::Any || other == Participant::Any
    }
}

impl From<CharacterId> for Participant {
    fn from(id: CharacterId) -> Self {
        Participant::Character(id)
    }
}

impl std::fmt::Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Participant::Character(id) => write!(f, "{}", id),
            Participant::Any => f.write_str("*"),
            Participant::LinkedTo(id) => write!(f, "linked({})", id),
            Participant::Undefined => f.write_str("?"),
        }
    }
}

/// How a fact changed between two snapshots of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum FactStatus {
    #[default]
    Inserted,
    Removed,
    Remained,
}

/// The three kinds of fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactType {
    Emotion,
    Tension,
    Position,
}

/// `from` feels `intensity` of `kind` towards `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Emotion<S> {
    pub from: S,
    pub to: S,
    pub kind: EmotionKind,
    pub intensity: Intensity,
}

/// A tension affecting `subject`, optionally caused by or shared with `object`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tension<S> {
    pub kind: TensionKind,
    pub subject: S,
    pub object: Option<S>,
}

/// Where a character ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Place<S> {
    With(S),
    At(LocationId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position<S> {
    pub who: S,
    pub place: Place<S>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Fact<S> {
    Emotion(Emotion<S>),
    Tension(Tension<S>),
    Position(Position<S>),
}

pub type AbstractFact = Fact<Role>;
pub type Condition = Fact<Slot>;
pub type BoundFact = Fact<Participant>;

impl<S> Fact<S> {
    pub fn emotion(from: S, to: S, kind: EmotionKind, intensity: Intensity) -> Self {
        Fact::Emotion(Emotion {
            from,
            to,
            kind,
            intensity,
        })
    }

    pub fn tension(kind: TensionKind, subject: S, object: Option<S>) -> Self {
        Fact::Tension(Tension {
            kind,
            subject,
            object,
        })
    }

    pub fn position(who: S, place: Place<S>) -> Self {
        Fact::Position(Position { who, place })
    }

    pub fn fact_type(&self) -> FactType {
        match self {
            Fact::Emotion(_) => FactType::Emotion,
            Fact::Tension(_) => FactType::Tension,
            Fact::Position(_) => FactType::Position,
        }
    }

    pub fn is_emotion(&self) -> bool {
        matches!(self, Fact::Emotion(_))
    }

    pub fn is_tension(&self) -> bool {
        matches!(self, Fact::Tension(_))
    }

    pub fn tension_kind(&self) -> Option<TensionKind> {
        match self {
            Fact::Tension(t) => Some(t.kind),
            _ => None,
        }
    }

    /// Character slots in declaration order.
    pub fn slots(&self) -> Vec<&S> {
        match self {
            Fact::Emotion(e) => vec![&e.from, &e.to],
            Fact::Tension(t) => std::iter::once(&t.subject).chain(t.object.as_ref()).collect(),
            Fact::Position(p) => match &p.place {
                Place::With(other) => vec![&p.who, other],
                Place::At(_) => vec![&p.who],
            },
        }
    }

    /// Rebuild the fact with every slot transformed by `f`.
    pub fn map<T>(&self, mut f: impl FnMut(&S) -> T) -> Fact<T> {
        match self {
            Fact::Emotion(e) => Fact::Emotion(Emotion {
                from: f(&e.from),
                to: f(&e.to),
                kind: e.kind,
                intensity: e.intensity,
            }),
            Fact::Tension(t) => Fact::Tension(Tension {
                kind: t.kind,
                subject: f(&t.subject),
                object: t.object.as_ref().map(&mut f),
            }),
            Fact::Position(p) => Fact::Position(Position {
                who: f(&p.who),
                place: match &p.place {
                    Place::With(other) => Place::With(f(other)),
                    Place::At(location) => Place::At(*location),
                },
            }),
        }
    }

    /// Same fact type and kind, ignoring who fills the slots: emotions need a
    /// compatible category and the same polarity, tensions the same kind.
    pub fn same_kind<T>(&self, other: &Fact<T>) -> bool {
        match (self, other) {
            (Fact::Emotion(a), Fact::Emotion(b)) => {
                a.kind.compatible(b.kind) && a.intensity.signum() == b.intensity.signum()
            }
            (Fact::Tension(a), Fact::Tension(b)) => a.kind == b.kind,
            (Fact::Position(_), Fact::Position(_)) => true,
            _ => false,
        }
    }
}

impl Condition {
    /// Bind the condition's slots to the characters of an action instance.
    pub fn bind(&self, characters: &[CharacterId]) -> BoundFact {
        self.map(|slot| slot.bind(characters))
    }
}

impl BoundFact {
    /// Concrete characters mentioned by the fact.
    pub fn characters(&self) -> Vec<CharacterId> {
        self.slots().into_iter().filter_map(|p| p.character()).collect()
    }

    pub fn involves(&self, id: CharacterId) -> bool {
        self.slots()
            .into_iter()
            .any(|p| *p == Participant::Character(id))
    }

    /// The character the fact is primarily about.
    pub fn subject(&self) -> Option<CharacterId> {
        match self {
            Fact::Emotion(e) => e.from.character(),
            Fact::Tension(t) => t.subject.character(),
            Fact::Position(p) => p.who.character(),
        }
    }

    /// Whether every slot holds a concrete character.
    pub fn is_concrete(&self) -> bool {
        self.slots().into_iter().all(|p| p.character().is_some())
    }

    /// Equal up to "any character" slots and generic emotion categories.
    pub fn equivalent(&self, other: &BoundFact) -> bool {
        let slots_match = {
            let (ours, theirs) = (self.slots(), other.slots());
            ours.len() == theirs.len() && ours.iter().zip(&theirs).all(|(a, b)| a.matches(**b))
        };
        if !slots_match {
            return false;
        }
        match (self, other) {
            (Fact::Emotion(a), Fact::Emotion(b)) => {
                if a.kind == EmotionKind::Generic || b.kind == EmotionKind::Generic {
                    a.intensity.signum() == b.intensity.signum()
                } else {
                    a.kind == b.kind && a.intensity == b.intensity
                }
            }
            (Fact::Tension(a), Fact::Tension(b)) => a.kind == b.kind,
            (Fact::Position(a), Fact::Position(b)) => match (&a.place, &b.place) {
                (Place::At(x), Place::At(y)) => x == y,
                (Place::With(_), Place::With(_)) => true,
                _ => false,
            },
            _ => false,
        }
    }

    /// Whether holding `self` meets the requirement `need`: equal, equivalent,
    /// or an emotion of the same polarity at least as strong.
    pub fn satisfies(&self, need: &BoundFact) -> bool {
        if self == need || self.equivalent(need) {
            return true;
        }
        match (self, need) {
            (Fact::Emotion(have), Fact::Emotion(need)) => {
                have.from.matches(need.from)
                    && have.to.matches(need.to)
                    && have.kind.compatible(need.kind)
                    && have.intensity.signum() == need.intensity.signum()
                    && have.intensity.magnitude() >= need.intensity.magnitude()
            }
            _ => false,
        }
    }

    /// Same link and polarity, strictly stronger than `other`.
    pub fn dominates(&self, other: &BoundFact) -> bool {
        match (self, other) {
            (Fact::Emotion(a), Fact::Emotion(b)) => {
                a.from == b.from
                    && a.to == b.to
                    && a.kind == b.kind
                    && a.intensity.signum() == b.intensity.signum()
                    && a.intensity.magnitude() > b.intensity.magnitude()
            }
            _ => false,
        }
    }

    /// Whether this resolution tension cancels `other`.
    pub fn defeats(&self, other: &BoundFact) -> bool {
        match (self, other) {
            (Fact::Tension(a), Fact::Tension(b)) => {
                a.kind.defeats() == Some(b.kind)
                    && a.subject.matches(b.subject)
                    && match (a.object, b.object) {
                        (Some(x), Some(y)) => x.matches(y),
                        _ => true,
                    }
            }
            _ => false,
        }
    }
}

impl<S: std::fmt::Display> std::fmt::Display for Fact<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fact::Emotion(e) => {
                let level = match e.intensity {
                    Intensity::Level(level) => format!("{:+}", level),
                    Intensity::Proportional { base } => format!("~{:+}", base),
                };
                write!(f, "{}({} -> {}, {})", emotion_label(e.kind), e.from, e.to, level)
            }
            Fact::Tension(t) => match &t.object {
                Some(object) => write!(f, "{}({}, {})", t.kind, t.subject, object),
                None => write!(f, "{}({})", t.kind, t.subject),
            },
            Fact::Position(p) => match &p.place {
                Place::With(other) => write!(f, "Pos({} with {})", p.who, other),
                Place::At(location) => write!(f, "Pos({} at {})", p.who, location),
            },
        }
    }
}

fn emotion_label(kind: EmotionKind) -> &'static str {
    match kind {
        EmotionKind::Brotherly => "Emo",
        EmotionKind::Amorous => "Love",
        EmotionKind::Generic => "Feel",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(n: u32) -> Participant {
        Participant::Character(CharacterId(n))
    }

    fn emo(from: Participant, to: Participant, level: i8) -> BoundFact {
        Fact::emotion(from, to, EmotionKind::Brotherly, Intensity::Level(level))
    }

    #[test]
    fn test_condition_binding() {
        let cond: Condition = Fact::tension(TensionKind::LifeAtRisk, Slot::B, Some(Slot::A));
        let bound = cond.bind(&[CharacterId(4), CharacterId(7)]);
        assert_eq!(bound, Fact::tension(TensionKind::LifeAtRisk, c(7), Some(c(4))));

        let unbound: Condition = Fact::tension(TensionKind::Prisoner, Slot::C, None);
        let bound = unbound.bind(&[CharacterId(4)]);
        assert_eq!(bound.slots(), vec![&Participant::Undefined]);
    }

    #[test]
    fn test_linked_slot_binding() {
        let cond: Condition = Fact::emotion(
            Slot::LinkedTo(Role::B),
            Slot::A,
            EmotionKind::Brotherly,
            Intensity::Proportional { base: -3 },
        );
        let bound = cond.bind(&[CharacterId(1), CharacterId(2)]);
        assert_eq!(bound.slots()[0], &Participant::LinkedTo(CharacterId(2)));
    }

    #[test]
    fn test_equivalence_with_any() {
        let have = emo(c(1), c(2), 2);
        let need = emo(Participant::Any, c(2), 2);
        assert!(have.equivalent(&need));
        assert!(!have.equivalent(&emo(c(3), c(2), 2)));
    }

    #[test]
    fn test_generic_emotion_equivalence() {
        let have = emo(c(1), c(2), 3);
        let need: BoundFact = Fact::emotion(c(1), c(2), EmotionKind::Generic, Intensity::Level(1));
        assert!(have.equivalent(&need));

        let opposite: BoundFact = Fact::emotion(c(1), c(2), EmotionKind::Generic, Intensity::Level(-1));
        assert!(!have.equivalent(&opposite));
    }

    #[test]
    fn test_satisfies_stronger_emotion() {
        let have = emo(c(1), c(2), 3);
        assert!(have.satisfies(&emo(c(1), c(2), 1)));
        assert!(!emo(c(1), c(2), 1).satisfies(&have));
        assert!(!have.satisfies(&emo(c(1), c(2), -1)));
    }

    #[test]
    fn test_dominance() {
        assert!(emo(c(1), c(2), 3).dominates(&emo(c(1), c(2), 1)));
        assert!(emo(c(1), c(2), -3).dominates(&emo(c(1), c(2), -2)));
        assert!(!emo(c(1), c(2), 3).dominates(&emo(c(1), c(2), -1)));
        assert!(!emo(c(1), c(2), 3).dominates(&emo(c(2), c(1), 1)));
    }

    #[test]
    fn test_tension_defeat() {
        let prisoner: BoundFact = Fact::tension(TensionKind::Prisoner, c(1), Some(c(2)));
        let free: BoundFact = Fact::tension(TensionKind::PrisonerFree, c(1), Some(c(2)));
        let other_free: BoundFact = Fact::tension(TensionKind::PrisonerFree, c(3), None);
        assert!(free.defeats(&prisoner));
        assert!(!prisoner.defeats(&free));
        assert!(!other_free.defeats(&prisoner));
    }

    #[test]
    fn test_same_kind_ignores_slots() {
        let atom: AbstractFact = Fact::tension(TensionKind::LifeAtRisk, Role::A, None);
        let bound: BoundFact = Fact::tension(TensionKind::LifeAtRisk, c(9), None);
        assert!(atom.same_kind(&bound));
        let emotion: AbstractFact =
            Fact::emotion(Role::A, Role::B, EmotionKind::Brotherly, Intensity::Level(2));
        assert!(emotion.same_kind(&emo(c(1), c(2), 1)));
        assert!(!emotion.same_kind(&emo(c(1), c(2), -1)));
        assert!(!emotion.same_kind(&bound));
    }

    #[test]
    fn test_display() {
        let fact: BoundFact = Fact::tension(TensionKind::LifeAtRisk, c(1), None);
        assert_eq!(fact.to_string(), "Lr(c1)");
        assert_eq!(emo(c(0), c(1), 2).to_string(), "Emo(c0 -> c1, +2)");
    }
}
