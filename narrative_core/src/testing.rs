//! Shared fixtures for the engine tests.
//!
//! A small cast split over two places, a catalog of warrior-tale actions, a
//! handful of exemplar stories and the atoms mined from them.

use rand::rngs::StdRng;
use rand::SeedableRng;

use story_world::{
    ActionCatalog, ActionTemplate, Arity, CharacterId, EmotionKind, ExemplarCorpus, ExemplarStory, Fact,
    Intensity, Place, Role, Slot, SocialNorm, SocialNorms, SpecialActions, StoryId, StoryWorld, TensionKind,
    PERFORMER, RECEIVER,
};

use crate::config::EngineConfig;
use crate::error::Attempt;
use crate::knowledge_base::{Atom, AtomFact, AtomIndex};
use crate::story::{StoryRules, StoryState};

/// In the city.
pub const KNIGHT: CharacterId = CharacterId(0);
/// In the forest.
pub const PRINCESS: CharacterId = CharacterId(1);
/// In the city.
pub const ENEMY: CharacterId = CharacterId(2);
/// In the city.
pub const PRIEST: CharacterId = CharacterId(3);

fn feels(from: Slot, to: Slot, level: i8) -> Fact<Slot> {
    Fact::emotion(from, to, EmotionKind::Brotherly, Intensity::Level(level))
}

pub fn world() -> StoryWorld {
    let mut world = StoryWorld::new();
    let city = world.add_location("Tenochtitlan");
    let forest = world.add_location("Forest");
    world.add_character("Jaguar Knight", city);
    world.add_character("Princess", forest);
    world.add_character("Enemy", city);
    world.add_character("Priest", city);
    world
}

pub fn templates() -> Vec<ActionTemplate> {
    vec![
        ActionTemplate::new("Met", Arity::Two)
            .with_effect(feels(PERFORMER, RECEIVER, 1))
            .with_effect(feels(RECEIVER, PERFORMER, 1))
            .with_text("A met B"),
        ActionTemplate::new("Befriended", Arity::Two)
            .with_precondition(feels(PERFORMER, RECEIVER, 1))
            .with_effect(feels(PERFORMER, RECEIVER, 3))
            .with_effect(feels(RECEIVER, PERFORMER, 3)),
        ActionTemplate::new("Insulted", Arity::Two).with_effect(feels(RECEIVER, PERFORMER, -2)),
        ActionTemplate::new("Fought", Arity::Two)
            .with_precondition(feels(PERFORMER, RECEIVER, -1))
            .with_effect(Fact::tension(TensionKind::HealthAtRisk, PERFORMER, None))
            .with_effect(Fact::tension(TensionKind::HealthAtRisk, RECEIVER, None)),
        ActionTemplate::new("Attacked", Arity::Two)
            .with_precondition(feels(PERFORMER, RECEIVER, -1))
            .with_effect(Fact::tension(TensionKind::LifeAtRisk, RECEIVER, None))
            .with_effect(feels(RECEIVER, PERFORMER, -3))
            .with_effect(Fact::emotion(
                Slot::LinkedTo(Role::B),
                PERFORMER,
                EmotionKind::Brotherly,
                Intensity::Proportional { base: -3 },
            ))
            .with_text("A attacked B"),
        ActionTemplate::new("Cured", Arity::Two)
            .with_precondition(Fact::tension(TensionKind::LifeAtRisk, RECEIVER, None))
            .with_effect(Fact::tension(TensionKind::LifeNormal, RECEIVER, None))
            .with_effect(feels(RECEIVER, PERFORMER, 3)),
        ActionTemplate::new("Killed", Arity::Two)
            .with_precondition(Fact::tension(TensionKind::LifeAtRisk, RECEIVER, None))
            .with_effect(Fact::tension(TensionKind::ActorDead, RECEIVER, None)),
        ActionTemplate::new("Poisoned", Arity::Two)
            .with_effect(Fact::tension(TensionKind::HealthAtRisk, RECEIVER, None))
            .secret(),
        ActionTemplate::new("Kidnapped", Arity::Two)
            .with_effect(Fact::tension(TensionKind::Prisoner, RECEIVER, Some(PERFORMER)))
            .with_effect(feels(RECEIVER, PERFORMER, -3)),
        ActionTemplate::new("Rescued", Arity::Two)
            .with_precondition(Fact::tension(TensionKind::Prisoner, RECEIVER, Some(Slot::Any)))
            .with_effect(Fact::tension(TensionKind::PrisonerFree, RECEIVER, None))
            .with_effect(feels(RECEIVER, PERFORMER, 3)),
        ActionTemplate::new("Prayed", Arity::One)
            .with_effect(Fact::tension(TensionKind::PotentialDanger, PERFORMER, None)),
        ActionTemplate::new("Went", Arity::Two).with_effect(Fact::position(PERFORMER, Place::With(RECEIVER))),
        ActionTemplate::new("Complained", Arity::Two).with_effect(feels(PERFORMER, RECEIVER, -1)),
    ]
}

pub fn catalog() -> ActionCatalog {
    ActionCatalog::new(
        templates(),
        SpecialActions {
            move_to_character: Some("Went".to_string()),
            social_complaint: Some("Complained".to_string()),
        },
    )
}

pub fn norms() -> SocialNorms {
    SocialNorms::new(vec![
        SocialNorm::new("Attacked")
            .justified_if(Fact::tension(TensionKind::LifeAtRisk, PERFORMER, None))
            .exception_if(Fact::tension(TensionKind::Prisoner, PERFORMER, Some(RECEIVER))),
        SocialNorm::new("Killed").justified_if(Fact::tension(TensionKind::LifeAtRisk, PERFORMER, None)),
    ])
}

pub fn corpus() -> ExemplarCorpus {
    ExemplarCorpus::new(vec![
        ExemplarStory::new(StoryId(1), "Friendship")
            .with_step("Met", &[0, 1], 0, 0)
            .with_step("Befriended", &[0, 1], 0, 0),
        ExemplarStory::new(StoryId(2), "Ambush")
            .with_step("Met", &[0, 1], 0, 0)
            .with_step("Attacked", &[2, 1], 1, 1)
            .with_step("Cured", &[0, 1], 0, 1),
        ExemplarStory::new(StoryId(3), "Revenge")
            .with_step("Insulted", &[0, 1], 0, 0)
            .with_step("Fought", &[1, 0], 2, 0)
            .with_step("Attacked", &[0, 1], 3, 1)
            .with_step("Killed", &[0, 1], 2, 2)
            .with_step("Prayed", &[2], 1, 2),
    ])
}

fn atom_feels(from: Role, to: Role, level: i8) -> AtomFact {
    AtomFact::new(Fact::emotion(from, to, EmotionKind::Brotherly, Intensity::Level(level)))
}

fn atom_tension(kind: TensionKind, role: Role) -> AtomFact {
    AtomFact::new(Fact::tension(kind, role, None))
}

pub fn index() -> AtomIndex {
    let mut index = AtomIndex::new();
    let atoms = [
        Atom::new([atom_feels(Role::A, Role::B, 1), atom_feels(Role::B, Role::A, 1)])
            .with_next("Befriended", &[Role::A, Role::B])
            .from_story(StoryId(1)),
        Atom::new([atom_feels(Role::A, Role::B, -2)])
            .with_next("Fought", &[Role::A, Role::B])
            .from_story(StoryId(3)),
        Atom::new([
            atom_tension(TensionKind::HealthAtRisk, Role::A),
            atom_feels(Role::A, Role::B, -2),
        ])
        .with_next("Attacked", &[Role::A, Role::B])
        .from_story(StoryId(3)),
        Atom::new([atom_tension(TensionKind::LifeAtRisk, Role::A)])
            .with_next("Cured", &[Role::B, Role::A])
            .from_story(StoryId(2)),
    ];
    for atom in atoms {
        index.insert(atom);
    }
    index
}

/// Everything a story run needs, owned in one place.
pub struct Fixture {
    pub world: StoryWorld,
    pub catalog: ActionCatalog,
    pub norms: SocialNorms,
    pub corpus: ExemplarCorpus,
    pub index: AtomIndex,
    pub config: EngineConfig,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            world: world(),
            catalog: catalog(),
            norms: norms(),
            corpus: corpus(),
            index: index(),
            config: EngineConfig::default(),
        }
    }

    /// Same fixture, but nothing can bring two characters together.
    pub fn without_move_action() -> Self {
        let mut fixture = Self::new();
        fixture.catalog = ActionCatalog::new(
            templates(),
            SpecialActions {
                move_to_character: None,
                social_complaint: Some("Complained".to_string()),
            },
        );
        fixture
    }

    pub fn story(&self) -> StoryState {
        StoryState::new(self.world.clone())
    }

    pub fn rules(&self) -> StoryRules<'_> {
        StoryRules {
            catalog: &self.catalog,
            norms: &self.norms,
            config: &self.config,
        }
    }

    pub fn try_commit(
        &self,
        story: &mut StoryState,
        action: &str,
        characters: &[CharacterId],
    ) -> crate::error::Result<Attempt<usize>> {
        let instance = self.catalog.require(action)?.bind(characters)?;
        story.commit(&self.rules(), instance)
    }

    /// Commit by name; engine errors fail the test.
    pub fn commit(&self, story: &mut StoryState, action: &str, characters: &[CharacterId]) -> Attempt<usize> {
        self.try_commit(story, action, characters)
            .expect("fixture data is consistent")
    }
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
