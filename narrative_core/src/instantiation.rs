//! Character instantiation - choosing who performs a suggested action.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use story_world::{ActionTemplate, Arity, CharacterId};

use crate::config::EngineConfig;
use crate::error::{Attempt, Rejection};
use crate::story::StoryState;

/// Which story characters may stand in when the atom's own mapping fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForbiddenMode {
    /// No story character may stand in.
    Active,
    /// Any story character except the context owner.
    HalfActive,
    /// Any story character.
    Inactive,
}

/// How much freedom instantiation has for the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strictness {
    #[default]
    Strict,
    /// Set by coarse retrieval: unused characters are always allowed.
    Relaxed,
}

/// Binds template roles to characters of one story.
pub struct Instantiator<'a> {
    story: &'a StoryState,
    config: &'a EngineConfig,
}

impl<'a> Instantiator<'a> {
    pub fn new(story: &'a StoryState, config: &'a EngineConfig) -> Self {
        Self { story, config }
    }

    /// Choose characters for `template`.
    ///
    /// `preset` holds the characters already resolved per role (performer
    /// first); `owner` is the context the suggestion came from.
    pub fn instantiate<R: Rng>(
        &self,
        template: &ActionTemplate,
        preset: &[Option<CharacterId>],
        owner: Option<CharacterId>,
        strictness: Strictness,
        rng: &mut R,
    ) -> Attempt<Vec<CharacterId>> {
        let preset_for = |i: usize| preset.get(i).copied().flatten();
        let usage = &self.config.usage;

        let chosen = match template.arity {
            Arity::One => self
                .candidates(preset_for(0), owner, strictness, rng)
                .into_iter()
                .map(|c| vec![c])
                .find(|chars| self.story.usage_eligible(&template.name, chars, usage)),
            Arity::Two => {
                let performers = self.candidates(preset_for(0), owner, strictness, rng);
                let receivers = self.candidates(preset_for(1), owner, strictness, rng);
                performers
                    .iter()
                    .flat_map(|p| receivers.iter().map(move |r| vec![*p, *r]))
                    .find(|chars| {
                        chars[0] != chars[1] && self.story.usage_eligible(&template.name, chars, usage)
                    })
            }
        };

        match chosen {
            Some(characters) => Ok(characters),
            None => {
                tracing::debug!(action = %template.name, ?preset, "no eligible characters");
                Err(Rejection::Instantiation)
            }
        }
    }

    /// Candidates for one role, in the order they should be tried.
    pub fn candidates<R: Rng>(
        &self,
        preset: Option<CharacterId>,
        owner: Option<CharacterId>,
        strictness: Strictness,
        rng: &mut R,
    ) -> Vec<CharacterId> {
        let mut candidates: Vec<CharacterId> = preset.filter(|c| self.story.is_alive(*c)).into_iter().collect();

        let mut used: Vec<CharacterId> = match self.config.instantiation.forbidden_characters {
            ForbiddenMode::Active => Vec::new(),
            ForbiddenMode::HalfActive => self
                .story
                .story_characters()
                .into_iter()
                .filter(|c| Some(*c) != owner)
                .collect(),
            ForbiddenMode::Inactive => self.story.story_characters(),
        };
        used.retain(|c| self.story.is_alive(*c) && !candidates.contains(c));
        used.shuffle(rng);
        candidates.extend(used);

        if self.config.instantiation.partial_instantiation || strictness == Strictness::Relaxed {
            let mut fresh = self.story.unused_characters();
            fresh.retain(|c| !candidates.contains(c));
            fresh.shuffle(rng);
            candidates.extend(fresh);
        }
        candidates
    }
}
