//! Story state and the commit pipeline.
//!
//! Every action that enters the story, whatever phase proposed it, goes
//! through [`StoryState::commit`]: validity checks, location reconciliation,
//! social evaluation, then fact propagation into every witness's context.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use story_world::{
    resolve_proportional, ActionCatalog, ActionInstance, ActionOrigin, BoundFact, CharacterId, Fact,
    Intensity, LocationId, Participant, Place, SocialNorms, SocialStatus, StoryWorld, TensionKind,
};

use crate::config::{EngineConfig, UsageConfig};
use crate::error::{Attempt, FilterReason, Rejection, Result};
use crate::knowledge_base::{CharacterContext, FactInsertion};

/// Read-only inputs the commit pipeline consults.
#[derive(Debug, Clone, Copy)]
pub struct StoryRules<'a> {
    pub catalog: &'a ActionCatalog,
    pub norms: &'a SocialNorms,
    pub config: &'a EngineConfig,
}

/// One committed action and the curve values after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryStep {
    pub action: ActionInstance,
    /// Active tensions once this step is told.
    pub tension: u32,
    /// Cumulative norm violations once this step is told.
    pub norm_violations: u32,
    /// Tensions this step cancelled.
    pub resolved: Vec<BoundFact>,
    /// Inserted to bring two characters together.
    pub filler: bool,
}

/// A story in progress: the cast, every active character's context, and
/// the actions told so far.
#[derive(Debug, Clone)]
pub struct StoryState {
    world: StoryWorld,
    contexts: BTreeMap<CharacterId, CharacterContext>,
    steps: Vec<StoryStep>,
    instance_uses: HashMap<(String, Vec<CharacterId>), u32>,
    template_uses: HashMap<String, u32>,
    deaths: BTreeMap<CharacterId, usize>,
}

impl StoryState {
    pub fn new(world: StoryWorld) -> Self {
        Self {
            world,
            contexts: BTreeMap::new(),
            steps: Vec::new(),
            instance_uses: HashMap::new(),
            template_uses: HashMap::new(),
            deaths: BTreeMap::new(),
        }
    }

    pub fn world(&self) -> &StoryWorld {
        &self.world
    }

    pub fn steps(&self) -> &[StoryStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn actions(&self) -> impl Iterator<Item = &ActionInstance> {
        self.steps.iter().map(|s| &s.action)
    }

    pub fn last_action(&self) -> Option<&ActionInstance> {
        self.steps.last().map(|s| &s.action)
    }

    /// Names of the actions told, realizations excluded.
    pub fn action_names(&self) -> Vec<&str> {
        self.actions()
            .filter(|a| !a.is_realization())
            .map(|a| a.name.as_str())
            .collect()
    }

    pub fn tension_curve(&self) -> Vec<u32> {
        self.steps.iter().map(|s| s.tension).collect()
    }

    pub fn social_curve(&self) -> Vec<u32> {
        self.steps.iter().map(|s| s.norm_violations).collect()
    }

    pub fn current_tension(&self) -> u32 {
        self.steps.last().map_or(0, |s| s.tension)
    }

    pub fn is_alive(&self, id: CharacterId) -> bool {
        self.world.is_alive(id)
    }

    pub fn context(&self, id: CharacterId) -> Option<&CharacterContext> {
        self.contexts.get(&id)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &CharacterContext> {
        self.contexts.values()
    }

    /// Contexts of the characters still alive.
    pub fn active_contexts(&self) -> Vec<&CharacterContext> {
        self.contexts
            .values()
            .filter(|c| self.world.is_alive(c.owner()))
            .collect()
    }

    /// Create a context for a character entering the story.
    pub fn activate(&mut self, id: CharacterId) -> &mut CharacterContext {
        self.contexts
            .entry(id)
            .or_insert_with(|| CharacterContext::new(id))
    }

    /// Characters who took part in some action, in order of first appearance.
    pub fn story_characters(&self) -> Vec<CharacterId> {
        let mut seen = Vec::new();
        for id in self.actions().flat_map(|a| a.characters.iter()) {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }

    /// Living cast members who have not taken part yet.
    pub fn unused_characters(&self) -> Vec<CharacterId> {
        let used = self.story_characters();
        self.world
            .characters()
            .filter(|c| c.is_alive() && !used.contains(&c.id))
            .map(|c| c.id)
            .collect()
    }

    pub fn template_uses(&self, name: &str) -> u32 {
        self.template_uses.get(name).copied().unwrap_or(0)
    }

    pub fn instance_uses(&self, name: &str, characters: &[CharacterId]) -> u32 {
        self.instance_uses
            .get(&(name.to_string(), characters.to_vec()))
            .copied()
            .unwrap_or(0)
    }

    /// Under both usage caps and not a repeat of the last action.
    pub fn usage_eligible(&self, name: &str, characters: &[CharacterId], usage: &UsageConfig) -> bool {
        let repeat = self
            .last_action()
            .is_some_and(|last| last.name == name && last.characters == characters);
        !repeat
            && self.instance_uses(name, characters) < usage.max_instance_uses
            && self.template_uses(name) < usage.max_template_uses
    }

    /// Characters with a positive link towards `to` according to any
    /// context, with the strongest strength seen.
    pub fn linked_to(&self, to: CharacterId) -> BTreeMap<CharacterId, i8> {
        let mut linked = BTreeMap::new();
        for (from, strength) in self.contexts.values().flat_map(|c| c.linked_to(to)) {
            if !self.world.is_alive(from) {
                continue;
            }
            let entry = linked.entry(from).or_insert(strength);
            *entry = (*entry).max(strength);
        }
        linked
    }

    pub fn link_strength(&self, from: CharacterId, to: CharacterId) -> Option<i8> {
        self.contexts
            .values()
            .filter_map(|c| c.link_strength(from, to))
            .max()
    }

    /// Whether `need` holds from `owner`'s point of view. Positions are
    /// checked against the world, everything else against the context.
    pub fn holds_for(&self, owner: CharacterId, need: &BoundFact) -> bool {
        match need {
            Fact::Position(position) => {
                let Some(who) = position.who.character() else {
                    return true;
                };
                match position.place {
                    Place::At(location) => self.world.location_of(who) == Some(location),
                    Place::With(Participant::Character(other)) => {
                        self.world.location_of(who) == self.world.location_of(other)
                    }
                    Place::With(_) => true,
                }
            }
            _ => self.contexts.get(&owner).is_some_and(|c| c.holds(need)),
        }
    }

    /// Take the previous-cycle snapshot of every context.
    pub fn snapshot_contexts(&mut self) {
        for context in self.contexts.values_mut() {
            context.snapshot();
        }
    }

    /// How the norms judge `action` in the current situation. Nothing is
    /// committed.
    pub fn social_status(&self, rules: &StoryRules<'_>, action: &ActionInstance) -> SocialStatus {
        if !rules.config.guidance.social_analysis || action.is_realization() {
            return SocialStatus::Regular;
        }
        let Some(performer) = action.performer() else {
            return SocialStatus::Regular;
        };
        rules
            .norms
            .evaluate(&action.name, &action.characters, |fact| self.holds_for(performer, fact))
    }

    /// Tell `action`, or explain why it cannot be told now. Returns the
    /// step index on success.
    pub fn commit(&mut self, rules: &StoryRules<'_>, action: ActionInstance) -> Result<Attempt<usize>> {
        let resolved = self.resolve_effects(&action)?;
        let moves = self.resolve_moves(&action);
        if let Err(rejection) = self.check(rules, &action, &resolved, &moves, false)? {
            tracing::debug!(%action, %rejection, "action rejected");
            return Ok(Err(rejection));
        }

        let filled = match self.reconcile_location(rules, &action)? {
            Ok(filled) => filled,
            Err(rejection) => {
                tracing::debug!(%action, %rejection, "action rejected");
                return Ok(Err(rejection));
            }
        };
        let (resolved, moves) = if filled {
            (self.resolve_effects(&action)?, self.resolve_moves(&action))
        } else {
            (resolved, moves)
        };

        Ok(Ok(self.apply(rules, action, resolved, moves, false)?))
    }

    /// Concrete emotion and tension effects, with linked characters expanded
    /// and proportional intensities resolved.
    fn resolve_effects(&self, action: &ActionInstance) -> Result<Vec<BoundFact>> {
        let mut resolved = Vec::new();
        for effect in action.effects.iter().filter(|e| e.is_emotion() || e.is_tension()) {
            let linked = effect.slots().into_iter().find_map(|p| match p {
                Participant::LinkedTo(id) => Some(*id),
                _ => None,
            });
            match linked {
                Some(target) => {
                    for (friend, strength) in self.linked_to(target) {
                        let fact = effect.map(|p| match p {
                            Participant::LinkedTo(_) => Participant::Character(friend),
                            other => *other,
                        });
                        if let Some(fact) = resolve_intensity(fact, strength)? {
                            push_unique(&mut resolved, fact);
                        }
                    }
                }
                None => {
                    let strength = match effect {
                        Fact::Emotion(e) => match (e.from.character(), e.to.character()) {
                            (Some(from), Some(to)) => self.link_strength(from, to).unwrap_or(1),
                            _ => 1,
                        },
                        _ => 1,
                    };
                    if let Some(fact) = resolve_intensity(*effect, strength)? {
                        push_unique(&mut resolved, fact);
                    }
                }
            }
        }
        Ok(resolved)
    }

    /// Where the action's position effects send people.
    fn resolve_moves(&self, action: &ActionInstance) -> Vec<(CharacterId, LocationId)> {
        action
            .effects
            .iter()
            .filter_map(|effect| match effect {
                Fact::Position(position) => {
                    let who = position.who.character()?;
                    let target = match position.place {
                        Place::At(location) => location,
                        Place::With(other) => self.world.location_of(other.character()?)?,
                    };
                    Some((who, target))
                }
                _ => None,
            })
            .collect()
    }

    fn check(
        &self,
        rules: &StoryRules<'_>,
        action: &ActionInstance,
        resolved: &[BoundFact],
        moves: &[(CharacterId, LocationId)],
        filler: bool,
    ) -> Result<Attempt<()>> {
        for id in &action.characters {
            if !self.world.require(*id)?.is_alive() {
                return Ok(Err(Rejection::DeadCharacter(*id)));
            }
        }
        let distinct: BTreeSet<_> = action.characters.iter().collect();
        if distinct.len() != action.characters.len() {
            return Ok(Err(Rejection::Filter(FilterReason::Illogical)));
        }

        if action.origin == ActionOrigin::Template && !filler {
            if self.last_action().is_some_and(|last| last.same_as(action)) {
                return Ok(Err(Rejection::Filter(FilterReason::Repeat)));
            }
            let usage = &rules.config.usage;
            if self.instance_uses(&action.name, &action.characters) >= usage.max_instance_uses
                || self.template_uses(&action.name) >= usage.max_template_uses
            {
                return Ok(Err(Rejection::Filter(FilterReason::UsageCap)));
            }
        }

        if resolved
            .iter()
            .filter_map(|f| f.subject())
            .any(|id| !self.world.is_alive(id))
        {
            return Ok(Err(Rejection::Filter(FilterReason::Illogical)));
        }

        let audience = self.audience(action);
        let moves_someone = moves
            .iter()
            .any(|(who, location)| self.world.location_of(*who) != Some(*location));
        let informs = resolved.iter().any(|fact| {
            audience
                .iter()
                .any(|id| self.contexts.get(id).map_or(true, |c| would_change(c, fact)))
        });
        if !moves_someone && !informs {
            return Ok(Err(Rejection::Filter(FilterReason::NoNewInformation)));
        }
        Ok(Ok(()))
    }

    /// Bring performer and receiver together with the catalog's move action.
    /// Returns whether a filler step was told.
    fn reconcile_location(&mut self, rules: &StoryRules<'_>, action: &ActionInstance) -> Result<Attempt<bool>> {
        let (Some(performer), Some(receiver)) = (action.performer(), action.receiver()) else {
            return Ok(Ok(false));
        };
        let apart = |state: &StoryState| state.world.location_of(performer) != state.world.location_of(receiver);
        if !apart(self) || action.effects.iter().any(|e| matches!(e, Fact::Position(_))) {
            return Ok(Ok(false));
        }

        let conflict = Rejection::LocationConflict {
            performer,
            receiver,
        };
        let Some(template) = rules.catalog.move_action() else {
            return Ok(Err(conflict));
        };
        let filler = template.bind(&[performer, receiver])?;
        let resolved = self.resolve_effects(&filler)?;
        let moves = self.resolve_moves(&filler);
        if self.check(rules, &filler, &resolved, &moves, true)?.is_err() {
            return Ok(Err(conflict));
        }
        self.apply(rules, filler, resolved, moves, true)?;

        if apart(self) {
            return Ok(Err(conflict));
        }
        Ok(Ok(true))
    }

    /// Participants, plus everyone at the performer's location unless the
    /// action is secret.
    fn audience(&self, action: &ActionInstance) -> Vec<CharacterId> {
        let mut audience: BTreeSet<CharacterId> = action
            .characters
            .iter()
            .copied()
            .filter(|id| self.world.is_alive(*id))
            .collect();
        if !action.secret {
            if let Some(location) = action.performer().and_then(|p| self.world.location_of(p)) {
                audience.extend(self.world.characters_at(location));
            }
        }
        audience.into_iter().collect()
    }

    fn apply(
        &mut self,
        rules: &StoryRules<'_>,
        mut action: ActionInstance,
        resolved: Vec<BoundFact>,
        moves: Vec<(CharacterId, LocationId)>,
        filler: bool,
    ) -> Result<usize> {
        let step = self.steps.len();
        action.social = self.social_status(rules, &action);

        let missing: Vec<BoundFact> = match action.performer() {
            Some(performer) => action
                .preconditions
                .iter()
                .filter(|c| checkable(c) && !self.holds_for(performer, c))
                .copied()
                .collect(),
            None => Vec::new(),
        };

        let audience = self.audience(&action);
        let mut cancelled = Vec::new();
        for id in &audience {
            let context = self.activate(*id);
            for fact in &resolved {
                if let FactInsertion::Defeated(old) = context.add_fact(*fact, step) {
                    for fact in old {
                        push_unique(&mut cancelled, fact);
                    }
                }
            }
        }

        for (who, location) in moves {
            self.world.move_character(who, location)?;
        }

        for fact in &resolved {
            if fact.tension_kind() != Some(TensionKind::ActorDead) {
                continue;
            }
            if let Some(id) = fact.subject() {
                if self.world.kill(id)? {
                    tracing::info!(character = %id, step, "character died");
                    self.deaths.insert(id, step);
                }
            }
        }

        if let Some(performer) = action.performer() {
            let context = self.activate(performer);
            for condition in missing {
                context.push_missing(condition, step);
            }
        }

        if action.origin == ActionOrigin::Template {
            *self
                .instance_uses
                .entry((action.name.clone(), action.characters.clone()))
                .or_insert(0) += 1;
            *self.template_uses.entry(action.name.clone()).or_insert(0) += 1;
        }

        let violations = self.steps.last().map_or(0, |s| s.norm_violations)
            + u32::from(action.social.is_violation());
        let social = action.social;
        let performer = action.performer();
        self.steps.push(StoryStep {
            action,
            tension: 0,
            norm_violations: violations,
            resolved: cancelled,
            filler,
        });

        if social.is_violation() {
            if let Some(performer) = performer {
                self.complain(rules, step, performer, &audience)?;
            }
        }

        let tension = self.active_tension_count(step);
        self.steps[step].tension = tension;
        self.refresh_missing();

        tracing::info!(
            step,
            action = %self.steps[step].action,
            tension,
            violations,
            filler,
            "action committed"
        );
        Ok(step)
    }

    /// Witnesses of a norm violation react with the complaint action.
    fn complain(
        &mut self,
        rules: &StoryRules<'_>,
        step: usize,
        performer: CharacterId,
        audience: &[CharacterId],
    ) -> Result<()> {
        let Some(template) = rules.catalog.complaint_action() else {
            return Ok(());
        };
        for witness in audience.iter().copied().filter(|id| *id != performer) {
            if self.steps[step].action.involves(witness) {
                continue;
            }
            let reaction = template.bind(&[witness, performer])?;
            let facts = self.resolve_effects(&reaction)?;
            let context = self.activate(witness);
            for fact in facts {
                context.add_fact(fact, step);
            }
            tracing::debug!(%witness, %performer, step, "witness complained");
        }
        Ok(())
    }

    /// Distinct active tensions on living characters, plus one per character
    /// who died at `step`.
    fn active_tension_count(&self, step: usize) -> u32 {
        let active: BTreeSet<&BoundFact> = self
            .contexts
            .values()
            .flat_map(|c| c.facts())
            .filter(|f| f.is_tension() && f.subject().is_some_and(|s| self.world.is_alive(s)))
            .collect();
        let deaths = self.deaths.values().filter(|s| **s == step).count();
        (active.len() + deaths) as u32
    }

    /// Drop missing conditions that have become true.
    fn refresh_missing(&mut self) {
        let ids: Vec<CharacterId> = self.contexts.keys().copied().collect();
        for id in ids {
            let Some(context) = self.contexts.get(&id) else {
                continue;
            };
            let satisfied: Vec<BoundFact> = context
                .missing_conditions()
                .filter(|m| self.holds_for(id, &m.condition))
                .map(|m| m.condition)
                .collect();
            if satisfied.is_empty() {
                continue;
            }
            if let Some(context) = self.contexts.get_mut(&id) {
                context.retain_missing(|c| !satisfied.contains(c));
            }
        }
    }
}

/// Preconditions that can be checked: concrete or "any" slots only.
fn checkable(condition: &BoundFact) -> bool {
    condition
        .slots()
        .into_iter()
        .all(|p| matches!(p, Participant::Character(_) | Participant::Any))
}

/// Whether adding `fact` would change `context`.
fn would_change(context: &CharacterContext, fact: &BoundFact) -> bool {
    match fact {
        Fact::Tension(t) if !t.kind.is_retained() => context.facts().iter().any(|f| fact.defeats(f)),
        Fact::Tension(_) => !context.facts().contains(fact),
        Fact::Emotion(_) => !context.facts().iter().any(|f| f == fact || f.dominates(fact)),
        Fact::Position(_) => false,
    }
}

/// Resolve a proportional intensity and drop facts that cannot be held:
/// zero intensity, self-directed emotions, pseudo-character slots.
fn resolve_intensity(fact: BoundFact, link_strength: i8) -> Result<Option<BoundFact>> {
    let fact = match fact {
        Fact::Emotion(mut emotion) => {
            let level = match emotion.intensity {
                Intensity::Level(level) => level,
                Intensity::Proportional { base } => resolve_proportional(link_strength, base)?,
            };
            if level == 0 || emotion.from == emotion.to {
                return Ok(None);
            }
            emotion.intensity = Intensity::Level(level);
            Fact::Emotion(emotion)
        }
        other => other,
    };
    Ok(fact.is_concrete().then_some(fact))
}

fn push_unique(facts: &mut Vec<BoundFact>, fact: BoundFact) {
    if !facts.contains(&fact) {
        facts.push(fact);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Fixture};

    fn c(id: CharacterId) -> Participant {
        Participant::Character(id)
    }

    fn risk(id: CharacterId) -> BoundFact {
        Fact::tension(TensionKind::LifeAtRisk, c(id), None)
    }

    #[test]
    fn test_attack_reaches_victim_and_witnesses() {
        let fx = Fixture::new();
        let mut story = fx.story();
        let (knight, enemy, priest) = (testing::KNIGHT, testing::ENEMY, testing::PRIEST);

        let step = fx.commit(&mut story, "Attacked", &[enemy, knight]).unwrap();
        assert_eq!(step, 0);

        // Victim and the priest standing by both learn of the risk.
        assert!(story.context(knight).unwrap().facts().contains(&risk(knight)));
        assert!(story.context(priest).unwrap().facts().contains(&risk(knight)));
        // The attacker is never at risk because of their own attack.
        assert!(!story.context(enemy).unwrap().facts().contains(&risk(enemy)));
        // The princess is elsewhere.
        assert!(story.context(testing::PRINCESS).is_none());

        assert_eq!(story.tension_curve(), vec![1]);
    }

    #[test]
    fn test_secret_action_has_no_witnesses() {
        let fx = Fixture::new();
        let mut story = fx.story();
        fx.commit(&mut story, "Poisoned", &[testing::ENEMY, testing::KNIGHT])
            .unwrap();
        assert!(story.context(testing::PRIEST).is_none());
        assert_eq!(story.context(testing::KNIGHT).unwrap().tension_count(), 1);
    }

    #[test]
    fn test_tension_counts_distinct_facts() {
        let fx = Fixture::new();
        let mut story = fx.story();
        fx.commit(&mut story, "Attacked", &[testing::ENEMY, testing::KNIGHT])
            .unwrap();
        fx.commit(&mut story, "Attacked", &[testing::ENEMY, testing::PRIEST])
            .unwrap();
        assert_eq!(story.tension_curve(), vec![1, 2]);

        fx.commit(&mut story, "Cured", &[testing::PRIEST, testing::KNIGHT])
            .unwrap();
        assert_eq!(story.current_tension(), 1);
        assert_eq!(story.steps()[2].resolved, vec![risk(testing::KNIGHT)]);
    }

    #[test]
    fn test_death_counts_once_then_drops_out() {
        let fx = Fixture::new();
        let mut story = fx.story();
        fx.commit(&mut story, "Attacked", &[testing::ENEMY, testing::KNIGHT])
            .unwrap();
        fx.commit(&mut story, "Killed", &[testing::ENEMY, testing::KNIGHT])
            .unwrap();

        assert!(!story.is_alive(testing::KNIGHT));
        // Life-at-risk on the dead knight no longer counts; the death does.
        assert_eq!(story.tension_curve(), vec![1, 1]);

        let rejected = fx
            .try_commit(&mut story, "Met", &[testing::PRIEST, testing::KNIGHT])
            .unwrap();
        assert_eq!(rejected, Err(Rejection::DeadCharacter(testing::KNIGHT)));
    }

    #[test]
    fn test_nothing_new_is_filtered() {
        let fx = Fixture::new();
        let mut story = fx.story();
        fx.commit(&mut story, "Befriended", &[testing::KNIGHT, testing::PRIEST])
            .unwrap();
        fx.commit(&mut story, "Met", &[testing::PRIEST, testing::ENEMY])
            .unwrap();
        // Met is weaker than the friendship already known.
        let rejected = fx
            .try_commit(&mut story, "Met", &[testing::KNIGHT, testing::PRIEST])
            .unwrap();
        assert_eq!(rejected, Err(Rejection::Filter(FilterReason::NoNewInformation)));
    }

    #[test]
    fn test_repeat_and_usage_caps() {
        let fx = Fixture::new();
        let mut story = fx.story();
        fx.commit(&mut story, "Insulted", &[testing::ENEMY, testing::KNIGHT])
            .unwrap();
        let repeat = fx
            .try_commit(&mut story, "Insulted", &[testing::ENEMY, testing::KNIGHT])
            .unwrap();
        assert_eq!(repeat, Err(Rejection::Filter(FilterReason::Repeat)));

        fx.commit(&mut story, "Insulted", &[testing::KNIGHT, testing::ENEMY])
            .unwrap();
        let capped = fx
            .try_commit(&mut story, "Insulted", &[testing::ENEMY, testing::KNIGHT])
            .unwrap();
        assert_eq!(capped, Err(Rejection::Filter(FilterReason::UsageCap)));
    }

    #[test]
    fn test_location_filler_brings_characters_together() {
        let fx = Fixture::new();
        let mut story = fx.story();
        let step = fx
            .commit(&mut story, "Met", &[testing::KNIGHT, testing::PRINCESS])
            .unwrap();

        assert_eq!(step, 1);
        assert!(story.steps()[0].filler);
        assert_eq!(story.steps()[0].action.name, "Went");
        assert_eq!(
            story.world().location_of(testing::KNIGHT),
            story.world().location_of(testing::PRINCESS)
        );
    }

    #[test]
    fn test_location_conflict_without_move_action() {
        let fx = Fixture::without_move_action();
        let mut story = fx.story();
        let rejected = fx
            .try_commit(&mut story, "Met", &[testing::KNIGHT, testing::PRINCESS])
            .unwrap();
        assert_eq!(
            rejected,
            Err(Rejection::LocationConflict {
                performer: testing::KNIGHT,
                receiver: testing::PRINCESS
            })
        );
        assert!(story.is_empty());
    }

    #[test]
    fn test_linked_characters_react_proportionally() {
        let fx = Fixture::new();
        let mut story = fx.story();
        fx.commit(&mut story, "Befriended", &[testing::PRIEST, testing::KNIGHT])
            .unwrap();
        fx.commit(&mut story, "Attacked", &[testing::ENEMY, testing::KNIGHT])
            .unwrap();

        // The priest likes the knight at +3, so base -3 resolves to -3.
        let grudge: BoundFact = Fact::emotion(
            c(testing::PRIEST),
            c(testing::ENEMY),
            story_world::EmotionKind::Brotherly,
            Intensity::Level(-3),
        );
        assert!(story.context(testing::PRIEST).unwrap().facts().contains(&grudge));
    }

    #[test]
    fn test_unmet_preconditions_become_missing() {
        let fx = Fixture::new();
        let mut story = fx.story();
        fx.commit(&mut story, "Insulted", &[testing::KNIGHT, testing::ENEMY])
            .unwrap();
        let fought = fx
            .commit(&mut story, "Fought", &[testing::KNIGHT, testing::ENEMY])
            .unwrap();

        // Fought needs the knight to hate the enemy; Insulted only made the
        // enemy hate the knight.
        let knight = story.context(testing::KNIGHT).unwrap();
        let missing: Vec<_> = knight.missing_conditions().map(|m| m.step).collect();
        assert_eq!(missing, vec![fought]);
    }

    #[test]
    fn test_missing_condition_clears_when_satisfied() {
        let fx = Fixture::new();
        let mut story = fx.story();
        fx.commit(&mut story, "Fought", &[testing::KNIGHT, testing::ENEMY])
            .unwrap();
        assert!(story.context(testing::KNIGHT).unwrap().has_missing());

        // Being insulted by the enemy makes the knight hate them.
        fx.commit(&mut story, "Insulted", &[testing::ENEMY, testing::KNIGHT])
            .unwrap();
        assert!(!story.context(testing::KNIGHT).unwrap().has_missing());
    }

    #[test]
    fn test_norm_violation_and_complaint() {
        let fx = Fixture::new();
        let mut story = fx.story();
        fx.commit(&mut story, "Attacked", &[testing::ENEMY, testing::KNIGHT])
            .unwrap();

        let step = &story.steps()[0];
        assert_eq!(step.action.social, SocialStatus::BreaksNorm);
        assert_eq!(story.social_curve(), vec![1]);

        // The priest witnessed it and now resents the enemy.
        let resentment: BoundFact = Fact::emotion(
            c(testing::PRIEST),
            c(testing::ENEMY),
            story_world::EmotionKind::Brotherly,
            Intensity::Level(-1),
        );
        assert!(story.context(testing::PRIEST).unwrap().holds(&resentment));
    }

    #[test]
    fn test_justified_attack_is_not_a_violation() {
        let fx = Fixture::new();
        let mut story = fx.story();
        fx.commit(&mut story, "Attacked", &[testing::ENEMY, testing::KNIGHT])
            .unwrap();
        // The knight is now at risk from the enemy's attack and strikes back.
        fx.commit(&mut story, "Attacked", &[testing::KNIGHT, testing::ENEMY])
            .unwrap();
        assert_eq!(story.steps()[1].action.social, SocialStatus::Justified);
        assert_eq!(story.social_curve(), vec![1, 1]);
    }

    #[test]
    fn test_social_analysis_disabled() {
        let mut fx = Fixture::new();
        fx.config.guidance.social_analysis = false;
        let mut story = fx.story();
        fx.commit(&mut story, "Attacked", &[testing::ENEMY, testing::KNIGHT])
            .unwrap();
        assert_eq!(story.steps()[0].action.social, SocialStatus::Regular);
    }

    #[test]
    fn test_story_and_unused_characters() {
        let fx = Fixture::new();
        let mut story = fx.story();
        fx.commit(&mut story, "Attacked", &[testing::ENEMY, testing::KNIGHT])
            .unwrap();
        assert_eq!(story.story_characters(), vec![testing::ENEMY, testing::KNIGHT]);
        assert_eq!(story.unused_characters(), vec![testing::PRINCESS, testing::PRIEST]);
    }
}
