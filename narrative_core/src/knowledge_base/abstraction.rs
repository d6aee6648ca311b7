//! Turning a told situation into an atom.

use std::collections::BTreeMap;

use story_world::{ActionInstance, CharacterId, FactStatus, Participant, Role, SocialStatus, StoryId};

use super::atom::{Atom, AtomFact};
use super::context::CharacterContext;

/// Assigns roles to characters in order of first appearance.
#[derive(Debug, Default)]
struct RoleMap {
    roles: BTreeMap<CharacterId, Role>,
}

impl RoleMap {
    fn role(&mut self, id: CharacterId) -> Role {
        let next = Role(self.roles.len() as u8);
        *self.roles.entry(id).or_insert(next)
    }
}

/// Abstract `context`'s change since its last snapshot into an atom whose
/// next action is `next`.
///
/// The owner always becomes role `A`. Removed facts and facts with
/// pseudo-character slots are left out; `None` if nothing remains.
pub fn abstract_situation(
    context: &CharacterContext,
    preceding: Option<&ActionInstance>,
    next: &ActionInstance,
    story: StoryId,
) -> Option<Atom> {
    let mut roles = RoleMap::default();
    roles.role(context.owner());

    let facts: Vec<AtomFact> = context
        .diff()
        .into_iter()
        .filter(|(fact, status)| *status != FactStatus::Removed && fact.is_concrete())
        .map(|(fact, status)| {
            let fact = fact.map(|p| match p {
                Participant::Character(id) => roles.role(*id),
                // Filtered out above.
                _ => Role::A,
            });
            AtomFact::new(fact).with_status(status)
        })
        .collect();
    if facts.is_empty() {
        return None;
    }

    let next_roles: Vec<Role> = next.characters.iter().map(|id| roles.role(*id)).collect();
    let mut atom = Atom::new(facts)
        .with_next(next.name.clone(), &next_roles)
        .from_story(story);

    if let Some(preceding) = preceding {
        let previous_roles: Vec<Role> = preceding.characters.iter().map(|id| roles.role(*id)).collect();
        atom = atom.with_previous(preceding.name.clone(), &previous_roles);
        if preceding.social != SocialStatus::Regular {
            atom = atom.social(preceding.name.clone(), preceding.social);
        }
    }
    Some(atom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use story_world::{ActionOrigin, EmotionKind, Fact, Intensity, TensionKind};

    fn action(name: &str, characters: &[u32], social: SocialStatus) -> ActionInstance {
        ActionInstance {
            name: name.to_string(),
            characters: characters.iter().map(|c| CharacterId(*c)).collect(),
            preconditions: Vec::new(),
            effects: Vec::new(),
            social,
            origin: ActionOrigin::Template,
            secret: false,
        }
    }

    fn c(n: u32) -> Participant {
        Participant::Character(CharacterId(n))
    }

    #[test]
    fn test_roles_follow_first_appearance() {
        let mut ctx = CharacterContext::new(CharacterId(5));
        ctx.add_fact(Fact::tension(TensionKind::LifeAtRisk, c(5), None), 0);
        ctx.snapshot();
        ctx.add_fact(
            Fact::emotion(c(5), c(2), EmotionKind::Brotherly, Intensity::Level(-3)),
            1,
        );

        let next = action("Fought", &[5, 2], SocialStatus::Regular);
        let atom = abstract_situation(&ctx, None, &next, StoryId(7)).unwrap();

        assert_eq!(atom.shape().tensions, 1);
        assert_eq!(atom.next_actions()[0].roles, vec![Role::A, Role::B]);
        assert!(atom.core().provenance.contains(&StoryId(7)));

        let statuses: Vec<_> = atom.facts().iter().map(|f| f.status).collect();
        assert!(statuses.contains(&FactStatus::Remained));
        assert!(statuses.contains(&FactStatus::Inserted));
    }

    #[test]
    fn test_social_preceding_action_makes_social_atom() {
        let mut ctx = CharacterContext::new(CharacterId(0));
        ctx.add_fact(Fact::tension(TensionKind::LifeAtRisk, c(1), None), 0);
        let before = action("Attacked", &[0, 1], SocialStatus::BreaksNorm);
        let next = action("Fled", &[0], SocialStatus::Regular);

        let atom = abstract_situation(&ctx, Some(&before), &next, StoryId(1)).unwrap();
        assert!(atom.is_social());
        assert_eq!(atom.core().previous_actions[0].action, "Attacked");
    }

    #[test]
    fn test_empty_context_yields_nothing() {
        let ctx = CharacterContext::new(CharacterId(0));
        let next = action("Met", &[0, 1], SocialStatus::Regular);
        assert!(abstract_situation(&ctx, None, &next, StoryId(1)).is_none());
    }
}
