//! Family relations derived from parent, partner and ancestor links
//!
//! Nothing here is stored redundantly. Every walk over the relation graph
//! carries a visited set, since partner and father links may form cycles
//! in malformed data.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::types::{EntityId, Gender};
use crate::entity::human::HumanEntity;
use crate::entity::store::EntityStore;

fn ancestry(id: EntityId, human: &HumanEntity) -> BTreeSet<EntityId> {
    let mut set: BTreeSet<EntityId> = human.ancestor_ids.iter().copied().collect();
    set.extend(human.mother_id);
    set.extend(human.father_id);
    set.insert(id);
    set
}

/// Whether two humans share blood: one descends from the other, or both
/// descend from a common ancestor within the bounded ancestor lists
pub fn is_lineage(store: &EntityStore, a: EntityId, b: EntityId) -> bool {
    let (Some(ha), Some(hb)) = (store.human(a), store.human(b)) else {
        return false;
    };
    let sa = ancestry(a, ha);
    let sb = ancestry(b, hb);
    !sa.is_disjoint(&sb)
}

/// Parent/child, siblings or partners
pub fn are_family(store: &EntityStore, a: EntityId, b: EntityId) -> bool {
    if a == b {
        return true;
    }
    let (Some(ha), Some(hb)) = (store.human(a), store.human(b)) else {
        return false;
    };

    let parent_of = |child: &HumanEntity, parent: EntityId| {
        child.mother_id == Some(parent) || child.father_id == Some(parent)
    };
    if parent_of(ha, b) || parent_of(hb, a) {
        return true;
    }

    let shares_parent = |x: Option<EntityId>, y: Option<EntityId>| x.is_some() && x == y;
    if shares_parent(ha.mother_id, hb.mother_id) || shares_parent(ha.father_id, hb.father_id) {
        return true;
    }

    ha.partner_ids.contains(&b) || hb.partner_ids.contains(&a)
}

/// Strength of the tie between two humans
///
/// 3 for immediate family, 2 for blood lineage, 1 for in-laws (a partner
/// of one is of the other's blood), 0 otherwise.
pub fn connection_weight(store: &EntityStore, a: EntityId, b: EntityId) -> u8 {
    if are_family(store, a, b) {
        return 3;
    }
    if is_lineage(store, a, b) {
        return 2;
    }
    let partners = |id: EntityId| {
        store
            .human(id)
            .map(|h| h.partner_ids.clone())
            .unwrap_or_default()
    };
    let in_law = partners(a).into_iter().any(|p| is_lineage(store, p, b))
        || partners(b).into_iter().any(|p| is_lineage(store, p, a));
    if in_law {
        1
    } else {
        0
    }
}

/// Resolves each human's top living ancestor, memoising along the way
///
/// The walk goes from a woman to her living male partner, and from anyone
/// to their living father. An optional scope limits the walk to a set of
/// humans, e.g. the members of one tribe.
#[derive(Debug, Default)]
pub struct AncestorResolver {
    cache: BTreeMap<EntityId, EntityId>,
    scope: Option<BTreeSet<EntityId>>,
}

impl AncestorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn within(scope: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            cache: BTreeMap::new(),
            scope: Some(scope.into_iter().collect()),
        }
    }

    fn eligible(&self, store: &EntityStore, id: EntityId) -> bool {
        self.scope.as_ref().map_or(true, |s| s.contains(&id)) && store.living_human(id).is_some()
    }

    fn step(&self, store: &EntityStore, id: EntityId) -> Option<EntityId> {
        let human = store.living_human(id)?;
        if human.agent.gender == Gender::Female {
            let partner = human.partner_ids.iter().copied().find(|p| {
                self.eligible(store, *p)
                    && store
                        .human(*p)
                        .is_some_and(|h| h.agent.gender == Gender::Male)
            });
            if partner.is_some() {
                return partner;
            }
        }
        human.father_id.filter(|f| self.eligible(store, *f))
    }

    pub fn resolve(&mut self, store: &EntityStore, id: EntityId) -> EntityId {
        let mut visited = BTreeSet::new();
        let mut path = Vec::new();
        let mut current = id;

        let top = loop {
            if let Some(cached) = self.cache.get(&current) {
                break *cached;
            }
            if !visited.insert(current) {
                // Cycle: the node we came back to stands as the top
                break current;
            }
            path.push(current);
            match self.step(store, current) {
                Some(next) => current = next,
                None => break current,
            }
        };

        for node in path {
            self.cache.insert(node, top);
        }
        top
    }
}

/// One-off resolution without a shared cache
pub fn top_living_ancestor(store: &EntityStore, id: EntityId) -> EntityId {
    AncestorResolver::new().resolve(store, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::Vec2;
    use crate::entity::store::EntityBody;

    fn add(store: &mut EntityStore, id: u32, gender: Gender, build: impl FnOnce(&mut HumanEntity)) -> EntityId {
        let config = SimulationConfig::default();
        let mut h = HumanEntity::new(gender, 30.0, &config);
        build(&mut h);
        store.spawn_with_id(EntityId(id), Vec2::default(), EntityBody::Human(Box::new(h)))
    }

    #[test]
    fn test_siblings_are_family() {
        let mut store = EntityStore::new();
        let a = add(&mut store, 3, Gender::Male, |h| h.father_id = Some(EntityId(1)));
        let b = add(&mut store, 4, Gender::Female, |h| h.father_id = Some(EntityId(1)));
        assert!(are_family(&store, a, b));
        assert!(are_family(&store, b, a));
        assert_eq!(connection_weight(&store, a, b), 3);
    }

    #[test]
    fn test_cousins_are_lineage_not_family() {
        let mut store = EntityStore::new();
        let a = add(&mut store, 10, Gender::Male, |h| {
            h.father_id = Some(EntityId(5));
            h.ancestor_ids = vec![EntityId(5), EntityId(1)];
        });
        let b = add(&mut store, 11, Gender::Male, |h| {
            h.father_id = Some(EntityId(6));
            h.ancestor_ids = vec![EntityId(6), EntityId(1)];
        });
        assert!(!are_family(&store, a, b));
        assert!(is_lineage(&store, a, b));
        assert_eq!(connection_weight(&store, a, b), 2);
    }

    #[test]
    fn test_in_law_weight() {
        let mut store = EntityStore::new();
        let wife = add(&mut store, 20, Gender::Female, |h| {
            h.father_id = Some(EntityId(2));
            h.partner_ids = vec![EntityId(21)];
        });
        let husband = add(&mut store, 21, Gender::Male, |h| h.partner_ids = vec![EntityId(20)]);
        let wife_brother = add(&mut store, 22, Gender::Male, |h| h.father_id = Some(EntityId(2)));
        assert!(are_family(&store, wife, husband));
        assert_eq!(connection_weight(&store, husband, wife_brother), 1);
        assert_eq!(connection_weight(&store, wife_brother, husband), 1);
    }

    #[test]
    fn test_top_living_ancestor_follows_partner_then_father() {
        let mut store = EntityStore::new();
        let grandpa = add(&mut store, 1, Gender::Male, |_| {});
        add(&mut store, 2, Gender::Male, |h| h.father_id = Some(EntityId(1)));
        let wife = add(&mut store, 3, Gender::Female, |h| h.partner_ids = vec![EntityId(2)]);
        let kid = add(&mut store, 4, Gender::Female, |h| h.father_id = Some(EntityId(2)));

        let mut resolver = AncestorResolver::new();
        assert_eq!(resolver.resolve(&store, wife), grandpa);
        assert_eq!(resolver.resolve(&store, kid), grandpa);
    }

    #[test]
    fn test_top_living_ancestor_skips_the_dead() {
        let mut store = EntityStore::new();
        let father = add(&mut store, 1, Gender::Male, |_| {});
        let son = add(&mut store, 2, Gender::Male, |h| h.father_id = Some(EntityId(1)));
        if let Some(h) = store.human_mut(father) {
            h.agent.hitpoints = 0.0;
        }
        assert_eq!(top_living_ancestor(&store, son), son);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut store = EntityStore::new();
        let a = add(&mut store, 1, Gender::Male, |h| h.father_id = Some(EntityId(2)));
        let b = add(&mut store, 2, Gender::Male, |h| h.father_id = Some(EntityId(1)));
        let top = top_living_ancestor(&store, a);
        assert!(top == a || top == b);
    }

    #[test]
    fn test_scope_limits_walk() {
        let mut store = EntityStore::new();
        add(&mut store, 1, Gender::Male, |_| {});
        let son = add(&mut store, 2, Gender::Male, |h| h.father_id = Some(EntityId(1)));
        let mut resolver = AncestorResolver::within([son]);
        assert_eq!(resolver.resolve(&store, son), son);
    }
}
