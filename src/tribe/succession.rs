//! Leadership succession, tribe merges and dissolution
//!
//! Run once per maintenance pass. Afterwards every tribe with members has
//! a living leader whose `leader_id` is its own id, and no ownership
//! (territory, buildings, bushes) points at a tribe without members.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use crate::ai::blackboard::keys;
use crate::core::types::EntityId;
use crate::entity::store::EntityBody;
use crate::simulation::events::SimulationEvent;
use crate::tribe::control::{TribeControl, TribeInfo};
use crate::tribe::lineage::{connection_weight, AncestorResolver};
use crate::tribe::{tribe_keys, tribe_leaders, tribe_members};
use crate::world::World;

/// State of a tribe's leader as seen from its members
enum LeaderState {
    Healthy,
    /// The leader is alive and follows another living leader
    JoinedOther(EntityId),
    /// Dead, removed, tribeless or following nobody valid
    Gone,
}

fn leader_state(world: &World, leader: EntityId) -> LeaderState {
    let Some(h) = world.entities.living_human(leader) else {
        return LeaderState::Gone;
    };
    match h.leader_id {
        Some(id) if id == leader => LeaderState::Healthy,
        Some(other) => {
            let other_leads = world
                .entities
                .living_human(other)
                .is_some_and(|o| o.is_leader(other));
            if other_leads {
                LeaderState::JoinedOther(other)
            } else {
                LeaderState::Gone
            }
        }
        None => LeaderState::Gone,
    }
}

/// Check every tribe and repair its leadership
pub fn run_succession(world: &mut World) -> Vec<SimulationEvent> {
    let mut events = Vec::new();

    for key in tribe_keys(&world.entities) {
        let members = tribe_members(&world.entities, key);
        if members.is_empty() {
            continue;
        }
        match leader_state(world, key) {
            LeaderState::Healthy => {}
            // The leader's own choice decides; kinship only ranks
            // adoptive tribes for orphaned children
            LeaderState::JoinedOther(target) => {
                tracing::info!(from = %key, into = %target, "leader joined another tribe, merging");
                merge_into(world, key, target, &mut events);
            }
            LeaderState::Gone => {
                let has_adult = members
                    .iter()
                    .any(|id| world.entities.agent(*id).is_some_and(|a| a.is_adult));
                if has_adult {
                    succeed_internally(world, key, &members, &mut events);
                } else {
                    place_children(world, key, &members, &mut events);
                }
            }
        }
    }

    dissolve_memberless(world, &mut events);
    events
}

/// Promote the patriarch of the largest family group among the members
fn succeed_internally(
    world: &mut World,
    old: EntityId,
    members: &[EntityId],
    events: &mut Vec<SimulationEvent>,
) {
    let mut resolver = AncestorResolver::within(members.iter().copied());
    let mut groups: BTreeMap<EntityId, Vec<EntityId>> = BTreeMap::new();
    for &member in members {
        let top = resolver.resolve(&world.entities, member);
        groups.entry(top).or_default().push(member);
    }

    // Largest group; equal sizes go to the lowest patriarch id
    let Some((patriarch, group)) = groups
        .iter()
        .max_by_key(|(id, group)| (group.len(), Reverse(**id)))
    else {
        return;
    };

    let oldest_adult = |pool: &[EntityId]| {
        pool.iter()
            .copied()
            .filter_map(|id| world.entities.agent(id).map(|a| (id, a)))
            .filter(|(_, a)| a.is_adult)
            .max_by(|a, b| a.1.age.total_cmp(&b.1.age).then(b.0.cmp(&a.0)))
            .map(|(id, _)| id)
    };
    let patriarch_is_adult = world.entities.agent(*patriarch).is_some_and(|a| a.is_adult);
    let successor = if patriarch_is_adult {
        Some(*patriarch)
    } else {
        oldest_adult(group).or_else(|| oldest_adult(members))
    };
    let Some(successor) = successor else {
        return;
    };

    promote(world, old, successor);
    tracing::info!(
        old_leader = %old,
        new_leader = %successor,
        family_groups = groups.len(),
        "leader succeeded"
    );
    events.push(SimulationEvent::LeaderSucceeded {
        old_leader: old,
        new_leader: successor,
    });
}

/// Hand the tribe of `old` to `new`, inheriting identity when possible
fn promote(world: &mut World, old: EntityId, new: EntityId) {
    let stashed = world.orphaned_controls.remove(&old);
    let (control, info) = match stashed {
        Some(s) => (Some(s.control), s.info),
        None => {
            // A leader that walked away leaves its control behind
            match world.entities.human_mut(old) {
                Some(h) if old != new => (h.tribe_control.take(), h.tribe_info.clone()),
                _ => (None, None),
            }
        }
    };
    let mut control = control.unwrap_or_else(|| Box::new(TribeControl::default()));
    control.diplomacy.remove(&new);
    control.diplomacy.remove(&old);
    let info = match info {
        Some(info) => info,
        None => TribeInfo::generate(&mut world.rng),
    };

    reassign_tribe(world, old, new);
    for member in tribe_members(&world.entities, new) {
        if let Some(h) = world.entities.human_mut(member) {
            h.tribe_info = Some(info.clone());
        }
    }
    if let Some(h) = world.entities.human_mut(new) {
        h.leader_id = Some(new);
        h.tribe_control = Some(control);
        h.tribe_info = Some(info);
    }
}

/// Move everything `from` leads or owns over to `to`
///
/// Members, territory, buildings and bushes follow; `from`'s tasks are
/// dropped and other tribes' diplomacy is re-keyed.
fn reassign_tribe(world: &mut World, from: EntityId, to: EntityId) -> usize {
    let mut moved = 0;
    for entity in world.entities.iter_mut() {
        match &mut entity.body {
            EntityBody::Human(h) => {
                if h.leader_id == Some(from) {
                    h.leader_id = Some(to);
                    h.agent.blackboard.delete(&keys::CLAIMED_TASK);
                    moved += 1;
                }
            }
            EntityBody::Building(b) => {
                if b.owner_id == Some(from) {
                    b.owner_id = Some(to);
                }
            }
            EntityBody::BerryBush(b) => {
                if b.owner_id == Some(from) {
                    b.owner_id = Some(to);
                }
            }
            EntityBody::Predator(_) | EntityBody::Prey(_) | EntityBody::Tree(_) => {}
        }
    }
    world.territory.transfer(from, to);
    world.tasks.prune_creator(from);

    for leader in tribe_leaders(&world.entities) {
        if let Some(control) = world
            .entities
            .human_mut(leader)
            .and_then(|h| h.tribe_control.as_deref_mut())
        {
            control.rename_leader(from, to);
            if leader == to {
                control.diplomacy.remove(&to);
            }
        }
    }
    moved
}

fn merge_into(world: &mut World, from: EntityId, into: EntityId, events: &mut Vec<SimulationEvent>) {
    let info = world.entities.human(into).and_then(|h| h.tribe_info.clone());
    let moved = reassign_tribe(world, from, into);
    if let Some(info) = info {
        for member in tribe_members(&world.entities, into) {
            if let Some(h) = world.entities.human_mut(member) {
                h.tribe_info = Some(info.clone());
            }
        }
    }
    if let Some(h) = world.entities.human_mut(from) {
        if !h.is_leader(from) {
            h.tribe_control = None;
        }
    }
    world.orphaned_controls.remove(&from);
    events.push(SimulationEvent::TribeMerged {
        from_leader: from,
        into_leader: into,
        members: moved,
    });
}

/// Only children are left: join the closest related tribe, or dissolve
fn place_children(
    world: &mut World,
    old: EntityId,
    children: &[EntityId],
    events: &mut Vec<SimulationEvent>,
) {
    let candidates: Vec<EntityId> = tribe_leaders(&world.entities)
        .into_iter()
        .filter(|id| *id != old)
        .collect();

    // Strongest tie, then the larger tribe, then the lower id
    let best = candidates
        .into_iter()
        .map(|leader| {
            let members = tribe_members(&world.entities, leader);
            let weight = children
                .iter()
                .flat_map(|c| members.iter().map(move |m| (*c, *m)))
                .map(|(c, m)| connection_weight(&world.entities, c, m))
                .max()
                .unwrap_or(0);
            (weight, members.len(), Reverse(leader))
        })
        .max();

    match best {
        Some((weight, _, Reverse(into))) => {
            tracing::info!(from = %old, into = %into, weight, "orphaned children adopted");
            merge_into(world, old, into, events);
        }
        None => dissolve(world, old, events),
    }
}

/// Wind up a tribe: members become tribeless, land and buildings are released
fn dissolve(world: &mut World, leader: EntityId, events: &mut Vec<SimulationEvent>) {
    let mut buildings_marked = 0;
    for entity in world.entities.iter_mut() {
        match &mut entity.body {
            EntityBody::Human(h) => {
                if h.leader_id == Some(leader) {
                    h.leader_id = None;
                    h.tribe_info = None;
                    h.agent.blackboard.delete(&keys::CLAIMED_TASK);
                }
            }
            EntityBody::Building(b) => {
                if b.owner_id == Some(leader) && !b.marked_for_destruction {
                    b.marked_for_destruction = true;
                    buildings_marked += 1;
                }
            }
            EntityBody::BerryBush(b) => {
                if b.owner_id == Some(leader) {
                    b.owner_id = None;
                }
            }
            EntityBody::Predator(_) | EntityBody::Prey(_) | EntityBody::Tree(_) => {}
        }
    }
    let cells_released = world.territory.clear_owner(leader);
    world.tasks.prune_creator(leader);
    world.orphaned_controls.remove(&leader);
    for other in tribe_leaders(&world.entities) {
        if let Some(control) = world
            .entities
            .human_mut(other)
            .and_then(|h| h.tribe_control.as_deref_mut())
        {
            control.diplomacy.remove(&leader);
        }
    }

    tracing::info!(leader = %leader, cells_released, buildings_marked, "tribe dissolved");
    events.push(SimulationEvent::TribeDissolved {
        leader,
        cells_released,
        buildings_marked,
    });
}

/// Dissolve every owner of land or buildings that has no members left
fn dissolve_memberless(world: &mut World, events: &mut Vec<SimulationEvent>) {
    let mut owners: BTreeSet<EntityId> = world.territory.owners().into_iter().collect();
    for entity in world.entities.iter() {
        match &entity.body {
            EntityBody::Building(b) if !b.marked_for_destruction => owners.extend(b.owner_id),
            EntityBody::BerryBush(b) => owners.extend(b.owner_id),
            _ => {}
        }
    }
    for owner in owners {
        if tribe_members(&world.entities, owner).is_empty() {
            dissolve(world, owner, events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{Gender, Vec2};
    use crate::entity::human::HumanEntity;
    use crate::entity::world_objects::BuildingEntity;
    use crate::tribe::control::DiplomacyStatus;

    fn world() -> World {
        World::new(SimulationConfig::default()).unwrap()
    }

    fn human_with_id(world: &mut World, id: u32, gender: Gender, age: f32, leader: Option<u32>) -> EntityId {
        let mut h = HumanEntity::new(gender, age, &world.config);
        h.leader_id = leader.map(EntityId);
        world.entities.spawn_with_id(
            EntityId(id),
            Vec2::new(1000.0 + id as f32, 1000.0),
            EntityBody::Human(Box::new(h)),
        )
    }

    fn leader_of(world: &World, id: EntityId) -> Option<EntityId> {
        world.entities.human(id).and_then(|h| h.leader_id)
    }

    #[test]
    fn test_healthy_tribe_is_untouched() {
        let mut world = world();
        let leader = world.spawn_human(Vec2::new(500.0, 500.0), Gender::Male, 40.0);
        world.found_tribe(leader);
        let member = world.spawn_human(Vec2::new(500.0, 520.0), Gender::Female, 30.0);
        world.join_tribe(member, leader);

        assert!(run_succession(&mut world).is_empty());
        assert_eq!(leader_of(&world, member), Some(leader));
    }

    #[test]
    fn test_largest_family_patriarch_wins() {
        let mut world = world();
        human_with_id(&mut world, 1, Gender::Male, 60.0, Some(1));
        // Family A: 5 and his two sons
        human_with_id(&mut world, 5, Gender::Male, 40.0, Some(1));
        for id in [6, 7] {
            human_with_id(&mut world, id, Gender::Male, 18.0, Some(1));
            if let Some(h) = world.entities.human_mut(EntityId(id)) {
                h.father_id = Some(EntityId(5));
            }
        }
        // Family B: 3 alone and older
        human_with_id(&mut world, 3, Gender::Male, 50.0, Some(1));
        world.entities.remove(EntityId(1));

        let events = run_succession(&mut world);
        assert!(events.contains(&SimulationEvent::LeaderSucceeded {
            old_leader: EntityId(1),
            new_leader: EntityId(5),
        }));
        for id in [3, 5, 6, 7] {
            assert_eq!(leader_of(&world, EntityId(id)), Some(EntityId(5)));
        }
    }

    #[test]
    fn test_equal_families_go_to_lowest_patriarch() {
        let mut world = world();
        human_with_id(&mut world, 9, Gender::Male, 30.0, Some(1));
        human_with_id(&mut world, 4, Gender::Male, 30.0, Some(1));
        run_succession(&mut world);
        assert_eq!(leader_of(&world, EntityId(9)), Some(EntityId(4)));
        assert_eq!(leader_of(&world, EntityId(4)), Some(EntityId(4)));
    }

    #[test]
    fn test_child_patriarch_falls_back_to_oldest_adult() {
        let mut world = world();
        // A mother partnered with nobody and her adult daughter; a boy alone
        human_with_id(&mut world, 2, Gender::Male, 8.0, Some(1));
        human_with_id(&mut world, 3, Gender::Female, 30.0, Some(1));
        human_with_id(&mut world, 4, Gender::Female, 35.0, Some(1));
        run_succession(&mut world);
        // Groups are singletons; 2 has the lowest id but is a child
        assert_eq!(leader_of(&world, EntityId(2)), Some(EntityId(4)));
    }

    #[test]
    fn test_succession_inherits_stashed_identity() {
        let mut world = world();
        let leader = world.spawn_human(Vec2::new(500.0, 500.0), Gender::Male, 40.0);
        world.found_tribe(leader);
        let member = world.spawn_human(Vec2::new(500.0, 520.0), Gender::Male, 30.0);
        world.join_tribe(member, leader);
        let info = world.entities.human(leader).and_then(|h| h.tribe_info.clone());
        let cells = world.territory.count_owned(leader);

        world.remove_entity(leader);
        run_succession(&mut world);

        let h = world.entities.human(member).unwrap();
        assert!(h.is_leader(member));
        assert_eq!(h.tribe_info, info);
        assert!(h.tribe_control.is_some());
        assert_eq!(world.territory.count_owned(member), cells);
        assert_eq!(world.territory.count_owned(leader), 0);
        assert!(world.orphaned_controls.is_empty());
    }

    #[test]
    fn test_leader_joining_other_tribe_merges() {
        let mut world = world();
        let a = world.spawn_human(Vec2::new(500.0, 500.0), Gender::Male, 40.0);
        world.found_tribe(a);
        let a_member = world.spawn_human(Vec2::new(500.0, 520.0), Gender::Female, 30.0);
        world.join_tribe(a_member, a);
        let b = world.spawn_human(Vec2::new(2000.0, 2000.0), Gender::Male, 40.0);
        world.found_tribe(b);

        if let Some(h) = world.entities.human_mut(a) {
            h.leader_id = Some(b);
        }
        let events = run_succession(&mut world);
        assert!(events.iter().any(|e| matches!(
            e,
            SimulationEvent::TribeMerged { from_leader, into_leader, .. }
                if *from_leader == a && *into_leader == b
        )));
        assert_eq!(leader_of(&world, a_member), Some(b));
        assert_eq!(world.territory.count_owned(a), 0);
        assert!(world.entities.human(a).unwrap().tribe_control.is_none());
    }

    #[test]
    fn test_merge_follows_the_leader_over_closer_kin() {
        let mut world = world();
        human_with_id(&mut world, 10, Gender::Male, 40.0, Some(20));
        let member = human_with_id(&mut world, 11, Gender::Female, 25.0, Some(10));
        human_with_id(&mut world, 20, Gender::Male, 40.0, Some(20));
        human_with_id(&mut world, 30, Gender::Male, 50.0, Some(30));
        if let Some(h) = world.entities.human_mut(member) {
            h.father_id = Some(EntityId(30));
        }

        run_succession(&mut world);
        // Her father leads tribe 30, but her leader chose tribe 20
        assert_eq!(leader_of(&world, member), Some(EntityId(20)));
    }

    #[test]
    fn test_orphaned_children_join_related_tribe() {
        let mut world = world();
        human_with_id(&mut world, 10, Gender::Male, 40.0, Some(10));
        human_with_id(&mut world, 11, Gender::Male, 20.0, Some(10));
        human_with_id(&mut world, 20, Gender::Male, 40.0, Some(20));
        let kid = human_with_id(&mut world, 30, Gender::Female, 6.0, Some(1));
        if let Some(h) = world.entities.human_mut(kid) {
            h.father_id = Some(EntityId(21));
            h.mother_id = Some(EntityId(11));
        }

        run_succession(&mut world);
        // Parent 11 lives in tribe 10, which is larger than tribe 20 anyway
        assert_eq!(leader_of(&world, kid), Some(EntityId(10)));
    }

    #[test]
    fn test_children_alone_dissolve() {
        let mut world = world();
        let leader = world.spawn_human(Vec2::new(500.0, 500.0), Gender::Male, 40.0);
        world.found_tribe(leader);
        let kid = world.spawn_human(Vec2::new(500.0, 520.0), Gender::Female, 5.0);
        world.join_tribe(kid, leader);
        let storage = world.entities.spawn(
            Vec2::new(520.0, 500.0),
            EntityBody::Building(BuildingEntity::storage(Some(leader))),
        );

        world.remove_entity(leader);
        let events = run_succession(&mut world);

        assert!(events.iter().any(|e| matches!(
            e,
            SimulationEvent::TribeDissolved { leader: l, buildings_marked: 1, .. } if *l == leader
        )));
        assert_eq!(leader_of(&world, kid), None);
        assert_eq!(world.territory.count_owned(leader), 0);
        assert!(world.entities.building(storage).unwrap().marked_for_destruction);
    }

    #[test]
    fn test_memberless_owner_is_dissolved() {
        let mut world = world();
        let leader = world.spawn_human(Vec2::new(500.0, 500.0), Gender::Male, 40.0);
        world.found_tribe(leader);
        assert!(world.territory.count_owned(leader) > 0);

        world.remove_entity(leader);
        run_succession(&mut world);
        assert_eq!(world.territory.count_owned(leader), 0);
    }

    #[test]
    fn test_diplomacy_is_rekeyed_to_successor() {
        let mut world = world();
        let a = world.spawn_human(Vec2::new(500.0, 500.0), Gender::Male, 40.0);
        world.found_tribe(a);
        let heir = world.spawn_human(Vec2::new(500.0, 520.0), Gender::Male, 20.0);
        world.join_tribe(heir, a);
        let b = world.spawn_human(Vec2::new(2000.0, 2000.0), Gender::Male, 40.0);
        world.found_tribe(b);
        if let Some(c) = world
            .entities
            .human_mut(b)
            .and_then(|h| h.tribe_control.as_deref_mut())
        {
            c.diplomacy.insert(a, DiplomacyStatus::Hostile);
        }

        world.remove_entity(a);
        run_succession(&mut world);
        let control = world.entities.human(b).unwrap().tribe_control.as_ref().unwrap();
        assert_eq!(control.stance_towards(heir), DiplomacyStatus::Hostile);
        assert!(!control.diplomacy.contains_key(&a));
    }
}
