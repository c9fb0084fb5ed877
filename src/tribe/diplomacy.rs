//! Inter-tribe stance, recomputed on a cooldown
//!
//! Mirror hostility first; otherwise a tribe that clearly dominates
//! another turns hostile; otherwise it is (or returns to) friendly.

use std::collections::BTreeMap;

use crate::core::types::EntityId;
use crate::simulation::events::SimulationEvent;
use crate::tribe::control::DiplomacyStatus;
use crate::tribe::{tribe_leaders, tribe_strength};
use crate::world::World;

/// Stance of `ours` (strength) towards a tribe of strength `theirs`
pub fn decide_stance(
    they_are_hostile: bool,
    ours: f32,
    theirs: f32,
    dominance_ratio: f32,
) -> DiplomacyStatus {
    if they_are_hostile || ours > theirs * dominance_ratio {
        DiplomacyStatus::Hostile
    } else {
        DiplomacyStatus::Friendly
    }
}

pub fn update_diplomacy(world: &mut World) -> Vec<SimulationEvent> {
    let now = world.clock.now();
    let leaders = tribe_leaders(&world.entities);
    let strengths: BTreeMap<EntityId, f32> = leaders
        .iter()
        .map(|id| (*id, tribe_strength(&world.entities, *id)))
        .collect();

    // Snapshot so the outcome does not depend on which leader goes first
    let mut stances: BTreeMap<(EntityId, EntityId), DiplomacyStatus> = BTreeMap::new();
    for &leader in &leaders {
        if let Some(control) = world.entities.human(leader).and_then(|h| h.tribe_control.as_ref()) {
            for (other, status) in &control.diplomacy {
                stances.insert((leader, *other), *status);
            }
        }
    }

    let mut events = Vec::new();
    for &leader in &leaders {
        let Some(control) = world
            .entities
            .human_mut(leader)
            .and_then(|h| h.tribe_control.as_deref_mut())
        else {
            continue;
        };
        if control.next_diplomacy_at > now {
            continue;
        }
        control.next_diplomacy_at = now + world.config.diplomacy_interval_hours;
        control.diplomacy.retain(|other, _| strengths.contains_key(other));

        let ours = strengths.get(&leader).copied().unwrap_or(0.0);
        for &other in &leaders {
            if other == leader {
                continue;
            }
            let they_are_hostile =
                stances.get(&(other, leader)) == Some(&DiplomacyStatus::Hostile);
            let theirs = strengths.get(&other).copied().unwrap_or(0.0);
            let status = decide_stance(they_are_hostile, ours, theirs, world.config.dominance_ratio);

            let previous = control.diplomacy.insert(other, status);
            let changed = previous.unwrap_or_default() != status;
            if changed {
                tracing::info!(leader = %leader, other = %other, ?status, "diplomacy changed");
                events.push(SimulationEvent::DiplomacyChanged {
                    leader,
                    other,
                    status,
                });
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{Gender, Vec2};

    fn stance(world: &World, of: EntityId, towards: EntityId) -> DiplomacyStatus {
        world
            .entities
            .human(of)
            .and_then(|h| h.tribe_control.as_ref())
            .map(|c| c.stance_towards(towards))
            .unwrap_or_default()
    }

    fn tribe_of(world: &mut World, at: Vec2, size: usize) -> EntityId {
        let leader = world.spawn_human(at, Gender::Male, 30.0);
        world.found_tribe(leader);
        for _ in 1..size {
            let m = world.spawn_human(at, Gender::Female, 25.0);
            world.join_tribe(m, leader);
        }
        leader
    }

    #[test]
    fn test_decide_stance() {
        assert_eq!(decide_stance(true, 1.0, 9.0, 1.5), DiplomacyStatus::Hostile);
        assert_eq!(decide_stance(false, 4.0, 2.0, 1.5), DiplomacyStatus::Hostile);
        assert_eq!(decide_stance(false, 3.0, 2.0, 1.5), DiplomacyStatus::Friendly);
    }

    #[test]
    fn test_dominant_tribe_turns_hostile_and_weak_one_mirrors_next_round() {
        let mut world = World::new(SimulationConfig::default()).unwrap();
        let big = tribe_of(&mut world, Vec2::new(500.0, 500.0), 6);
        let small = tribe_of(&mut world, Vec2::new(2000.0, 2000.0), 2);

        let events = update_diplomacy(&mut world);
        assert_eq!(stance(&world, big, small), DiplomacyStatus::Hostile);
        assert_eq!(stance(&world, small, big), DiplomacyStatus::Friendly);
        assert_eq!(events.len(), 1);

        world.clock.set_now(world.config.diplomacy_interval_hours);
        update_diplomacy(&mut world);
        assert_eq!(stance(&world, small, big), DiplomacyStatus::Hostile);
    }

    #[test]
    fn test_cooldown_gates_recomputation() {
        let mut world = World::new(SimulationConfig::default()).unwrap();
        let big = tribe_of(&mut world, Vec2::new(500.0, 500.0), 6);
        let small = tribe_of(&mut world, Vec2::new(2000.0, 2000.0), 2);
        update_diplomacy(&mut world);

        world.clock.set_now(1.0);
        assert!(update_diplomacy(&mut world).is_empty());
        assert_eq!(stance(&world, small, big), DiplomacyStatus::Friendly);
    }

    #[test]
    fn test_dead_tribes_are_forgotten() {
        let mut world = World::new(SimulationConfig::default()).unwrap();
        let big = tribe_of(&mut world, Vec2::new(500.0, 500.0), 6);
        let small = tribe_of(&mut world, Vec2::new(2000.0, 2000.0), 1);
        update_diplomacy(&mut world);
        assert_eq!(stance(&world, big, small), DiplomacyStatus::Hostile);

        world.remove_entity(small);
        world.clock.set_now(world.config.diplomacy_interval_hours);
        update_diplomacy(&mut world);
        let control = world.entities.human(big).unwrap().tribe_control.as_ref().unwrap();
        assert!(control.diplomacy.is_empty());
    }
}
