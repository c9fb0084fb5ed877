//! Low-frequency tribe maintenance
//!
//! Runs on its own cadence rather than every sub-step. Order matters:
//! leadership is repaired first so that splits, diplomacy, strategy and
//! producers all see a tribe with a valid leader.

use crate::simulation::events::SimulationEvent;
use crate::tasks::producers::maybe_run_producers;
use crate::tribe::diplomacy::update_diplomacy;
use crate::tribe::split::update_splits;
use crate::tribe::strategy::update_strategy;
use crate::tribe::succession::run_succession;
use crate::tribe::{tribe_keys, tribe_leaders, tribe_members};
use crate::world::World;

pub fn run_maintenance(world: &mut World) -> Vec<SimulationEvent> {
    let now = world.clock.now();
    let mut events = run_succession(world);
    events.extend(update_splits(world));
    events.extend(update_diplomacy(world));
    events.extend(update_strategy(world));

    let leaders = tribe_leaders(&world.entities);
    {
        let mut ctx = world.context();
        for &leader in &leaders {
            maybe_run_producers(&mut ctx, leader);
        }
    }

    // Land can outlive its tribe when a split or merge changed hands mid-pass
    let entities = &world.entities;
    let released = world
        .territory
        .reconcile(|owner| !tribe_members(entities, owner).is_empty());
    let expired = world.tasks.prune_expired(now);

    // Stashes nobody can inherit any more
    let keys = tribe_keys(&world.entities);
    world
        .orphaned_controls
        .retain(|leader, _| keys.contains(leader));

    world.next_maintenance_at = now + world.config.maintenance_interval_hours;
    tracing::debug!(
        tribes = leaders.len(),
        released,
        expired,
        events = events.len(),
        "maintenance pass"
    );
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::ai::blackboard::keys;
    use crate::core::types::{EntityId, Gender, Vec2};
    use crate::tasks::{Task, TaskKind, TaskTarget};

    #[test]
    fn test_maintenance_schedules_next_pass() {
        let mut world = World::new(SimulationConfig::default()).unwrap();
        world.clock.set_now(3.0);
        run_maintenance(&mut world);
        assert_eq!(
            world.next_maintenance_at,
            3.0 + world.config.maintenance_interval_hours
        );
    }

    #[test]
    fn test_expired_tasks_are_removed() {
        let mut world = World::new(SimulationConfig::default()).unwrap();
        world.tasks.upsert(Task::new(
            TaskKind::ClaimTerritory,
            EntityId(99),
            TaskTarget::Position(Vec2::default()),
            Vec2::default(),
            1.0,
        ));
        world.clock.set_now(2.0);
        run_maintenance(&mut world);
        assert!(world.tasks.is_empty());
    }

    #[test]
    fn test_stale_stash_is_dropped() {
        let mut world = World::new(SimulationConfig::default()).unwrap();
        let loner = world.spawn_human(Vec2::new(100.0, 100.0), Gender::Male, 30.0);
        world.found_tribe(loner);
        world.remove_entity(loner);
        assert!(world.orphaned_controls.contains_key(&loner));

        run_maintenance(&mut world);
        assert!(world.orphaned_controls.is_empty());
        assert_eq!(world.territory.count_owned(loner), 0);
    }

    #[test]
    fn test_producers_run_for_each_leader() {
        let mut world = World::new(SimulationConfig::default()).unwrap();
        let leader = world.spawn_human(Vec2::new(500.0, 500.0), Gender::Male, 30.0);
        world.found_tribe(leader);
        world.rebuild_index();
        run_maintenance(&mut world);

        let ran = world
            .entities
            .agent(leader)
            .and_then(|a| a.blackboard.get(&keys::LAST_PRODUCER_RUN));
        assert_eq!(ran, Some(0.0));
    }
}
