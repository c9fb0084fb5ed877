//! Strategic objective and role assignment
//!
//! On its own cooldown a leader looks at the tribe's situation, picks an
//! objective that biases task scoring tribe-wide, and redistributes adult
//! roles to match the objective's role weights.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;

use crate::core::types::EntityId;
use crate::simulation::events::SimulationEvent;
use crate::tribe::control::{DiplomacyStatus, RoleWeights, StrategicObjective, TribeRole};
use crate::tribe::{tribe_adults, tribe_members, tribe_stored_food, tribe_strength};
use crate::world::World;

/// Role mix a leader wants for an objective
pub fn weights_for(objective: StrategicObjective) -> RoleWeights {
    match objective {
        StrategicObjective::None => RoleWeights::default(),
        StrategicObjective::GreatHarvest => RoleWeights {
            gatherer: 0.55,
            builder: 0.15,
            hunter: 0.2,
            guard: 0.1,
        },
        StrategicObjective::Fortify => RoleWeights {
            gatherer: 0.25,
            builder: 0.3,
            hunter: 0.1,
            guard: 0.35,
        },
        StrategicObjective::Expansion => RoleWeights {
            gatherer: 0.3,
            builder: 0.35,
            hunter: 0.2,
            guard: 0.15,
        },
    }
}

/// Pick the objective for `leader`'s tribe from its current state
pub fn choose_objective(world: &World, leader: EntityId) -> StrategicObjective {
    let members = tribe_members(&world.entities, leader).len().max(1);
    let ours = tribe_strength(&world.entities, leader);

    let threatened = world
        .entities
        .human(leader)
        .and_then(|h| h.tribe_control.as_ref())
        .is_some_and(|control| {
            control.diplomacy.iter().any(|(other, status)| {
                *status == DiplomacyStatus::Hostile && tribe_strength(&world.entities, *other) >= ours
            })
        });
    if threatened {
        return StrategicObjective::Fortify;
    }

    let food_per_member = tribe_stored_food(&world.entities, leader) as f32 / members as f32;
    if food_per_member < world.config.hunt_food_per_member {
        return StrategicObjective::GreatHarvest;
    }

    if world.territory.count_owned(leader) < members * 2 {
        return StrategicObjective::Expansion;
    }
    StrategicObjective::None
}

/// Hand out roles so the tribe's mix approaches `weights`
pub fn assign_roles(world: &mut World, leader: EntityId, weights: &RoleWeights) {
    let mut adults = tribe_adults(&world.entities, leader);
    adults.shuffle(&mut world.rng);

    let total = adults.len();
    let mut counts: BTreeMap<TribeRole, usize> = BTreeMap::new();
    for adult in adults {
        let role = weights.most_needed(&counts, total);
        *counts.entry(role).or_insert(0) += 1;
        if let Some(h) = world.entities.human_mut(adult) {
            h.tribe_role = role;
        }
    }
}

pub fn update_strategy(world: &mut World) -> Vec<SimulationEvent> {
    let now = world.clock.now();
    let mut events = Vec::new();

    for leader in crate::tribe::tribe_leaders(&world.entities) {
        let due = world
            .entities
            .human(leader)
            .and_then(|h| h.tribe_control.as_ref())
            .is_some_and(|c| c.next_strategy_at <= now);
        if !due {
            continue;
        }

        let objective = choose_objective(world, leader);
        let weights = weights_for(objective);
        assign_roles(world, leader, &weights);

        let Some(control) = world
            .entities
            .human_mut(leader)
            .and_then(|h| h.tribe_control.as_deref_mut())
        else {
            continue;
        };
        control.next_strategy_at = now + world.config.strategy_interval_hours;
        control.role_weights = weights;
        if control.objective != objective {
            control.objective = objective;
            tracing::info!(leader = %leader, ?objective, "objective changed");
            events.push(SimulationEvent::ObjectiveChanged { leader, objective });
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{Gender, Vec2};
    use crate::entity::human::FoodKind;
    use crate::entity::store::EntityBody;
    use crate::entity::world_objects::BuildingEntity;

    fn tribe(size: usize) -> (World, EntityId) {
        let mut world = World::new(SimulationConfig::default()).unwrap();
        let leader = world.spawn_human(Vec2::new(800.0, 800.0), Gender::Male, 30.0);
        world.found_tribe(leader);
        for _ in 1..size {
            let m = world.spawn_human(Vec2::new(800.0, 820.0), Gender::Female, 25.0);
            world.join_tribe(m, leader);
        }
        (world, leader)
    }

    #[test]
    fn test_empty_stores_call_for_harvest() {
        let (world, leader) = tribe(4);
        assert_eq!(choose_objective(&world, leader), StrategicObjective::GreatHarvest);
    }

    #[test]
    fn test_fed_tribe_with_little_land_expands() {
        let (mut world, leader) = tribe(8);
        let mut storage = BuildingEntity::storage(Some(leader));
        storage.stored_food = vec![FoodKind::Berry; 20];
        world
            .entities
            .spawn(Vec2::new(800.0, 780.0), EntityBody::Building(storage));
        world.territory.clear_owner(leader);
        assert_eq!(choose_objective(&world, leader), StrategicObjective::Expansion);
    }

    #[test]
    fn test_strong_hostile_neighbour_means_fortify() {
        let (mut world, leader) = tribe(2);
        let other = world.spawn_human(Vec2::new(2000.0, 2000.0), Gender::Male, 30.0);
        world.found_tribe(other);
        for _ in 0..4 {
            let m = world.spawn_human(Vec2::new(2000.0, 2000.0), Gender::Male, 30.0);
            world.join_tribe(m, other);
        }
        if let Some(c) = world
            .entities
            .human_mut(leader)
            .and_then(|h| h.tribe_control.as_deref_mut())
        {
            c.diplomacy.insert(other, DiplomacyStatus::Hostile);
        }
        assert_eq!(choose_objective(&world, leader), StrategicObjective::Fortify);
    }

    #[test]
    fn test_roles_follow_weights() {
        let (mut world, leader) = tribe(10);
        let weights = RoleWeights::default();
        assign_roles(&mut world, leader, &weights);

        let mut counts: BTreeMap<TribeRole, usize> = BTreeMap::new();
        for id in tribe_adults(&world.entities, leader) {
            *counts.entry(world.entities.human(id).unwrap().tribe_role).or_insert(0) += 1;
        }
        assert_eq!(counts.get(&TribeRole::Gatherer), Some(&4));
        assert_eq!(counts.get(&TribeRole::Builder), Some(&2));
        assert_eq!(counts.get(&TribeRole::Hunter), Some(&2));
        assert_eq!(counts.get(&TribeRole::Guard), Some(&2));
    }

    #[test]
    fn test_update_is_cooldown_gated() {
        let (mut world, leader) = tribe(3);
        let events = update_strategy(&mut world);
        assert_eq!(
            events,
            vec![SimulationEvent::ObjectiveChanged {
                leader,
                objective: StrategicObjective::GreatHarvest,
            }]
        );
        world.clock.set_now(1.0);
        assert!(update_strategy(&mut world).is_empty());
    }
}
