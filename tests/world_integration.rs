//! Integration tests for the world loop
//!
//! These tests verify the simulation end-to-end:
//! - Task expiry and producer retraction through maintenance
//! - Torus geometry symmetry
//! - Seeded runs are reproducible
//! - Configuration loading and snapshots

use proptest::prelude::*;

use tribe_sim::core::config::SimulationConfig;
use tribe_sim::core::types::{EntityId, Gender, Vec2};
use tribe_sim::entity::human::FoodKind;
use tribe_sim::entity::store::EntityBody;
use tribe_sim::entity::world_objects::BuildingEntity;
use tribe_sim::simulation::{advance, run_maintenance};
use tribe_sim::spatial::torus::WorldMap;
use tribe_sim::tasks::{Task, TaskKind, TaskTarget};
use tribe_sim::world::World;

// ============================================================================
// Task marketplace
// ============================================================================

#[test]
fn test_expired_task_is_filtered_then_removed() {
    let mut world = World::new(SimulationConfig::default()).unwrap();
    let task = Task::new(
        TaskKind::ClaimTerritory,
        EntityId(42),
        TaskTarget::Position(Vec2::new(10.0, 10.0)),
        Vec2::new(10.0, 10.0),
        1.0,
    );
    let id = task.id.clone();
    world.tasks.upsert(task);

    assert_eq!(world.tasks.eligible(0.5, &TaskKind::ALL).count(), 1);
    assert_eq!(world.tasks.eligible(1.5, &TaskKind::ALL).count(), 0);
    assert!(world.tasks.contains(&id));

    world.clock.set_now(1.5);
    run_maintenance(&mut world);
    assert!(!world.tasks.contains(&id));
}

#[test]
fn test_storage_task_follows_utilization() {
    let mut world = World::new(SimulationConfig::default()).unwrap();
    let leader = world.spawn_human(Vec2::new(500.0, 500.0), Gender::Male, 40.0);
    world.found_tribe(leader);
    let mut storage = BuildingEntity::storage(Some(leader));
    let nearly_full = (world.config.storage_capacity as f32 * 0.9) as usize;
    storage.stored_food = vec![FoodKind::Berry; nearly_full];
    let storage = world
        .entities
        .spawn(Vec2::new(540.0, 500.0), EntityBody::Building(storage));
    world.rebuild_index();

    run_maintenance(&mut world);
    assert_eq!(world.tasks.ids_by_creator(leader, TaskKind::BuildStorage).len(), 1);

    // Food taken out; next pass after the producer interval drops the task
    if let Some(b) = world.entities.building_mut(storage) {
        b.stored_food.truncate(2);
    }
    world.clock.set_now(world.config.producer_interval_hours + 0.1);
    run_maintenance(&mut world);
    assert!(world
        .tasks
        .ids_by_creator(leader, TaskKind::BuildStorage)
        .is_empty());
}

// ============================================================================
// Torus geometry
// ============================================================================

fn point() -> impl Strategy<Value = Vec2> {
    (-5000.0f32..5000.0, -5000.0f32..5000.0).prop_map(|(x, y)| Vec2::new(x, y))
}

proptest! {
    #[test]
    fn prop_torus_distance_is_symmetric(a in point(), b in point()) {
        let map = WorldMap::new(1000.0, 600.0);
        let ab = map.distance(a, b);
        let ba = map.distance(b, a);
        prop_assert!((ab - ba).abs() < 1e-2);

        // Never further than half the map in each axis
        let half_diagonal = (500.0f32 * 500.0 + 300.0 * 300.0).sqrt();
        prop_assert!(ab <= half_diagonal + 1e-2);
    }

    #[test]
    fn prop_wrap_is_idempotent(p in point()) {
        let map = WorldMap::new(1000.0, 600.0);
        let once = map.wrap(p);
        prop_assert!(once.x >= 0.0 && once.x < 1000.0);
        prop_assert!(once.y >= 0.0 && once.y < 600.0);
        prop_assert_eq!(map.wrap(once), once);
    }

    #[test]
    fn prop_step_never_overshoots(a in point(), b in point(), step in 0.0f32..2000.0) {
        let map = WorldMap::new(1000.0, 600.0);
        let before = map.distance(a, b);
        let next = map.step_towards(a, b, step);
        let after = map.distance(next, b);
        prop_assert!(after <= before + 1e-2);
        prop_assert!(after >= (before - step).max(0.0) - 1e-2);
    }
}

// ============================================================================
// Whole runs
// ============================================================================

#[test]
fn test_seeded_runs_are_reproducible() {
    let run = || {
        let mut world = World::generate(SimulationConfig::default(), 2).unwrap();
        let events = advance(&mut world, 10.0);
        let positions: Vec<(EntityId, Vec2)> =
            world.entities.iter().map(|e| (e.id, e.position)).collect();
        (events, positions, world.births, world.deaths)
    };
    assert_eq!(run(), run());
}

#[test]
fn test_generated_world_keeps_living() {
    let mut world = World::generate(SimulationConfig::default(), 3).unwrap();
    let humans = world.living_humans();
    advance(&mut world, 5.0);
    assert!(!world.game_over);
    assert!(world.living_humans() > 0);
    assert!(world.living_humans() <= humans + world.births as usize);
    assert!(world.clock.now() > 0.0);
}

#[test]
fn test_config_overrides_from_toml() {
    let config = SimulationConfig::from_toml_str(
        r#"
        seed = 7
        bonfire_capacity = 1
        map_width = 1200.0
        "#,
    )
    .unwrap();
    assert_eq!(config.seed, 7);
    assert_eq!(config.bonfire_capacity, 1);
    assert_eq!(config.map_width, 1200.0);
    assert_eq!(config.map_height, SimulationConfig::default().map_height);

    assert!(SimulationConfig::from_toml_str("map_width = -1.0").is_err());
    assert!(SimulationConfig::from_toml_str("seed = \"x\"").is_err());
}

#[test]
fn test_snapshot_serializes_world() {
    let world = World::generate(SimulationConfig::default(), 1).unwrap();
    let snapshot = world.snapshot(true);
    assert_eq!(snapshot.entities.len(), world.entities.len());
    assert_eq!(snapshot.tribes.len(), 1);

    let json = snapshot.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["entities"].as_array().is_some_and(|e| !e.is_empty()));
}
