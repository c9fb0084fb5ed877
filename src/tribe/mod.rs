//! Social graph: tribes, lineage, succession, diplomacy and territory
//!
//! A tribe is not stored anywhere; it is the set of living humans sharing
//! a `leader_id`, led by the human whose `leader_id` is its own id. The
//! helpers below derive tribe views from the entity store on demand.

pub mod control;
pub mod diplomacy;
pub mod lineage;
pub mod split;
pub mod strategy;
pub mod succession;
pub mod territory;

use std::collections::BTreeSet;

use crate::core::types::{EntityId, Vec2};
use crate::entity::store::EntityStore;
use crate::entity::world_objects::BuildingKind;
use crate::spatial::torus::WorldMap;

pub use control::{DiplomacyStatus, StrategicObjective, TribeControl, TribeInfo, TribeRole};
pub use territory::TerritoryGrid;

/// Living humans whose leader is `leader`, the leader included, in id order
pub fn tribe_members(store: &EntityStore, leader: EntityId) -> Vec<EntityId> {
    store
        .humans()
        .filter(|(_, h)| h.agent.is_alive() && h.leader_id == Some(leader))
        .map(|(id, _)| id)
        .collect()
}

/// Adult members of the tribe of `leader`
pub fn tribe_adults(store: &EntityStore, leader: EntityId) -> Vec<EntityId> {
    store
        .humans()
        .filter(|(_, h)| h.agent.is_alive() && h.agent.is_adult && h.leader_id == Some(leader))
        .map(|(id, _)| id)
        .collect()
}

/// Every living human that leads itself
pub fn tribe_leaders(store: &EntityStore) -> Vec<EntityId> {
    store
        .humans()
        .filter(|(id, h)| h.agent.is_alive() && h.is_leader(*id))
        .map(|(id, _)| id)
        .collect()
}

/// Every leader id referenced by a living human, dead leaders included
pub fn tribe_keys(store: &EntityStore) -> BTreeSet<EntityId> {
    store
        .humans()
        .filter(|(_, h)| h.agent.is_alive())
        .filter_map(|(_, h)| h.leader_id)
        .collect()
}

/// Circular mean of member positions
pub fn tribe_center(store: &EntityStore, map: &WorldMap, leader: EntityId) -> Option<Vec2> {
    let positions: Vec<Vec2> = tribe_members(store, leader)
        .into_iter()
        .filter_map(|id| store.get(id).map(|e| e.position))
        .collect();
    map.centroid(&positions)
}

/// Food held in the non-destroyed storages owned by `leader`
pub fn tribe_stored_food(store: &EntityStore, leader: EntityId) -> usize {
    store
        .iter()
        .filter_map(|e| e.building())
        .filter(|b| {
            b.kind == BuildingKind::Storage && b.owner_id == Some(leader) && !b.marked_for_destruction
        })
        .map(|b| b.stored_food.len())
        .sum()
}

/// Fighting strength: healthy adults count fully, children a little
pub fn tribe_strength(store: &EntityStore, leader: EntityId) -> f32 {
    store
        .humans()
        .filter(|(_, h)| h.agent.is_alive() && h.leader_id == Some(leader))
        .map(|(_, h)| {
            let health = 1.0 - h.agent.health_deficit();
            if h.agent.is_adult {
                health
            } else {
                0.25 * health
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::Gender;
    use crate::entity::human::HumanEntity;
    use crate::entity::store::EntityBody;

    fn spawn(store: &mut EntityStore, leader: Option<u32>, age: f32, x: f32) -> EntityId {
        let config = SimulationConfig::default();
        let mut h = HumanEntity::new(Gender::Male, age, &config);
        h.leader_id = leader.map(EntityId);
        store.spawn(Vec2::new(x, 10.0), EntityBody::Human(Box::new(h)))
    }

    #[test]
    fn test_tribe_views() {
        let mut store = EntityStore::new();
        let leader = spawn(&mut store, Some(1), 30.0, 10.0);
        let adult = spawn(&mut store, Some(1), 20.0, 20.0);
        let child = spawn(&mut store, Some(1), 5.0, 30.0);
        spawn(&mut store, None, 20.0, 40.0);

        assert_eq!(tribe_members(&store, leader), vec![leader, adult, child]);
        assert_eq!(tribe_adults(&store, leader), vec![leader, adult]);
        assert_eq!(tribe_leaders(&store), vec![leader]);
        assert!((tribe_strength(&store, leader) - 2.25).abs() < 1e-5);

        let map = WorldMap::new(1000.0, 1000.0);
        let center = tribe_center(&store, &map, leader).unwrap();
        assert!((center.x - 20.0).abs() < 0.5);
    }

    #[test]
    fn test_tribe_keys_include_dead_leaders() {
        let mut store = EntityStore::new();
        spawn(&mut store, Some(99), 20.0, 0.0);
        assert_eq!(tribe_keys(&store).into_iter().collect::<Vec<_>>(), vec![EntityId(99)]);
        assert!(tribe_leaders(&store).is_empty());
    }
}
