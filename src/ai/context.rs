//! Evaluation context handed to behavior tree nodes

use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::types::{EntityId, GameHours, Vec2};
use crate::entity::store::EntityStore;
use crate::spatial::index::SpatialIndex;
use crate::spatial::torus::WorldMap;
use crate::tasks::TaskStore;
use crate::tribe::territory::TerritoryGrid;

/// Mutable view of the world for one agent's decision
///
/// The index and territory are read-only snapshots for the tick; the store,
/// the task list and the random source may be mutated by action nodes.
pub struct BehaviorContext<'a> {
    pub entities: &'a mut EntityStore,
    pub index: &'a SpatialIndex,
    pub tasks: &'a mut TaskStore,
    pub territory: &'a TerritoryGrid,
    pub map: &'a WorldMap,
    pub config: &'a SimulationConfig,
    pub rng: &'a mut ChaCha8Rng,
    pub now: GameHours,
    pub ambient_temperature: f32,
}

impl<'a> BehaviorContext<'a> {
    pub fn position(&self, id: EntityId) -> Option<Vec2> {
        self.entities.get(id).map(|e| e.position)
    }

    /// Distance between two live entities, if both still exist
    pub fn distance_between(&self, a: EntityId, b: EntityId) -> Option<f32> {
        let pa = self.position(a)?;
        let pb = self.position(b)?;
        Some(self.map.distance(pa, pb))
    }

    pub fn leader_of(&self, id: EntityId) -> Option<EntityId> {
        self.entities.human(id).and_then(|h| h.leader_id)
    }
}
