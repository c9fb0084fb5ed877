//! Passive entities: buildings, plants and animals' payloads

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::types::EntityId;
use crate::entity::agent::AgentState;
use crate::entity::human::FoodKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    Storage,
    Bonfire,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingEntity {
    pub kind: BuildingKind,
    /// Leader of the owning tribe
    pub owner_id: Option<EntityId>,
    pub stored_food: Vec<FoodKind>,
    pub fuel: f32,
    pub marked_for_destruction: bool,
}

impl BuildingEntity {
    pub fn storage(owner_id: Option<EntityId>) -> Self {
        Self {
            kind: BuildingKind::Storage,
            owner_id,
            stored_food: Vec::new(),
            fuel: 0.0,
            marked_for_destruction: false,
        }
    }

    pub fn bonfire(owner_id: Option<EntityId>, config: &SimulationConfig) -> Self {
        Self {
            kind: BuildingKind::Bonfire,
            owner_id,
            stored_food: Vec::new(),
            fuel: config.bonfire_max_fuel,
            marked_for_destruction: false,
        }
    }

    pub fn is_burning(&self) -> bool {
        self.kind == BuildingKind::Bonfire && self.fuel > 0.0
    }

    /// Fill fraction of a storage, fuel fraction of a bonfire
    pub fn utilization(&self, config: &SimulationConfig) -> f32 {
        match self.kind {
            BuildingKind::Storage => {
                self.stored_food.len() as f32 / config.storage_capacity.max(1) as f32
            }
            BuildingKind::Bonfire => self.fuel / config.bonfire_max_fuel.max(f32::EPSILON),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BerryBushEntity {
    pub food: u32,
    /// Hours accumulated towards the next berry
    pub regrow_progress: f64,
    pub owner_id: Option<EntityId>,
}

impl BerryBushEntity {
    pub fn new(food: u32, owner_id: Option<EntityId>) -> Self {
        Self {
            food,
            regrow_progress: 0.0,
            owner_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEntity {
    pub wood: u32,
}

/// Predator or prey; the species is carried by the entity variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimalEntity {
    pub agent: AgentState,
}
