//! The authoritative entity store
//!
//! Everything else (spatial index, tasks, blackboards, relations) refers to
//! entities by [`EntityId`] and resolves through here. Storage is a
//! `BTreeMap` so every iteration is id-ordered and runs are reproducible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Vec2};
use crate::entity::agent::AgentState;
use crate::entity::human::HumanEntity;
use crate::entity::world_objects::{AnimalEntity, BerryBushEntity, BuildingEntity, TreeEntity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Human,
    Predator,
    Prey,
    Building,
    BerryBush,
    Tree,
}

/// Variant payload of an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntityBody {
    Human(Box<HumanEntity>),
    Predator(AnimalEntity),
    Prey(AnimalEntity),
    Building(BuildingEntity),
    BerryBush(BerryBushEntity),
    Tree(TreeEntity),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub position: Vec2,
    pub body: EntityBody,
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match &self.body {
            EntityBody::Human(_) => EntityKind::Human,
            EntityBody::Predator(_) => EntityKind::Predator,
            EntityBody::Prey(_) => EntityKind::Prey,
            EntityBody::Building(_) => EntityKind::Building,
            EntityBody::BerryBush(_) => EntityKind::BerryBush,
            EntityBody::Tree(_) => EntityKind::Tree,
        }
    }

    pub fn agent(&self) -> Option<&AgentState> {
        match &self.body {
            EntityBody::Human(h) => Some(&h.agent),
            EntityBody::Predator(a) | EntityBody::Prey(a) => Some(&a.agent),
            EntityBody::Building(_) | EntityBody::BerryBush(_) | EntityBody::Tree(_) => None,
        }
    }

    pub fn agent_mut(&mut self) -> Option<&mut AgentState> {
        match &mut self.body {
            EntityBody::Human(h) => Some(&mut h.agent),
            EntityBody::Predator(a) | EntityBody::Prey(a) => Some(&mut a.agent),
            EntityBody::Building(_) | EntityBody::BerryBush(_) | EntityBody::Tree(_) => None,
        }
    }

    pub fn human(&self) -> Option<&HumanEntity> {
        match &self.body {
            EntityBody::Human(h) => Some(h.as_ref()),
            _ => None,
        }
    }

    pub fn building(&self) -> Option<&BuildingEntity> {
        match &self.body {
            EntityBody::Building(b) => Some(b),
            _ => None,
        }
    }

    pub fn building_mut(&mut self) -> Option<&mut BuildingEntity> {
        match &mut self.body {
            EntityBody::Building(b) => Some(b),
            _ => None,
        }
    }

    pub fn bush(&self) -> Option<&BerryBushEntity> {
        match &self.body {
            EntityBody::BerryBush(b) => Some(b),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStore {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u32,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        id
    }

    pub fn spawn(&mut self, position: Vec2, body: EntityBody) -> EntityId {
        let id = self.allocate_id();
        self.entities.insert(id, Entity { id, position, body });
        id
    }

    /// Insert under a chosen id; later allocations continue above it
    pub fn spawn_with_id(&mut self, id: EntityId, position: Vec2, body: EntityBody) -> EntityId {
        self.next_id = self.next_id.max(id.0 + 1);
        self.entities.insert(id, Entity { id, position, body });
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> + '_ {
        self.entities.values_mut()
    }

    /// Snapshot of current ids, safe to iterate while mutating the store
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    pub fn kind(&self, id: EntityId) -> Option<EntityKind> {
        self.get(id).map(|e| e.kind())
    }

    pub fn agent(&self, id: EntityId) -> Option<&AgentState> {
        self.get(id).and_then(|e| e.agent())
    }

    pub fn agent_mut(&mut self, id: EntityId) -> Option<&mut AgentState> {
        self.get_mut(id).and_then(|e| e.agent_mut())
    }

    pub fn human(&self, id: EntityId) -> Option<&HumanEntity> {
        self.get(id).and_then(|e| e.human())
    }

    pub fn human_mut(&mut self, id: EntityId) -> Option<&mut HumanEntity> {
        match self.get_mut(id).map(|e| &mut e.body) {
            Some(EntityBody::Human(h)) => Some(h.as_mut()),
            _ => None,
        }
    }

    /// A human that exists and still has hitpoints
    pub fn living_human(&self, id: EntityId) -> Option<&HumanEntity> {
        self.human(id).filter(|h| h.agent.is_alive())
    }

    pub fn building(&self, id: EntityId) -> Option<&BuildingEntity> {
        self.get(id).and_then(|e| e.building())
    }

    pub fn building_mut(&mut self, id: EntityId) -> Option<&mut BuildingEntity> {
        self.get_mut(id).and_then(|e| e.building_mut())
    }

    pub fn bush(&self, id: EntityId) -> Option<&BerryBushEntity> {
        self.get(id).and_then(|e| e.bush())
    }

    pub fn bush_mut(&mut self, id: EntityId) -> Option<&mut BerryBushEntity> {
        match self.get_mut(id).map(|e| &mut e.body) {
            Some(EntityBody::BerryBush(b)) => Some(b),
            _ => None,
        }
    }

    pub fn tree_mut(&mut self, id: EntityId) -> Option<&mut TreeEntity> {
        match self.get_mut(id).map(|e| &mut e.body) {
            Some(EntityBody::Tree(t)) => Some(t),
            _ => None,
        }
    }

    pub fn humans(&self) -> impl Iterator<Item = (EntityId, &HumanEntity)> + '_ {
        self.entities
            .values()
            .filter_map(|e| e.human().map(|h| (e.id, h)))
    }

    pub fn count_kind(&self, kind: EntityKind) -> usize {
        self.entities.values().filter(|e| e.kind() == kind).count()
    }
}
