//! Human entity: the richest agent variant

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::types::{EntityId, Gender};
use crate::entity::agent::AgentState;
use crate::tribe::control::{TribeControl, TribeInfo, TribeRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoodKind {
    Berry,
    Meat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanEntity {
    pub agent: AgentState,
    pub food: Vec<FoodKind>,
    pub wood: u32,

    // Relations are weak references; any of them may point at a dead id.
    pub mother_id: Option<EntityId>,
    pub father_id: Option<EntityId>,
    pub partner_ids: Vec<EntityId>,
    /// The tribe's leader; equal to the human's own id for a leader
    pub leader_id: Option<EntityId>,
    /// Bounded ancestor list, nearest generation first
    pub ancestor_ids: Vec<EntityId>,

    pub tribe_role: TribeRole,
    /// Present on leaders only
    pub tribe_control: Option<Box<TribeControl>>,
    pub tribe_info: Option<TribeInfo>,

    /// 0 = warm, 100 = freezing
    pub coldness: f32,
    pub player_controlled: bool,
}

impl HumanEntity {
    pub fn new(gender: Gender, age: f32, config: &SimulationConfig) -> Self {
        Self {
            agent: AgentState::new(
                gender,
                age,
                config.human_adult_age,
                config.human_max_hitpoints,
            ),
            food: Vec::new(),
            wood: 0,
            mother_id: None,
            father_id: None,
            partner_ids: Vec::new(),
            leader_id: None,
            ancestor_ids: Vec::new(),
            tribe_role: TribeRole::default(),
            tribe_control: None,
            tribe_info: None,
            coldness: 0.0,
            player_controlled: false,
        }
    }

    /// Newborn with parents and ancestry derived from both
    pub fn newborn(
        gender: Gender,
        mother: (EntityId, &HumanEntity),
        father: (EntityId, &HumanEntity),
        config: &SimulationConfig,
    ) -> Self {
        let mut child = Self::new(gender, 0.0, config);
        child.mother_id = Some(mother.0);
        child.father_id = Some(father.0);
        child.leader_id = mother.1.leader_id.or(father.1.leader_id);
        child.tribe_info = mother.1.tribe_info.clone().or_else(|| father.1.tribe_info.clone());
        child.ancestor_ids = merge_ancestors(mother, father, config.max_ancestor_ids);
        child
    }

    pub fn is_leader(&self, own_id: EntityId) -> bool {
        self.leader_id == Some(own_id)
    }

    pub fn has_food_space(&self, config: &SimulationConfig) -> bool {
        self.food.len() < config.max_food_inventory
    }

    pub fn has_wood_space(&self, config: &SimulationConfig) -> bool {
        self.wood < config.max_wood_carried
    }

    pub fn is_cold(&self, config: &SimulationConfig) -> bool {
        self.coldness >= config.cold_seek_threshold
    }

    pub fn is_hungry(&self, config: &SimulationConfig) -> bool {
        self.agent.hunger >= config.hunger_threshold
    }

    pub fn add_partner(&mut self, partner: EntityId) {
        if !self.partner_ids.contains(&partner) {
            self.partner_ids.push(partner);
        }
    }
}

/// Interleave both parents and their ancestors, nearest generation first
fn merge_ancestors(
    mother: (EntityId, &HumanEntity),
    father: (EntityId, &HumanEntity),
    limit: usize,
) -> Vec<EntityId> {
    let mut merged = Vec::with_capacity(limit);
    let push = |id: EntityId, merged: &mut Vec<EntityId>| {
        if merged.len() < limit && !merged.contains(&id) {
            merged.push(id);
        }
    };
    push(mother.0, &mut merged);
    push(father.0, &mut merged);

    let (ma, fa) = (&mother.1.ancestor_ids, &father.1.ancestor_ids);
    for i in 0..ma.len().max(fa.len()) {
        if let Some(id) = ma.get(i) {
            push(*id, &mut merged);
        }
        if let Some(id) = fa.get(i) {
            push(*id, &mut merged);
        }
    }
    merged
}
