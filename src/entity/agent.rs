//! State shared by every AI-driven entity

use serde::{Deserialize, Serialize};

use crate::ai::blackboard::Blackboard;
use crate::core::types::{EntityId, GameHours, Gender, Vec2};
use crate::entity::world_objects::BuildingKind;

/// What the agent is currently trying to do
///
/// Behaviors only set this (plus [`Target`]); the interaction pass reads it
/// and resolves the effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActiveAction {
    #[default]
    Idle,
    Moving,
    Wandering,
    Fleeing,
    Eating,
    Gathering,
    Depositing,
    Retrieving,
    Chopping,
    Refueling,
    Planting,
    Building(BuildingKind),
    Claiming,
    Attacking,
    Procreating,
    Warming,
    Grazing,
}

impl ActiveAction {
    /// Actions that move the agent towards its target this tick
    pub fn moves(&self) -> bool {
        !matches!(self, ActiveAction::Idle | ActiveAction::Eating)
    }
}

/// Weak reference to what an action is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Entity(EntityId),
    Position(Vec2),
}

impl Target {
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Target::Entity(id) => Some(*id),
            Target::Position(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pregnancy {
    pub father_id: EntityId,
    pub conceived_at: GameHours,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub gender: Gender,
    /// Age in years
    pub age: f32,
    pub is_adult: bool,
    /// 0 = sated, 100 = starving
    pub hunger: f32,
    pub hitpoints: f32,
    pub max_hitpoints: f32,
    pub active_action: ActiveAction,
    pub target: Option<Target>,
    pub blackboard: Blackboard,
    pub pregnancy: Option<Pregnancy>,
    pub procreation_ready_at: GameHours,
    pub attack_ready_at: GameHours,
    pub action_ready_at: GameHours,
    /// Remaining hours of the damage flash effect
    pub damage_flash: f64,
}

impl AgentState {
    pub fn new(gender: Gender, age: f32, adult_age: f32, max_hitpoints: f32) -> Self {
        Self {
            gender,
            age,
            is_adult: age >= adult_age,
            hunger: 0.0,
            hitpoints: max_hitpoints,
            max_hitpoints,
            active_action: ActiveAction::Idle,
            target: None,
            blackboard: Blackboard::new(),
            pregnancy: None,
            procreation_ready_at: 0.0,
            attack_ready_at: 0.0,
            action_ready_at: 0.0,
            damage_flash: 0.0,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.hitpoints > 0.0
    }

    /// 0.0 = full health, 1.0 = dying
    pub fn health_deficit(&self) -> f32 {
        if self.max_hitpoints <= 0.0 {
            return 1.0;
        }
        (1.0 - self.hitpoints / self.max_hitpoints).clamp(0.0, 1.0)
    }

    pub fn set_intent(&mut self, action: ActiveAction, target: Option<Target>) {
        self.active_action = action;
        self.target = target;
    }

    pub fn clear_intent(&mut self) {
        self.active_action = ActiveAction::Idle;
        self.target = None;
    }

    pub fn can_procreate(&self, now: GameHours) -> bool {
        self.is_adult && self.pregnancy.is_none() && now >= self.procreation_ready_at
    }

    pub fn can_act(&self, now: GameHours) -> bool {
        now >= self.action_ready_at
    }

    pub fn can_attack(&self, now: GameHours) -> bool {
        now >= self.attack_ready_at
    }
}
