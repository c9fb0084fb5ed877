//! Read-only copy of the world for renderers and inspection tools
//!
//! A snapshot is taken once per rendered frame and never written back.
//! Blackboards are only included on request since they are large.

use serde::Serialize;

use crate::ai::blackboard::Blackboard;
use crate::core::error::Result;
use crate::core::types::{EntityId, GameHours, Vec2};
use crate::entity::agent::ActiveAction;
use crate::entity::store::{Entity, EntityBody, EntityKind};
use crate::tasks::Task;
use crate::tribe::control::{StrategicObjective, TribeRole};
use crate::tribe::territory::TerritoryGrid;
use crate::tribe::{tribe_leaders, tribe_members};
use crate::world::World;

#[derive(Debug, Clone, Serialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hitpoints: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActiveAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<TribeRole>,
    /// Seconds of damage flash left, for the hit effect
    pub damage_flash: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blackboard: Option<Blackboard>,
}

impl EntitySnapshot {
    fn capture(entity: &Entity, include_debug: bool) -> Self {
        let agent = entity.agent();
        let human = entity.human();
        Self {
            id: entity.id,
            kind: entity.kind(),
            position: entity.position,
            hitpoints: agent.map(|a| a.hitpoints),
            action: agent.map(|a| a.active_action),
            leader_id: match &entity.body {
                EntityBody::Human(h) => h.leader_id,
                EntityBody::Building(b) => b.owner_id,
                EntityBody::BerryBush(b) => b.owner_id,
                EntityBody::Predator(_) | EntityBody::Prey(_) | EntityBody::Tree(_) => None,
            },
            role: human.map(|h| h.tribe_role),
            damage_flash: agent.map_or(0.0, |a| a.damage_flash),
            blackboard: agent
                .filter(|_| include_debug)
                .map(|a| a.blackboard.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TribeSnapshot {
    pub leader: EntityId,
    pub badge: String,
    pub color: [u8; 3],
    pub members: usize,
    pub cells: usize,
    pub objective: StrategicObjective,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub time: GameHours,
    pub day: u64,
    pub temperature: f32,
    pub game_over: bool,
    pub entities: Vec<EntitySnapshot>,
    pub tribes: Vec<TribeSnapshot>,
    pub tasks: Vec<Task>,
    pub territory: TerritoryGrid,
}

impl WorldSnapshot {
    pub fn capture(world: &World, include_debug: bool) -> Self {
        let tribes = tribe_leaders(&world.entities)
            .into_iter()
            .filter_map(|leader| {
                let h = world.entities.human(leader)?;
                let info = h.tribe_info.clone().unwrap_or_else(|| crate::tribe::TribeInfo {
                    badge: String::new(),
                    color: [128, 128, 128],
                });
                Some(TribeSnapshot {
                    leader,
                    badge: info.badge,
                    color: info.color,
                    members: tribe_members(&world.entities, leader).len(),
                    cells: world.territory.count_owned(leader),
                    objective: h
                        .tribe_control
                        .as_ref()
                        .map(|c| c.objective)
                        .unwrap_or_default(),
                })
            })
            .collect();

        Self {
            time: world.clock.now(),
            day: world.clock.day(),
            temperature: world.ambient_temperature(),
            game_over: world.game_over,
            entities: world
                .entities
                .iter()
                .map(|e| EntitySnapshot::capture(e, include_debug))
                .collect(),
            tribes,
            tasks: world.tasks.iter().cloned().collect(),
            territory: world.territory.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
