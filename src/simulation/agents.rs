//! Per-agent pass: vitals, births, one decision and movement
//!
//! Decisions only set intent. Effects between entities wait for the
//! interaction pass so every agent decides against the same world.

use crate::core::config::SimulationConfig;
use crate::core::types::{EntityId, GameHours, Gender};
use crate::entity::agent::{ActiveAction, Target};
use crate::entity::human::HumanEntity;
use crate::entity::store::{EntityBody, EntityKind};
use crate::simulation::climate;
use crate::simulation::events::{DeathCause, SimulationEvent};
use crate::world::World;

/// Children walk slower than adults
const CHILD_SPEED_FACTOR: f32 = 0.7;

/// Life-cycle constants of one agent kind
#[derive(Debug, Clone, Copy)]
pub struct LifeParams {
    pub speed: f32,
    pub adult_age: f32,
    pub max_age: f32,
    pub hunger_rate: f32,
    pub gestation_hours: f64,
    pub procreation_cooldown_hours: f64,
}

impl LifeParams {
    pub fn for_kind(config: &SimulationConfig, kind: EntityKind) -> Option<Self> {
        let params = match kind {
            EntityKind::Human => Self {
                speed: config.human_speed,
                adult_age: config.human_adult_age,
                max_age: config.human_max_age,
                hunger_rate: config.human_hunger_rate,
                gestation_hours: config.human_gestation_hours,
                procreation_cooldown_hours: config.human_procreation_cooldown_hours,
            },
            EntityKind::Prey => Self {
                speed: config.prey_speed,
                adult_age: config.prey_adult_age,
                max_age: config.prey_max_age,
                hunger_rate: config.prey_hunger_rate,
                gestation_hours: config.prey_gestation_hours,
                procreation_cooldown_hours: config.prey_procreation_cooldown_hours,
            },
            EntityKind::Predator => Self {
                speed: config.predator_speed,
                adult_age: config.predator_adult_age,
                max_age: config.predator_max_age,
                hunger_rate: config.predator_hunger_rate,
                gestation_hours: config.predator_gestation_hours,
                procreation_cooldown_hours: config.predator_procreation_cooldown_hours,
            },
            EntityKind::Building | EntityKind::BerryBush | EntityKind::Tree => return None,
        };
        Some(params)
    }
}

pub fn update_agents(world: &mut World, dt: GameHours) -> Vec<SimulationEvent> {
    let mut events = Vec::new();

    for id in world.entities.ids() {
        let Some(kind) = world.entities.kind(id) else {
            continue;
        };
        let Some(params) = LifeParams::for_kind(&world.config, kind) else {
            continue;
        };

        if let Some(cause) = update_vitals(world, id, kind, &params, dt) {
            events.extend(record_death(world, id, cause));
            continue;
        }
        events.extend(deliver_birth(world, id, kind, &params));
        think(world, id, kind);
        move_agent(world, id, &params, dt);
    }
    events
}

/// Ageing, hunger and cold; returns the cause if the agent died
fn update_vitals(
    world: &mut World,
    id: EntityId,
    kind: EntityKind,
    params: &LifeParams,
    dt: GameHours,
) -> Option<DeathCause> {
    let position = world.entities.get(id)?.position;
    let felt = (kind == EntityKind::Human).then(|| {
        let ambient = world.ambient_temperature();
        climate::temperature_at(&world.entities, &world.index, &world.config, position, ambient)
    });

    let config = &world.config;
    let hours = dt as f32;
    let entity = world.entities.get_mut(id)?;

    let mut coldness = 0.0;
    if let (EntityBody::Human(h), Some(felt)) = (&mut entity.body, felt) {
        h.coldness = if felt < config.cold_threshold {
            (h.coldness + config.cold_rate * hours).min(100.0)
        } else {
            (h.coldness - config.warm_rate * hours).max(0.0)
        };
        if h.coldness >= 100.0 {
            h.agent.hitpoints -= config.cold_damage_rate * hours;
        }
        coldness = h.coldness;
    }

    let agent = entity.agent_mut()?;
    agent.age += (dt / config.hours_per_year) as f32;
    if !agent.is_adult && agent.age >= params.adult_age {
        agent.is_adult = true;
    }

    agent.hunger = (agent.hunger + params.hunger_rate * hours).min(100.0);
    let starving = agent.hunger >= 100.0;
    if starving {
        agent.hitpoints -= config.starvation_damage_rate * hours;
    } else if agent.hunger < config.hunger_threshold && coldness < config.cold_seek_threshold {
        agent.hitpoints = (agent.hitpoints + config.hitpoint_regen_rate * hours).min(agent.max_hitpoints);
    }

    if agent.age >= params.max_age {
        return Some(DeathCause::OldAge);
    }
    if !agent.is_alive() {
        return Some(if starving {
            DeathCause::Starvation
        } else {
            DeathCause::Cold
        });
    }
    None
}

/// Remove a dead agent and report it
pub(crate) fn record_death(world: &mut World, id: EntityId, cause: DeathCause) -> Option<SimulationEvent> {
    let entity = world.remove_entity(id)?;
    let kind = entity.kind();
    if kind == EntityKind::Human {
        world.deaths += 1;
        tracing::info!(entity = %id, ?cause, "human died");
    } else {
        tracing::debug!(entity = %id, ?kind, ?cause, "animal died");
    }
    Some(SimulationEvent::Death {
        entity: id,
        kind,
        cause,
    })
}

fn deliver_birth(
    world: &mut World,
    mother: EntityId,
    kind: EntityKind,
    params: &LifeParams,
) -> Option<SimulationEvent> {
    let now = world.clock.now();
    let entity = world.entities.get(mother)?;
    let pregnancy = entity.agent()?.pregnancy?;
    if now - pregnancy.conceived_at < params.gestation_hours {
        return None;
    }
    let position = entity.position;
    let gender = world.random_gender();

    let child = match kind {
        EntityKind::Human => {
            let body = {
                let mother_h = world.entities.human(mother)?;
                // The father may have died during the pregnancy
                let stand_in;
                let father_h = match world.entities.human(pregnancy.father_id) {
                    Some(f) => f,
                    None => {
                        stand_in = HumanEntity::new(Gender::Male, 0.0, &world.config);
                        &stand_in
                    }
                };
                HumanEntity::newborn(
                    gender,
                    (mother, mother_h),
                    (pregnancy.father_id, father_h),
                    &world.config,
                )
            };
            world.births += 1;
            world.entities.spawn(position, EntityBody::Human(Box::new(body)))
        }
        EntityKind::Prey => world.spawn_prey(position, gender, 0.0),
        EntityKind::Predator => world.spawn_predator(position, gender, 0.0),
        EntityKind::Building | EntityKind::BerryBush | EntityKind::Tree => return None,
    };

    if let Some(agent) = world.entities.agent_mut(mother) {
        agent.pregnancy = None;
    }
    tracing::debug!(child = %child, mother = %mother, ?kind, "birth");
    Some(SimulationEvent::Birth {
        child,
        mother,
        kind,
    })
}

/// One behavior tree evaluation
fn think(world: &mut World, id: EntityId, kind: EntityKind) {
    let (brains, mut ctx) = world.brains_and_context();
    if let Some(tree) = brains.for_kind(kind) {
        tree.tick(&mut ctx, id);
    }
}

fn move_agent(world: &mut World, id: EntityId, params: &LifeParams, dt: GameHours) {
    let map = world.map;
    let stop_distance = world.config.interaction_range * 0.5;
    let Some(entity) = world.entities.get(id) else {
        return;
    };
    let Some(agent) = entity.agent() else {
        return;
    };
    if !agent.active_action.moves() {
        return;
    }

    let goal = match agent.target {
        Some(Target::Position(p)) => Some(p),
        Some(Target::Entity(t)) => world.entities.get(t).map(|e| e.position),
        None => return,
    };
    let Some(goal) = goal else {
        // Target vanished; re-plan next tick
        if let Some(agent) = world.entities.agent_mut(id) {
            agent.clear_intent();
        }
        return;
    };

    let mut speed = params.speed;
    if !agent.is_adult {
        speed *= CHILD_SPEED_FACTOR;
    }
    let step = speed * dt as f32;
    let from = entity.position;

    let next = if agent.active_action == ActiveAction::Fleeing {
        map.step_away(from, goal, step)
    } else {
        let d = map.distance(from, goal);
        if d <= stop_distance {
            return;
        }
        map.step_towards(from, goal, step.min(d - stop_distance))
    };
    if let Some(e) = world.entities.get_mut(id) {
        e.position = next;
    }
}
