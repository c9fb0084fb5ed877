//! Task scoring
//!
//! `score = base * role affinity * urgency * objective * distance factor`,
//! or `None` when the agent must not take the task at all.

use crate::ai::context::BehaviorContext;
use crate::core::types::EntityId;
use crate::entity::human::{FoodKind, HumanEntity};
use crate::tasks::{Task, TaskKind, TaskTarget};
use crate::tribe::control::StrategicObjective;

/// A wounded agent above this health deficit will not fight
const WOUNDED_DEFICIT: f32 = 0.5;

fn base_score(kind: TaskKind) -> f32 {
    match kind {
        TaskKind::GatherFood => 1.0,
        TaskKind::BuildStorage => 0.8,
        TaskKind::BuildBonfire => 1.0,
        TaskKind::FuelBonfire => 0.9,
        TaskKind::PlantBush => 0.6,
        TaskKind::ClaimTerritory => 0.5,
        TaskKind::HuntPrey => 0.9,
        TaskKind::DefendTerritory => 1.2,
    }
}

fn urgency(kind: TaskKind, human: &HumanEntity) -> f32 {
    let hunger = human.agent.hunger / 100.0;
    let cold = human.coldness / 100.0;
    match kind {
        TaskKind::GatherFood => 1.0 + hunger,
        TaskKind::HuntPrey => 1.0 + hunger * 0.5,
        TaskKind::BuildBonfire | TaskKind::FuelBonfire => 1.0 + cold,
        TaskKind::DefendTerritory => 1.0 - human.agent.health_deficit(),
        TaskKind::BuildStorage | TaskKind::PlantBush | TaskKind::ClaimTerritory => 1.0,
    }
}

/// Whether the task's target still makes sense for this agent
fn target_is_actionable(ctx: &BehaviorContext<'_>, human: &HumanEntity, task: &Task) -> bool {
    let entities = &*ctx.entities;
    match (task.kind, task.target) {
        (TaskKind::GatherFood, TaskTarget::Entity(bush)) => {
            human.has_food_space(ctx.config) && entities.bush(bush).is_some_and(|b| b.food > 0)
        }
        (TaskKind::FuelBonfire, TaskTarget::Entity(bonfire)) => entities
            .building(bonfire)
            .is_some_and(|b| !b.marked_for_destruction && b.fuel < ctx.config.bonfire_max_fuel),
        (TaskKind::HuntPrey, TaskTarget::Entity(prey)) => {
            human.agent.health_deficit() < WOUNDED_DEFICIT
                && entities.agent(prey).is_some_and(|a| a.is_alive())
        }
        (TaskKind::DefendTerritory, TaskTarget::Entity(intruder)) => {
            human.agent.health_deficit() < WOUNDED_DEFICIT
                && entities.agent(intruder).is_some_and(|a| a.is_alive())
        }
        (TaskKind::PlantBush, _) => human.food.contains(&FoodKind::Berry),
        (TaskKind::BuildStorage | TaskKind::BuildBonfire | TaskKind::ClaimTerritory, _) => true,
        // Entity kinds posted with a position target, or the reverse
        (_, TaskTarget::Entity(id)) => entities.contains(id),
        (_, TaskTarget::Position(_)) => true,
    }
}

/// Score `task` for `agent`; `None` disqualifies
pub fn score(ctx: &BehaviorContext<'_>, agent: EntityId, task: &Task) -> Option<f32> {
    if !task.is_valid(ctx.now) {
        return None;
    }
    let entity = ctx.entities.get(agent)?;
    let human = entity.human()?;
    if !human.agent.is_alive() || !human.agent.is_adult {
        return None;
    }

    // Tribe tasks go to the tribe; player orders go to the one agent
    let for_us = human.leader_id == Some(task.creator_id) || task.creator_id == agent;
    if !for_us {
        return None;
    }

    if !target_is_actionable(ctx, human, task) {
        return None;
    }

    let distance = ctx.map.distance(entity.position, task.position);
    if distance > ctx.config.max_task_distance {
        return None;
    }
    let distance_factor = 1.0 / (1.0 + distance / ctx.config.task_distance_falloff.max(1.0));

    let objective = human
        .leader_id
        .and_then(|leader| ctx.entities.human(leader))
        .and_then(|leader| leader.tribe_control.as_ref())
        .map(|control| control.objective)
        .unwrap_or(StrategicObjective::None);

    let score = base_score(task.kind)
        * human.tribe_role.affinity(task.kind)
        * urgency(task.kind, human)
        * objective.multiplier(task.kind)
        * distance_factor;

    Some(score)
}
