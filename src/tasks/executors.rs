//! Per-kind task executors
//!
//! Executors only set intent (active action and target). The effect itself
//! happens during interaction resolution once the agent is in range, and
//! the executor notices it on a later tick and reports Success.

use crate::ai::behavior_tree::NodeStatus;
use crate::ai::context::BehaviorContext;
use crate::core::types::{EntityId, Vec2};
use crate::entity::agent::{ActiveAction, Target};
use crate::entity::human::FoodKind;
use crate::entity::store::{Entity, EntityBody, EntityKind};
use crate::entity::world_objects::BuildingKind;
use crate::tasks::{Task, TaskKind, TaskTarget};

/// Run one step of `task` for `agent`
pub fn execute(ctx: &mut BehaviorContext<'_>, agent: EntityId, task: &Task) -> NodeStatus {
    match (task.kind, task.target) {
        (TaskKind::GatherFood, TaskTarget::Entity(bush)) => gather_food(ctx, agent, bush),
        (TaskKind::BuildStorage, TaskTarget::Position(at)) => {
            build(ctx, agent, task.creator_id, BuildingKind::Storage, at)
        }
        (TaskKind::BuildBonfire, TaskTarget::Position(at)) => {
            build(ctx, agent, task.creator_id, BuildingKind::Bonfire, at)
        }
        (TaskKind::FuelBonfire, TaskTarget::Entity(bonfire)) => fuel_bonfire(ctx, agent, bonfire),
        (TaskKind::PlantBush, TaskTarget::Position(at)) => plant_bush(ctx, agent, at),
        (TaskKind::ClaimTerritory, TaskTarget::Position(at)) => {
            claim_territory(ctx, agent, task.creator_id, at)
        }
        (TaskKind::HuntPrey, TaskTarget::Entity(prey)) => attack(ctx, agent, prey, None),
        (TaskKind::DefendTerritory, TaskTarget::Entity(intruder)) => {
            attack(ctx, agent, intruder, Some(task.creator_id))
        }
        _ => NodeStatus::Failure,
    }
}

fn set_intent(ctx: &mut BehaviorContext<'_>, agent: EntityId, action: ActiveAction, target: Target) {
    if let Some(state) = ctx.entities.agent_mut(agent) {
        state.set_intent(action, Some(target));
    }
}

fn gather_food(ctx: &mut BehaviorContext<'_>, agent: EntityId, bush: EntityId) -> NodeStatus {
    let Some(human) = ctx.entities.human(agent) else {
        return NodeStatus::Failure;
    };
    if !human.has_food_space(ctx.config) {
        return NodeStatus::Success;
    }
    let carrying = !human.food.is_empty();
    match ctx.entities.bush(bush) {
        Some(b) if b.food > 0 => {
            set_intent(ctx, agent, ActiveAction::Gathering, Target::Entity(bush));
            NodeStatus::Running
        }
        // Picked clean: done if we got anything out of it
        Some(_) if carrying => NodeStatus::Success,
        _ => NodeStatus::Failure,
    }
}

/// Whether the tribe already has a building of `kind` close to `at`
fn building_near(ctx: &BehaviorContext<'_>, owner: EntityId, kind: BuildingKind, at: Vec2) -> bool {
    ctx.entities.iter().any(|e| {
        e.building().is_some_and(|b| {
            b.kind == kind
                && b.owner_id == Some(owner)
                && !b.marked_for_destruction
                && ctx.map.distance(e.position, at) < ctx.config.interaction_range * 2.0
        })
    })
}

fn build(
    ctx: &mut BehaviorContext<'_>,
    agent: EntityId,
    owner: EntityId,
    kind: BuildingKind,
    at: Vec2,
) -> NodeStatus {
    if building_near(ctx, owner, kind, at) {
        return NodeStatus::Success;
    }
    set_intent(ctx, agent, ActiveAction::Building(kind), Target::Position(at));
    NodeStatus::Running
}

fn fuel_bonfire(ctx: &mut BehaviorContext<'_>, agent: EntityId, bonfire: EntityId) -> NodeStatus {
    let Some(fire) = ctx.entities.building(bonfire) else {
        return NodeStatus::Failure;
    };
    if fire.marked_for_destruction {
        return NodeStatus::Failure;
    }
    if fire.fuel >= ctx.config.bonfire_max_fuel * 0.9 {
        return NodeStatus::Success;
    }
    let Some(human) = ctx.entities.human(agent) else {
        return NodeStatus::Failure;
    };
    let wood = human.wood;
    let has_space = human.has_wood_space(ctx.config);
    let chopping = match (human.agent.active_action, human.agent.target) {
        (ActiveAction::Chopping, Some(Target::Entity(tree))) => Some(tree),
        _ => None,
    };

    // Keep chopping until the arms are full, then carry the load over
    if let Some(tree) = chopping.filter(|_| has_space) {
        if ctx.entities.get(tree).is_some_and(tree_has_wood) {
            return NodeStatus::Running;
        }
    }
    if wood > 0 {
        set_intent(ctx, agent, ActiveAction::Refueling, Target::Entity(bonfire));
        return NodeStatus::Running;
    }

    let Some(position) = ctx.position(agent) else {
        return NodeStatus::Failure;
    };
    let entities = &*ctx.entities;
    let tree = ctx.index.nearest(
        position,
        ctx.config.perception_radius,
        Some(EntityKind::Tree),
        |id| entities.get(id).is_some_and(tree_has_wood),
    );
    match tree {
        Some(tree) => {
            set_intent(ctx, agent, ActiveAction::Chopping, Target::Entity(tree));
            NodeStatus::Running
        }
        None => NodeStatus::Failure,
    }
}

fn tree_has_wood(entity: &Entity) -> bool {
    matches!(&entity.body, EntityBody::Tree(t) if t.wood > 0)
}

fn plant_bush(ctx: &mut BehaviorContext<'_>, agent: EntityId, at: Vec2) -> NodeStatus {
    let planted = ctx
        .index
        .by_radius(at, ctx.config.interaction_range, Some(EntityKind::BerryBush))
        .into_iter()
        .any(|id| ctx.entities.contains(id));
    if planted {
        return NodeStatus::Success;
    }
    let has_seed = ctx
        .entities
        .human(agent)
        .is_some_and(|h| h.food.contains(&FoodKind::Berry));
    if !has_seed {
        return NodeStatus::Failure;
    }
    set_intent(ctx, agent, ActiveAction::Planting, Target::Position(at));
    NodeStatus::Running
}

fn claim_territory(
    ctx: &mut BehaviorContext<'_>,
    agent: EntityId,
    leader: EntityId,
    at: Vec2,
) -> NodeStatus {
    if ctx.territory.owner_at(at) == Some(leader) {
        return NodeStatus::Success;
    }
    set_intent(ctx, agent, ActiveAction::Claiming, Target::Position(at));
    NodeStatus::Running
}

/// Hunt or defend: chase and strike until the target is gone
///
/// A defender stops once the intruder has left the tribe's land.
fn attack(
    ctx: &mut BehaviorContext<'_>,
    agent: EntityId,
    target: EntityId,
    defend_for: Option<EntityId>,
) -> NodeStatus {
    let alive = ctx.entities.agent(target).is_some_and(|a| a.is_alive());
    if !alive {
        return NodeStatus::Success;
    }
    if let Some(leader) = defend_for {
        let inside = ctx
            .position(target)
            .is_some_and(|p| ctx.territory.owner_at(p) == Some(leader));
        if !inside {
            return NodeStatus::Success;
        }
    }
    set_intent(ctx, agent, ActiveAction::Attacking, Target::Entity(target));
    NodeStatus::Running
}
