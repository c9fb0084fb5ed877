//! Human behavior tree
//!
//! Priority order, first branch that does not fail wins:
//!
//! 1. player orders (player-controlled humans never fall through)
//! 2. retaliation against a recent attacker
//! 3. eating, or fetching food from the tribe's storage
//! 4. warming at a bonfire, coordinated per fire through the leader
//! 5. split duty (founder or follower)
//! 6. depositing a full food inventory
//! 7. procreation
//! 8. tribe tasks
//! 9. wandering

use crate::ai::behavior_tree::{BehaviorTree, NodeSpec, NodeStatus};
use crate::ai::blackboard::keys;
use crate::ai::context::BehaviorContext;
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::EntityId;
use crate::entity::agent::{ActiveAction, Target};
use crate::entity::store::EntityKind;
use crate::entity::world_objects::BuildingKind;
use crate::spatial::index::PropertyKey;
use crate::tasks::consumer::{consume_tasks, consume_tasks_from};
use crate::tasks::TaskKind;
use crate::tribe::split::SplitPhase;

use super::{procreation_branch, set_intent, wander};

pub const WARMTH_TASK: &str = "warmth";

pub fn build_human_tree(config: &SimulationConfig) -> Result<BehaviorTree> {
    let root = NodeSpec::selector(
        "human",
        vec![
            player_branch(),
            retaliation_branch(),
            hunger_branch(),
            warmth_branch(config),
            split_branch(),
            deposit_branch(),
            NodeSpec::sequence(
                "family",
                vec![
                    NodeSpec::condition("warm enough", |ctx, agent| {
                        ctx.entities
                            .human(agent)
                            .is_some_and(|h| !h.is_cold(ctx.config))
                    }),
                    procreation_branch(config.hunger_threshold),
                ],
            ),
            NodeSpec::action("tribe tasks", |ctx, agent| {
                consume_tasks(ctx, agent, &TaskKind::ALL)
            }),
            NodeSpec::action("wander", wander),
        ],
    );
    BehaviorTree::build("human", root)
}

fn player_branch() -> NodeSpec {
    NodeSpec::sequence(
        "player",
        vec![
            NodeSpec::condition("player controlled", |ctx, agent| {
                ctx.entities.human(agent).is_some_and(|h| h.player_controlled)
            }),
            NodeSpec::action("player orders", |ctx, agent| {
                // Orders issued as tasks run through the marketplace; direct
                // orders are already the agent's intent and are kept as is.
                consume_tasks_from(ctx, agent, &TaskKind::ALL, Some(agent));
                NodeStatus::Running
            }),
        ],
    )
}

fn recent_attacker(ctx: &BehaviorContext<'_>, agent: EntityId) -> Option<EntityId> {
    let attacker = ctx
        .entities
        .agent(agent)?
        .blackboard
        .get_fresh(&keys::LAST_ATTACKER, ctx.now)?;
    let alive = ctx.entities.agent(attacker).is_some_and(|a| a.is_alive());
    let near = ctx
        .distance_between(agent, attacker)
        .is_some_and(|d| d <= ctx.config.perception_radius);
    (alive && near).then_some(attacker)
}

fn retaliation_branch() -> NodeSpec {
    NodeSpec::action("retaliate", |ctx, agent| {
        let Some(attacker) = recent_attacker(ctx, agent) else {
            return NodeStatus::Failure;
        };
        let adult = ctx.entities.agent(agent).is_some_and(|a| a.is_adult);
        let action = if adult {
            ActiveAction::Attacking
        } else {
            ActiveAction::Fleeing
        };
        set_intent(ctx, agent, action, Some(Target::Entity(attacker)));
        NodeStatus::Running
    })
}

/// Nearest intact storage of the agent's tribe accepted by `accept`
fn nearest_tribe_storage(
    ctx: &BehaviorContext<'_>,
    agent: EntityId,
    accept: impl Fn(usize) -> bool,
) -> Option<EntityId> {
    let leader = ctx.leader_of(agent)?;
    let position = ctx.position(agent)?;
    ctx.index
        .by_property(PropertyKey::Owner, leader)
        .iter()
        .copied()
        .filter(|id| {
            ctx.entities.building(*id).is_some_and(|b| {
                b.kind == BuildingKind::Storage
                    && !b.marked_for_destruction
                    && accept(b.stored_food.len())
            })
        })
        .filter_map(|id| ctx.position(id).map(|p| (ctx.map.distance_sq(position, p), id)))
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        .map(|(_, id)| id)
}

fn hunger_branch() -> NodeSpec {
    NodeSpec::sequence(
        "hunger",
        vec![
            NodeSpec::condition("hungry", |ctx, agent| {
                ctx.entities.human(agent).is_some_and(|h| h.is_hungry(ctx.config))
            }),
            NodeSpec::selector(
                "find food",
                vec![
                    NodeSpec::action("eat", |ctx, agent| {
                        let carrying = ctx.entities.human(agent).is_some_and(|h| !h.food.is_empty());
                        if !carrying {
                            return NodeStatus::Failure;
                        }
                        set_intent(ctx, agent, ActiveAction::Eating, None);
                        NodeStatus::Running
                    }),
                    NodeSpec::action("fetch food", |ctx, agent| {
                        let Some(storage) = nearest_tribe_storage(ctx, agent, |stored| stored > 0) else {
                            return NodeStatus::Failure;
                        };
                        set_intent(ctx, agent, ActiveAction::Retrieving, Some(Target::Entity(storage)));
                        NodeStatus::Running
                    }),
                ],
            ),
        ],
    )
}

/// Nearest burning bonfire within perception
pub(crate) fn nearest_fire(ctx: &BehaviorContext<'_>, agent: EntityId) -> Option<EntityId> {
    let position = ctx.position(agent)?;
    ctx.index.nearest(
        position,
        ctx.config.perception_radius,
        Some(EntityKind::Building),
        |id| ctx.entities.building(id).is_some_and(|b| b.is_burning()),
    )
}

fn warmth_branch(config: &SimulationConfig) -> NodeSpec {
    NodeSpec::sequence(
        "warmth",
        vec![
            NodeSpec::condition("cold", |ctx, agent| {
                ctx.entities.human(agent).is_some_and(|h| {
                    h.is_cold(ctx.config) || h.agent.active_action == ActiveAction::Warming
                })
            }),
            NodeSpec::tribal_task(
                "share fire",
                WARMTH_TASK,
                nearest_fire,
                config.bonfire_capacity,
                config.warmth_timeout_hours,
                NodeSpec::action("go warm", |ctx, agent| {
                    let warm = ctx.entities.human(agent).map_or(true, |h| h.coldness <= 0.0);
                    if warm {
                        if let Some(state) = ctx.entities.agent_mut(agent) {
                            state.clear_intent();
                        }
                        return NodeStatus::Success;
                    }
                    let Some(fire) = nearest_fire(ctx, agent) else {
                        return NodeStatus::Failure;
                    };
                    set_intent(ctx, agent, ActiveAction::Warming, Some(Target::Entity(fire)));
                    NodeStatus::Running
                }),
            ),
        ],
    )
}

fn split_branch() -> NodeSpec {
    NodeSpec::selector(
        "split duty",
        vec![
            NodeSpec::action("lead split", |ctx, agent| {
                let Some(plan) = ctx
                    .entities
                    .agent(agent)
                    .and_then(|a| a.blackboard.get(&keys::SPLIT_PLAN))
                else {
                    return NodeStatus::Failure;
                };
                match (plan.phase, plan.destination) {
                    (SplitPhase::Migrating | SplitPhase::Concentrating, Some(to)) => {
                        set_intent(ctx, agent, ActiveAction::Moving, Some(Target::Position(to)));
                    }
                    _ => set_intent(ctx, agent, ActiveAction::Idle, None),
                }
                NodeStatus::Running
            }),
            NodeSpec::action("follow split", |ctx, agent| {
                let Some(founder) = ctx
                    .entities
                    .agent(agent)
                    .and_then(|a| a.blackboard.get(&keys::SPLIT_FOLLOWING))
                else {
                    return NodeStatus::Failure;
                };
                let leading = ctx.entities.living_human(founder).is_some_and(|h| {
                    h.agent.blackboard.contains(&keys::SPLIT_PLAN)
                });
                if !leading {
                    if let Some(state) = ctx.entities.agent_mut(agent) {
                        state.blackboard.delete(&keys::SPLIT_FOLLOWING);
                    }
                    return NodeStatus::Failure;
                }
                set_intent(ctx, agent, ActiveAction::Moving, Some(Target::Entity(founder)));
                NodeStatus::Running
            }),
        ],
    )
}

fn deposit_branch() -> NodeSpec {
    NodeSpec::action("deposit", |ctx, agent| {
        let Some(h) = ctx.entities.human(agent) else {
            return NodeStatus::Failure;
        };
        let wants = !h.food.is_empty()
            && (!h.has_food_space(ctx.config) || h.agent.active_action == ActiveAction::Depositing);
        if !wants {
            return NodeStatus::Failure;
        }
        let capacity = ctx.config.storage_capacity;
        let Some(storage) = nearest_tribe_storage(ctx, agent, |stored| stored < capacity) else {
            return NodeStatus::Failure;
        };
        set_intent(ctx, agent, ActiveAction::Depositing, Some(Target::Entity(storage)));
        NodeStatus::Running
    })
}
