//! Task consumer: the behavior-tree leaf that picks and runs tasks

use std::cmp::Reverse;

use ordered_float::OrderedFloat;

use crate::ai::behavior_tree::NodeStatus;
use crate::ai::blackboard::keys;
use crate::ai::context::BehaviorContext;
use crate::core::types::EntityId;
use crate::tasks::executors::execute;
use crate::tasks::scoring::score;
use crate::tasks::{Task, TaskId, TaskKind};

/// Best eligible task for `agent` among `kinds`
///
/// Ties go to the task that expires first, then to the lower id.
pub fn best_task(ctx: &BehaviorContext<'_>, agent: EntityId, kinds: &[TaskKind]) -> Option<TaskId> {
    best_task_from(ctx, agent, kinds, None)
}

/// Like [`best_task`], restricted to tasks posted by `creator` when given
pub fn best_task_from(
    ctx: &BehaviorContext<'_>,
    agent: EntityId,
    kinds: &[TaskKind],
    creator: Option<EntityId>,
) -> Option<TaskId> {
    ctx.tasks
        .eligible(ctx.now, kinds)
        .filter(|task| creator.map_or(true, |c| task.creator_id == c))
        .filter_map(|task| score(ctx, agent, task).map(|s| (s, task)))
        .filter(|(s, _)| *s >= 0.0)
        .max_by_key(|(s, task)| {
            (
                OrderedFloat(*s),
                Reverse(OrderedFloat(task.valid_until)),
                Reverse(task.id.clone()),
            )
        })
        .map(|(_, task)| task.id.clone())
}

/// The agent's current claim, if it is still worth pursuing
fn current_claim(
    ctx: &BehaviorContext<'_>,
    agent: EntityId,
    kinds: &[TaskKind],
    creator: Option<EntityId>,
) -> Option<TaskId> {
    let claimed = ctx.entities.agent(agent)?.blackboard.get(&keys::CLAIMED_TASK)?;
    let task = ctx.tasks.get(&claimed)?;
    if !task.is_valid(ctx.now)
        || !kinds.contains(&task.kind)
        || creator.is_some_and(|c| task.creator_id != c)
    {
        return None;
    }
    score(ctx, agent, task).map(|_| claimed)
}

fn clear_claim(ctx: &mut BehaviorContext<'_>, agent: EntityId) {
    if let Some(state) = ctx.entities.agent_mut(agent) {
        state.blackboard.delete(&keys::CLAIMED_TASK);
    }
}

/// Continue the current claim or commit to the best task, then run it
pub fn consume_tasks(ctx: &mut BehaviorContext<'_>, agent: EntityId, kinds: &[TaskKind]) -> NodeStatus {
    consume_tasks_from(ctx, agent, kinds, None)
}

/// Consume only tasks posted by `creator`, e.g. a player's own orders
pub fn consume_tasks_from(
    ctx: &mut BehaviorContext<'_>,
    agent: EntityId,
    kinds: &[TaskKind],
    creator: Option<EntityId>,
) -> NodeStatus {
    let chosen = current_claim(ctx, agent, kinds, creator)
        .or_else(|| best_task_from(ctx, agent, kinds, creator));
    let Some(task_id) = chosen else {
        clear_claim(ctx, agent);
        return NodeStatus::Failure;
    };

    let task: Task = match ctx.tasks.get_mut(&task_id) {
        Some(task) => {
            task.claimed_by = Some(agent);
            task.clone()
        }
        None => return NodeStatus::Failure,
    };
    if let Some(state) = ctx.entities.agent_mut(agent) {
        state.blackboard.set(&keys::CLAIMED_TASK, task_id.clone());
    }

    let status = execute(ctx, agent, &task);
    match status {
        NodeStatus::Running => {}
        NodeStatus::Success => {
            if task.kind.is_one_shot() {
                ctx.tasks.retract(&task_id);
            }
            clear_claim(ctx, agent);
        }
        NodeStatus::Failure => {
            clear_claim(ctx, agent);
            if let Some(state) = ctx.entities.agent_mut(agent) {
                state.clear_intent();
            }
        }
    }
    status
}
