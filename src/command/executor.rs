//! Command execution - turns player commands into intents and tasks

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TribeError};
use crate::core::types::{EntityId, Vec2};
use crate::entity::agent::{ActiveAction, Target};
use crate::tasks::{Task, TaskKind, TaskTarget};
use crate::world::World;

/// One order from the player to one human
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerCommand {
    MoveTo { agent: EntityId, to: Vec2 },
    Attack { agent: EntityId, target: EntityId },
    Gather { agent: EntityId, bush: EntityId },
    /// Post a task only this agent will consider
    IssueTask {
        agent: EntityId,
        kind: TaskKind,
        target: TaskTarget,
    },
    /// Hand the agent to the player or back to the AI
    SetControl { agent: EntityId, player_controlled: bool },
}

impl PlayerCommand {
    pub fn agent(&self) -> EntityId {
        match self {
            PlayerCommand::MoveTo { agent, .. }
            | PlayerCommand::Attack { agent, .. }
            | PlayerCommand::Gather { agent, .. }
            | PlayerCommand::IssueTask { agent, .. }
            | PlayerCommand::SetControl { agent, .. } => *agent,
        }
    }
}

/// Executes commands against the world
pub struct CommandExecutor;

impl CommandExecutor {
    /// Apply `command`; fails if the agent or a targeted entity is gone
    pub fn apply(world: &mut World, command: &PlayerCommand) -> Result<()> {
        let agent = command.agent();
        if world.entities.living_human(agent).is_none() {
            return Err(TribeError::EntityNotFound(agent));
        }

        match command {
            PlayerCommand::MoveTo { to, .. } => {
                let to = world.map.wrap(*to);
                set_intent(world, agent, ActiveAction::Moving, Target::Position(to));
            }
            PlayerCommand::Attack { target, .. } => {
                require(world, *target)?;
                set_intent(world, agent, ActiveAction::Attacking, Target::Entity(*target));
            }
            PlayerCommand::Gather { bush, .. } => {
                if world.entities.bush(*bush).is_none() {
                    return Err(TribeError::EntityNotFound(*bush));
                }
                set_intent(world, agent, ActiveAction::Gathering, Target::Entity(*bush));
            }
            PlayerCommand::IssueTask { kind, target, .. } => {
                let position = match target {
                    TaskTarget::Entity(id) => require(world, *id)?,
                    TaskTarget::Position(p) => world.map.wrap(*p),
                };
                let valid_until = world.clock.now() + world.config.task_validity_hours;
                let task = Task::new(*kind, agent, *target, position, valid_until);
                tracing::debug!(agent = %agent, task = %task.id, "player task issued");
                world.tasks.upsert(task);
            }
            PlayerCommand::SetControl {
                player_controlled, ..
            } => {
                if let Some(h) = world.entities.human_mut(agent) {
                    h.player_controlled = *player_controlled;
                    if !*player_controlled {
                        h.agent.clear_intent();
                    }
                }
                // Orders nobody will follow any more; a leader's orders are
                // tribe tasks and stay up
                let leads = world.entities.human(agent).is_some_and(|h| h.is_leader(agent));
                if !*player_controlled && !leads {
                    world.tasks.prune_creator(agent);
                }
            }
        }
        Ok(())
    }
}

/// Apply one player command to the world
pub fn apply_command(world: &mut World, command: &PlayerCommand) -> Result<()> {
    CommandExecutor::apply(world, command)
}

fn require(world: &World, id: EntityId) -> Result<Vec2> {
    world
        .entities
        .get(id)
        .map(|e| e.position)
        .ok_or(TribeError::EntityNotFound(id))
}

fn set_intent(world: &mut World, agent: EntityId, action: ActiveAction, target: Target) {
    if let Some(state) = world.entities.agent_mut(agent) {
        state.set_intent(action, Some(target));
    }
}
