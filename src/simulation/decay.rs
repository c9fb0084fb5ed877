//! Time-based decay: effects, fuel, regrowth, blackboard expiry

use crate::core::types::{EntityId, GameHours};
use crate::entity::agent::AgentState;
use crate::entity::store::EntityBody;
use crate::world::World;

/// Advance passive state by `dt` hours and remove spent entities
///
/// Returns the number of entities removed.
pub fn apply_decay(world: &mut World, dt: GameHours) -> usize {
    let now = world.clock.now();
    let config = &world.config;
    let mut spent: Vec<EntityId> = Vec::new();

    for entity in world.entities.iter_mut() {
        match &mut entity.body {
            EntityBody::Human(h) => decay_agent(&mut h.agent, now, dt),
            EntityBody::Predator(a) | EntityBody::Prey(a) => decay_agent(&mut a.agent, now, dt),
            EntityBody::Building(b) => {
                if b.marked_for_destruction {
                    spent.push(entity.id);
                } else if b.is_burning() {
                    b.fuel = (b.fuel - config.bonfire_burn_rate * dt as f32).max(0.0);
                }
            }
            EntityBody::BerryBush(bush) => {
                if bush.food >= config.bush_max_food {
                    bush.regrow_progress = 0.0;
                    continue;
                }
                bush.regrow_progress += dt;
                while bush.regrow_progress >= config.bush_regrow_hours
                    && bush.food < config.bush_max_food
                {
                    bush.regrow_progress -= config.bush_regrow_hours;
                    bush.food += 1;
                }
            }
            EntityBody::Tree(t) => {
                if t.wood == 0 {
                    spent.push(entity.id);
                }
            }
        }
    }

    for id in &spent {
        world.remove_entity(*id);
    }
    if !spent.is_empty() {
        tracing::debug!(removed = spent.len(), "spent entities removed");
    }
    spent.len()
}

fn decay_agent(agent: &mut AgentState, now: GameHours, dt: GameHours) {
    agent.damage_flash = (agent.damage_flash - dt).max(0.0);
    agent.blackboard.purge_expired(now);
}
