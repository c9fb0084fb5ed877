//! Predator and prey trees

use crate::ai::behavior_tree::{BehaviorTree, NodeSpec, NodeStatus};
use crate::ai::context::BehaviorContext;
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::EntityId;
use crate::entity::agent::{ActiveAction, Target};
use crate::entity::store::EntityKind;

use super::{procreation_branch, set_intent, wander};

/// Hunger above which predators also hunt humans
const DESPERATE_HUNGER: f32 = 90.0;

fn hunger_of(ctx: &BehaviorContext<'_>, agent: EntityId) -> f32 {
    ctx.entities.agent(agent).map_or(0.0, |a| a.hunger)
}

fn is_living(ctx: &BehaviorContext<'_>, id: EntityId) -> bool {
    ctx.entities.agent(id).is_some_and(|a| a.is_alive())
}

pub fn build_prey_tree(config: &SimulationConfig) -> Result<BehaviorTree> {
    let graze_at = config.hunger_threshold * 0.5;
    let root = NodeSpec::selector(
        "prey",
        vec![
            NodeSpec::action("flee", |ctx, agent| {
                let Some(position) = ctx.position(agent) else {
                    return NodeStatus::Failure;
                };
                let threat = ctx.index.nearest(
                    position,
                    ctx.config.prey_flee_radius,
                    Some(EntityKind::Predator),
                    |id| is_living(ctx, id),
                );
                let Some(threat) = threat else {
                    return NodeStatus::Failure;
                };
                set_intent(ctx, agent, ActiveAction::Fleeing, Some(Target::Entity(threat)));
                NodeStatus::Running
            }),
            NodeSpec::action("graze", move |ctx, agent| {
                if hunger_of(ctx, agent) < graze_at {
                    return NodeStatus::Failure;
                }
                set_intent(ctx, agent, ActiveAction::Grazing, None);
                NodeStatus::Running
            }),
            procreation_branch(config.hunger_threshold),
            NodeSpec::action("wander", wander),
        ],
    );
    BehaviorTree::build("prey", root)
}

/// Whether `victim` is worth chasing for a predator at `hunger`
fn huntable(ctx: &BehaviorContext<'_>, victim: EntityId, hunger: f32) -> bool {
    let edible = match ctx.entities.kind(victim) {
        Some(EntityKind::Prey) => true,
        Some(EntityKind::Human) => hunger >= DESPERATE_HUNGER,
        _ => false,
    };
    edible && is_living(ctx, victim)
}

fn hunt(ctx: &mut BehaviorContext<'_>, agent: EntityId) -> NodeStatus {
    let hunger = hunger_of(ctx, agent);
    let Some(position) = ctx.position(agent) else {
        return NodeStatus::Failure;
    };
    let radius = ctx.config.predator_hunt_radius;

    // Stay on the current chase while it is still in reach
    let current = ctx.entities.agent(agent).and_then(|a| {
        (a.active_action == ActiveAction::Attacking)
            .then_some(a.target)
            .flatten()
            .and_then(|t| t.entity())
    });
    let sticky = current.filter(|victim| {
        huntable(ctx, *victim, hunger)
            && ctx
                .position(*victim)
                .is_some_and(|p| ctx.map.distance(position, p) <= radius)
    });

    let victim = sticky.or_else(|| {
        let prey = ctx
            .index
            .nearest(position, radius, Some(EntityKind::Prey), |id| is_living(ctx, id));
        if prey.is_some() || hunger < DESPERATE_HUNGER {
            return prey;
        }
        ctx.index
            .nearest(position, radius, Some(EntityKind::Human), |id| is_living(ctx, id))
    });
    let Some(victim) = victim else {
        return NodeStatus::Failure;
    };
    set_intent(ctx, agent, ActiveAction::Attacking, Some(Target::Entity(victim)));
    NodeStatus::Running
}

pub fn build_predator_tree(config: &SimulationConfig) -> Result<BehaviorTree> {
    let hunt_at = config.hunger_threshold * 0.5;
    let root = NodeSpec::selector(
        "predator",
        vec![
            NodeSpec::sequence(
                "hunt",
                vec![
                    NodeSpec::condition("hungry", move |ctx, agent| hunger_of(ctx, agent) >= hunt_at),
                    NodeSpec::action("chase", hunt),
                ],
            ),
            procreation_branch(config.hunger_threshold),
            NodeSpec::action("wander", wander),
        ],
    );
    BehaviorTree::build("predator", root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Gender, Vec2};
    use crate::world::World;

    fn world() -> World {
        World::new(SimulationConfig::default()).unwrap()
    }

    fn think(world: &mut World, id: EntityId) {
        world.rebuild_index();
        let kind = world.entities.kind(id).unwrap();
        let (brains, mut ctx) = world.brains_and_context();
        if let Some(tree) = brains.for_kind(kind) {
            tree.tick(&mut ctx, id);
        }
    }

    fn intent(world: &World, id: EntityId) -> (ActiveAction, Option<Target>) {
        let a = world.entities.agent(id).unwrap();
        (a.active_action, a.target)
    }

    #[test]
    fn test_prey_flees_nearby_predator() {
        let mut world = world();
        let deer = world.spawn_prey(Vec2::new(500.0, 500.0), Gender::Female, 5.0);
        let wolf = world.spawn_predator(Vec2::new(560.0, 500.0), Gender::Male, 5.0);
        think(&mut world, deer);
        assert_eq!(intent(&world, deer), (ActiveAction::Fleeing, Some(Target::Entity(wolf))));
    }

    #[test]
    fn test_hungry_prey_grazes() {
        let mut world = world();
        let deer = world.spawn_prey(Vec2::new(500.0, 500.0), Gender::Female, 5.0);
        if let Some(a) = world.entities.agent_mut(deer) {
            a.hunger = 50.0;
        }
        think(&mut world, deer);
        assert_eq!(intent(&world, deer), (ActiveAction::Grazing, None));
    }

    #[test]
    fn test_predator_spares_humans_unless_desperate() {
        let mut world = world();
        let wolf = world.spawn_predator(Vec2::new(500.0, 500.0), Gender::Male, 5.0);
        let human = world.spawn_human(Vec2::new(520.0, 500.0), Gender::Male, 30.0);
        if let Some(a) = world.entities.agent_mut(wolf) {
            a.hunger = 50.0;
        }
        think(&mut world, wolf);
        assert_eq!(intent(&world, wolf).0, ActiveAction::Wandering);

        if let Some(a) = world.entities.agent_mut(wolf) {
            a.hunger = 95.0;
        }
        think(&mut world, wolf);
        assert_eq!(intent(&world, wolf), (ActiveAction::Attacking, Some(Target::Entity(human))));
    }

    #[test]
    fn test_predator_sticks_to_its_chase() {
        let mut world = world();
        let wolf = world.spawn_predator(Vec2::new(500.0, 500.0), Gender::Male, 5.0);
        let far = world.spawn_prey(Vec2::new(700.0, 500.0), Gender::Male, 5.0);
        if let Some(a) = world.entities.agent_mut(wolf) {
            a.hunger = 50.0;
        }
        think(&mut world, wolf);
        assert_eq!(intent(&world, wolf).1, Some(Target::Entity(far)));

        world.spawn_prey(Vec2::new(520.0, 500.0), Gender::Male, 5.0);
        think(&mut world, wolf);
        assert_eq!(intent(&world, wolf).1, Some(Target::Entity(far)));
    }

    #[test]
    fn test_animal_trees_build() {
        let config = SimulationConfig::default();
        assert_eq!(build_prey_tree(&config).unwrap().name(), "prey");
        assert_eq!(build_predator_tree(&config).unwrap().name(), "predator");
    }
}
