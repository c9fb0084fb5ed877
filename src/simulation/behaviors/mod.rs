//! Behavior trees of every agent kind
//!
//! Leaves here only read the context and set intent; the interaction pass
//! applies the effects. Leaves shared by humans and animals (wandering,
//! courting) live in this module.

pub mod animal;
pub mod human;

use rand::Rng;

use crate::ai::behavior_tree::{NodeSpec, NodeStatus};
use crate::ai::blackboard::keys;
use crate::ai::context::BehaviorContext;
use crate::core::types::{EntityId, Vec2};
use crate::entity::agent::{ActiveAction, Target};
use crate::entity::store::EntityKind;
use crate::tribe::lineage::{are_family, is_lineage};

/// How long a partner search result is reused
const PARTNER_SEARCH_TTL_HOURS: f64 = 0.5;

pub(crate) fn set_intent(ctx: &mut BehaviorContext<'_>, agent: EntityId, action: ActiveAction, target: Option<Target>) {
    if let Some(state) = ctx.entities.agent_mut(agent) {
        state.set_intent(action, target);
    }
}

/// Keep walking to a random nearby point, picking a new one on arrival
pub(crate) fn wander(ctx: &mut BehaviorContext<'_>, agent: EntityId) -> NodeStatus {
    let Some(position) = ctx.position(agent) else {
        return NodeStatus::Failure;
    };
    let current = ctx
        .entities
        .agent(agent)
        .and_then(|a| a.blackboard.get(&keys::WANDER_TARGET));
    let arrived = current.map_or(true, |t| {
        ctx.map.distance(position, t) <= ctx.config.interaction_range
    });

    let destination = match current {
        Some(t) if !arrived => t,
        _ => {
            let angle = ctx.rng.gen_range(0.0..std::f32::consts::TAU);
            let dist = ctx.rng.gen_range(0.0..ctx.config.perception_radius.max(1.0));
            ctx.map
                .wrap(position + Vec2::new(angle.cos(), angle.sin()) * dist)
        }
    };
    if let Some(state) = ctx.entities.agent_mut(agent) {
        state.blackboard.set(&keys::WANDER_TARGET, destination);
        state.set_intent(ActiveAction::Wandering, Some(Target::Position(destination)));
    }
    NodeStatus::Running
}

/// Whether `a` and `b` could conceive together right now
fn compatible(ctx: &BehaviorContext<'_>, a: EntityId, b: EntityId) -> bool {
    if a == b || ctx.entities.kind(a) != ctx.entities.kind(b) {
        return false;
    }
    let (Some(x), Some(y)) = (ctx.entities.agent(a), ctx.entities.agent(b)) else {
        return false;
    };
    x.is_alive() && y.is_alive() && x.gender != y.gender && x.can_procreate(ctx.now) && y.can_procreate(ctx.now)
}

/// Whether two humans may start a family
///
/// Blood relatives never pair up, and a tribe member only pairs inside its
/// own tribe or with someone tribeless.
fn acceptable_human_partner(ctx: &BehaviorContext<'_>, a: EntityId, b: EntityId) -> bool {
    let (Some(x), Some(y)) = (ctx.entities.human(a), ctx.entities.human(b)) else {
        return false;
    };
    if x.partner_ids.contains(&b) {
        return true;
    }
    let same_tribe = match (x.leader_id, y.leader_id) {
        (Some(l), Some(m)) => l == m,
        _ => true,
    };
    same_tribe && !are_family(ctx.entities, a, b) && !is_lineage(ctx.entities, a, b)
}

/// Nearest suitable partner, existing partners first
pub(crate) fn find_partner(ctx: &BehaviorContext<'_>, agent: EntityId) -> Option<EntityId> {
    let position = ctx.position(agent)?;
    let kind = ctx.entities.kind(agent)?;
    let radius = ctx.config.perception_radius;

    if let Some(h) = ctx.entities.human(agent) {
        let known = h.partner_ids.iter().copied().find(|p| {
            compatible(ctx, agent, *p)
                && ctx
                    .position(*p)
                    .is_some_and(|pp| ctx.map.distance(position, pp) <= radius)
        });
        if known.is_some() {
            return known;
        }
    }

    ctx.index.nearest(position, radius, Some(kind), |other| {
        compatible(ctx, agent, other)
            && (kind != EntityKind::Human || acceptable_human_partner(ctx, agent, other))
    })
}

/// Ready, search for a partner (cached), then court it
pub(crate) fn procreation_branch(hunger_limit: f32) -> NodeSpec {
    NodeSpec::sequence(
        "procreate",
        vec![
            NodeSpec::condition("fertile", move |ctx, agent| {
                ctx.entities
                    .agent(agent)
                    .is_some_and(|a| a.can_procreate(ctx.now) && a.hunger < hunger_limit)
            }),
            NodeSpec::caching(
                "partner search",
                PARTNER_SEARCH_TTL_HOURS,
                NodeSpec::action("find partner", |ctx, agent| {
                    let Some(partner) = find_partner(ctx, agent) else {
                        return NodeStatus::Failure;
                    };
                    if let Some(state) = ctx.entities.agent_mut(agent) {
                        state.blackboard.set(&keys::PROCREATION_PARTNER, partner);
                    }
                    NodeStatus::Success
                }),
            ),
            NodeSpec::action("court", |ctx, agent| {
                let partner = ctx
                    .entities
                    .agent(agent)
                    .and_then(|a| a.blackboard.get(&keys::PROCREATION_PARTNER));
                match partner.filter(|p| compatible(ctx, agent, *p)) {
                    Some(p) => {
                        set_intent(ctx, agent, ActiveAction::Procreating, Some(Target::Entity(p)));
                        NodeStatus::Running
                    }
                    None => {
                        if let Some(state) = ctx.entities.agent_mut(agent) {
                            state.blackboard.delete(&keys::PROCREATION_PARTNER);
                        }
                        NodeStatus::Failure
                    }
                }
            }),
        ],
    )
}
