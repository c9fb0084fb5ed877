//! Tribe fission
//!
//! A non-heir adult male whose descendant family is a large enough share
//! of the tribe's adults may lead it away. The choreography is persisted
//! on the founder's blackboard as a [`SplitPlan`] and advanced once per
//! maintenance pass:
//!
//! Gathering -> Migrating | Concentrating -> Execute
//!
//! Each phase has a timeout; a failed attempt puts the founder on cooldown.
//! On success the founder leads a new, landless tribe hostile to the old one.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ai::blackboard::keys;
use crate::core::types::{EntityId, GameHours, Gender, Vec2};
use crate::entity::human::HumanEntity;
use crate::entity::store::EntityStore;
use crate::simulation::events::SimulationEvent;
use crate::tribe::control::{DiplomacyStatus, TribeControl, TribeInfo};
use crate::tribe::{tribe_adults, tribe_center, tribe_leaders};
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitPhase {
    /// Family members converge on the founder
    Gathering,
    /// Walking to a fresh site away from the tribe
    Migrating,
    /// Walking to an outlying building of the tribe
    Concentrating,
    /// Arrived; the split happens on the next pass
    Execute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitPlan {
    pub phase: SplitPhase,
    pub parent_leader: EntityId,
    pub started_at: GameHours,
    pub phase_started_at: GameHours,
    pub destination: Option<Vec2>,
    /// Family members expected to follow, founder excluded
    pub family: Vec<EntityId>,
}

/// Whether `founder` is `human`'s father or listed among its ancestors
fn descends_from(human: &HumanEntity, founder: EntityId) -> bool {
    human.father_id == Some(founder)
        || human.mother_id == Some(founder)
        || human.ancestor_ids.contains(&founder)
}

/// Living members of `leader`'s tribe in `founder`'s family
///
/// Descendants plus partners, founder excluded.
fn split_family(store: &EntityStore, leader: EntityId, founder: EntityId) -> Vec<EntityId> {
    let partners = store
        .human(founder)
        .map(|h| h.partner_ids.clone())
        .unwrap_or_default();
    store
        .humans()
        .filter(|(id, h)| {
            *id != founder
                && h.agent.is_alive()
                && h.leader_id == Some(leader)
                && (descends_from(h, founder) || partners.contains(id))
        })
        .map(|(id, _)| id)
        .collect()
}

/// The leader's oldest living adult son in the tribe
pub fn heir_of(store: &EntityStore, leader: EntityId) -> Option<EntityId> {
    store
        .humans()
        .filter(|(_, h)| {
            h.agent.is_alive()
                && h.agent.is_adult
                && h.agent.gender == Gender::Male
                && h.father_id == Some(leader)
                && h.leader_id == Some(leader)
        })
        .max_by(|a, b| {
            a.1.agent
                .age
                .total_cmp(&b.1.agent.age)
                .then(b.0.cmp(&a.0))
        })
        .map(|(id, _)| id)
}

fn has_split_in_progress(store: &EntityStore, leader: EntityId) -> bool {
    store.humans().any(|(_, h)| {
        h.agent
            .blackboard
            .get(&keys::SPLIT_PLAN)
            .is_some_and(|p| p.parent_leader == leader)
    })
}

/// Advance running splits, then look for new founders
pub fn update_splits(world: &mut World) -> Vec<SimulationEvent> {
    let mut events = Vec::new();

    let founders: Vec<EntityId> = world
        .entities
        .humans()
        .filter(|(_, h)| h.agent.blackboard.contains(&keys::SPLIT_PLAN))
        .map(|(id, _)| id)
        .collect();
    for founder in founders {
        advance_split(world, founder, &mut events);
    }

    for leader in tribe_leaders(&world.entities) {
        start_split(world, leader, &mut events);
    }
    events
}

fn start_split(world: &mut World, leader: EntityId, events: &mut Vec<SimulationEvent>) {
    let now = world.clock.now();
    let adults = tribe_adults(&world.entities, leader);
    if adults.len() < world.config.split_min_tribe_adults
        || has_split_in_progress(&world.entities, leader)
    {
        return;
    }
    let heir = heir_of(&world.entities, leader);

    let mut best: Option<(usize, EntityId, Vec<EntityId>)> = None;
    for &candidate in &adults {
        let Some(h) = world.entities.human(candidate) else {
            continue;
        };
        let cooling = h
            .agent
            .blackboard
            .get(&keys::SPLIT_COOLDOWN_UNTIL)
            .is_some_and(|until| now < until);
        if candidate == leader
            || Some(candidate) == heir
            || h.agent.gender != Gender::Male
            || h.player_controlled
            || cooling
        {
            continue;
        }
        let family = split_family(&world.entities, leader, candidate);
        let family_adults = 1 + family
            .iter()
            .filter(|id| world.entities.agent(**id).is_some_and(|a| a.is_adult))
            .count();
        if best.as_ref().map_or(true, |(n, _, _)| family_adults > *n) {
            best = Some((family_adults, candidate, family));
        }
    }

    let Some((family_adults, founder, family)) = best else {
        return;
    };
    let share = family_adults as f32 / adults.len() as f32;
    if share < world.config.split_fraction_threshold {
        return;
    }

    for member in &family {
        if let Some(agent) = world.entities.agent_mut(*member) {
            agent.blackboard.set(&keys::SPLIT_FOLLOWING, founder);
        }
    }
    let plan = SplitPlan {
        phase: SplitPhase::Gathering,
        parent_leader: leader,
        started_at: now,
        phase_started_at: now,
        destination: None,
        family,
    };
    if let Some(agent) = world.entities.agent_mut(founder) {
        agent.blackboard.set(&keys::SPLIT_PLAN, plan);
    }
    tracing::info!(founder = %founder, leader = %leader, share, "split started");
    events.push(SimulationEvent::SplitPhaseChanged {
        founder,
        phase: SplitPhase::Gathering,
    });
}

fn advance_split(world: &mut World, founder: EntityId, events: &mut Vec<SimulationEvent>) {
    let now = world.clock.now();
    let Some(mut plan) = world
        .entities
        .agent(founder)
        .and_then(|a| a.blackboard.get(&keys::SPLIT_PLAN))
    else {
        return;
    };

    let still_member = world
        .entities
        .living_human(founder)
        .is_some_and(|h| h.leader_id == Some(plan.parent_leader));
    let parent_alive = world
        .entities
        .living_human(plan.parent_leader)
        .is_some_and(|h| h.is_leader(plan.parent_leader));
    if !still_member || !parent_alive {
        fail_split(world, founder, &plan, events);
        return;
    }
    let Some(founder_pos) = world.entities.get(founder).map(|e| e.position) else {
        return;
    };
    let elapsed = now - plan.phase_started_at;

    match plan.phase {
        SplitPhase::Gathering => {
            if elapsed > world.config.split_gather_timeout_hours {
                fail_split(world, founder, &plan, events);
                return;
            }
            let living: Vec<EntityId> = plan
                .family
                .iter()
                .copied()
                .filter(|id| world.entities.living_human(*id).is_some())
                .collect();
            let gathered = living
                .iter()
                .filter(|id| {
                    world.entities.get(**id).is_some_and(|e| {
                        world.map.distance(e.position, founder_pos) <= world.config.split_gather_radius
                    })
                })
                .count();
            let needed = (living.len() as f32 * world.config.split_gather_fraction).ceil() as usize;
            if gathered < needed {
                return;
            }
            let (phase, destination) = pick_destination(world, plan.parent_leader, founder_pos);
            plan.phase = phase;
            plan.destination = Some(destination);
            plan.family = living;
        }
        SplitPhase::Migrating | SplitPhase::Concentrating => {
            if elapsed > world.config.split_migration_timeout_hours {
                fail_split(world, founder, &plan, events);
                return;
            }
            let arrived = plan.destination.map_or(true, |d| {
                world.map.distance(founder_pos, d) <= world.config.interaction_range * 2.0
            });
            if !arrived {
                return;
            }
            plan.phase = SplitPhase::Execute;
        }
        SplitPhase::Execute => {
            execute_split(world, founder, &plan, events);
            return;
        }
    }

    plan.phase_started_at = now;
    tracing::debug!(founder = %founder, phase = ?plan.phase, "split phase changed");
    events.push(SimulationEvent::SplitPhaseChanged {
        founder,
        phase: plan.phase,
    });
    if let Some(agent) = world.entities.agent_mut(founder) {
        agent.blackboard.set(&keys::SPLIT_PLAN, plan);
    }
}

/// Concentrate at an outlying tribe building if there is one, else migrate
fn pick_destination(world: &mut World, parent: EntityId, from: Vec2) -> (SplitPhase, Vec2) {
    let far = world.config.split_migration_distance * 0.5;
    if let Some(center) = tribe_center(&world.entities, &world.map, parent) {
        let outpost = world
            .entities
            .iter()
            .filter(|e| {
                e.building()
                    .is_some_and(|b| b.owner_id == Some(parent) && !b.marked_for_destruction)
            })
            .map(|e| (world.map.distance(e.position, center), e.id, e.position))
            .filter(|(d, _, _)| *d >= far)
            .max_by(|a, b| a.0.total_cmp(&b.0).then(b.1.cmp(&a.1)));
        if let Some((_, _, at)) = outpost {
            return (SplitPhase::Concentrating, at);
        }
    }
    let angle = world.rng.gen_range(0.0..std::f32::consts::TAU);
    let offset = Vec2::new(angle.cos(), angle.sin()) * world.config.split_migration_distance;
    (SplitPhase::Migrating, world.map.wrap(from + offset))
}

fn release_followers(world: &mut World, plan: &SplitPlan) {
    for member in &plan.family {
        if let Some(agent) = world.entities.agent_mut(*member) {
            agent.blackboard.delete(&keys::SPLIT_FOLLOWING);
        }
    }
}

fn fail_split(world: &mut World, founder: EntityId, plan: &SplitPlan, events: &mut Vec<SimulationEvent>) {
    release_followers(world, plan);
    let until = world.clock.now() + world.config.split_cooldown_hours;
    if let Some(agent) = world.entities.agent_mut(founder) {
        agent.blackboard.delete(&keys::SPLIT_PLAN);
        agent.blackboard.set(&keys::SPLIT_COOLDOWN_UNTIL, until);
    }
    tracing::info!(founder = %founder, phase = ?plan.phase, "split failed");
    events.push(SimulationEvent::SplitFailed { founder });
}

fn execute_split(world: &mut World, founder: EntityId, plan: &SplitPlan, events: &mut Vec<SimulationEvent>) {
    release_followers(world, plan);
    let parent = plan.parent_leader;
    let Some(founder_pos) = world.entities.get(founder).map(|e| e.position) else {
        return;
    };

    let info = TribeInfo::generate(&mut world.rng);
    let mut control = TribeControl::default();
    control.diplomacy.insert(parent, DiplomacyStatus::Hostile);

    let joining: Vec<EntityId> = plan
        .family
        .iter()
        .copied()
        .filter(|id| {
            world.entities.get(*id).is_some_and(|e| {
                e.human()
                    .is_some_and(|h| h.agent.is_alive() && h.leader_id == Some(parent))
                    && world.map.distance(e.position, founder_pos) <= world.config.split_execute_radius
            })
        })
        .collect();

    if let Some(h) = world.entities.human_mut(founder) {
        h.leader_id = Some(founder);
        h.tribe_control = Some(Box::new(control));
        h.tribe_info = Some(info.clone());
        h.agent.blackboard.delete(&keys::SPLIT_PLAN);
        h.agent.blackboard.delete(&keys::CLAIMED_TASK);
    }
    for member in &joining {
        if let Some(h) = world.entities.human_mut(*member) {
            h.leader_id = Some(founder);
            h.tribe_info = Some(info.clone());
            h.agent.blackboard.delete(&keys::CLAIMED_TASK);
        }
    }
    if let Some(control) = world
        .entities
        .human_mut(parent)
        .and_then(|h| h.tribe_control.as_deref_mut())
    {
        control.diplomacy.insert(founder, DiplomacyStatus::Hostile);
    }

    tracing::info!(
        founder = %founder,
        parent = %parent,
        members = joining.len() + 1,
        badge = %info.badge,
        "tribe split"
    );
    events.push(SimulationEvent::TribeSplit {
        parent_leader: parent,
        founder,
        members: joining.len() + 1,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::tribe::tribe_members;

    /// Leader with an heir, plus a second son whose own family is large
    fn splitting_world() -> (World, EntityId, EntityId, EntityId) {
        let mut config = SimulationConfig::default();
        config.split_min_tribe_adults = 4;
        config.split_fraction_threshold = 0.3;
        let mut world = World::new(config).unwrap();
        let at = Vec2::new(1000.0, 1000.0);

        let leader = world.spawn_human(at, Gender::Male, 55.0);
        world.found_tribe(leader);
        let heir = world.spawn_human(at, Gender::Male, 35.0);
        let founder = world.spawn_human(at, Gender::Male, 30.0);
        for son in [heir, founder] {
            world.join_tribe(son, leader);
            if let Some(h) = world.entities.human_mut(son) {
                h.father_id = Some(leader);
                h.ancestor_ids = vec![leader];
            }
        }
        for _ in 0..2 {
            let grandchild = world.spawn_human(at, Gender::Female, 18.0);
            world.join_tribe(grandchild, leader);
            if let Some(h) = world.entities.human_mut(grandchild) {
                h.father_id = Some(founder);
                h.ancestor_ids = vec![founder, leader];
            }
        }
        (world, leader, heir, founder)
    }

    fn plan_of(world: &World, founder: EntityId) -> Option<SplitPlan> {
        world
            .entities
            .agent(founder)
            .and_then(|a| a.blackboard.get(&keys::SPLIT_PLAN))
    }

    #[test]
    fn test_heir_is_oldest_son() {
        let (world, leader, heir, _) = splitting_world();
        assert_eq!(heir_of(&world.entities, leader), Some(heir));
    }

    #[test]
    fn test_non_heir_with_family_starts_split() {
        let (mut world, leader, heir, founder) = splitting_world();
        let events = update_splits(&mut world);
        assert!(events.contains(&SimulationEvent::SplitPhaseChanged {
            founder,
            phase: SplitPhase::Gathering,
        }));
        let plan = plan_of(&world, founder).unwrap();
        assert_eq!(plan.parent_leader, leader);
        assert_eq!(plan.family.len(), 2);
        assert!(plan_of(&world, heir).is_none());
    }

    #[test]
    fn test_full_choreography_creates_hostile_landless_tribe() {
        let (mut world, leader, _, founder) = splitting_world();
        let cells_before = world.territory.count_owned(leader);

        update_splits(&mut world);
        // Everyone stands together, so gathering completes at once
        update_splits(&mut world);
        let plan = plan_of(&world, founder).unwrap();
        assert!(matches!(plan.phase, SplitPhase::Migrating | SplitPhase::Concentrating));

        // Teleport the family to the destination
        let dest = plan.destination.unwrap();
        for id in std::iter::once(founder).chain(plan.family.iter().copied()) {
            if let Some(e) = world.entities.get_mut(id) {
                e.position = dest;
            }
        }
        update_splits(&mut world);
        assert_eq!(plan_of(&world, founder).unwrap().phase, SplitPhase::Execute);

        let events = update_splits(&mut world);
        assert!(events.iter().any(|e| matches!(
            e,
            SimulationEvent::TribeSplit { founder: f, members: 3, .. } if *f == founder
        )));
        assert_eq!(tribe_members(&world.entities, founder).len(), 3);
        assert_eq!(world.territory.count_owned(founder), 0);
        assert_eq!(world.territory.count_owned(leader), cells_before);

        let stance = |of: EntityId, towards: EntityId| {
            world
                .entities
                .human(of)
                .and_then(|h| h.tribe_control.as_ref())
                .map(|c| c.stance_towards(towards))
        };
        assert_eq!(stance(founder, leader), Some(DiplomacyStatus::Hostile));
        assert_eq!(stance(leader, founder), Some(DiplomacyStatus::Hostile));
    }

    #[test]
    fn test_gathering_timeout_sets_cooldown() {
        let (mut world, _, _, founder) = splitting_world();
        update_splits(&mut world);
        let plan = plan_of(&world, founder).unwrap();
        for id in &plan.family {
            if let Some(e) = world.entities.get_mut(*id) {
                e.position = Vec2::new(2500.0, 2500.0);
            }
        }
        let timeout = world.config.split_gather_timeout_hours;
        world.clock.set_now(timeout + 1.0);

        let events = update_splits(&mut world);
        assert!(events.contains(&SimulationEvent::SplitFailed { founder }));
        assert!(plan_of(&world, founder).is_none());
        let cooldown = world
            .entities
            .agent(founder)
            .and_then(|a| a.blackboard.get(&keys::SPLIT_COOLDOWN_UNTIL));
        assert!(cooldown.is_some_and(|t| t > world.clock.now()));
        assert!(!world
            .entities
            .agent(plan.family[0])
            .unwrap()
            .blackboard
            .contains(&keys::SPLIT_FOLLOWING));
    }

    #[test]
    fn test_small_tribes_never_split() {
        let (mut world, _, _, founder) = splitting_world();
        world.config.split_min_tribe_adults = 10;
        update_splits(&mut world);
        assert!(plan_of(&world, founder).is_none());
    }
}
