//! Task producers
//!
//! Each tribe leader periodically inspects the tribe and posts, refreshes
//! or retracts tasks. Every producer is idempotent: a need that still
//! exists refreshes the same task id, a need that resolved retracts it.

use rand::Rng;

use crate::ai::blackboard::keys;
use crate::ai::context::BehaviorContext;
use crate::core::types::{EntityId, GameHours, Vec2};
use crate::entity::store::{EntityBody, EntityKind};
use crate::entity::world_objects::BuildingKind;
use crate::tasks::{Task, TaskId, TaskKind, TaskTarget};
use crate::tribe::control::DiplomacyStatus;
use crate::tribe::{tribe_center, tribe_members, tribe_stored_food};

/// Hunt tasks posted at once
const MAX_HUNT_TASKS: usize = 2;

/// Run the producers for `leader` if its interval has elapsed
pub fn maybe_run_producers(ctx: &mut BehaviorContext<'_>, leader: EntityId) -> bool {
    let last = ctx
        .entities
        .agent(leader)
        .and_then(|a| a.blackboard.get(&keys::LAST_PRODUCER_RUN));
    if last.is_some_and(|t| ctx.now - t < ctx.config.producer_interval_hours) {
        return false;
    }
    run_producers(ctx, leader);
    if let Some(state) = ctx.entities.agent_mut(leader) {
        state.blackboard.set(&keys::LAST_PRODUCER_RUN, ctx.now);
    }
    true
}

/// Inspect the tribe of `leader` and update its tasks; returns tasks posted
pub fn run_producers(ctx: &mut BehaviorContext<'_>, leader: EntityId) -> usize {
    let members = tribe_members(ctx.entities, leader);
    let Some(center) = tribe_center(ctx.entities, ctx.map, leader) else {
        ctx.tasks.prune_creator(leader);
        return 0;
    };
    let valid_until = ctx.now + ctx.config.task_validity_hours;

    // Tasks aimed at entities that no longer exist
    let entities = &*ctx.entities;
    ctx.tasks.retain(|t| {
        t.creator_id != leader || t.target.entity().map_or(true, |id| entities.contains(id))
    });

    let mut posted = 0;
    posted += produce_storage(ctx, leader, center, valid_until);
    posted += produce_bonfire(ctx, leader, center, valid_until);
    posted += produce_refuel(ctx, leader, valid_until);
    posted += produce_planting(ctx, leader, center, members.len(), valid_until);
    posted += produce_gathering(ctx, leader, center, valid_until);
    posted += produce_hunting(ctx, leader, center, members.len(), valid_until);
    posted += produce_defense(ctx, leader, center, valid_until);
    posted += scan_border(ctx, leader, valid_until);

    tracing::debug!(leader = %leader, posted, "producers ran");
    posted
}

/// Non-destroyed buildings of `kind` owned by `leader`
fn owned_buildings(ctx: &BehaviorContext<'_>, leader: EntityId, kind: BuildingKind) -> Vec<(EntityId, Vec2)> {
    ctx.entities
        .iter()
        .filter(|e| {
            e.building().is_some_and(|b| {
                b.kind == kind && b.owner_id == Some(leader) && !b.marked_for_destruction
            })
        })
        .map(|e| (e.id, e.position))
        .collect()
}

fn owned_bush_count(ctx: &BehaviorContext<'_>, leader: EntityId) -> usize {
    ctx.entities
        .iter()
        .filter(|e| e.bush().is_some_and(|b| b.owner_id == Some(leader)))
        .count()
}

/// Food held in the tribe's storages
pub fn stored_food(ctx: &BehaviorContext<'_>, leader: EntityId) -> usize {
    tribe_stored_food(ctx.entities, leader)
}

/// A free spot near `center`, away from other buildings when possible
fn pick_site(ctx: &mut BehaviorContext<'_>, center: Vec2) -> Vec2 {
    let spacing = ctx.config.building_min_spacing.max(1.0);
    let mut fallback = center;
    for attempt in 0..8 {
        let angle = ctx.rng.gen_range(0.0..std::f32::consts::TAU);
        let dist = ctx.rng.gen_range(spacing * 0.5..spacing * 2.5);
        let site = ctx
            .map
            .wrap(center + Vec2::new(angle.cos(), angle.sin()) * dist);
        if attempt == 0 {
            fallback = site;
        }
        let crowded = ctx
            .index
            .by_radius(site, spacing, Some(EntityKind::Building))
            .into_iter()
            .any(|id| ctx.entities.contains(id));
        if !crowded {
            return site;
        }
    }
    fallback
}

/// Post a position task once, or refresh it, keeping its site stable
fn post_site_task(
    ctx: &mut BehaviorContext<'_>,
    kind: TaskKind,
    leader: EntityId,
    center: Vec2,
    valid_until: GameHours,
) -> usize {
    let id = Task::id_for(kind, leader, TaskTarget::Position(center));
    if let Some(task) = ctx.tasks.get_mut(&id) {
        task.valid_until = valid_until;
        return 0;
    }
    let site = pick_site(ctx, center);
    let task = Task::new(kind, leader, TaskTarget::Position(site), site, valid_until);
    usize::from(ctx.tasks.upsert(task))
}

fn retract_kind(ctx: &mut BehaviorContext<'_>, leader: EntityId, kind: TaskKind) {
    for id in ctx.tasks.ids_by_creator(leader, kind) {
        ctx.tasks.retract(&id);
    }
}

fn produce_storage(ctx: &mut BehaviorContext<'_>, leader: EntityId, center: Vec2, valid_until: GameHours) -> usize {
    let storages = owned_buildings(ctx, leader, BuildingKind::Storage);
    let utilization = if storages.is_empty() {
        1.0
    } else {
        let capacity = storages.len() * ctx.config.storage_capacity.max(1);
        stored_food(ctx, leader) as f32 / capacity as f32
    };

    if utilization > ctx.config.storage_utilization_threshold {
        post_site_task(ctx, TaskKind::BuildStorage, leader, center, valid_until)
    } else {
        retract_kind(ctx, leader, TaskKind::BuildStorage);
        0
    }
}

fn produce_bonfire(ctx: &mut BehaviorContext<'_>, leader: EntityId, center: Vec2, valid_until: GameHours) -> usize {
    let watch = ctx.config.tribe_watch_radius;
    let has_fire = owned_buildings(ctx, leader, BuildingKind::Bonfire)
        .iter()
        .any(|(_, pos)| ctx.map.distance(*pos, center) <= watch);
    let cold = ctx.ambient_temperature < ctx.config.cold_threshold;

    if cold && !has_fire {
        post_site_task(ctx, TaskKind::BuildBonfire, leader, center, valid_until)
    } else {
        retract_kind(ctx, leader, TaskKind::BuildBonfire);
        0
    }
}

fn produce_refuel(ctx: &mut BehaviorContext<'_>, leader: EntityId, valid_until: GameHours) -> usize {
    let mut posted = 0;
    for (fire, pos) in owned_buildings(ctx, leader, BuildingKind::Bonfire) {
        let low = ctx
            .entities
            .building(fire)
            .is_some_and(|b| b.utilization(ctx.config) < ctx.config.bonfire_refuel_threshold);
        let task = Task::new(
            TaskKind::FuelBonfire,
            leader,
            TaskTarget::Entity(fire),
            pos,
            valid_until,
        );
        if low {
            posted += usize::from(ctx.tasks.upsert(task));
        } else {
            ctx.tasks.retract(&task.id);
        }
    }
    posted
}

fn produce_planting(
    ctx: &mut BehaviorContext<'_>,
    leader: EntityId,
    center: Vec2,
    members: usize,
    valid_until: GameHours,
) -> usize {
    let wanted = (members as f32 * ctx.config.bushes_per_member_target).ceil() as usize;
    if owned_bush_count(ctx, leader) < wanted {
        post_site_task(ctx, TaskKind::PlantBush, leader, center, valid_until)
    } else {
        retract_kind(ctx, leader, TaskKind::PlantBush);
        0
    }
}

fn produce_gathering(ctx: &mut BehaviorContext<'_>, leader: EntityId, center: Vec2, valid_until: GameHours) -> usize {
    let watch = ctx.config.tribe_watch_radius;
    let mut candidates: Vec<(f32, EntityId, Vec2)> = ctx
        .entities
        .iter()
        .filter_map(|e| {
            let bush = e.bush()?;
            let dist = ctx.map.distance(e.position, center);
            let ours = bush.owner_id == Some(leader);
            let wild_nearby = bush.owner_id.is_none() && dist <= watch;
            (bush.food > 0 && (ours || wild_nearby)).then_some((dist, e.id, e.position))
        })
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    candidates.truncate(ctx.config.max_gather_tasks);

    let keep: Vec<TaskId> = candidates
        .iter()
        .map(|(_, bush, _)| Task::id_for(TaskKind::GatherFood, leader, TaskTarget::Entity(*bush)))
        .collect();
    for id in ctx.tasks.ids_by_creator(leader, TaskKind::GatherFood) {
        if !keep.contains(&id) {
            ctx.tasks.retract(&id);
        }
    }

    let mut posted = 0;
    for (_, bush, pos) in candidates {
        let task = Task::new(TaskKind::GatherFood, leader, TaskTarget::Entity(bush), pos, valid_until);
        posted += usize::from(ctx.tasks.upsert(task));
    }
    posted
}

fn produce_hunting(
    ctx: &mut BehaviorContext<'_>,
    leader: EntityId,
    center: Vec2,
    members: usize,
    valid_until: GameHours,
) -> usize {
    let per_member = stored_food(ctx, leader) as f32 / members.max(1) as f32;
    if per_member >= ctx.config.hunt_food_per_member {
        retract_kind(ctx, leader, TaskKind::HuntPrey);
        return 0;
    }

    let mut prey: Vec<(f32, EntityId, Vec2)> = ctx
        .index
        .by_radius(center, ctx.config.tribe_watch_radius, Some(EntityKind::Prey))
        .into_iter()
        .filter_map(|id| {
            let e = ctx.entities.get(id)?;
            e.agent()
                .filter(|a| a.is_alive())
                .map(|_| (ctx.map.distance(e.position, center), id, e.position))
        })
        .collect();
    prey.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    prey.truncate(MAX_HUNT_TASKS);

    let keep: Vec<TaskId> = prey
        .iter()
        .map(|(_, id, _)| Task::id_for(TaskKind::HuntPrey, leader, TaskTarget::Entity(*id)))
        .collect();
    for id in ctx.tasks.ids_by_creator(leader, TaskKind::HuntPrey) {
        if !keep.contains(&id) {
            ctx.tasks.retract(&id);
        }
    }

    let mut posted = 0;
    for (_, id, pos) in prey {
        let task = Task::new(TaskKind::HuntPrey, leader, TaskTarget::Entity(id), pos, valid_until);
        posted += usize::from(ctx.tasks.upsert(task));
    }
    posted
}

fn produce_defense(ctx: &mut BehaviorContext<'_>, leader: EntityId, center: Vec2, valid_until: GameHours) -> usize {
    let control = ctx
        .entities
        .human(leader)
        .and_then(|h| h.tribe_control.as_deref());

    let intruders: Vec<(EntityId, Vec2)> = ctx
        .index
        .by_radius(center, ctx.config.tribe_watch_radius, None)
        .into_iter()
        .filter_map(|id| {
            let e = ctx.entities.get(id)?;
            if ctx.territory.owner_at(e.position) != Some(leader) {
                return None;
            }
            let hostile = match &e.body {
                EntityBody::Predator(a) => a.agent.is_alive(),
                EntityBody::Human(h) => {
                    h.agent.is_alive()
                        && h.leader_id.is_some_and(|other| {
                            other != leader
                                && control.is_some_and(|c| {
                                    c.stance_towards(other) == DiplomacyStatus::Hostile
                                })
                        })
                }
                EntityBody::Prey(_)
                | EntityBody::Building(_)
                | EntityBody::BerryBush(_)
                | EntityBody::Tree(_) => false,
            };
            hostile.then_some((id, e.position))
        })
        .collect();

    let keep: Vec<TaskId> = intruders
        .iter()
        .map(|(id, _)| Task::id_for(TaskKind::DefendTerritory, leader, TaskTarget::Entity(*id)))
        .collect();
    for id in ctx.tasks.ids_by_creator(leader, TaskKind::DefendTerritory) {
        if !keep.contains(&id) {
            ctx.tasks.retract(&id);
        }
    }

    let mut posted = 0;
    for (id, pos) in intruders {
        let task = Task::new(TaskKind::DefendTerritory, leader, TaskTarget::Entity(id), pos, valid_until);
        posted += usize::from(ctx.tasks.upsert(task));
    }
    posted
}

fn claim_task_id(leader: EntityId, cell: usize) -> TaskId {
    TaskId(format!("{}_{}_cell{}", TaskKind::ClaimTerritory.slug(), leader, cell))
}

/// Amortised frontier scan
///
/// Examines `border_scan_slice` cells per call starting at the cursor kept
/// in the leader's blackboard, posting claim tasks for unowned cells next
/// to the tribe's land.
fn scan_border(ctx: &mut BehaviorContext<'_>, leader: EntityId, valid_until: GameHours) -> usize {
    let total = ctx.territory.len();
    if total == 0 {
        return 0;
    }

    // Cells someone took in the meantime
    let territory = ctx.territory;
    ctx.tasks.retain(|t| {
        t.creator_id != leader
            || t.kind != TaskKind::ClaimTerritory
            || territory.owner_at(t.position).is_none()
    });

    let Some(state) = ctx.entities.agent(leader) else {
        return 0;
    };
    let cursor = state.blackboard.get(&keys::BORDER_SCAN_CURSOR).unwrap_or(0) % total;
    let found_so_far = state.blackboard.get(&keys::BORDER_SCAN_FOUND).unwrap_or(0);

    let mut open = ctx.tasks.ids_by_creator(leader, TaskKind::ClaimTerritory).len();
    let slice = ctx.config.border_scan_slice.min(total);
    let mut found = 0u64;
    let mut posted = 0;

    for step in 0..slice {
        let cell = (cursor + step) % total;
        if territory.owner_of_cell(cell) != Some(leader) {
            continue;
        }
        for neighbor in territory.neighbors(cell) {
            if territory.owner_of_cell(neighbor).is_some() {
                continue;
            }
            found += 1;
            let id = claim_task_id(leader, neighbor);
            if let Some(task) = ctx.tasks.get_mut(&id) {
                task.valid_until = valid_until;
                continue;
            }
            if open >= ctx.config.max_claim_tasks {
                continue;
            }
            let at = territory.cell_center(neighbor);
            let task = Task::new(TaskKind::ClaimTerritory, leader, TaskTarget::Position(at), at, valid_until)
                .with_id(id);
            if ctx.tasks.upsert(task) {
                open += 1;
                posted += 1;
            }
        }
    }

    let next = cursor + slice;
    if let Some(state) = ctx.entities.agent_mut(leader) {
        state.blackboard.set(&keys::BORDER_SCAN_CURSOR, next % total);
        if next >= total {
            tracing::debug!(leader = %leader, frontier = found_so_far + found, "border scan pass complete");
            state.blackboard.set(&keys::BORDER_SCAN_FOUND, 0u64);
        } else {
            state.blackboard.set(&keys::BORDER_SCAN_FOUND, found_so_far + found);
        }
    }
    posted
}
