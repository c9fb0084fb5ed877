//! Interaction resolution
//!
//! Turns the intents set during the agent pass into effects between
//! entities. Every weak reference is re-resolved through the store before
//! use, so a target that died earlier in the pass is simply skipped.
//! Combat damage is buffered and applied at the end, which makes a fight
//! between two agents independent of which one is processed first.
//!
//! Range checks read positions from the store, after the movement step,
//! not from the spatial index built at the start of the sub-step. Nothing
//! moves during this pass, so those positions form the snapshot every
//! interaction is resolved against.

use crate::ai::blackboard::keys;
use crate::core::types::{EntityId, GameHours, Gender, Vec2};
use crate::entity::agent::{ActiveAction, Pregnancy, Target};
use crate::entity::human::FoodKind;
use crate::entity::store::{EntityBody, EntityKind};
use crate::entity::world_objects::{BerryBushEntity, BuildingEntity, BuildingKind};
use crate::simulation::agents::{record_death, LifeParams};
use crate::simulation::events::{DeathCause, SimulationEvent};
use crate::world::World;

/// How long a victim remembers who hit it
const ATTACKER_MEMORY_HOURS: f64 = 1.0;

/// A strike waiting to be applied
#[derive(Debug, Clone, Copy)]
struct Hit {
    attacker: EntityId,
    victim: EntityId,
    damage: f32,
}

/// Intent of one agent as read at the start of its resolution
#[derive(Debug, Clone, Copy)]
struct Intent {
    kind: EntityKind,
    action: ActiveAction,
    target: Option<Target>,
    position: Vec2,
}

pub fn resolve_interactions(world: &mut World) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    let mut hits = Vec::new();

    for id in world.entities.ids() {
        let Some(intent) = intent_of(world, id) else {
            continue;
        };
        // Self-targeted actions need no range check
        match intent.action {
            ActiveAction::Grazing => {
                graze(world, id);
                continue;
            }
            ActiveAction::Eating => {
                eat(world, id);
                continue;
            }
            _ => {}
        }
        let Some((target_pos, target_id)) = resolve_target(world, intent.target) else {
            continue;
        };
        if world.map.distance(intent.position, target_pos) > world.config.interaction_range {
            continue;
        }

        match (intent.action, target_id) {
            (ActiveAction::Gathering, Some(bush)) => gather(world, id, bush),
            (ActiveAction::Depositing, Some(storage)) => deposit(world, id, storage),
            (ActiveAction::Retrieving, Some(storage)) => retrieve(world, id, storage),
            (ActiveAction::Chopping, Some(tree)) => chop(world, id, tree),
            (ActiveAction::Refueling, Some(bonfire)) => refuel(world, id, bonfire),
            (ActiveAction::Planting, None) => events.extend(plant(world, id, target_pos)),
            (ActiveAction::Building(kind), None) => events.extend(build(world, id, kind, target_pos)),
            (ActiveAction::Claiming, None) => claim(world, id, target_pos),
            (ActiveAction::Attacking, Some(victim)) => {
                hits.extend(strike(world, id, intent.kind, victim));
            }
            (ActiveAction::Procreating, Some(partner)) => procreate(world, id, intent.kind, partner),
            _ => {}
        }
    }

    events.extend(apply_hits(world, hits));
    events
}

fn intent_of(world: &World, id: EntityId) -> Option<Intent> {
    let entity = world.entities.get(id)?;
    let agent = entity.agent()?;
    if !agent.is_alive() {
        return None;
    }
    Some(Intent {
        kind: entity.kind(),
        action: agent.active_action,
        target: agent.target,
        position: entity.position,
    })
}

/// Position of the target and, for entity targets, its id
fn resolve_target(world: &World, target: Option<Target>) -> Option<(Vec2, Option<EntityId>)> {
    match target? {
        Target::Position(p) => Some((p, None)),
        Target::Entity(id) => world.entities.get(id).map(|e| (e.position, Some(id))),
    }
}

/// Marks an agent as busy until its action cooldown elapses
fn ready_to_act(world: &mut World, id: EntityId) -> bool {
    let now = world.clock.now();
    let cooldown = world.config.action_cooldown_hours;
    match world.entities.agent_mut(id) {
        Some(agent) if agent.can_act(now) => {
            agent.action_ready_at = now + cooldown;
            true
        }
        _ => false,
    }
}

fn eat(world: &mut World, id: EntityId) {
    let reduction = world.config.food_hunger_reduction;
    let has_food = world
        .entities
        .human(id)
        .is_some_and(|h| !h.food.is_empty() && h.agent.hunger > 0.0);
    if !has_food || !ready_to_act(world, id) {
        return;
    }
    if let Some(h) = world.entities.human_mut(id) {
        if h.food.pop().is_some() {
            h.agent.hunger = (h.agent.hunger - reduction).max(0.0);
        }
    }
}

fn graze(world: &mut World, id: EntityId) {
    if world.entities.kind(id) != Some(EntityKind::Prey) || !ready_to_act(world, id) {
        return;
    }
    let reduction = world.config.food_hunger_reduction;
    if let Some(agent) = world.entities.agent_mut(id) {
        agent.hunger = (agent.hunger - reduction).max(0.0);
    }
}

fn gather(world: &mut World, id: EntityId, bush: EntityId) {
    let has_space = world
        .entities
        .human(id)
        .is_some_and(|h| h.has_food_space(&world.config));
    let has_food = world.entities.bush(bush).is_some_and(|b| b.food > 0);
    if !has_space || !has_food || !ready_to_act(world, id) {
        return;
    }
    if let Some(b) = world.entities.bush_mut(bush) {
        b.food -= 1;
    }
    if let Some(h) = world.entities.human_mut(id) {
        h.food.push(FoodKind::Berry);
    }
}

/// Whether `building` is an intact building of `kind` belonging to `id`'s tribe
fn tribe_building(world: &World, id: EntityId, building: EntityId, kind: BuildingKind) -> bool {
    let leader = world.entities.human(id).and_then(|h| h.leader_id);
    world.entities.building(building).is_some_and(|b| {
        b.kind == kind && !b.marked_for_destruction && leader.is_some() && b.owner_id == leader
    })
}

fn deposit(world: &mut World, id: EntityId, storage: EntityId) {
    if !tribe_building(world, id, storage, BuildingKind::Storage) {
        return;
    }
    let capacity = world.config.storage_capacity;
    let room = world
        .entities
        .building(storage)
        .map_or(0, |b| capacity.saturating_sub(b.stored_food.len()));
    let moved: Vec<FoodKind> = match world.entities.human_mut(id) {
        Some(h) => {
            let n = room.min(h.food.len());
            let keep = h.food.len() - n;
            h.food.split_off(keep)
        }
        None => return,
    };
    if let Some(b) = world.entities.building_mut(storage) {
        b.stored_food.extend(moved);
    }
}

fn retrieve(world: &mut World, id: EntityId, storage: EntityId) {
    if !tribe_building(world, id, storage, BuildingKind::Storage) {
        return;
    }
    let has_space = world
        .entities
        .human(id)
        .is_some_and(|h| h.has_food_space(&world.config));
    if !has_space || !ready_to_act(world, id) {
        return;
    }
    let item = world
        .entities
        .building_mut(storage)
        .and_then(|b| b.stored_food.pop());
    if let (Some(item), Some(h)) = (item, world.entities.human_mut(id)) {
        h.food.push(item);
    }
}

fn chop(world: &mut World, id: EntityId, tree: EntityId) {
    let has_space = world
        .entities
        .human(id)
        .is_some_and(|h| h.has_wood_space(&world.config));
    let has_wood = world
        .entities
        .get(tree)
        .is_some_and(|e| matches!(&e.body, EntityBody::Tree(t) if t.wood > 0));
    if !has_space || !has_wood || !ready_to_act(world, id) {
        return;
    }
    if let Some(t) = world.entities.tree_mut(tree) {
        t.wood -= 1;
    }
    if let Some(h) = world.entities.human_mut(id) {
        h.wood += 1;
    }
}

fn refuel(world: &mut World, id: EntityId, bonfire: EntityId) {
    let burnable = world
        .entities
        .building(bonfire)
        .is_some_and(|b| b.kind == BuildingKind::Bonfire && !b.marked_for_destruction);
    if !burnable {
        return;
    }
    let wood = match world.entities.human_mut(id) {
        Some(h) if h.wood > 0 => std::mem::take(&mut h.wood),
        _ => return,
    };
    let (per_wood, max_fuel) = (world.config.bonfire_fuel_per_wood, world.config.bonfire_max_fuel);
    if let Some(b) = world.entities.building_mut(bonfire) {
        b.fuel = (b.fuel + wood as f32 * per_wood).min(max_fuel);
    }
}

fn plant(world: &mut World, id: EntityId, at: Vec2) -> Option<SimulationEvent> {
    let owner = {
        let h = world.entities.human_mut(id)?;
        let seed = h.food.iter().position(|f| *f == FoodKind::Berry)?;
        h.food.remove(seed);
        h.agent.clear_intent();
        h.leader_id
    };
    let bush = world
        .entities
        .spawn(at, EntityBody::BerryBush(BerryBushEntity::new(0, owner)));
    tracing::debug!(bush = %bush, planter = %id, "bush planted");
    Some(SimulationEvent::BushPlanted { bush, owner })
}

fn build(world: &mut World, id: EntityId, kind: BuildingKind, at: Vec2) -> Option<SimulationEvent> {
    let owner = world.entities.human(id)?.leader_id;

    // Someone from the tribe may have finished the same site this pass
    let radius = world.config.interaction_range * 2.0;
    let duplicate = world.entities.iter().any(|e| {
        e.building().is_some_and(|b| {
            b.kind == kind
                && b.owner_id == owner
                && !b.marked_for_destruction
                && world.map.distance(e.position, at) < radius
        })
    });
    if let Some(agent) = world.entities.agent_mut(id) {
        agent.clear_intent();
    }
    if duplicate {
        return None;
    }

    let body = match kind {
        BuildingKind::Storage => BuildingEntity::storage(owner),
        BuildingKind::Bonfire => BuildingEntity::bonfire(owner, &world.config),
    };
    let building = world.entities.spawn(at, EntityBody::Building(body));
    tracing::info!(building = %building, ?kind, builder = %id, "building placed");
    Some(SimulationEvent::BuildingPlaced {
        building,
        kind,
        owner,
    })
}

fn claim(world: &mut World, id: EntityId, at: Vec2) {
    let Some(leader) = world.entities.human(id).and_then(|h| h.leader_id) else {
        return;
    };
    if world.territory.owner_at(at).is_none() {
        world.territory.claim_at(at, leader);
        tracing::debug!(leader = %leader, claimer = %id, "cell claimed");
    }
    if let Some(agent) = world.entities.agent_mut(id) {
        agent.clear_intent();
    }
}

fn strike(world: &mut World, id: EntityId, kind: EntityKind, victim: EntityId) -> Option<Hit> {
    let damage = match kind {
        EntityKind::Human => world.config.human_attack_damage,
        EntityKind::Predator => world.config.predator_attack_damage,
        _ => return None,
    };
    if victim == id || !world.entities.agent(victim).is_some_and(|a| a.is_alive()) {
        return None;
    }
    let now = world.clock.now();
    let cooldown = world.config.attack_cooldown_hours;
    let agent = world.entities.agent_mut(id)?;
    if !agent.can_attack(now) {
        return None;
    }
    agent.attack_ready_at = now + cooldown;
    Some(Hit {
        attacker: id,
        victim,
        damage,
    })
}

fn apply_hits(world: &mut World, hits: Vec<Hit>) -> Vec<SimulationEvent> {
    let now = world.clock.now();
    let flash = world.config.effect_duration_hours;
    let mut killed: Vec<(EntityId, EntityId)> = Vec::new();

    for hit in hits {
        let Some(victim) = world.entities.agent_mut(hit.victim) else {
            continue;
        };
        if !victim.is_alive() {
            continue;
        }
        victim.hitpoints -= hit.damage;
        victim.damage_flash = flash;
        victim
            .blackboard
            .set_expiring(&keys::LAST_ATTACKER, hit.attacker, now, ATTACKER_MEMORY_HOURS);
        if !victim.is_alive() {
            killed.push((hit.victim, hit.attacker));
        }
    }

    let mut events = Vec::new();
    for (victim, killer) in killed {
        let victim_kind = world.entities.kind(victim);
        events.extend(record_death(world, victim, DeathCause::Killed { by: killer }));
        reward_kill(world, killer, victim_kind);
    }
    events
}

/// Predators eat what they kill; humans carry the meat home
fn reward_kill(world: &mut World, killer: EntityId, victim_kind: Option<EntityKind>) {
    let animal = matches!(victim_kind, Some(EntityKind::Prey | EntityKind::Predator));
    let reduction = world.config.predator_kill_hunger_reduction;
    let max_food = world.config.max_food_inventory;
    let Some(entity) = world.entities.get_mut(killer) else {
        return;
    };
    match &mut entity.body {
        EntityBody::Predator(p) => p.agent.hunger = (p.agent.hunger - reduction).max(0.0),
        EntityBody::Human(h) if animal && h.food.len() < max_food => h.food.push(FoodKind::Meat),
        _ => {}
    }
}

fn procreate(world: &mut World, id: EntityId, kind: EntityKind, partner: EntityId) {
    let now = world.clock.now();
    let Some(params) = LifeParams::for_kind(&world.config, kind) else {
        return;
    };
    let compatible = match (world.entities.get(id), world.entities.get(partner)) {
        (Some(a), Some(b)) => {
            a.kind() == b.kind()
                && match (a.agent(), b.agent()) {
                    (Some(x), Some(y)) => {
                        x.gender != y.gender
                            && x.is_alive()
                            && y.is_alive()
                            && x.can_procreate(now)
                            && y.can_procreate(now)
                    }
                    _ => false,
                }
        }
        _ => false,
    };
    if !compatible {
        return;
    }

    let ready_at: GameHours = now + params.procreation_cooldown_hours;
    let mut mother = None;
    for (me, other) in [(id, partner), (partner, id)] {
        if let Some(agent) = world.entities.agent_mut(me) {
            agent.procreation_ready_at = ready_at;
            agent.clear_intent();
            if agent.gender == Gender::Female {
                agent.pregnancy = Some(Pregnancy {
                    father_id: other,
                    conceived_at: now,
                });
                mother = Some(me);
            }
        }
        if let Some(h) = world.entities.human_mut(me) {
            h.add_partner(other);
        }
    }

    if kind == EntityKind::Human {
        // A tribeless partner joins the other's tribe
        let tribe_of = |w: &World, who: EntityId| w.entities.human(who).and_then(|h| h.leader_id);
        match (tribe_of(world, id), tribe_of(world, partner)) {
            (None, Some(leader)) => world.join_tribe(id, leader),
            (Some(leader), None) => world.join_tribe(partner, leader),
            _ => {}
        }
    }
    tracing::debug!(a = %id, b = %partner, mother = ?mother, "conception");
}
