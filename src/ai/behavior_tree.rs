//! Behavior tree engine
//!
//! Trees are described with [`NodeSpec`] and validated once by
//! [`BehaviorTree::build`]; a malformed tree is rejected there and never
//! reaches the simulation. Every node reports its outcome through
//! [`NodeStatus`]; nothing in evaluation panics or returns errors.
//!
//! `Running` is a cooperative continuation: the node is simply evaluated
//! again next tick, with whatever state it persisted in blackboards.

use serde::{Deserialize, Serialize};

use crate::ai::blackboard::{keys, BbKey, TribalTaskData};
use crate::ai::context::BehaviorContext;
use crate::core::error::{Result, TribeError};
use crate::core::types::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Success,
    Failure,
    Running,
}

/// Status plus a human-readable trace of how it was reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutcome {
    pub status: NodeStatus,
    pub debug: Option<String>,
}

impl NodeOutcome {
    pub fn new(status: NodeStatus, debug: impl Into<String>) -> Self {
        Self {
            status,
            debug: Some(debug.into()),
        }
    }

    fn nested(self, name: &str) -> Self {
        let debug = match self.debug {
            Some(inner) => format!("{} > {}", name, inner),
            None => name.to_string(),
        };
        Self {
            status: self.status,
            debug: Some(debug),
        }
    }
}

pub type ConditionFn = Box<dyn Fn(&BehaviorContext<'_>, EntityId) -> bool>;
pub type ActionFn = Box<dyn Fn(&mut BehaviorContext<'_>, EntityId) -> NodeStatus>;
pub type TargetFn = Box<dyn Fn(&BehaviorContext<'_>, EntityId) -> Option<EntityId>>;

/// Unvalidated tree description
pub enum NodeSpec {
    Condition {
        name: String,
        predicate: ConditionFn,
    },
    Action {
        name: String,
        action: ActionFn,
    },
    Sequence {
        name: String,
        children: Vec<NodeSpec>,
    },
    Selector {
        name: String,
        children: Vec<NodeSpec>,
    },
    Caching {
        name: String,
        ttl_hours: f64,
        children: Vec<NodeSpec>,
    },
    TribalTask {
        name: String,
        task_type: String,
        target: TargetFn,
        max_capacity: usize,
        timeout_hours: f64,
        children: Vec<NodeSpec>,
    },
}

impl NodeSpec {
    pub fn condition(
        name: &str,
        predicate: impl Fn(&BehaviorContext<'_>, EntityId) -> bool + 'static,
    ) -> Self {
        NodeSpec::Condition {
            name: name.to_string(),
            predicate: Box::new(predicate),
        }
    }

    pub fn action(
        name: &str,
        action: impl Fn(&mut BehaviorContext<'_>, EntityId) -> NodeStatus + 'static,
    ) -> Self {
        NodeSpec::Action {
            name: name.to_string(),
            action: Box::new(action),
        }
    }

    pub fn sequence(name: &str, children: Vec<NodeSpec>) -> Self {
        NodeSpec::Sequence {
            name: name.to_string(),
            children,
        }
    }

    pub fn selector(name: &str, children: Vec<NodeSpec>) -> Self {
        NodeSpec::Selector {
            name: name.to_string(),
            children,
        }
    }

    pub fn caching(name: &str, ttl_hours: f64, child: NodeSpec) -> Self {
        NodeSpec::Caching {
            name: name.to_string(),
            ttl_hours,
            children: vec![child],
        }
    }

    pub fn tribal_task(
        name: &str,
        task_type: &str,
        target: impl Fn(&BehaviorContext<'_>, EntityId) -> Option<EntityId> + 'static,
        max_capacity: usize,
        timeout_hours: f64,
        child: NodeSpec,
    ) -> Self {
        NodeSpec::TribalTask {
            name: name.to_string(),
            task_type: task_type.to_string(),
            target: Box::new(target),
            max_capacity,
            timeout_hours,
            children: vec![child],
        }
    }

    fn name(&self) -> &str {
        match self {
            NodeSpec::Condition { name, .. }
            | NodeSpec::Action { name, .. }
            | NodeSpec::Sequence { name, .. }
            | NodeSpec::Selector { name, .. }
            | NodeSpec::Caching { name, .. }
            | NodeSpec::TribalTask { name, .. } => name,
        }
    }
}

enum Node {
    Condition {
        name: String,
        predicate: ConditionFn,
    },
    Action {
        name: String,
        action: ActionFn,
    },
    Sequence {
        name: String,
        children: Vec<Node>,
    },
    Selector {
        name: String,
        children: Vec<Node>,
    },
    Caching {
        name: String,
        ttl_hours: f64,
        cache_key: BbKey<NodeOutcome>,
        child: Box<Node>,
    },
    TribalTask {
        name: String,
        task_type: String,
        target: TargetFn,
        max_capacity: usize,
        timeout_hours: f64,
        child: Box<Node>,
    },
}

/// A validated, shareable behavior tree
pub struct BehaviorTree {
    name: String,
    root: Node,
    node_count: usize,
}

impl BehaviorTree {
    /// Validate a spec and assign every node a stable identity
    pub fn build(name: &str, spec: NodeSpec) -> Result<Self> {
        let mut next_id = 0u32;
        let root = build_node(name, spec, &mut next_id)?;
        Ok(Self {
            name: name.to_string(),
            root,
            node_count: next_id as usize,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Evaluate the tree once for `agent`
    ///
    /// The trace of the deciding path is left in the agent's blackboard
    /// for inspection.
    pub fn tick(&self, ctx: &mut BehaviorContext<'_>, agent: EntityId) -> NodeOutcome {
        let outcome = self.root.tick(ctx, agent);
        if let (Some(state), Some(debug)) = (ctx.entities.agent_mut(agent), &outcome.debug) {
            state.blackboard.set(&keys::LAST_DECISION, debug.clone());
        }
        outcome
    }
}

fn single_child(kind: &str, name: &str, mut children: Vec<NodeSpec>) -> Result<NodeSpec> {
    if children.len() != 1 {
        return Err(TribeError::MalformedTree(format!(
            "{} '{}' must wrap exactly one child, found {}",
            kind,
            name,
            children.len()
        )));
    }
    Ok(children.remove(0))
}

fn build_node(tree: &str, spec: NodeSpec, next_id: &mut u32) -> Result<Node> {
    let id = *next_id;
    *next_id += 1;

    let node = match spec {
        NodeSpec::Condition { name, predicate } => Node::Condition { name, predicate },
        NodeSpec::Action { name, action } => Node::Action { name, action },
        NodeSpec::Sequence { name, children } | NodeSpec::Selector { name, children }
            if children.is_empty() =>
        {
            return Err(TribeError::MalformedTree(format!(
                "composite '{}' has no children",
                name
            )));
        }
        NodeSpec::Sequence { name, children } => Node::Sequence {
            name,
            children: children
                .into_iter()
                .map(|c| build_node(tree, c, next_id))
                .collect::<Result<Vec<_>>>()?,
        },
        NodeSpec::Selector { name, children } => Node::Selector {
            name,
            children: children
                .into_iter()
                .map(|c| build_node(tree, c, next_id))
                .collect::<Result<Vec<_>>>()?,
        },
        NodeSpec::Caching {
            name,
            ttl_hours,
            children,
        } => {
            if !(ttl_hours > 0.0 && ttl_hours.is_finite()) {
                return Err(TribeError::MalformedTree(format!(
                    "caching node '{}' needs a positive ttl",
                    name
                )));
            }
            let child = single_child("caching node", &name, children)?;
            Node::Caching {
                cache_key: BbKey::dynamic(format!("bt_cache_{}_{}", tree, id)),
                ttl_hours,
                child: Box::new(build_node(tree, child, next_id)?),
                name,
            }
        }
        NodeSpec::TribalTask {
            name,
            task_type,
            target,
            max_capacity,
            timeout_hours,
            children,
        } => {
            if max_capacity == 0 {
                return Err(TribeError::MalformedTree(format!(
                    "tribal task '{}' needs a capacity of at least 1",
                    name
                )));
            }
            if !(timeout_hours > 0.0 && timeout_hours.is_finite()) {
                return Err(TribeError::MalformedTree(format!(
                    "tribal task '{}' needs a positive timeout",
                    name
                )));
            }
            if task_type.is_empty() {
                return Err(TribeError::MalformedTree(format!(
                    "tribal task '{}' has an empty task type",
                    name
                )));
            }
            let child = single_child("tribal task", &name, children)?;
            Node::TribalTask {
                child: Box::new(build_node(tree, child, next_id)?),
                name,
                task_type,
                target,
                max_capacity,
                timeout_hours,
            }
        }
    };
    Ok(node)
}

impl Node {
    fn tick(&self, ctx: &mut BehaviorContext<'_>, agent: EntityId) -> NodeOutcome {
        match self {
            Node::Condition { name, predicate } => {
                let status = if predicate(&*ctx, agent) {
                    NodeStatus::Success
                } else {
                    NodeStatus::Failure
                };
                NodeOutcome::new(status, format!("{}: {:?}", name, status))
            }
            Node::Action { name, action } => {
                let status = action(ctx, agent);
                NodeOutcome::new(status, format!("{}: {:?}", name, status))
            }
            Node::Sequence { name, children } => {
                let mut last = NodeOutcome::new(NodeStatus::Success, name.clone());
                for child in children {
                    let outcome = child.tick(ctx, agent);
                    if outcome.status != NodeStatus::Success {
                        return outcome.nested(name);
                    }
                    last = outcome;
                }
                last.nested(name)
            }
            Node::Selector { name, children } => {
                for child in children {
                    let outcome = child.tick(ctx, agent);
                    if outcome.status != NodeStatus::Failure {
                        return outcome.nested(name);
                    }
                }
                NodeOutcome::new(NodeStatus::Failure, format!("{}: all failed", name))
            }
            Node::Caching {
                name,
                ttl_hours,
                cache_key,
                child,
            } => tick_caching(ctx, agent, name, *ttl_hours, cache_key, child),
            Node::TribalTask {
                name,
                task_type,
                target,
                max_capacity,
                timeout_hours,
                child,
            } => {
                let Some(target_id) = target(&*ctx, agent) else {
                    return NodeOutcome::new(NodeStatus::Failure, format!("{}: no target", name));
                };
                tick_tribal_task(
                    ctx,
                    agent,
                    TribalTaskParams {
                        name,
                        task_type,
                        target_id,
                        max_capacity: *max_capacity,
                        timeout_hours: *timeout_hours,
                    },
                    child,
                )
            }
        }
    }
}

fn tick_caching(
    ctx: &mut BehaviorContext<'_>,
    agent: EntityId,
    name: &str,
    ttl_hours: f64,
    cache_key: &BbKey<NodeOutcome>,
    child: &Node,
) -> NodeOutcome {
    let now = ctx.now;
    if let Some(state) = ctx.entities.agent(agent) {
        let cached = state.blackboard.get(cache_key);
        let ran_at = state.blackboard.recorded_at(cache_key);
        if let (Some(cached), Some(ran_at)) = (cached, ran_at) {
            if now - ran_at < ttl_hours {
                return cached;
            }
        }
    }

    let outcome = child.tick(ctx, agent).nested(name);
    if let Some(state) = ctx.entities.agent_mut(agent) {
        state.blackboard.set_at(cache_key, outcome.clone(), now);
    }
    outcome
}

struct TribalTaskParams<'n> {
    name: &'n str,
    task_type: &'n str,
    target_id: EntityId,
    max_capacity: usize,
    timeout_hours: f64,
}

/// Key of the coordination record for one shared target
pub fn tribal_task_key(task_type: &str, target_id: EntityId) -> BbKey<TribalTaskData> {
    BbKey::dynamic(format!("tribal_{}_{}", task_type, target_id))
}

fn tick_tribal_task(
    ctx: &mut BehaviorContext<'_>,
    agent: EntityId,
    params: TribalTaskParams<'_>,
    child: &Node,
) -> NodeOutcome {
    let now = ctx.now;
    let leader_id = ctx
        .leader_of(agent)
        .filter(|l| ctx.entities.living_human(*l).is_some());

    // Tribeless agents pursue the target uncoordinated
    let Some(leader_id) = leader_id else {
        return child.tick(ctx, agent).nested(params.name);
    };

    let key = tribal_task_key(params.task_type, params.target_id);
    let existing = ctx
        .entities
        .human(leader_id)
        .and_then(|l| l.agent.blackboard.get(&key));

    let mut record = match existing {
        Some(record) if now - record.start_time <= params.timeout_hours => record,
        _ => TribalTaskData {
            start_time: now,
            member_ids: Vec::new(),
        },
    };

    // Members may have died or left the tribe since they joined
    let entities = &*ctx.entities;
    record.member_ids.retain(|id| {
        *id == agent
            || entities
                .human(*id)
                .is_some_and(|h| h.agent.is_alive() && h.leader_id == Some(leader_id))
    });

    let is_member = record.member_ids.contains(&agent);
    if !is_member && record.member_ids.len() >= params.max_capacity {
        write_record(ctx, leader_id, &key, record, params.timeout_hours);
        return NodeOutcome::new(
            NodeStatus::Failure,
            format!("{}: at capacity", params.name),
        );
    }
    if !is_member {
        record.member_ids.push(agent);
    }
    write_record(ctx, leader_id, &key, record, params.timeout_hours);

    let outcome = child.tick(ctx, agent);
    if outcome.status != NodeStatus::Running {
        release_membership(ctx, leader_id, &key, agent, params.timeout_hours);
    }
    outcome.nested(params.name)
}

/// Records expire with their timeout so abandoned ones are purged in decay
fn write_record(
    ctx: &mut BehaviorContext<'_>,
    leader_id: EntityId,
    key: &BbKey<TribalTaskData>,
    record: TribalTaskData,
    timeout_hours: f64,
) {
    if let Some(leader) = ctx.entities.human_mut(leader_id) {
        let start = record.start_time;
        leader.agent.blackboard.set_expiring(key, record, start, timeout_hours);
    }
}

fn release_membership(
    ctx: &mut BehaviorContext<'_>,
    leader_id: EntityId,
    key: &BbKey<TribalTaskData>,
    agent: EntityId,
    timeout_hours: f64,
) {
    if let Some(leader) = ctx.entities.human_mut(leader_id) {
        if let Some(mut record) = leader.agent.blackboard.get(key) {
            record.member_ids.retain(|id| *id != agent);
            if record.member_ids.is_empty() {
                leader.agent.blackboard.delete(key);
            } else {
                let start = record.start_time;
                leader.agent.blackboard.set_expiring(key, record, start, timeout_hours);
            }
        }
    }
}

impl std::fmt::Debug for BehaviorTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorTree")
            .field("name", &self.name)
            .field("node_count", &self.node_count)
            .field("root", &self.root_name())
            .finish()
    }
}

impl BehaviorTree {
    fn root_name(&self) -> &str {
        match &self.root {
            Node::Condition { name, .. }
            | Node::Action { name, .. }
            | Node::Sequence { name, .. }
            | Node::Selector { name, .. }
            | Node::Caching { name, .. }
            | Node::TribalTask { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::blackboard::BbKey;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{Gender, Vec2};
    use crate::entity::human::HumanEntity;
    use crate::entity::store::{EntityBody, EntityStore};
    use crate::spatial::index::SpatialIndex;
    use crate::spatial::torus::WorldMap;
    use crate::tasks::TaskStore;
    use crate::tribe::territory::TerritoryGrid;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const COUNTER: BbKey<u64> = BbKey::new("test_counter");

    struct Fixture {
        config: SimulationConfig,
        map: WorldMap,
        entities: EntityStore,
        index: SpatialIndex,
        tasks: TaskStore,
        territory: TerritoryGrid,
        rng: ChaCha8Rng,
    }

    impl Fixture {
        fn new() -> Self {
            let config = SimulationConfig::default();
            let map = WorldMap::new(config.map_width, config.map_height);
            Self {
                index: SpatialIndex::new(map, config.index_cell_size),
                territory: TerritoryGrid::new(&config),
                entities: EntityStore::new(),
                tasks: TaskStore::new(),
                rng: ChaCha8Rng::seed_from_u64(1),
                config,
                map,
            }
        }

        fn spawn_human(&mut self, leader: Option<EntityId>) -> EntityId {
            let mut human = HumanEntity::new(Gender::Male, 30.0, &self.config);
            human.leader_id = leader;
            self.entities
                .spawn(Vec2::new(100.0, 100.0), EntityBody::Human(Box::new(human)))
        }

        fn ctx(&mut self, now: f64) -> BehaviorContext<'_> {
            BehaviorContext {
                entities: &mut self.entities,
                index: &self.index,
                tasks: &mut self.tasks,
                territory: &self.territory,
                map: &self.map,
                config: &self.config,
                rng: &mut self.rng,
                now,
                ambient_temperature: 10.0,
            }
        }
    }

    fn bump_counter(ctx: &mut BehaviorContext<'_>, agent: EntityId) -> NodeStatus {
        if let Some(state) = ctx.entities.agent_mut(agent) {
            let n = state.blackboard.get(&COUNTER).unwrap_or(0);
            state.blackboard.set(&COUNTER, n + 1);
        }
        NodeStatus::Success
    }

    fn counter(fx: &Fixture, id: EntityId) -> u64 {
        fx.entities
            .agent(id)
            .and_then(|a| a.blackboard.get(&COUNTER))
            .unwrap_or(0)
    }

    #[test]
    fn test_sequence_short_circuits_on_failure() {
        let tree = BehaviorTree::build(
            "t",
            NodeSpec::sequence(
                "seq",
                vec![
                    NodeSpec::condition("never", |_, _| false),
                    NodeSpec::action("bump", bump_counter),
                ],
            ),
        )
        .unwrap();

        let mut fx = Fixture::new();
        let id = fx.spawn_human(None);
        let outcome = tree.tick(&mut fx.ctx(0.0), id);
        assert_eq!(outcome.status, NodeStatus::Failure);
        assert_eq!(counter(&fx, id), 0);
    }

    #[test]
    fn test_sequence_returns_running() {
        let tree = BehaviorTree::build(
            "t",
            NodeSpec::sequence(
                "seq",
                vec![
                    NodeSpec::action("busy", |_, _| NodeStatus::Running),
                    NodeSpec::action("bump", bump_counter),
                ],
            ),
        )
        .unwrap();

        let mut fx = Fixture::new();
        let id = fx.spawn_human(None);
        assert_eq!(tree.tick(&mut fx.ctx(0.0), id).status, NodeStatus::Running);
        assert_eq!(counter(&fx, id), 0);
    }

    #[test]
    fn test_selector_takes_first_non_failure() {
        let tree = BehaviorTree::build(
            "t",
            NodeSpec::selector(
                "root",
                vec![
                    NodeSpec::condition("no", |_, _| false),
                    NodeSpec::action("bump", bump_counter),
                    NodeSpec::action("bump_again", bump_counter),
                ],
            ),
        )
        .unwrap();

        let mut fx = Fixture::new();
        let id = fx.spawn_human(None);
        let outcome = tree.tick(&mut fx.ctx(0.0), id);
        assert_eq!(outcome.status, NodeStatus::Success);
        assert_eq!(counter(&fx, id), 1);
        assert_eq!(outcome.debug.as_deref(), Some("root > bump: Success"));
    }

    #[test]
    fn test_last_decision_recorded() {
        let tree =
            BehaviorTree::build("t", NodeSpec::action("idle", |_, _| NodeStatus::Success)).unwrap();
        let mut fx = Fixture::new();
        let id = fx.spawn_human(None);
        tree.tick(&mut fx.ctx(0.0), id);
        let recorded = fx
            .entities
            .agent(id)
            .and_then(|a| a.blackboard.get(&keys::LAST_DECISION));
        assert_eq!(recorded.as_deref(), Some("idle: Success"));
    }

    #[test]
    fn test_caching_node_reuses_result_within_ttl() {
        let tree = BehaviorTree::build(
            "t",
            NodeSpec::caching("cached", 1.0, NodeSpec::action("bump", bump_counter)),
        )
        .unwrap();

        let mut fx = Fixture::new();
        let id = fx.spawn_human(None);
        let first = tree.tick(&mut fx.ctx(0.0), id);
        let second = tree.tick(&mut fx.ctx(0.5), id);
        assert_eq!(first, second);
        assert_eq!(counter(&fx, id), 1);

        tree.tick(&mut fx.ctx(1.5), id);
        assert_eq!(counter(&fx, id), 2);
    }

    #[test]
    fn test_caching_is_per_agent() {
        let tree = BehaviorTree::build(
            "t",
            NodeSpec::caching("cached", 1.0, NodeSpec::action("bump", bump_counter)),
        )
        .unwrap();

        let mut fx = Fixture::new();
        let a = fx.spawn_human(None);
        let b = fx.spawn_human(None);
        tree.tick(&mut fx.ctx(0.0), a);
        tree.tick(&mut fx.ctx(0.1), b);
        assert_eq!(counter(&fx, a), 1);
        assert_eq!(counter(&fx, b), 1);
    }

    #[test]
    fn test_decorator_without_child_is_rejected() {
        let spec = NodeSpec::Caching {
            name: "empty".into(),
            ttl_hours: 1.0,
            children: Vec::new(),
        };
        assert!(matches!(
            BehaviorTree::build("t", spec),
            Err(TribeError::MalformedTree(_))
        ));
    }

    #[test]
    fn test_empty_composite_is_rejected() {
        let spec = NodeSpec::selector("root", Vec::new());
        assert!(BehaviorTree::build("t", spec).is_err());
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let spec = NodeSpec::tribal_task(
            "warm",
            "warmth",
            |_, _| Some(EntityId(1)),
            0,
            1.0,
            NodeSpec::action("go", |_, _| NodeStatus::Running),
        );
        assert!(BehaviorTree::build("t", spec).is_err());
    }

    #[test]
    fn test_tribal_task_respects_capacity() {
        let mut fx = Fixture::new();
        let leader = fx.spawn_human(None);
        if let Some(h) = fx.entities.human_mut(leader) {
            h.leader_id = Some(leader);
        }
        let a = fx.spawn_human(Some(leader));
        let b = fx.spawn_human(Some(leader));
        let target = EntityId(999);

        let tree = BehaviorTree::build(
            "t",
            NodeSpec::tribal_task(
                "warm",
                "warmth",
                move |_, _| Some(target),
                1,
                2.0,
                NodeSpec::action("go", |_, _| NodeStatus::Running),
            ),
        )
        .unwrap();

        assert_eq!(tree.tick(&mut fx.ctx(0.0), a).status, NodeStatus::Running);
        assert_eq!(tree.tick(&mut fx.ctx(0.0), b).status, NodeStatus::Failure);

        let record = fx
            .entities
            .human(leader)
            .and_then(|l| l.agent.blackboard.get(&tribal_task_key("warmth", target)))
            .unwrap();
        assert_eq!(record.member_ids, vec![a]);

        // Once the record is stale, the slot frees up
        assert_eq!(tree.tick(&mut fx.ctx(3.0), b).status, NodeStatus::Running);
    }

    #[test]
    fn test_tribal_task_releases_on_completion() {
        let mut fx = Fixture::new();
        let leader = fx.spawn_human(None);
        if let Some(h) = fx.entities.human_mut(leader) {
            h.leader_id = Some(leader);
        }
        let a = fx.spawn_human(Some(leader));
        let target = EntityId(500);

        let tree = BehaviorTree::build(
            "t",
            NodeSpec::tribal_task(
                "warm",
                "warmth",
                move |_, _| Some(target),
                1,
                2.0,
                NodeSpec::action("done", |_, _| NodeStatus::Success),
            ),
        )
        .unwrap();

        assert_eq!(tree.tick(&mut fx.ctx(0.0), a).status, NodeStatus::Success);
        let has_record = fx
            .entities
            .human(leader)
            .is_some_and(|l| l.agent.blackboard.contains(&tribal_task_key("warmth", target)));
        assert!(!has_record);
    }

    #[test]
    fn test_tribal_task_prunes_dead_members() {
        let mut fx = Fixture::new();
        let leader = fx.spawn_human(None);
        if let Some(h) = fx.entities.human_mut(leader) {
            h.leader_id = Some(leader);
        }
        let a = fx.spawn_human(Some(leader));
        let b = fx.spawn_human(Some(leader));
        let target = EntityId(77);

        let tree = BehaviorTree::build(
            "t",
            NodeSpec::tribal_task(
                "warm",
                "warmth",
                move |_, _| Some(target),
                1,
                5.0,
                NodeSpec::action("go", |_, _| NodeStatus::Running),
            ),
        )
        .unwrap();

        tree.tick(&mut fx.ctx(0.0), a);
        fx.entities.remove(a);
        assert_eq!(tree.tick(&mut fx.ctx(0.1), b).status, NodeStatus::Running);
    }
}
