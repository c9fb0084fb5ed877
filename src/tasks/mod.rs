//! Task marketplace
//!
//! Producers (tribe leaders) notice needs and post tasks; consumers
//! (behavior-tree leaves on every agent) score the tasks they could do and
//! commit to the best one. Claims are advisory: several agents may pursue
//! the same task, and a task leaves the store only when it expires, its
//! need resolves, or a one-shot task is completed.

pub mod consumer;
pub mod executors;
pub mod producers;
pub mod scoring;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, GameHours, Vec2};

/// Stable task identifier, derived from what the task is about so that a
/// producer re-posting the same need refreshes the existing task
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    GatherFood,
    BuildStorage,
    BuildBonfire,
    FuelBonfire,
    PlantBush,
    ClaimTerritory,
    HuntPrey,
    DefendTerritory,
}

impl TaskKind {
    pub const ALL: [TaskKind; 8] = [
        TaskKind::GatherFood,
        TaskKind::BuildStorage,
        TaskKind::BuildBonfire,
        TaskKind::FuelBonfire,
        TaskKind::PlantBush,
        TaskKind::ClaimTerritory,
        TaskKind::HuntPrey,
        TaskKind::DefendTerritory,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            TaskKind::GatherFood => "gather_food",
            TaskKind::BuildStorage => "build_storage",
            TaskKind::BuildBonfire => "build_bonfire",
            TaskKind::FuelBonfire => "fuel_bonfire",
            TaskKind::PlantBush => "plant_bush",
            TaskKind::ClaimTerritory => "claim_territory",
            TaskKind::HuntPrey => "hunt_prey",
            TaskKind::DefendTerritory => "defend_territory",
        }
    }

    /// Completing the task once resolves the need, so it leaves the store
    pub fn is_one_shot(&self) -> bool {
        matches!(
            self,
            TaskKind::BuildStorage
                | TaskKind::BuildBonfire
                | TaskKind::PlantBush
                | TaskKind::ClaimTerritory
        )
    }

    /// The target walks around, so the task's position tracks it
    pub fn follows_target(&self) -> bool {
        matches!(self, TaskKind::HuntPrey | TaskKind::DefendTerritory)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TaskTarget {
    Entity(EntityId),
    Position(Vec2),
}

impl TaskTarget {
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            TaskTarget::Entity(id) => Some(*id),
            TaskTarget::Position(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    pub position: Vec2,
    /// Usually the leader of the tribe the task is meant for
    pub creator_id: EntityId,
    pub target: TaskTarget,
    pub valid_until: GameHours,
    /// Most recent scoring winner; advisory only
    pub claimed_by: Option<EntityId>,
}

impl Task {
    pub fn new(
        kind: TaskKind,
        creator_id: EntityId,
        target: TaskTarget,
        position: Vec2,
        valid_until: GameHours,
    ) -> Self {
        Self {
            id: Self::id_for(kind, creator_id, target),
            kind,
            position,
            creator_id,
            target,
            valid_until,
            claimed_by: None,
        }
    }

    /// Deterministic id: one task per (kind, creator, target entity)
    ///
    /// Position-targeted tasks are one per (kind, creator) unless the caller
    /// supplies its own id.
    pub fn id_for(kind: TaskKind, creator_id: EntityId, target: TaskTarget) -> TaskId {
        match target {
            TaskTarget::Entity(id) => TaskId(format!("{}_{}_{}", kind.slug(), creator_id, id)),
            TaskTarget::Position(_) => TaskId(format!("{}_{}", kind.slug(), creator_id)),
        }
    }

    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    pub fn is_valid(&self, now: GameHours) -> bool {
        self.valid_until >= now
    }
}

/// All posted tasks, keyed by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskStore {
    tasks: BTreeMap<TaskId, Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a task or refresh an existing one's validity
    ///
    /// A refreshed site task keeps its position and claim so agents already
    /// walking to it are not redirected; hunt and defense tasks move with
    /// their target. Returns `true` for a new task.
    pub fn upsert(&mut self, task: Task) -> bool {
        match self.tasks.get_mut(&task.id) {
            Some(existing) => {
                existing.valid_until = existing.valid_until.max(task.valid_until);
                existing.target = task.target;
                if existing.kind.follows_target() {
                    existing.position = task.position;
                }
                false
            }
            None => {
                tracing::debug!(task = %task.id, creator = %task.creator_id, "task posted");
                self.tasks.insert(task.id.clone(), task);
                true
            }
        }
    }

    pub fn retract(&mut self, id: &TaskId) -> Option<Task> {
        let removed = self.tasks.remove(id);
        if removed.is_some() {
            tracing::debug!(task = %id, "task retracted");
        }
        removed
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Unexpired tasks of the given kinds, in id order
    pub fn eligible<'a>(
        &'a self,
        now: GameHours,
        kinds: &'a [TaskKind],
    ) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks
            .values()
            .filter(move |t| t.is_valid(now) && kinds.contains(&t.kind))
    }

    pub fn prune_expired(&mut self, now: GameHours) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, t| t.is_valid(now));
        before - self.tasks.len()
    }

    /// Drop every task posted by `creator`
    pub fn prune_creator(&mut self, creator: EntityId) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, t| t.creator_id != creator);
        before - self.tasks.len()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Task) -> bool) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, t| keep(t));
        before - self.tasks.len()
    }

    /// Ids of tasks of one kind posted by `creator`
    pub fn ids_by_creator(&self, creator: EntityId, kind: TaskKind) -> Vec<TaskId> {
        self.tasks
            .values()
            .filter(|t| t.creator_id == creator && t.kind == kind)
            .map(|t| t.id.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gather(creator: u32, bush: u32, valid_until: f64) -> Task {
        Task::new(
            TaskKind::GatherFood,
            EntityId(creator),
            TaskTarget::Entity(EntityId(bush)),
            Vec2::default(),
            valid_until,
        )
    }

    #[test]
    fn test_task_ids_are_deterministic() {
        assert_eq!(gather(1, 9, 0.0).id, TaskId::new("gather_food_1_9"));
        let build = Task::new(
            TaskKind::BuildStorage,
            EntityId(4),
            TaskTarget::Position(Vec2::new(1.0, 1.0)),
            Vec2::new(1.0, 1.0),
            2.0,
        );
        assert_eq!(build.id.as_str(), "build_storage_4");
    }

    #[test]
    fn test_upsert_refreshes_without_moving() {
        let mut store = TaskStore::new();
        assert!(store.upsert(gather(1, 9, 2.0)));

        let mut refreshed = gather(1, 9, 5.0);
        refreshed.position = Vec2::new(50.0, 50.0);
        assert!(!store.upsert(refreshed));

        let task = store.get(&TaskId::new("gather_food_1_9")).unwrap();
        assert_eq!(task.valid_until, 5.0);
        assert_eq!(task.position, Vec2::default());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_upsert_moves_hunt_with_its_prey() {
        let mut store = TaskStore::new();
        let hunt = |at: Vec2| {
            Task::new(TaskKind::HuntPrey, EntityId(1), TaskTarget::Entity(EntityId(9)), at, 5.0)
        };
        store.upsert(hunt(Vec2::new(1350.0, 1000.0)));
        assert!(!store.upsert(hunt(Vec2::new(1005.0, 1000.0))));

        let task = store.get(&TaskId::new("hunt_prey_1_9")).unwrap();
        assert_eq!(task.position, Vec2::new(1005.0, 1000.0));
    }

    #[test]
    fn test_eligible_filters_expired_and_kind() {
        let mut store = TaskStore::new();
        store.upsert(gather(1, 1, 1.0));
        store.upsert(gather(1, 2, 10.0));

        let now = 2.0;
        let ids: Vec<_> = store
            .eligible(now, &[TaskKind::GatherFood])
            .map(|t| t.id.clone())
            .collect();
        assert_eq!(ids, vec![TaskId::new("gather_food_1_2")]);
        assert_eq!(store.eligible(now, &[TaskKind::HuntPrey]).count(), 0);

        assert_eq!(store.prune_expired(now), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_prune_creator() {
        let mut store = TaskStore::new();
        store.upsert(gather(1, 1, 1.0));
        store.upsert(gather(2, 1, 1.0));
        assert_eq!(store.prune_creator(EntityId(1)), 1);
        assert_eq!(store.ids_by_creator(EntityId(2), TaskKind::GatherFood).len(), 1);
    }
}
