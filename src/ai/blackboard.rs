//! Per-agent scratch memory
//!
//! Every agent owns exactly one blackboard. Entries are addressed by typed
//! keys so a key is always read back as the type it was written with; a
//! mismatched read yields `None` instead of a wrong value. Entries may carry
//! the game time they were recorded at and an optional expiry.
//!
//! Coordination data that refers to other agents ("who is warming at this
//! bonfire") is stored by value as id lists, never by reference.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::ai::behavior_tree::NodeOutcome;
use crate::core::types::{EntityId, GameHours, Vec2};
use crate::tasks::TaskId;
use crate::tribe::split::SplitPlan;

/// Coordination record kept on a leader's blackboard for one shared target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TribalTaskData {
    pub start_time: GameHours,
    pub member_ids: Vec<EntityId>,
}

/// Everything a blackboard can hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlackboardValue {
    Flag(bool),
    Number(f64),
    Count(u64),
    Entity(EntityId),
    Entities(Vec<EntityId>),
    Point(Vec2),
    Text(String),
    Task(TaskId),
    TribalTask(TribalTaskData),
    Outcome(NodeOutcome),
    Split(SplitPlan),
}

/// Conversion between a Rust type and its blackboard representation
pub trait BlackboardType: Sized {
    fn into_value(self) -> BlackboardValue;
    fn from_value(value: &BlackboardValue) -> Option<Self>;
}

macro_rules! blackboard_type {
    ($ty:ty, $variant:ident) => {
        impl BlackboardType for $ty {
            fn into_value(self) -> BlackboardValue {
                BlackboardValue::$variant(self)
            }

            fn from_value(value: &BlackboardValue) -> Option<Self> {
                match value {
                    BlackboardValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

blackboard_type!(bool, Flag);
blackboard_type!(f64, Number);
blackboard_type!(u64, Count);
blackboard_type!(EntityId, Entity);
blackboard_type!(Vec<EntityId>, Entities);
blackboard_type!(Vec2, Point);
blackboard_type!(String, Text);
blackboard_type!(TaskId, Task);
blackboard_type!(TribalTaskData, TribalTask);
blackboard_type!(NodeOutcome, Outcome);
blackboard_type!(SplitPlan, Split);

impl BlackboardType for usize {
    fn into_value(self) -> BlackboardValue {
        BlackboardValue::Count(self as u64)
    }

    fn from_value(value: &BlackboardValue) -> Option<Self> {
        match value {
            BlackboardValue::Count(v) => Some(*v as usize),
            _ => None,
        }
    }
}

/// A typed blackboard key
pub struct BbKey<T> {
    name: Cow<'static, str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> BbKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            _marker: PhantomData,
        }
    }

    /// Key with a name computed at runtime, e.g. `tribal_warmth_17`
    pub fn dynamic(name: String) -> Self {
        Self {
            name: Cow::Owned(name),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for BbKey<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for BbKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BbKey").field(&self.name).finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    value: BlackboardValue,
    recorded_at: Option<GameHours>,
    expires_at: Option<GameHours>,
}

/// Keys shared across systems
pub mod keys {
    use super::BbKey;
    use crate::core::types::{EntityId, Vec2};
    use crate::tasks::TaskId;
    use crate::tribe::split::SplitPlan;

    /// Task the agent is currently committed to
    pub const CLAIMED_TASK: BbKey<TaskId> = BbKey::new("claimed_task");
    /// Debug trace of the agent's last tree evaluation
    pub const LAST_DECISION: BbKey<String> = BbKey::new("last_decision");
    /// Current wander destination
    pub const WANDER_TARGET: BbKey<Vec2> = BbKey::new("wander_target");
    /// Leader-side: last producer run
    pub const LAST_PRODUCER_RUN: BbKey<f64> = BbKey::new("last_producer_run");
    /// Leader-side: next territory cell for the frontier scan
    pub const BORDER_SCAN_CURSOR: BbKey<usize> = BbKey::new("border_scan_cursor");
    /// Leader-side: frontier candidates found by the scan in progress
    pub const BORDER_SCAN_FOUND: BbKey<u64> = BbKey::new("border_scan_found");
    /// Founder-side: split choreography in progress
    pub const SPLIT_PLAN: BbKey<SplitPlan> = BbKey::new("split_plan");
    /// Founder-side: no split attempts before this time
    pub const SPLIT_COOLDOWN_UNTIL: BbKey<f64> = BbKey::new("split_cooldown_until");
    /// Last entity that attacked this agent
    pub const LAST_ATTACKER: BbKey<EntityId> = BbKey::new("last_attacker");
    /// Follower-side: founder of the split this agent is walking with
    pub const SPLIT_FOLLOWING: BbKey<EntityId> = BbKey::new("split_following");
    /// Partner picked by the last procreation search
    pub const PROCREATION_PARTNER: BbKey<EntityId> = BbKey::new("procreation_partner");
}

/// Per-entity scoped key/value store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Blackboard {
    entries: BTreeMap<String, Entry>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: BlackboardType>(&self, key: &BbKey<T>) -> Option<T> {
        self.entries
            .get(key.name())
            .and_then(|e| T::from_value(&e.value))
    }

    /// Read an entry, treating it as absent once its expiry has passed
    pub fn get_fresh<T: BlackboardType>(&self, key: &BbKey<T>, now: GameHours) -> Option<T> {
        let entry = self.entries.get(key.name())?;
        if entry.expires_at.is_some_and(|t| t <= now) {
            return None;
        }
        T::from_value(&entry.value)
    }

    pub fn set<T: BlackboardType>(&mut self, key: &BbKey<T>, value: T) {
        self.entries.insert(
            key.name().to_string(),
            Entry {
                value: value.into_value(),
                recorded_at: None,
                expires_at: None,
            },
        );
    }

    /// Write an entry and record when it was written
    pub fn set_at<T: BlackboardType>(&mut self, key: &BbKey<T>, value: T, now: GameHours) {
        self.entries.insert(
            key.name().to_string(),
            Entry {
                value: value.into_value(),
                recorded_at: Some(now),
                expires_at: None,
            },
        );
    }

    /// Write a time-boxed entry that expires `ttl` hours from now
    pub fn set_expiring<T: BlackboardType>(
        &mut self,
        key: &BbKey<T>,
        value: T,
        now: GameHours,
        ttl: GameHours,
    ) {
        self.entries.insert(
            key.name().to_string(),
            Entry {
                value: value.into_value(),
                recorded_at: Some(now),
                expires_at: Some(now + ttl),
            },
        );
    }

    pub fn recorded_at<T>(&self, key: &BbKey<T>) -> Option<GameHours> {
        self.entries.get(key.name()).and_then(|e| e.recorded_at)
    }

    pub fn contains<T>(&self, key: &BbKey<T>) -> bool {
        self.entries.contains_key(key.name())
    }

    pub fn delete<T>(&mut self, key: &BbKey<T>) -> bool {
        self.entries.remove(key.name()).is_some()
    }

    /// Drop every entry whose expiry has passed
    pub fn purge_expired(&mut self, now: GameHours) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, e| e.expires_at.map_or(true, |t| t > now));
        before - self.entries.len()
    }

    /// Names of entries starting with `prefix`, in key order
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.as_str())
    }

    /// Untyped view for debug overlays
    pub fn raw(&self, name: &str) -> Option<&BlackboardValue> {
        self.entries.get(name).map(|e| &e.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HUNGER_SEEN: BbKey<f64> = BbKey::new("hunger_seen");

    #[test]
    fn test_typed_roundtrip() {
        let mut bb = Blackboard::new();
        bb.set(&HUNGER_SEEN, 42.0);
        assert_eq!(bb.get(&HUNGER_SEEN), Some(42.0));
        assert!(bb.contains(&HUNGER_SEEN));
    }

    #[test]
    fn test_type_mismatch_reads_none() {
        let mut bb = Blackboard::new();
        bb.set(&BbKey::<u64>::new("counter"), 3);
        let wrong: BbKey<String> = BbKey::new("counter");
        assert_eq!(bb.get(&wrong), None);
    }

    #[test]
    fn test_expiring_entry() {
        let mut bb = Blackboard::new();
        bb.set_expiring(&HUNGER_SEEN, 1.0, 10.0, 2.0);
        assert_eq!(bb.get_fresh(&HUNGER_SEEN, 11.0), Some(1.0));
        assert_eq!(bb.get_fresh(&HUNGER_SEEN, 12.5), None);
        assert_eq!(bb.recorded_at(&HUNGER_SEEN), Some(10.0));

        assert_eq!(bb.purge_expired(12.5), 1);
        assert!(bb.is_empty());
    }

    #[test]
    fn test_delete() {
        let mut bb = Blackboard::new();
        bb.set(&keys::WANDER_TARGET, Vec2::new(1.0, 2.0));
        assert!(bb.delete(&keys::WANDER_TARGET));
        assert!(!bb.delete(&keys::WANDER_TARGET));
    }

    #[test]
    fn test_dynamic_keys_and_prefix_scan() {
        let mut bb = Blackboard::new();
        for id in [3u32, 1, 2] {
            let key: BbKey<TribalTaskData> = BbKey::dynamic(format!("tribal_warmth_{}", id));
            bb.set(
                &key,
                TribalTaskData {
                    start_time: 0.0,
                    member_ids: vec![EntityId(id)],
                },
            );
        }
        bb.set(&keys::CLAIMED_TASK, TaskId::new("gather_9"));

        let names: Vec<&str> = bb.keys_with_prefix("tribal_").collect();
        assert_eq!(
            names,
            vec!["tribal_warmth_1", "tribal_warmth_2", "tribal_warmth_3"]
        );
    }
}
