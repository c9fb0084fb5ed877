//! Decision making: behavior trees, blackboards and their evaluation context

pub mod behavior_tree;
pub mod blackboard;
pub mod context;

pub use behavior_tree::{BehaviorTree, NodeOutcome, NodeSpec, NodeStatus};
pub use blackboard::{keys, BbKey, Blackboard};
pub use context::BehaviorContext;
