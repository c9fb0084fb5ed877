//! Tribe Sim - deterministic tribe simulation on a wrapping map
//!
//! Humans, predators and prey are driven by behavior trees. Tribe leaders
//! post tasks to a marketplace that members score and claim; succession,
//! splits, diplomacy and strategy run on a slower maintenance cadence.

pub mod ai;
pub mod command;
pub mod core;
pub mod entity;
pub mod simulation;
pub mod spatial;
pub mod tasks;
pub mod tribe;
pub mod world;

pub use crate::core::{Result, SimulationConfig, TribeError};
pub use crate::world::World;
