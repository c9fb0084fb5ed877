//! Entities and the store that owns them

pub mod agent;
pub mod human;
pub mod store;
pub mod world_objects;

pub use agent::{ActiveAction, AgentState, Pregnancy, Target};
pub use human::{FoodKind, HumanEntity};
pub use store::{Entity, EntityBody, EntityKind, EntityStore};
pub use world_objects::{AnimalEntity, BerryBushEntity, BuildingEntity, BuildingKind, TreeEntity};
