pub mod calendar;
pub mod config;
pub mod error;
pub mod types;

pub use calendar::{GameClock, TimePeriod};
pub use config::SimulationConfig;
pub use error::{Result, TribeError};
pub use types::{EntityId, GameHours, Gender, Vec2};
