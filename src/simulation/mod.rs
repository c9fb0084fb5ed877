pub mod agents;
pub mod behaviors;
pub mod climate;
pub mod decay;
pub mod events;
pub mod interactions;
pub mod maintenance;
pub mod tick;

pub use events::{DeathCause, GameOutcome, SimulationEvent};
pub use maintenance::run_maintenance;
pub use tick::{advance, check_game_over, run_substep};
