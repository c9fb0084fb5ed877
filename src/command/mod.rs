//! Player input
//!
//! Commands speak the same vocabulary as the AI: direct orders become the
//! agent's intent, delegated orders become tasks in the marketplace.

pub mod executor;

pub use executor::{apply_command, CommandExecutor, PlayerCommand};
