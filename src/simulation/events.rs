//! Events emitted by the world loop
//!
//! These are returned by [`advance`](crate::simulation::advance) for logs,
//! UI notifications and tests. The simulation never reads them back.

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, GameHours};
use crate::entity::store::EntityKind;
use crate::entity::world_objects::BuildingKind;
use crate::tribe::control::{DiplomacyStatus, StrategicObjective};
use crate::tribe::split::SplitPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    OldAge,
    Starvation,
    Cold,
    Killed { by: EntityId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationEvent {
    Birth {
        child: EntityId,
        mother: EntityId,
        kind: EntityKind,
    },
    Death {
        entity: EntityId,
        kind: EntityKind,
        cause: DeathCause,
    },
    BuildingPlaced {
        building: EntityId,
        kind: BuildingKind,
        owner: Option<EntityId>,
    },
    BushPlanted {
        bush: EntityId,
        owner: Option<EntityId>,
    },
    /// A member took over a tribe whose leader died or left
    LeaderSucceeded {
        old_leader: EntityId,
        new_leader: EntityId,
    },
    /// A whole tribe joined another one
    TribeMerged {
        from_leader: EntityId,
        into_leader: EntityId,
        members: usize,
    },
    /// A tribe with no path to a successor was wound up
    TribeDissolved {
        leader: EntityId,
        cells_released: usize,
        buildings_marked: usize,
    },
    SplitPhaseChanged {
        founder: EntityId,
        phase: SplitPhase,
    },
    SplitFailed {
        founder: EntityId,
    },
    TribeSplit {
        parent_leader: EntityId,
        founder: EntityId,
        members: usize,
    },
    DiplomacyChanged {
        leader: EntityId,
        other: EntityId,
        status: DiplomacyStatus,
    },
    ObjectiveChanged {
        leader: EntityId,
        objective: StrategicObjective,
    },
    GameOver {
        at: GameHours,
        outcome: GameOutcome,
    },
}

/// Outcome of the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameOutcome {
    /// Every human has died
    Extinction { births: u64, deaths: u64 },
    /// Simulation still in progress
    InProgress,
}
