//! Leader-held tribe state and tribe identity

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, GameHours};
use crate::tasks::TaskKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum TribeRole {
    #[default]
    Gatherer,
    Builder,
    Hunter,
    Guard,
}

impl TribeRole {
    pub const ALL: [TribeRole; 4] = [
        TribeRole::Gatherer,
        TribeRole::Builder,
        TribeRole::Hunter,
        TribeRole::Guard,
    ];

    /// Multiplier a role applies to a task kind's score
    pub fn affinity(&self, kind: TaskKind) -> f32 {
        let favored = match self {
            TribeRole::Gatherer => matches!(kind, TaskKind::GatherFood | TaskKind::PlantBush),
            TribeRole::Builder => matches!(
                kind,
                TaskKind::BuildStorage
                    | TaskKind::BuildBonfire
                    | TaskKind::FuelBonfire
                    | TaskKind::ClaimTerritory
            ),
            TribeRole::Hunter => matches!(kind, TaskKind::HuntPrey),
            TribeRole::Guard => matches!(kind, TaskKind::DefendTerritory | TaskKind::ClaimTerritory),
        };
        if favored {
            1.5
        } else {
            1.0
        }
    }
}

/// Share of the tribe's adults the leader wants in each role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleWeights {
    pub gatherer: f32,
    pub builder: f32,
    pub hunter: f32,
    pub guard: f32,
}

impl Default for RoleWeights {
    fn default() -> Self {
        Self {
            gatherer: 0.4,
            builder: 0.2,
            hunter: 0.2,
            guard: 0.2,
        }
    }
}

impl RoleWeights {
    pub fn weight(&self, role: TribeRole) -> f32 {
        match role {
            TribeRole::Gatherer => self.gatherer,
            TribeRole::Builder => self.builder,
            TribeRole::Hunter => self.hunter,
            TribeRole::Guard => self.guard,
        }
    }

    /// Role with the largest shortfall between wanted and current share
    pub fn most_needed(&self, counts: &BTreeMap<TribeRole, usize>, total: usize) -> TribeRole {
        let total = total.max(1) as f32;
        let mut best = TribeRole::Gatherer;
        let mut best_gap = f32::MIN;
        for role in TribeRole::ALL {
            let have = counts.get(&role).copied().unwrap_or(0) as f32 / total;
            let gap = self.weight(role) - have;
            if gap > best_gap {
                best_gap = gap;
                best = role;
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DiplomacyStatus {
    #[default]
    Friendly,
    Hostile,
}

/// Tribe-wide bias on task scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrategicObjective {
    #[default]
    None,
    GreatHarvest,
    Fortify,
    Expansion,
}

impl StrategicObjective {
    pub fn multiplier(&self, kind: TaskKind) -> f32 {
        match (self, kind) {
            (StrategicObjective::GreatHarvest, TaskKind::GatherFood | TaskKind::PlantBush) => 2.0,
            (
                StrategicObjective::Fortify,
                TaskKind::BuildStorage
                | TaskKind::BuildBonfire
                | TaskKind::FuelBonfire
                | TaskKind::DefendTerritory,
            ) => 1.5,
            (StrategicObjective::Expansion, TaskKind::ClaimTerritory) => 2.0,
            (StrategicObjective::Expansion, TaskKind::HuntPrey) => 1.2,
            _ => 1.0,
        }
    }
}

/// State only a leader carries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TribeControl {
    pub role_weights: RoleWeights,
    /// Stance towards other tribes, keyed by their leader
    pub diplomacy: BTreeMap<EntityId, DiplomacyStatus>,
    pub objective: StrategicObjective,
    pub next_diplomacy_at: GameHours,
    pub next_strategy_at: GameHours,
}

impl TribeControl {
    pub fn stance_towards(&self, other_leader: EntityId) -> DiplomacyStatus {
        self.diplomacy
            .get(&other_leader)
            .copied()
            .unwrap_or_default()
    }

    /// Re-key diplomacy after another tribe changed leader
    pub fn rename_leader(&mut self, old: EntityId, new: EntityId) {
        if let Some(status) = self.diplomacy.remove(&old) {
            self.diplomacy.insert(new, status);
        }
    }
}

/// Visual identity of a tribe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TribeInfo {
    pub badge: String,
    pub color: [u8; 3],
}

const BADGES: &[&str] = &[
    "wolf", "bear", "hawk", "elk", "fox", "owl", "boar", "lynx", "heron", "otter", "raven",
    "bison", "viper", "stag", "crane", "badger",
];

impl TribeInfo {
    pub fn generate(rng: &mut impl Rng) -> Self {
        let badge = BADGES.choose(rng).copied().unwrap_or("wolf");
        Self {
            badge: badge.to_string(),
            color: [rng.gen_range(40..=230), rng.gen_range(40..=230), rng.gen_range(40..=230)],
        }
    }
}
