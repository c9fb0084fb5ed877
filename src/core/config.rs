//! Simulation configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other. The ecosystem balancer (an
//! external system) may rewrite any of these between runs; the core only
//! reads them.

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TribeError};

/// Configuration for the simulation systems
///
/// Loadable from TOML. Missing keys fall back to the defaults below, so a
/// config file only needs to name what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === WORLD ===
    /// Seed for the world's random source
    pub seed: u64,

    /// Width of the wrapping map (world units)
    pub map_width: f32,

    /// Height of the wrapping map (world units)
    pub map_height: f32,

    /// Size of each bucket in the spatial index (world units)
    ///
    /// Should be well under the common query radii; radius queries scan
    /// (2r / cell)^2 buckets.
    pub index_cell_size: f32,

    /// Size of each territory ownership cell (world units)
    pub territory_cell_size: f32,

    // === TIME ===
    /// Game hours that pass per real second
    pub game_hours_per_real_second: f64,

    /// Largest slice of real time a single sub-step may consume
    ///
    /// Bounds the magnitude of any single state change regardless of
    /// frame hitches.
    pub max_substep_seconds: f64,

    /// Game hours in one year (ageing and the seasonal cycle)
    pub hours_per_year: f64,

    // === CLIMATE ===
    /// Mean ambient temperature (degrees)
    pub base_temperature: f32,

    /// Half the peak-to-peak seasonal swing (degrees)
    pub seasonal_amplitude: f32,

    /// Below this temperature humans get cold and tribes want a bonfire
    pub cold_threshold: f32,

    /// Coldness gained per hour while below the cold threshold (0-100 scale)
    pub cold_rate: f32,

    /// Coldness lost per hour while warm
    pub warm_rate: f32,

    /// Coldness at which a human starts seeking warmth
    pub cold_seek_threshold: f32,

    /// Hitpoints lost per hour at maximum coldness
    pub cold_damage_rate: f32,

    /// Temperature bonus within a burning bonfire's radius
    pub bonfire_warmth: f32,

    /// Radius of a bonfire's warmth (world units)
    pub bonfire_warm_radius: f32,

    // === HUMANS ===
    pub human_max_hitpoints: f32,

    /// Movement speed (world units per game hour)
    pub human_speed: f32,

    /// Age (years) at which a human becomes an adult
    pub human_adult_age: f32,

    /// Age (years) at which a human dies of old age
    pub human_max_age: f32,

    /// Hunger gained per hour (0-100 scale)
    pub human_hunger_rate: f32,

    /// Hunger above which an agent is considered hungry
    pub hunger_threshold: f32,

    /// Hitpoints lost per hour at maximum hunger
    pub starvation_damage_rate: f32,

    /// Hitpoints regained per hour while fed and warm
    pub hitpoint_regen_rate: f32,

    /// Hunger removed by eating one food item
    pub food_hunger_reduction: f32,

    /// Food items a human can carry
    pub max_food_inventory: usize,

    /// Wood a human can carry
    pub max_wood_carried: u32,

    /// Bounded length of the ancestor list kept on each human
    ///
    /// Long enough to cover great-grandparents on both sides, which is
    /// what the common-ancestor short-circuit needs.
    pub max_ancestor_ids: usize,

    /// Hours from conception to birth for humans
    pub human_gestation_hours: f64,

    /// Hours a human must wait between procreation attempts
    pub human_procreation_cooldown_hours: f64,

    pub human_attack_damage: f32,

    // === ANIMALS ===
    pub prey_max_hitpoints: f32,
    pub prey_speed: f32,
    pub prey_adult_age: f32,
    pub prey_max_age: f32,
    pub prey_hunger_rate: f32,
    pub prey_gestation_hours: f64,
    pub prey_procreation_cooldown_hours: f64,

    /// Distance at which prey notice and flee a predator
    pub prey_flee_radius: f32,

    pub predator_max_hitpoints: f32,
    pub predator_speed: f32,
    pub predator_adult_age: f32,
    pub predator_max_age: f32,
    pub predator_hunger_rate: f32,
    pub predator_gestation_hours: f64,
    pub predator_procreation_cooldown_hours: f64,
    pub predator_attack_damage: f32,

    /// Distance within which a hungry predator looks for a kill
    pub predator_hunt_radius: f32,

    /// Hunger removed from a predator that lands a kill
    pub predator_kill_hunger_reduction: f32,

    // === SHARED AGENT ===
    /// Distance at which two entities can interact (world units)
    pub interaction_range: f32,

    /// General awareness radius (partners, threats, nearby resources)
    pub perception_radius: f32,

    /// Hours between two attacks by the same agent
    pub attack_cooldown_hours: f64,

    /// Hours between two gather/chop/graze actions by the same agent
    pub action_cooldown_hours: f64,

    // === PLANTS & BUILDINGS ===
    pub bush_max_food: u32,

    /// Hours for a bush to regrow one berry
    pub bush_regrow_hours: f64,

    pub tree_max_wood: u32,

    /// Food items one storage spot can hold
    pub storage_capacity: usize,

    pub bonfire_max_fuel: f32,

    /// Fuel added per unit of wood
    pub bonfire_fuel_per_wood: f32,

    /// Fuel burned per hour
    pub bonfire_burn_rate: f32,

    /// Humans that may warm at one bonfire at once
    pub bonfire_capacity: usize,

    /// Age after which a warmth coordination record is considered stale
    pub warmth_timeout_hours: f64,

    /// Minimum distance between two buildings of the same kind
    pub building_min_spacing: f32,

    // === TASK MARKETPLACE ===
    /// Hours between producer runs for one tribe
    pub producer_interval_hours: f64,

    /// How long a produced task stays valid without a refresh
    pub task_validity_hours: f64,

    /// Storage fill fraction above which another storage is requested
    pub storage_utilization_threshold: f32,

    /// Fuel fraction below which a bonfire asks for wood
    pub bonfire_refuel_threshold: f32,

    /// Desired bushes per tribe member
    pub bushes_per_member_target: f32,

    pub max_gather_tasks: usize,
    pub max_claim_tasks: usize,

    /// Territory cells examined per frontier-scan invocation
    pub border_scan_slice: usize,

    /// Tasks further than this are never scored
    pub max_task_distance: f32,

    /// Distance at which the distance factor of a task score halves
    pub task_distance_falloff: f32,

    /// Stored food per member below which hunting is requested
    pub hunt_food_per_member: f32,

    /// Radius around the tribe centre searched for prey and intruders
    pub tribe_watch_radius: f32,

    // === TRIBES ===
    /// Hours between maintenance passes (succession, splits, producers)
    pub maintenance_interval_hours: f64,

    /// Hours between diplomacy recomputations for one tribe
    pub diplomacy_interval_hours: f64,

    /// Strength ratio over another tribe that turns us hostile
    pub dominance_ratio: f32,

    /// Hours between strategy and role reassessments
    pub strategy_interval_hours: f64,

    /// Radius (in territory cells) claimed by a newly founded tribe
    pub initial_territory_radius_cells: i32,

    /// Fraction of tribe adults a family must reach before it may split
    pub split_fraction_threshold: f32,

    /// Tribes with fewer adults never split
    pub split_min_tribe_adults: usize,

    pub split_gather_radius: f32,

    /// Fraction of the family that must be gathered to move on
    pub split_gather_fraction: f32,

    pub split_gather_timeout_hours: f64,
    pub split_migration_timeout_hours: f64,
    pub split_migration_distance: f32,

    /// Radius around the founder whose family members join the new tribe
    pub split_execute_radius: f32,

    /// Hours a founder waits after a failed split attempt
    pub split_cooldown_hours: f64,

    // === EFFECTS ===
    /// Lifetime of transient visual effects (hours)
    pub effect_duration_hours: f64,

    // === WORLD GENERATION ===
    /// Humans per generated tribe, leader included
    pub initial_tribe_size: usize,

    /// Owned bushes planted around each generated tribe
    pub initial_bushes_per_tribe: usize,

    pub initial_wild_bushes: usize,
    pub initial_trees: usize,
    pub initial_prey: usize,
    pub initial_predators: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            map_width: 3000.0,
            map_height: 3000.0,
            index_cell_size: 100.0,
            territory_cell_size: 100.0,

            // One game day every 60 real seconds; one year per game day
            game_hours_per_real_second: 0.4,
            max_substep_seconds: 1.0 / 60.0,
            hours_per_year: 24.0,

            base_temperature: 12.0,
            seasonal_amplitude: 14.0,
            cold_threshold: 8.0,
            cold_rate: 20.0,
            warm_rate: 40.0,
            cold_seek_threshold: 40.0,
            cold_damage_rate: 2.0,
            bonfire_warmth: 15.0,
            bonfire_warm_radius: 120.0,

            human_max_hitpoints: 100.0,
            human_speed: 300.0,
            human_adult_age: 16.0,
            human_max_age: 60.0,
            human_hunger_rate: 4.0,
            hunger_threshold: 60.0,
            starvation_damage_rate: 5.0,
            hitpoint_regen_rate: 2.0,
            food_hunger_reduction: 30.0,
            max_food_inventory: 8,
            max_wood_carried: 3,
            max_ancestor_ids: 14,
            human_gestation_hours: 8.0,
            human_procreation_cooldown_hours: 6.0,
            human_attack_damage: 12.0,

            prey_max_hitpoints: 40.0,
            prey_speed: 280.0,
            prey_adult_age: 2.0,
            prey_max_age: 20.0,
            prey_hunger_rate: 3.0,
            prey_gestation_hours: 10.0,
            prey_procreation_cooldown_hours: 8.0,
            prey_flee_radius: 150.0,

            predator_max_hitpoints: 80.0,
            predator_speed: 330.0,
            predator_adult_age: 3.0,
            predator_max_age: 25.0,
            predator_hunger_rate: 3.0,
            predator_gestation_hours: 14.0,
            predator_procreation_cooldown_hours: 14.0,
            predator_attack_damage: 15.0,
            predator_hunt_radius: 400.0,
            predator_kill_hunger_reduction: 60.0,

            interaction_range: 25.0,
            perception_radius: 300.0,
            attack_cooldown_hours: 0.2,
            action_cooldown_hours: 0.2,

            bush_max_food: 5,
            bush_regrow_hours: 1.5,
            tree_max_wood: 10,
            storage_capacity: 30,
            bonfire_max_fuel: 10.0,
            bonfire_fuel_per_wood: 4.0,
            bonfire_burn_rate: 0.5,
            bonfire_capacity: 3,
            warmth_timeout_hours: 3.0,
            building_min_spacing: 80.0,

            producer_interval_hours: 1.0,
            task_validity_hours: 2.0,
            storage_utilization_threshold: 0.8,
            bonfire_refuel_threshold: 0.3,
            bushes_per_member_target: 1.0,
            max_gather_tasks: 8,
            max_claim_tasks: 4,
            border_scan_slice: 32,
            max_task_distance: 900.0,
            task_distance_falloff: 200.0,
            hunt_food_per_member: 1.0,
            tribe_watch_radius: 400.0,

            maintenance_interval_hours: 0.5,
            diplomacy_interval_hours: 6.0,
            dominance_ratio: 1.5,
            strategy_interval_hours: 4.0,
            initial_territory_radius_cells: 2,
            split_fraction_threshold: 0.3,
            split_min_tribe_adults: 6,
            split_gather_radius: 150.0,
            split_gather_fraction: 0.6,
            split_gather_timeout_hours: 6.0,
            split_migration_timeout_hours: 12.0,
            split_migration_distance: 700.0,
            split_execute_radius: 250.0,
            split_cooldown_hours: 48.0,

            effect_duration_hours: 0.5,

            initial_tribe_size: 8,
            initial_bushes_per_tribe: 4,
            initial_wild_bushes: 40,
            initial_trees: 60,
            initial_prey: 30,
            initial_predators: 6,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; unspecified keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.map_width <= 0.0 || self.map_height <= 0.0 {
            return Err(TribeError::InvalidConfig(
                "map dimensions must be positive".into(),
            ));
        }

        if self.index_cell_size <= 0.0 || self.territory_cell_size <= 0.0 {
            return Err(TribeError::InvalidConfig(
                "cell sizes must be positive".into(),
            ));
        }

        if self.territory_cell_size > self.map_width.min(self.map_height) {
            return Err(TribeError::InvalidConfig(format!(
                "territory_cell_size ({}) exceeds the map",
                self.territory_cell_size
            )));
        }

        if self.max_substep_seconds <= 0.0 || self.game_hours_per_real_second <= 0.0 {
            return Err(TribeError::InvalidConfig(
                "time scaling must be positive".into(),
            ));
        }

        if self.human_hunger_rate <= 0.0
            || self.prey_hunger_rate <= 0.0
            || self.predator_hunger_rate <= 0.0
        {
            return Err(TribeError::InvalidConfig("hunger rates must be positive".into()));
        }

        if self.hunger_threshold >= 100.0 {
            return Err(TribeError::InvalidConfig(format!(
                "hunger_threshold ({}) should be < 100",
                self.hunger_threshold
            )));
        }

        if !(0.0..=1.0).contains(&self.storage_utilization_threshold)
            || !(0.0..=1.0).contains(&self.split_fraction_threshold)
        {
            return Err(TribeError::InvalidConfig(
                "fractions must lie within [0, 1]".into(),
            ));
        }

        if self.bonfire_capacity == 0 || self.border_scan_slice == 0 {
            return Err(TribeError::InvalidConfig(
                "bonfire_capacity and border_scan_slice must be at least 1".into(),
            ));
        }

        if self.human_adult_age >= self.human_max_age {
            return Err(TribeError::InvalidConfig(
                "human_adult_age should be < human_max_age".into(),
            ));
        }

        Ok(())
    }

    /// Number of territory columns covering the map
    pub fn territory_cols(&self) -> usize {
        (self.map_width / self.territory_cell_size).ceil().max(1.0) as usize
    }

    /// Number of territory rows covering the map
    pub fn territory_rows(&self) -> usize {
        (self.map_height / self.territory_cell_size).ceil().max(1.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str("seed = 7\nbonfire_capacity = 5\n").unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.bonfire_capacity, 5);
        assert_eq!(config.storage_capacity, SimulationConfig::default().storage_capacity);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = SimulationConfig::from_toml_str("hunger_threshold = 150.0\n");
        assert!(matches!(result, Err(TribeError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = SimulationConfig::from_toml_str("seed = \"not a number\"\n");
        assert!(matches!(result, Err(TribeError::ConfigParse(_))));
    }

    #[test]
    fn test_territory_dimensions() {
        let config = SimulationConfig::default();
        assert_eq!(config.territory_cols(), 30);
        assert_eq!(config.territory_rows(), 30);
    }
}
