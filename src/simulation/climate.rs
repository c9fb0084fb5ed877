//! Seasonal temperature and bonfire warmth

use crate::core::config::SimulationConfig;
use crate::core::types::Vec2;
use crate::entity::store::{EntityKind, EntityStore};
use crate::spatial::index::SpatialIndex;

/// Ambient temperature for a point in the year
///
/// Coldest at the turn of the year, warmest at mid-year.
pub fn ambient_temperature(config: &SimulationConfig, year_fraction: f64) -> f32 {
    let phase = (year_fraction * std::f64::consts::TAU) as f32;
    config.base_temperature - config.seasonal_amplitude * phase.cos()
}

/// Whether a burning bonfire warms `pos`
pub fn near_fire(store: &EntityStore, index: &SpatialIndex, config: &SimulationConfig, pos: Vec2) -> bool {
    index
        .by_radius(pos, config.bonfire_warm_radius, Some(EntityKind::Building))
        .into_iter()
        .any(|id| store.building(id).is_some_and(|b| b.is_burning() && !b.marked_for_destruction))
}

/// Felt temperature at `pos`
pub fn temperature_at(
    store: &EntityStore,
    index: &SpatialIndex,
    config: &SimulationConfig,
    pos: Vec2,
    ambient: f32,
) -> f32 {
    if near_fire(store, index, config, pos) {
        ambient + config.bonfire_warmth
    } else {
        ambient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::store::EntityBody;
    use crate::entity::world_objects::BuildingEntity;
    use crate::spatial::torus::WorldMap;

    #[test]
    fn test_seasonal_curve() {
        let config = SimulationConfig::default();
        let winter = ambient_temperature(&config, 0.0);
        let summer = ambient_temperature(&config, 0.5);
        assert!((winter - (config.base_temperature - config.seasonal_amplitude)).abs() < 1e-4);
        assert!((summer - (config.base_temperature + config.seasonal_amplitude)).abs() < 1e-4);
        assert!(winter < config.cold_threshold);
    }

    #[test]
    fn test_burning_bonfire_warms_its_radius() {
        let config = SimulationConfig::default();
        let mut store = EntityStore::new();
        let fire = store.spawn(
            Vec2::new(100.0, 100.0),
            EntityBody::Building(BuildingEntity::bonfire(None, &config)),
        );
        let mut index = SpatialIndex::new(WorldMap::new(1000.0, 1000.0), 100.0);
        index.rebuild(&store);

        let close = temperature_at(&store, &index, &config, Vec2::new(150.0, 100.0), 0.0);
        let far = temperature_at(&store, &index, &config, Vec2::new(600.0, 600.0), 0.0);
        assert_eq!(close, config.bonfire_warmth);
        assert_eq!(far, 0.0);

        if let Some(b) = store.building_mut(fire) {
            b.fuel = 0.0;
        }
        assert_eq!(temperature_at(&store, &index, &config, Vec2::new(150.0, 100.0), 0.0), 0.0);
    }
}
