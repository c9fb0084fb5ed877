//! Territory ownership grid
//!
//! One coarse cell per `territory_cell_size` square, each owned by at most
//! one tribe (identified by its leader's id).

use serde::{Serialize, Serializer};

use crate::core::config::SimulationConfig;
use crate::core::types::{EntityId, Vec2};
use crate::spatial::grid::Grid;

#[derive(Debug, Clone)]
pub struct TerritoryGrid {
    grid: Grid<Option<EntityId>>,
}

impl TerritoryGrid {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            grid: Grid::new(
                config.territory_cols(),
                config.territory_rows(),
                config.territory_cell_size,
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    pub fn cols(&self) -> usize {
        self.grid.width
    }

    pub fn cell_of(&self, pos: Vec2) -> usize {
        let (x, y) = self.grid.world_to_cell(pos);
        self.grid.wrapped_index(x, y)
    }

    pub fn cell_center(&self, cell: usize) -> Vec2 {
        let (x, y) = self.grid.coords_of(cell);
        self.grid.cell_center(x as i32, y as i32)
    }

    pub fn neighbors(&self, cell: usize) -> [usize; 4] {
        self.grid.neighbors4(cell)
    }

    pub fn owner_at(&self, pos: Vec2) -> Option<EntityId> {
        *self.grid.sample(pos)
    }

    pub fn owner_of_cell(&self, cell: usize) -> Option<EntityId> {
        self.grid.get_index(cell).copied().flatten()
    }

    /// Take a cell regardless of its current owner
    pub fn claim_cell(&mut self, cell: usize, leader: EntityId) {
        self.grid.set_index(cell, Some(leader));
    }

    pub fn claim_at(&mut self, pos: Vec2, leader: EntityId) {
        let cell = self.cell_of(pos);
        self.claim_cell(cell, leader);
    }

    pub fn release_cell(&mut self, cell: usize) {
        self.grid.set_index(cell, None);
    }

    /// Claim the unowned cells within `radius` cells of `center`
    pub fn claim_around(&mut self, center: Vec2, radius: i32, leader: EntityId) -> usize {
        let (cx, cy) = self.grid.world_to_cell(center);
        let mut claimed = 0;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                let idx = self.grid.wrapped_index(cx + dx, cy + dy);
                if self.owner_of_cell(idx).is_none() {
                    self.grid.set_index(idx, Some(leader));
                    claimed += 1;
                }
            }
        }
        claimed
    }

    pub fn cells_owned_by(&self, leader: EntityId) -> Vec<usize> {
        self.grid
            .iter()
            .filter(|(_, owner)| **owner == Some(leader))
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn count_owned(&self, leader: EntityId) -> usize {
        self.grid
            .iter()
            .filter(|(_, owner)| **owner == Some(leader))
            .count()
    }

    /// Hand every cell of `from` to `to`
    pub fn transfer(&mut self, from: EntityId, to: EntityId) -> usize {
        let mut moved = 0;
        for owner in self.grid.iter_mut() {
            if *owner == Some(from) {
                *owner = Some(to);
                moved += 1;
            }
        }
        moved
    }

    /// Release every cell of `leader`
    pub fn clear_owner(&mut self, leader: EntityId) -> usize {
        let mut cleared = 0;
        for owner in self.grid.iter_mut() {
            if *owner == Some(leader) {
                *owner = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Release cells whose owner no longer backs a tribe
    pub fn reconcile(&mut self, mut is_valid_owner: impl FnMut(EntityId) -> bool) -> usize {
        let mut cleared = 0;
        for owner in self.grid.iter_mut() {
            if let Some(leader) = *owner {
                if !is_valid_owner(leader) {
                    *owner = None;
                    cleared += 1;
                }
            }
        }
        cleared
    }

    /// Distinct owners, in id order
    pub fn owners(&self) -> Vec<EntityId> {
        let mut owners: Vec<EntityId> = self.grid.iter().filter_map(|(_, o)| *o).collect();
        owners.sort_unstable();
        owners.dedup();
        owners
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, Option<EntityId>)> + '_ {
        self.grid.iter().map(|(idx, owner)| (idx, *owner))
    }
}

impl Serialize for TerritoryGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let cells: Vec<Option<u32>> = self.grid.iter().map(|(_, o)| o.map(|id| id.0)).collect();
        cells.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> TerritoryGrid {
        TerritoryGrid::new(&SimulationConfig::default())
    }

    #[test]
    fn test_claim_around_skips_owned_cells() {
        let mut t = grid();
        let center = Vec2::new(1500.0, 1500.0);
        t.claim_at(center, EntityId(9));
        let claimed = t.claim_around(center, 1, EntityId(1));
        assert_eq!(claimed, 4);
        assert_eq!(t.owner_at(center), Some(EntityId(9)));
        assert_eq!(t.count_owned(EntityId(1)), 4);
    }

    #[test]
    fn test_transfer_and_clear() {
        let mut t = grid();
        t.claim_around(Vec2::new(50.0, 50.0), 2, EntityId(1));
        let owned = t.count_owned(EntityId(1));
        assert_eq!(t.transfer(EntityId(1), EntityId(2)), owned);
        assert_eq!(t.count_owned(EntityId(1)), 0);
        assert_eq!(t.clear_owner(EntityId(2)), owned);
        assert!(t.owners().is_empty());
    }

    #[test]
    fn test_reconcile_releases_orphans() {
        let mut t = grid();
        t.claim_at(Vec2::new(10.0, 10.0), EntityId(1));
        t.claim_at(Vec2::new(500.0, 10.0), EntityId(2));
        let cleared = t.reconcile(|leader| leader == EntityId(2));
        assert_eq!(cleared, 1);
        assert_eq!(t.owners(), vec![EntityId(2)]);
    }

    #[test]
    fn test_claim_wraps_around_edges() {
        let mut t = grid();
        t.claim_around(Vec2::new(10.0, 10.0), 1, EntityId(3));
        assert_eq!(t.owner_at(Vec2::new(2950.0, 10.0)), Some(EntityId(3)));
    }
}
