//! Bucketed entity lookup on the wrapping map
//!
//! The index is rebuilt from the entity store at the start of every
//! sub-step and is never authoritative: an id returned by a query may have
//! died since the rebuild, so callers re-resolve it through the store.

use std::collections::BTreeSet;

use ahash::AHashMap;

use crate::core::types::{EntityId, Vec2};
use crate::entity::store::{EntityBody, EntityKind, EntityStore};
use crate::spatial::torus::{Rect, WorldMap};

/// Exact-match keys for non-spatial lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// Humans following a leader
    Leader,
    /// Buildings and bushes owned by a leader
    Owner,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexedEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
}

/// Sparse hash grid over the torus, bucketed by cell and kind
pub struct SpatialIndex {
    map: WorldMap,
    cell_size: f32,
    cols: i32,
    rows: i32,
    cells: AHashMap<(i32, i32), Vec<IndexedEntity>>,
    entries: AHashMap<EntityId, IndexedEntity>,
    by_kind: AHashMap<EntityKind, Vec<EntityId>>,
    properties: AHashMap<(PropertyKey, EntityId), Vec<EntityId>>,
}

impl SpatialIndex {
    pub fn new(map: WorldMap, cell_size: f32) -> Self {
        Self {
            map,
            cell_size,
            cols: (map.width / cell_size).ceil().max(1.0) as i32,
            rows: (map.height / cell_size).ceil().max(1.0) as i32,
            cells: AHashMap::new(),
            entries: AHashMap::new(),
            by_kind: AHashMap::new(),
            properties: AHashMap::new(),
        }
    }

    #[inline]
    fn cell_coord(&self, pos: Vec2) -> (i32, i32) {
        let p = self.map.wrap(pos);
        (
            ((p.x / self.cell_size).floor() as i32).rem_euclid(self.cols),
            ((p.y / self.cell_size).floor() as i32).rem_euclid(self.rows),
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.entries.clear();
        self.by_kind.clear();
        self.properties.clear();
    }

    pub fn insert(&mut self, entry: IndexedEntity) {
        let coord = self.cell_coord(entry.position);
        self.cells.entry(coord).or_default().push(entry);
        self.by_kind.entry(entry.kind).or_default().push(entry.id);
        self.entries.insert(entry.id, entry);
    }

    fn index_property(&mut self, key: PropertyKey, value: EntityId, id: EntityId) {
        self.properties.entry((key, value)).or_default().push(id);
    }

    /// Rebuild the whole index from the store
    pub fn rebuild(&mut self, store: &EntityStore) {
        self.clear();
        for entity in store.iter() {
            self.insert(IndexedEntity {
                id: entity.id,
                kind: entity.kind(),
                position: entity.position,
            });
            match &entity.body {
                EntityBody::Human(h) => {
                    if let Some(leader) = h.leader_id {
                        self.index_property(PropertyKey::Leader, leader, entity.id);
                    }
                }
                EntityBody::Building(b) => {
                    if let Some(owner) = b.owner_id {
                        self.index_property(PropertyKey::Owner, owner, entity.id);
                    }
                }
                EntityBody::BerryBush(b) => {
                    if let Some(owner) = b.owner_id {
                        self.index_property(PropertyKey::Owner, owner, entity.id);
                    }
                }
                EntityBody::Predator(_) | EntityBody::Prey(_) | EntityBody::Tree(_) => {}
            }
        }
        // Store iteration is id-ordered, so every bucket already is too
    }

    /// Wrapped cell indices along one axis covering `[c - r, c + r]`
    fn axis_span(center: i32, reach: i32, size: i32) -> BTreeSet<i32> {
        if 2 * reach + 1 >= size {
            return (0..size).collect();
        }
        (center - reach..=center + reach)
            .map(|c| c.rem_euclid(size))
            .collect()
    }

    /// Entities within `radius` of `center`, optionally of one kind
    pub fn by_radius(&self, center: Vec2, radius: f32, kind: Option<EntityKind>) -> Vec<EntityId> {
        let mut found: Vec<EntityId> = self
            .scan_radius(center, radius, kind)
            .map(|e| e.id)
            .collect();
        found.sort_unstable();
        found
    }

    fn scan_radius(
        &self,
        center: Vec2,
        radius: f32,
        kind: Option<EntityKind>,
    ) -> impl Iterator<Item = &IndexedEntity> + '_ {
        let (cx, cy) = self.cell_coord(center);
        let reach = (radius / self.cell_size).ceil() as i32 + 1;
        let xs = Self::axis_span(cx, reach, self.cols);
        let ys = Self::axis_span(cy, reach, self.rows);
        let radius_sq = radius * radius;

        xs.into_iter()
            .flat_map(move |x| ys.clone().into_iter().map(move |y| (x, y)))
            .filter_map(move |coord| self.cells.get(&coord))
            .flatten()
            .filter(move |e| kind.map_or(true, |k| e.kind == k))
            .filter(move |e| self.map.distance_sq(center, e.position) <= radius_sq)
    }

    /// Entities inside a (possibly wrapping) rectangle
    pub fn by_rect(&self, rect: &Rect, kind: Option<EntityKind>) -> Vec<EntityId> {
        let mut found: Vec<EntityId> = self
            .entries
            .values()
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .filter(|e| self.map.rect_contains(rect, e.position))
            .map(|e| e.id)
            .collect();
        found.sort_unstable();
        found
    }

    /// Exact-match lookup, e.g. every human whose leader is `value`
    pub fn by_property(&self, key: PropertyKey, value: EntityId) -> &[EntityId] {
        self.properties
            .get(&(key, value))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Closest entity to `point` within `tolerance`
    pub fn at(&self, point: Vec2, tolerance: f32) -> Option<EntityId> {
        self.nearest(point, tolerance, None, |_| true)
    }

    /// Closest entity within `radius` accepted by `predicate`; ties go to the lower id
    pub fn nearest(
        &self,
        point: Vec2,
        radius: f32,
        kind: Option<EntityKind>,
        mut predicate: impl FnMut(EntityId) -> bool,
    ) -> Option<EntityId> {
        let mut best: Option<(f32, EntityId)> = None;
        for e in self.scan_radius(point, radius, kind) {
            if !predicate(e.id) {
                continue;
            }
            let d = self.map.distance_sq(point, e.position);
            let better = match best {
                None => true,
                Some((bd, bid)) => d < bd || (d == bd && e.id < bid),
            };
            if better {
                best = Some((d, e.id));
            }
        }
        best.map(|(_, id)| id)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn count_kind(&self, kind: EntityKind) -> usize {
        self.by_kind.get(&kind).map_or(0, |v| v.len())
    }

    pub fn ids_of_kind(&self, kind: EntityKind) -> &[EntityId] {
        self.by_kind.get(&kind).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Position as of the last rebuild
    pub fn position_of(&self, id: EntityId) -> Option<Vec2> {
        self.entries.get(&id).map(|e| e.position)
    }

    pub fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        self.entries.get(&id).map(|e| e.kind)
    }

    pub fn map(&self) -> &WorldMap {
        &self.map
    }
}
