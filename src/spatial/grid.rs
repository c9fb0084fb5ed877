//! Generic wrapping grid for coarse spatial data

use crate::core::types::Vec2;

/// Generic 2D grid with configurable cell size over a wrapping map
///
/// Cell coordinates outside the grid wrap around, matching the torus the
/// grid covers.
#[derive(Debug, Clone)]
pub struct Grid<T: Clone + Default> {
    pub width: usize,
    pub height: usize,
    pub cell_size: f32,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(width: usize, height: usize, cell_size: f32) -> Self {
        Self {
            width,
            height,
            cell_size,
            data: vec![T::default(); width * height],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat index of a (possibly out-of-range) cell, wrapped onto the grid
    #[inline]
    pub fn wrapped_index(&self, x: i32, y: i32) -> usize {
        let wx = x.rem_euclid(self.width as i32) as usize;
        let wy = y.rem_euclid(self.height as i32) as usize;
        wy * self.width + wx
    }

    #[inline]
    pub fn coords_of(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> &T {
        &self.data[self.wrapped_index(x, y)]
    }

    #[inline]
    pub fn get_index(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, value: T) {
        let idx = self.wrapped_index(x, y);
        self.data[idx] = value;
    }

    #[inline]
    pub fn set_index(&mut self, index: usize, value: T) {
        if let Some(cell) = self.data.get_mut(index) {
            *cell = value;
        }
    }

    /// Convert world position to cell coordinates
    #[inline]
    pub fn world_to_cell(&self, pos: Vec2) -> (i32, i32) {
        let x = (pos.x / self.cell_size).floor() as i32;
        let y = (pos.y / self.cell_size).floor() as i32;
        (
            x.rem_euclid(self.width as i32),
            y.rem_euclid(self.height as i32),
        )
    }

    /// Sample grid at world position
    pub fn sample(&self, pos: Vec2) -> &T {
        let (x, y) = self.world_to_cell(pos);
        self.get(x, y)
    }

    /// Cell center in world coordinates
    pub fn cell_center(&self, x: i32, y: i32) -> Vec2 {
        let idx = self.wrapped_index(x, y);
        let (wx, wy) = self.coords_of(idx);
        Vec2::new(
            (wx as f32 + 0.5) * self.cell_size,
            (wy as f32 + 0.5) * self.cell_size,
        )
    }

    /// Four orthogonal neighbours of a flat index, wrapped
    pub fn neighbors4(&self, index: usize) -> [usize; 4] {
        let (x, y) = self.coords_of(index);
        let (x, y) = (x as i32, y as i32);
        [
            self.wrapped_index(x + 1, y),
            self.wrapped_index(x - 1, y),
            self.wrapped_index(x, y + 1),
            self.wrapped_index(x, y - 1),
        ]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.data.iter().enumerate()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.data.iter_mut()
    }
}
