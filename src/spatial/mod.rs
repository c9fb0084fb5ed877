//! Spatial structures over the wrapping map

pub mod grid;
pub mod index;
pub mod torus;

pub use grid::Grid;
pub use index::{PropertyKey, SpatialIndex};
pub use torus::{Rect, WorldMap};
