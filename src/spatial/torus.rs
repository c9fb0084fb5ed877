//! Wrapping (toroidal) map geometry
//!
//! The left/right and top/bottom edges are adjacent. Every displacement is
//! the shorter of the direct and the wrapped-around path.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldMap {
    pub width: f32,
    pub height: f32,
}

/// Axis-aligned rectangle; may extend past the map edge and wrap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn centered(center: Vec2, half_extent: f32) -> Self {
        Self {
            x: center.x - half_extent,
            y: center.y - half_extent,
            width: half_extent * 2.0,
            height: half_extent * 2.0,
        }
    }
}

impl WorldMap {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Bring a point back onto the map
    pub fn wrap(&self, p: Vec2) -> Vec2 {
        Vec2::new(Self::wrap_coord(p.x, self.width), Self::wrap_coord(p.y, self.height))
    }

    fn wrap_coord(v: f32, size: f32) -> f32 {
        let w = v.rem_euclid(size);
        // Tiny negatives round up to exactly `size`
        if w >= size {
            0.0
        } else {
            w
        }
    }

    fn wrap_axis(d: f32, size: f32) -> f32 {
        let d = d.rem_euclid(size);
        if d > size / 2.0 {
            d - size
        } else {
            d
        }
    }

    /// Shortest displacement from `from` to `to`
    pub fn delta(&self, from: Vec2, to: Vec2) -> Vec2 {
        Vec2::new(
            Self::wrap_axis(to.x - from.x, self.width),
            Self::wrap_axis(to.y - from.y, self.height),
        )
    }

    pub fn distance_sq(&self, a: Vec2, b: Vec2) -> f32 {
        self.delta(a, b).length_sq()
    }

    pub fn distance(&self, a: Vec2, b: Vec2) -> f32 {
        self.delta(a, b).length()
    }

    /// Unit vector pointing from `from` towards `to` along the shorter path
    pub fn direction(&self, from: Vec2, to: Vec2) -> Vec2 {
        self.delta(from, to).normalize()
    }

    /// Move up to `step` towards `to`, never overshooting
    pub fn step_towards(&self, from: Vec2, to: Vec2, step: f32) -> Vec2 {
        let d = self.delta(from, to);
        let len = d.length();
        if len <= step || len < 0.0001 {
            return self.wrap(to);
        }
        self.wrap(from + d * (step / len))
    }

    /// Move `step` directly away from `threat`
    pub fn step_away(&self, from: Vec2, threat: Vec2, step: f32) -> Vec2 {
        let mut dir = self.direction(threat, from);
        if dir.length_sq() < 0.0001 {
            dir = Vec2::new(1.0, 0.0);
        }
        self.wrap(from + dir * step)
    }

    /// Whether `p` lies in `rect`, taking wrap-around into account
    pub fn rect_contains(&self, rect: &Rect, p: Vec2) -> bool {
        let dx = (p.x - rect.x).rem_euclid(self.width);
        let dy = (p.y - rect.y).rem_euclid(self.height);
        dx <= rect.width && dy <= rect.height
    }

    /// Circular mean of a set of points
    ///
    /// A plain average breaks for groups straddling an edge; mapping each
    /// axis onto a circle and averaging the angle does not.
    pub fn centroid(&self, points: &[Vec2]) -> Option<Vec2> {
        if points.is_empty() {
            return None;
        }
        let tau = std::f32::consts::TAU;
        let (mut sx, mut cx, mut sy, mut cy) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
        for p in points {
            let ax = p.x / self.width * tau;
            let ay = p.y / self.height * tau;
            sx += ax.sin();
            cx += ax.cos();
            sy += ay.sin();
            cy += ay.cos();
        }
        let mean_x = circular_mean(sx, cx, self.width);
        let mean_y = circular_mean(sy, cy, self.height);
        Some(self.wrap(Vec2::new(mean_x, mean_y)))
    }
}

fn circular_mean(sin_sum: f32, cos_sum: f32, size: f32) -> f32 {
    let angle = sin_sum.atan2(cos_sum);
    angle.rem_euclid(std::f32::consts::TAU) / std::f32::consts::TAU * size
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> WorldMap {
        WorldMap::new(1000.0, 1000.0)
    }

    #[test]
    fn test_direct_distance() {
        let d = map().distance(Vec2::new(100.0, 100.0), Vec2::new(400.0, 500.0));
        assert!((d - 500.0).abs() < 1e-3);
    }

    #[test]
    fn test_wrapped_distance_is_shorter() {
        let m = map();
        let a = Vec2::new(10.0, 500.0);
        let b = Vec2::new(990.0, 500.0);
        assert!((m.distance(a, b) - 20.0).abs() < 1e-3);
        assert!(m.delta(a, b).x < 0.0);
    }

    #[test]
    fn test_step_towards_crosses_edge() {
        let m = map();
        let p = m.step_towards(Vec2::new(5.0, 5.0), Vec2::new(995.0, 5.0), 8.0);
        assert!((p.x - 997.0).abs() < 1e-3);
    }

    #[test]
    fn test_step_towards_does_not_overshoot() {
        let m = map();
        let p = m.step_towards(Vec2::new(0.0, 0.0), Vec2::new(3.0, 4.0), 100.0);
        assert_eq!(p, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_rect_contains_wrapping() {
        let m = map();
        let rect = Rect::new(950.0, 950.0, 100.0, 100.0);
        assert!(m.rect_contains(&rect, Vec2::new(20.0, 20.0)));
        assert!(m.rect_contains(&rect, Vec2::new(960.0, 990.0)));
        assert!(!m.rect_contains(&rect, Vec2::new(500.0, 20.0)));
    }

    #[test]
    fn test_centroid_across_edge() {
        let m = map();
        let c = m
            .centroid(&[Vec2::new(990.0, 500.0), Vec2::new(10.0, 500.0)])
            .unwrap();
        assert!(c.x < 1.0 || c.x > 999.0);
        assert!((c.y - 500.0).abs() < 1.0);
    }
}
