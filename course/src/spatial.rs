//! Spatial lookups shared by terrain maps and decoration placement.
//!
//! Grid queries estimate an index from a position's offset inside a bounding box instead of
//! scanning every point. [`PointGrid`] is a spatial hash used for cross-chunk distance checks,
//! so each query only looks at the handful of cells around it.

use bevy::prelude::*;
use std::collections::HashMap;

/// True if `(x, y)` is a valid index into a `width` x `height` grid.
#[inline]
pub fn is_within_grid(x: isize, y: isize, width: usize, height: usize) -> bool {
    x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height
}

/// Nearest grid index to `pos` for a grid whose first and last samples sit on `min` and `max`.
///
/// Positions outside the box clamp to the closest valid index.
pub fn closest_grid_index(
    pos: Vec2,
    min: Vec2,
    max: Vec2,
    width: usize,
    height: usize,
) -> (usize, usize) {
    (
        closest_axis_index(pos.x, min.x, max.x, width),
        closest_axis_index(pos.y, min.y, max.y, height),
    )
}

fn closest_axis_index(value: f32, min: f32, max: f32, count: usize) -> usize {
    if count <= 1 {
        return 0;
    }
    let span = max - min;
    if span <= f32::EPSILON || !value.is_finite() {
        return 0;
    }

    let last = (count - 1) as f32;
    let estimated = ((value - min) / span * last).round();
    estimated.clamp(0.0, last) as usize
}

/// Spatial hash of world positions bucketed on the horizontal plane.
#[derive(Debug, Clone)]
pub struct PointGrid {
    cell_size: f32,
    /// Map from grid cell (x, z) to indices into `points`.
    cells: HashMap<(i32, i32), Vec<usize>>,
    points: Vec<Vec3>,
}

impl PointGrid {
    /// Create an empty grid. `cell_size` should be close to the query radius.
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(f32::EPSILON),
            cells: HashMap::new(),
            points: Vec::new(),
        }
    }

    pub fn from_points(cell_size: f32, points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut grid = Self::new(cell_size);
        for p in points {
            grid.insert(p);
        }
        grid
    }

    #[inline]
    fn world_to_cell(&self, pos: Vec3) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, pos: Vec3) {
        let cell = self.world_to_cell(pos);
        let idx = self.points.len();
        self.points.push(pos);
        self.cells.entry(cell).or_default().push(idx);
    }

    /// All stored points in the cells that could hold something within `radius` of `pos`.
    pub fn get_nearby(&self, pos: Vec3, radius: f32) -> impl Iterator<Item = Vec3> + '_ {
        let (cx, cz) = self.world_to_cell(pos);
        let reach = (radius / self.cell_size).ceil().max(1.0) as i32;

        (-reach..=reach)
            .flat_map(move |dz| (-reach..=reach).map(move |dx| (cx + dx, cz + dz)))
            .filter_map(move |cell| self.cells.get(&cell))
            .flat_map(move |indices| indices.iter().map(move |&i| self.points[i]))
    }

    /// True if any stored point is strictly closer than `radius` to `pos`.
    pub fn any_within(&self, pos: Vec3, radius: f32) -> bool {
        let radius_sq = radius * radius;
        self.get_nearby(pos, radius)
            .any(|p| (p - pos).length_squared() < radius_sq)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_index_exact_samples() {
        let min = Vec2::new(-75.0, -75.0);
        let max = Vec2::new(75.0, 75.0);
        // 6 samples per axis, 30 units apart
        assert_eq!(closest_grid_index(min, min, max, 6, 6), (0, 0));
        assert_eq!(closest_grid_index(max, min, max, 6, 6), (5, 5));
        assert_eq!(closest_grid_index(Vec2::new(-45.0, 15.0), min, max, 6, 6), (1, 3));
        assert_eq!(closest_grid_index(Vec2::new(-44.0, 29.0), min, max, 6, 6), (1, 3));
    }

    #[test]
    fn test_closest_index_clamps_out_of_range() {
        let min = Vec2::ZERO;
        let max = Vec2::splat(10.0);
        assert_eq!(closest_grid_index(Vec2::new(-100.0, 50.0), min, max, 4, 5), (0, 4));
        assert_eq!(closest_grid_index(Vec2::new(f32::NAN, 5.0), min, max, 4, 5), (0, 2));
    }

    #[test]
    fn test_within_grid() {
        assert!(is_within_grid(0, 0, 3, 3));
        assert!(is_within_grid(2, 2, 3, 3));
        assert!(!is_within_grid(-1, 0, 3, 3));
        assert!(!is_within_grid(0, 3, 3, 3));
    }

    #[test]
    fn test_point_grid_basic() {
        let mut grid = PointGrid::new(20.0);
        grid.insert(Vec3::new(0.0, 0.0, 0.0));
        grid.insert(Vec3::new(100.0, 0.0, 100.0));

        assert!(grid.any_within(Vec3::new(10.0, 0.0, 10.0), 20.0));
        assert!(!grid.any_within(Vec3::new(50.0, 0.0, 50.0), 20.0));
        // Across a cell boundary
        assert!(grid.any_within(Vec3::new(-19.0, 0.0, 0.0), 20.0));
        // Exactly at the radius is not "within"
        assert!(!grid.any_within(Vec3::new(20.0, 0.0, 0.0), 20.0));
    }

    #[test]
    fn test_point_grid_uses_full_distance() {
        let grid = PointGrid::from_points(5.0, [Vec3::new(0.0, 30.0, 0.0)]);
        // Close horizontally but far vertically
        assert!(!grid.any_within(Vec3::new(1.0, 0.0, 1.0), 5.0));
        // Radius larger than the cell size still finds distant cells
        assert!(grid.any_within(Vec3::new(12.0, 30.0, 0.0), 15.0));
    }
}
