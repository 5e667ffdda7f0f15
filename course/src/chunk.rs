//! Chunk coordinates, world-space bounds and neighbour directions.
//!
//! Chunks are square cells of the level's horizontal plane. Chunk `(x, y)` maps to the
//! world X/Z axes, and chunk (0, 0) is centred on the world origin.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default chunk size in world units
pub const CHUNK_SIZE: f32 = 150.0;

/// Axis heights are applied along.
pub const UP: Vec3 = Vec3::Y;

/// Chunk coordinate (integer grid position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Convert a world position to the chunk containing it.
    ///
    /// The chunk grid is shifted by half a chunk so that (0, 0) is centred on the origin.
    pub fn from_world_pos(pos: Vec3, chunk_size: f32) -> Self {
        let half = chunk_size / 2.0;
        Self {
            x: ((pos.x + half) / chunk_size).floor() as i32,
            y: ((pos.z + half) / chunk_size).floor() as i32,
        }
    }

    /// World position of the chunk centre
    pub fn centre_world(&self, chunk_size: f32) -> Vec3 {
        Vec3::new(self.x as f32 * chunk_size, 0.0, self.y as f32 * chunk_size)
    }

    /// World position of the chunk's corner (min x, min z)
    pub fn min_corner_world(&self, chunk_size: f32) -> Vec3 {
        self.centre_world(chunk_size) - Vec3::new(chunk_size / 2.0, 0.0, chunk_size / 2.0)
    }

    /// The chunk one step away in `direction`.
    pub fn step(&self, direction: NeighbourDirection) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Direction from this chunk towards `other`, if they are adjacent.
    pub fn direction_to(&self, other: ChunkCoord) -> Option<NeighbourDirection> {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        if dx.abs() > 1 || dy.abs() > 1 {
            return None;
        }
        NeighbourDirection::from_offset(dx, dy)
    }

    /// Get chunks in a radius around this chunk
    pub fn chunks_in_radius(&self, radius: i32) -> Vec<ChunkCoord> {
        let mut chunks = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                chunks.push(ChunkCoord::new(self.x + dx, self.y + dy));
            }
        }
        chunks
    }

    /// The 8 surrounding chunks, excluding this one.
    pub fn adjacent(&self) -> impl Iterator<Item = (NeighbourDirection, ChunkCoord)> + '_ {
        NeighbourDirection::ALL
            .iter()
            .map(move |&dir| (dir, self.step(dir)))
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned box described by its centre and full size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub centre: Vec3,
    pub size: Vec3,
}

impl Bounds {
    pub fn new(centre: Vec3, size: Vec3) -> Self {
        Self { centre, size }
    }

    pub fn extents(&self) -> Vec3 {
        self.size / 2.0
    }

    pub fn min(&self) -> Vec3 {
        self.centre - self.extents()
    }

    pub fn max(&self) -> Vec3 {
        self.centre + self.extents()
    }

    /// True if the position lies inside the box on the horizontal axes.
    pub fn contains_xz(&self, pos: Vec3) -> bool {
        let min = self.min();
        let max = self.max();
        pos.x >= min.x && pos.x <= max.x && pos.z >= min.z && pos.z <= max.z
    }
}

/// Direction from a chunk towards one of its 8 neighbours.
///
/// `Up` is towards -y in chunk and grid coordinates, `Left` towards -x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeighbourDirection {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl NeighbourDirection {
    pub const ALL: [NeighbourDirection; 8] = [
        NeighbourDirection::Up,
        NeighbourDirection::Down,
        NeighbourDirection::Left,
        NeighbourDirection::Right,
        NeighbourDirection::UpLeft,
        NeighbourDirection::UpRight,
        NeighbourDirection::DownLeft,
        NeighbourDirection::DownRight,
    ];

    pub const CARDINAL: [NeighbourDirection; 4] = [
        NeighbourDirection::Up,
        NeighbourDirection::Down,
        NeighbourDirection::Left,
        NeighbourDirection::Right,
    ];

    /// Direction for a chunk offset. Components are clamped to -1..=1; (0, 0) has no direction.
    pub fn from_offset(dx: i32, dy: i32) -> Option<Self> {
        match (dx.clamp(-1, 1), dy.clamp(-1, 1)) {
            (0, -1) => Some(Self::Up),
            (0, 1) => Some(Self::Down),
            (-1, 0) => Some(Self::Left),
            (1, 0) => Some(Self::Right),
            (-1, -1) => Some(Self::UpLeft),
            (1, -1) => Some(Self::UpRight),
            (-1, 1) => Some(Self::DownLeft),
            (1, 1) => Some(Self::DownRight),
            _ => None,
        }
    }

    pub const fn offset(&self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::UpLeft => (-1, -1),
            Self::UpRight => (1, -1),
            Self::DownLeft => (-1, 1),
            Self::DownRight => (1, 1),
        }
    }

    pub const fn opposite(&self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::UpLeft => Self::DownRight,
            Self::UpRight => Self::DownLeft,
            Self::DownLeft => Self::UpRight,
            Self::DownRight => Self::UpLeft,
        }
    }

    pub const fn is_cardinal(&self) -> bool {
        matches!(self, Self::Up | Self::Down | Self::Left | Self::Right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_chunk_is_centred() {
        assert_eq!(ChunkCoord::from_world_pos(Vec3::ZERO, 150.0), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_world_pos(Vec3::new(74.9, 0.0, -74.9), 150.0), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_world_pos(Vec3::new(75.0, 0.0, 0.0), 150.0), ChunkCoord::new(1, 0));
        assert_eq!(ChunkCoord::from_world_pos(Vec3::new(-75.1, 3.0, -300.0), 150.0), ChunkCoord::new(-1, -2));
    }

    #[test]
    fn test_coords_are_plain_ordered_keys() {
        let set: std::collections::BTreeSet<ChunkCoord> =
            [ChunkCoord::new(1, 0), ChunkCoord::new(0, 1), ChunkCoord::new(0, -1)].into_iter().collect();
        let order: Vec<_> = set.into_iter().collect();
        assert_eq!(
            order,
            vec![ChunkCoord::new(0, -1), ChunkCoord::new(0, 1), ChunkCoord::new(1, 0)]
        );
    }

    #[test]
    fn test_centre_round_trips_through_world_to_chunk() {
        for coord in ChunkCoord::new(0, 0).chunks_in_radius(3) {
            let centre = coord.centre_world(150.0);
            assert_eq!(ChunkCoord::from_world_pos(centre, 150.0), coord);
        }
    }

    #[test]
    fn test_directions_are_consistent() {
        for dir in NeighbourDirection::ALL {
            let (dx, dy) = dir.offset();
            assert_eq!(NeighbourDirection::from_offset(dx, dy), Some(dir));
            assert_eq!(dir.opposite().opposite(), dir);
            let here = ChunkCoord::new(4, -2);
            assert_eq!(here.step(dir).direction_to(here), Some(dir.opposite()));
        }
        assert_eq!(NeighbourDirection::from_offset(0, 0), None);
        assert_eq!(NeighbourDirection::from_offset(5, 0), Some(NeighbourDirection::Right));
    }

    #[test]
    fn test_bounds_extents() {
        let b = Bounds::new(Vec3::new(150.0, 0.0, 0.0), Vec3::new(150.0, 0.0, 150.0));
        assert_eq!(b.min(), Vec3::new(75.0, 0.0, -75.0));
        assert_eq!(b.max(), Vec3::new(225.0, 0.0, 75.0));
        assert!(b.contains_xz(Vec3::new(80.0, 40.0, 0.0)));
        assert!(!b.contains_xz(Vec3::new(0.0, 0.0, 0.0)));
    }
}
