//! Per-chunk sample grid and its neighbour graph.
//!
//! A [`TerrainMap`] owns one [`Point`] per grid cell, stored flat at `y * width + x`.
//! Neighbour links inside a chunk are arena indices; links to an adjacent chunk carry the
//! chunk coordinate and the remote point's world height, which never changes after the
//! remote map is built.

use bevy::prelude::*;
use std::collections::VecDeque;

use crate::biome::{Biome, TerrainSettings};
use crate::chunk::{Bounds, ChunkCoord, NeighbourDirection, UP};
use crate::error::TerrainError;
use crate::hole::{HoleId, HoleTable};
use crate::spatial::{closest_grid_index, is_within_grid};

/// A link from one point to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Neighbour {
    /// Point in the same map, by arena index
    Local(usize),
    /// Point in an adjacent chunk's map
    Remote {
        chunk: ChunkCoord,
        index: usize,
        world_height: f32,
    },
}

impl Neighbour {
    fn same_point(&self, other: &Neighbour) -> bool {
        match (self, other) {
            (Neighbour::Local(a), Neighbour::Local(b)) => a == b,
            (
                Neighbour::Remote { chunk, index, .. },
                Neighbour::Remote {
                    chunk: other_chunk,
                    index: other_index,
                    ..
                },
            ) => chunk == other_chunk && index == other_index,
            _ => false,
        }
    }
}

/// One sample on a chunk's height/biome grid.
#[derive(Debug, Clone)]
pub struct Point {
    base_position: Vec3,
    height: f32,
    original_height: f32,
    biome: Biome,
    is_at_edge: bool,
    hole: Option<HoleId>,
    neighbours: Vec<Neighbour>,
}

impl Point {
    fn new(base_position: Vec3, height: f32, biome: Biome, is_at_edge: bool) -> Self {
        Self {
            base_position,
            height,
            original_height: height,
            biome,
            is_at_edge,
            hole: None,
            neighbours: Vec::with_capacity(8),
        }
    }

    /// Position relative to the chunk centre, before the height offset
    pub fn base_position(&self) -> Vec3 {
        self.base_position
    }

    /// Vertex position relative to the chunk centre
    pub fn local_position(&self) -> Vec3 {
        self.base_position + UP * self.height
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn original_height(&self) -> f32 {
        self.original_height
    }

    pub fn biome(&self) -> Biome {
        self.biome
    }

    pub fn is_at_edge(&self) -> bool {
        self.is_at_edge
    }

    /// Hole handle as assigned at construction. Resolve through the [`HoleTable`].
    pub fn hole(&self) -> Option<HoleId> {
        self.hole
    }

    pub fn neighbours(&self) -> &[Neighbour] {
        &self.neighbours
    }

    pub fn is_linked_to(&self, neighbour: &Neighbour) -> bool {
        self.neighbours.iter().any(|n| n.same_point(neighbour))
    }

    fn link(&mut self, neighbour: Neighbour) -> bool {
        if self.is_linked_to(&neighbour) {
            return false;
        }
        self.neighbours.push(neighbour);
        true
    }
}

/// Raw per-cell inputs for one chunk, all `width * height` long and indexed `y * width + x`.
#[derive(Debug, Clone, Copy)]
pub struct MapSamples<'a> {
    pub base_positions: &'a [Vec3],
    pub heights: &'a [f32],
    pub bunkers: &'a [f32],
    pub holes: &'a [f32],
    /// Optional base biome per cell; empty means "use the main biome everywhere".
    pub biomes: &'a [Biome],
}

/// The maximum detail terrain data of one chunk.
#[derive(Debug, Clone)]
pub struct TerrainMap {
    chunk: ChunkCoord,
    width: usize,
    height: usize,
    bounds: Bounds,
    points: Vec<Point>,
    stitched: Vec<NeighbourDirection>,
}

impl TerrainMap {
    /// Build the grid, link every point to its 3x3 neighbourhood and assign hole identities.
    pub fn new(
        chunk: ChunkCoord,
        width: usize,
        height: usize,
        bounds: Bounds,
        samples: MapSamples<'_>,
        settings: &TerrainSettings,
        holes: &mut HoleTable,
    ) -> Result<Self, TerrainError> {
        if width == 0 || height == 0 {
            return Err(TerrainError::InvalidDimensions { width, height });
        }

        let expected = width * height;
        check_len("base_positions", samples.base_positions.len(), expected)?;
        check_len("heights", samples.heights.len(), expected)?;
        check_len("bunkers", samples.bunkers.len(), expected)?;
        check_len("holes", samples.holes.len(), expected)?;
        if !samples.biomes.is_empty() {
            check_len("biomes", samples.biomes.len(), expected)?;
        }

        let mut settings = settings.clone();
        settings.validate_values();

        let mut points = Vec::with_capacity(expected);
        for y in 0..height {
            for x in 0..width {
                let i = y * width + x;
                let at_edge = x == 0 || x == width - 1 || y == 0 || y == height - 1;
                let base = samples.biomes.get(i).copied().unwrap_or(Biome::None);
                let biome = settings.resolve_biome(base, samples.bunkers[i], samples.holes[i]);
                let point_height = settings.resolve_height(samples.heights[i], samples.bunkers[i]);

                points.push(Point::new(samples.base_positions[i], point_height, biome, at_edge));
            }
        }

        let mut map = Self {
            chunk,
            width,
            height,
            bounds,
            points,
            stitched: Vec::new(),
        };
        map.link_grid();
        map.assign_holes(holes);
        Ok(map)
    }

    fn link_grid(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                let here = self.index_of(x, y);
                for j in -1isize..=1 {
                    for i in -1isize..=1 {
                        if i == 0 && j == 0 {
                            continue;
                        }
                        let nx = x as isize + i;
                        let ny = y as isize + j;
                        if is_within_grid(nx, ny, self.width, self.height) {
                            let there = self.index_of(nx as usize, ny as usize);
                            self.points[here].link(Neighbour::Local(there));
                        }
                    }
                }
            }
        }
    }

    /// Give every 8-connected group of hole points one fresh identity.
    fn assign_holes(&mut self, holes: &mut HoleTable) {
        let mut queue = VecDeque::new();
        for start in 0..self.points.len() {
            if self.points[start].biome != Biome::Hole || self.points[start].hole.is_some() {
                continue;
            }

            let id = holes.create();
            self.points[start].hole = Some(id);
            queue.push_back(start);

            while let Some(current) = queue.pop_front() {
                for n in 0..self.points[current].neighbours.len() {
                    let Neighbour::Local(next) = self.points[current].neighbours[n] else {
                        continue;
                    };
                    let point = &mut self.points[next];
                    if point.biome == Biome::Hole && point.hole.is_none() {
                        point.hole = Some(id);
                        queue.push_back(next);
                    }
                }
            }
        }
    }

    pub fn chunk(&self) -> ChunkCoord {
        self.chunk
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn index_of(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn coords_of(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    pub fn point(&self, x: usize, y: usize) -> Option<&Point> {
        if x < self.width && y < self.height {
            self.points.get(self.index_of(x, y))
        } else {
            None
        }
    }

    /// World-space vertex of the point at `index`.
    pub fn world_position(&self, index: usize) -> Vec3 {
        self.bounds.centre + self.points[index].local_position()
    }

    fn world_height(&self, index: usize) -> f32 {
        self.world_position(index).y
    }

    /// Index of the grid point nearest to a world position, clamped to the grid.
    pub fn closest_point_index(&self, world_pos: Vec3) -> usize {
        let min = self.bounds.min();
        let max = self.bounds.max();
        let (x, y) = closest_grid_index(
            Vec2::new(world_pos.x, world_pos.z),
            Vec2::new(min.x, min.z),
            Vec2::new(max.x, max.z),
            self.width,
            self.height,
        );
        self.index_of(x, y)
    }

    pub fn closest_point(&self, world_pos: Vec3) -> &Point {
        &self.points[self.closest_point_index(world_pos)]
    }

    /// Lowest world height among the point at `index` and everything linked to it.
    pub fn lowest_neighbour_height(&self, index: usize) -> f32 {
        self.points[index]
            .neighbours
            .iter()
            .map(|n| match *n {
                Neighbour::Local(i) => self.world_height(i),
                Neighbour::Remote { world_height, .. } => world_height,
            })
            .fold(self.world_height(index), f32::min)
    }

    /// Minimum and maximum point heights.
    pub fn height_range(&self) -> (f32, f32) {
        self.points
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), p| {
                (min.min(p.height), max.max(p.height))
            })
    }

    pub fn has_stitched(&self, direction: NeighbourDirection) -> bool {
        self.stitched.contains(&direction)
    }

    pub fn stitched_directions(&self) -> &[NeighbourDirection] {
        &self.stitched
    }

    /// Link this map's border to `neighbour`, which lies in `direction` from this chunk.
    ///
    /// Returns true if a hole split by the border was merged, meaning anything built from
    /// the old hole identities needs rebuilding.
    ///
    /// Only the four cardinal directions link. Diagonal neighbours share a single corner
    /// point and are accepted without doing anything.
    pub fn stitch(
        &mut self,
        direction: NeighbourDirection,
        neighbour: &mut TerrainMap,
        holes: &mut HoleTable,
    ) -> Result<bool, TerrainError> {
        self.stitch_merges(direction, neighbour, holes)
            .map(|merged| !merged.is_empty())
    }

    /// Same as [`TerrainMap::stitch`], returning the surviving identity of every merge.
    pub fn stitch_merges(
        &mut self,
        direction: NeighbourDirection,
        neighbour: &mut TerrainMap,
        holes: &mut HoleTable,
    ) -> Result<Vec<HoleId>, TerrainError> {
        if self.width != neighbour.width || self.height != neighbour.height {
            error!(
                "Trying to stitch terrain map {} ({}x{}) with {} ({}x{})",
                self.chunk, self.width, self.height, neighbour.chunk, neighbour.width, neighbour.height
            );
            return Err(TerrainError::MismatchedDimensions {
                width: self.width,
                height: self.height,
                other_width: neighbour.width,
                other_height: neighbour.height,
            });
        }

        if self.has_stitched(direction) {
            return Ok(Vec::new());
        }

        if !direction.is_cardinal() {
            debug!(
                "Skipping diagonal stitch {:?} between {} and {}",
                direction, self.chunk, neighbour.chunk
            );
            return Ok(Vec::new());
        }

        self.stitched.push(direction);
        if !neighbour.has_stitched(direction.opposite()) {
            neighbour.stitched.push(direction.opposite());
        }

        let mut merged = Vec::new();
        for (here, there) in self.border_pairs(direction) {
            if let Some(survivor) = self.link_edge(here, neighbour, there, holes) {
                merged.push(survivor);
            }
        }
        Ok(merged)
    }

    /// (this index, neighbour index) candidates along the shared border.
    fn border_pairs(&self, direction: NeighbourDirection) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        match direction {
            NeighbourDirection::Up | NeighbourDirection::Down => {
                let (y, neighbour_y) = if direction == NeighbourDirection::Up {
                    (0, self.height - 1)
                } else {
                    (self.height - 1, 0)
                };
                for x in 0..self.width {
                    for i in -1isize..=1 {
                        let nx = x as isize + i;
                        if is_within_grid(nx, neighbour_y as isize, self.width, self.height) {
                            pairs.push((self.index_of(x, y), self.index_of(nx as usize, neighbour_y)));
                        }
                    }
                }
            }
            NeighbourDirection::Left | NeighbourDirection::Right => {
                let (x, neighbour_x) = if direction == NeighbourDirection::Left {
                    (0, self.width - 1)
                } else {
                    (self.width - 1, 0)
                };
                for y in 0..self.height {
                    for j in -1isize..=1 {
                        let ny = y as isize + j;
                        if is_within_grid(neighbour_x as isize, ny, self.width, self.height) {
                            pairs.push((self.index_of(x, y), self.index_of(neighbour_x, ny as usize)));
                        }
                    }
                }
            }
            // TODO: link the single shared corner point for diagonal neighbours.
            _ => {}
        }
        pairs
    }

    /// Link two edge points both ways. Returns the survivor if their holes were merged.
    fn link_edge(
        &mut self,
        here: usize,
        neighbour: &mut TerrainMap,
        there: usize,
        holes: &mut HoleTable,
    ) -> Option<HoleId> {
        if !(self.points[here].is_at_edge && neighbour.points[there].is_at_edge) {
            return None;
        }

        let remote = Neighbour::Remote {
            chunk: neighbour.chunk,
            index: there,
            world_height: neighbour.world_height(there),
        };
        if !self.points[here].link(remote) {
            return None;
        }
        let back = Neighbour::Remote {
            chunk: self.chunk,
            index: here,
            world_height: self.world_height(here),
        };
        neighbour.points[there].link(back);

        let p = &self.points[here];
        let q = &neighbour.points[there];
        if p.biome != Biome::Hole || q.biome != Biome::Hole {
            return None;
        }
        // These points are the same hole split by the chunk border
        match (p.hole, q.hole) {
            (Some(a), Some(b)) if !holes.same(a, b) => Some(holes.merge(a, b)),
            _ => None,
        }
    }
}

fn check_len(name: &'static str, actual: usize, expected: usize) -> Result<(), TerrainError> {
    if actual == expected {
        Ok(())
    } else {
        Err(TerrainError::SampleLength {
            name,
            actual,
            expected,
        })
    }
}

/// Base positions for a regular grid spanning `bounds`, relative to its centre.
pub fn grid_base_positions(bounds: Bounds, width: usize, height: usize) -> Vec<Vec3> {
    let extents = bounds.extents();
    let step_x = if width > 1 {
        bounds.size.x / (width - 1) as f32
    } else {
        0.0
    };
    let step_z = if height > 1 {
        bounds.size.z / (height - 1) as f32
    } else {
        0.0
    };

    let mut positions = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            positions.push(Vec3::new(
                -extents.x + x as f32 * step_x,
                0.0,
                -extents.z + y as f32 * step_z,
            ));
        }
    }
    positions
}
