//! Procedural level data.
//!
//! Uses deterministic noise so the same layout always produces the same level. Samples are
//! taken at world positions, so the shared border rows of two adjacent chunks get identical
//! values and holes placed on a border end up split across both chunks.

use bevy::prelude::*;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::biome::{Biome, TerrainSettings};
use crate::chunk::{Bounds, ChunkCoord, CHUNK_SIZE};
use crate::level::{ChunkData, LevelData, LEVEL_VERSION};
use crate::terrain_map::grid_base_positions;

pub const LEVEL_SEED: u32 = 42;

/// A cup and the green around it, in world X/Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoleSpec {
    pub centre: Vec2,
    pub radius: f32,
    /// Radius of the green; zero for none
    #[serde(default)]
    pub green_radius: f32,
}

/// Shape of a generated level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelLayout {
    pub name: String,
    pub seed: u32,
    /// Inclusive chunk range
    pub min_chunk: ChunkCoord,
    pub max_chunk: ChunkCoord,
    /// Points per chunk side
    pub resolution: usize,
    pub chunk_size: f32,
    /// Maximum terrain height variation
    pub max_height: f32,
    /// Bunker noise threshold; higher means fewer bunkers
    pub bunker_threshold: f32,
    pub holes: Vec<HoleSpec>,
}

impl Default for LevelLayout {
    fn default() -> Self {
        Self {
            name: "generated".to_string(),
            seed: LEVEL_SEED,
            min_chunk: ChunkCoord::new(-1, -1),
            max_chunk: ChunkCoord::new(1, 1),
            resolution: 16,
            chunk_size: CHUNK_SIZE,
            max_height: 12.0,
            bunker_threshold: 0.45,
            holes: vec![
                // On the border between (0, 0) and (1, 0)
                HoleSpec {
                    centre: Vec2::new(75.0, 0.0),
                    radius: 8.0,
                    green_radius: 25.0,
                },
                HoleSpec {
                    centre: Vec2::new(-120.0, -110.0),
                    radius: 6.0,
                    green_radius: 20.0,
                },
            ],
        }
    }
}

impl LevelLayout {
    /// Chunk coordinates in level order (row by row).
    pub fn chunk_coords(&self) -> Vec<ChunkCoord> {
        let mut coords = Vec::new();
        for y in self.min_chunk.y..=self.max_chunk.y {
            for x in self.min_chunk.x..=self.max_chunk.x {
                coords.push(ChunkCoord::new(x, y));
            }
        }
        coords
    }
}

/// Level generator using Perlin noise
pub struct LevelGenerator {
    layout: LevelLayout,
    terrain: TerrainSettings,
    height_noise: Perlin,
    detail_noise: Perlin,
    bunker_noise: Perlin,
    rough_noise: Perlin,
}

impl LevelGenerator {
    pub fn new(layout: LevelLayout) -> Self {
        let seed = layout.seed;
        Self {
            layout,
            terrain: TerrainSettings::default(),
            height_noise: Perlin::new(seed),
            detail_noise: Perlin::new(seed.wrapping_add(1000)),
            bunker_noise: Perlin::new(seed.wrapping_add(2000)),
            rough_noise: Perlin::new(seed.wrapping_add(3000)),
        }
    }

    /// Terrain settings the generated level is built with; heights are scaled by the
    /// layout's `max_height` on top of them.
    pub fn with_terrain(mut self, terrain: TerrainSettings) -> Self {
        self.terrain = terrain;
        self
    }

    pub fn layout(&self) -> &LevelLayout {
        &self.layout
    }

    pub fn generate(&self) -> LevelData {
        let chunks = self
            .layout
            .chunk_coords()
            .into_iter()
            .map(|coord| self.generate_chunk(coord))
            .collect();

        LevelData {
            version: LEVEL_VERSION,
            name: self.layout.name.clone(),
            settings: Some(TerrainSettings {
                height_multiplier: self.terrain.height_multiplier * self.layout.max_height,
                ..self.terrain.clone()
            }),
            chunks,
        }
    }

    pub fn generate_chunk(&self, coord: ChunkCoord) -> ChunkData {
        let resolution = self.layout.resolution.max(2);
        let size = self.layout.chunk_size;
        let centre = coord.centre_world(size);
        let extent = Vec3::new(size, 0.0, size);

        let base = grid_base_positions(Bounds::new(centre, extent), resolution, resolution);

        let n = resolution * resolution;
        let mut heights = Vec::with_capacity(n);
        let mut bunkers = Vec::with_capacity(n);
        let mut holes = Vec::with_capacity(n);
        let mut biomes = Vec::with_capacity(n);

        for local in &base {
            let x = centre.x + local.x;
            let z = centre.z + local.z;

            let hole = self.hole_at(x, z);
            let on_green = self.green_at(x, z);

            heights.push(self.height_at(x, z, on_green));
            holes.push(if hole { 1.0 } else { 0.0 });
            bunkers.push(if hole || on_green {
                0.0
            } else {
                self.bunker_at(x, z)
            });
            biomes.push(if on_green {
                Biome::Green
            } else {
                self.base_biome_at(x, z)
            });
        }

        ChunkData {
            x: coord.x,
            y: coord.y,
            centre,
            size: extent,
            width: resolution,
            height: resolution,
            biomes,
            heights,
            bunkers,
            holes,
            decorations: Vec::new(),
        }
    }

    /// Raw height in 0..=1
    fn height_at(&self, x: f32, z: f32, on_green: bool) -> f32 {
        let scale = 0.006;
        let h = self.height_noise.get([x as f64 * scale, z as f64 * scale]) as f32;
        let detail = self
            .detail_noise
            .get([x as f64 * scale * 4.0, z as f64 * scale * 4.0]) as f32;

        // Greens are kept smooth
        let detail_weight = if on_green { 0.0 } else { 0.2 };
        ((h + detail * detail_weight) * 0.5 + 0.5).clamp(0.0, 1.0)
    }

    /// Bunker depth, zero outside bunkers
    fn bunker_at(&self, x: f32, z: f32) -> f32 {
        let scale = 0.02;
        let b = self.bunker_noise.get([x as f64 * scale, z as f64 * scale]) as f32;
        if b > self.layout.bunker_threshold {
            (b - self.layout.bunker_threshold) * 4.0
        } else {
            0.0
        }
    }

    fn base_biome_at(&self, x: f32, z: f32) -> Biome {
        let scale = 0.01;
        let r = self.rough_noise.get([x as f64 * scale, z as f64 * scale]) as f32;
        if r > 0.3 {
            Biome::Rough
        } else {
            Biome::None
        }
    }

    fn hole_at(&self, x: f32, z: f32) -> bool {
        let pos = Vec2::new(x, z);
        self.layout
            .holes
            .iter()
            .any(|h| pos.distance(h.centre) < h.radius)
    }

    fn green_at(&self, x: f32, z: f32) -> bool {
        let pos = Vec2::new(x, z);
        self.layout
            .holes
            .iter()
            .any(|h| pos.distance(h.centre) < h.green_radius)
    }
}
