//! Level data: the ordered chunk records a level is built from.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::biome::{Biome, TerrainSettings};
use crate::chunk::{Bounds, ChunkCoord};
use crate::config::BiomeDecorations;
use crate::error::DataError;
use crate::terrain_map::MapSamples;

pub const LEVEL_VERSION: u32 = 1;

/// Raw sampled inputs for one chunk. Arrays are `width * height` long, indexed `y * width + x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkData {
    pub x: i32,
    pub y: i32,
    pub centre: Vec3,
    pub size: Vec3,
    pub width: usize,
    pub height: usize,
    /// Optional base biome per cell
    #[serde(default)]
    pub biomes: Vec<Biome>,
    pub heights: Vec<f32>,
    pub bunkers: Vec<f32>,
    pub holes: Vec<f32>,
    /// Decorations allowed per biome in this chunk. Empty means the config's table applies.
    #[serde(default)]
    pub decorations: Vec<BiomeDecorations>,
}

impl ChunkData {
    pub fn coord(&self) -> ChunkCoord {
        ChunkCoord::new(self.x, self.y)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.centre, self.size)
    }

    /// Borrow the raw arrays together with precomputed base positions.
    pub fn samples<'a>(&'a self, base_positions: &'a [Vec3]) -> MapSamples<'a> {
        MapSamples {
            base_positions,
            heights: &self.heights,
            bunkers: &self.bunkers,
            holes: &self.holes,
            biomes: &self.biomes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub version: u32,
    #[serde(default)]
    pub name: String,
    /// Overrides the config's terrain settings for this level
    #[serde(default)]
    pub settings: Option<TerrainSettings>,
    pub chunks: Vec<ChunkData>,
}

impl LevelData {
    pub fn from_ron_str(text: &str) -> Result<Self, DataError> {
        let level: LevelData = ron::from_str(text)?;
        if level.version != LEVEL_VERSION {
            return Err(DataError::UnsupportedVersion {
                what: "level",
                found: level.version,
                expected: LEVEL_VERSION,
            });
        }
        Ok(level)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    pub fn to_ron_string(&self) -> Result<String, DataError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_level() {
        let text = r#"(
            version: 1,
            chunks: [
                (
                    x: 0, y: -1,
                    centre: (0.0, 0.0, -150.0),
                    size: (150.0, 0.0, 150.0),
                    width: 2, height: 2,
                    heights: [0.0, 0.1, 0.2, 0.3],
                    bunkers: [0.0, 0.0, 0.0, 0.0],
                    holes: [0.0, 0.0, 1.0, 0.0],
                ),
            ],
        )"#;
        let level = LevelData::from_ron_str(text).unwrap();
        assert_eq!(level.chunks.len(), 1);
        assert!(level.settings.is_none());
        let chunk = &level.chunks[0];
        assert_eq!(chunk.coord(), ChunkCoord::new(0, -1));
        assert!(chunk.biomes.is_empty());
        assert!(chunk.decorations.is_empty());
        assert_eq!(chunk.bounds().min(), Vec3::new(-75.0, 0.0, -225.0));
    }

    #[test]
    fn test_parse_chunk_decorations() {
        let text = r#"(
            version: 1,
            chunks: [
                (
                    x: 0, y: 0,
                    centre: (0.0, 0.0, 0.0),
                    size: (150.0, 0.0, 150.0),
                    width: 1, height: 1,
                    heights: [0.0],
                    bunkers: [0.0],
                    holes: [0.0],
                    decorations: [(biome: Grass, decorations: [Rock])],
                ),
            ],
        )"#;
        let level = LevelData::from_ron_str(text).unwrap();
        let decorations = &level.chunks[0].decorations;
        assert_eq!(decorations.len(), 1);
        assert_eq!(decorations[0].biome, Biome::Grass);
        assert_eq!(decorations[0].decorations, vec![crate::decoration::Decoration::Rock]);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let result = LevelData::from_ron_str("(version: 2, chunks: [])");
        assert!(matches!(result, Err(DataError::UnsupportedVersion { found: 2, .. })));
    }
}
