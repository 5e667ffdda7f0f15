//! Generation config, usually loaded from `assets/generation.ron`.
//!
//! Every field has a default so a config file only needs to name what it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::biome::{Biome, TerrainSettings};
use crate::chunk::CHUNK_SIZE;
use crate::decoration::{Decoration, PrefabId};
use crate::error::DataError;

pub const CONFIG_VERSION: u32 = 1;

/// Decoration category and the prefabs that can stand in for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabPreset {
    pub decoration: Decoration,
    pub prefabs: Vec<PrefabId>,
}

/// Decorations allowed on a biome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeDecorations {
    pub biome: Biome,
    pub decorations: Vec<Decoration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecorationSettings {
    /// Minimum spacing between objects (world units)
    pub radius: f32,
    /// Poisson-disc tries per active sample, clamped to 1..=10
    pub iterations: u32,
    pub presets: Vec<PrefabPreset>,
    pub biome_decorations: Vec<BiomeDecorations>,
}

impl Default for DecorationSettings {
    fn default() -> Self {
        let preset = |decoration: Decoration, ids: &[&str]| PrefabPreset {
            decoration,
            prefabs: ids.iter().map(|id| PrefabId::new(*id)).collect(),
        };
        let allow = |biome: Biome, decorations: &[Decoration]| BiomeDecorations {
            biome,
            decorations: decorations.to_vec(),
        };

        Self {
            radius: 20.0,
            iterations: 5,
            presets: vec![
                preset(Decoration::Tree, &["tree_oak", "tree_birch", "tree_pine"]),
                preset(Decoration::Bush, &["bush_round", "bush_flowering"]),
                preset(Decoration::Rock, &["rock_small", "rock_large"]),
                preset(Decoration::Flower, &["flowers_yellow", "flowers_red"]),
                preset(Decoration::Cactus, &["cactus_tall"]),
                preset(Decoration::Reed, &["reeds"]),
                preset(Decoration::IceSpike, &["ice_spike"]),
            ],
            biome_decorations: vec![
                allow(Biome::Grass, &[Decoration::Tree, Decoration::Bush, Decoration::Flower]),
                allow(Biome::Rough, &[Decoration::Tree, Decoration::Bush, Decoration::Rock]),
                allow(Biome::Sand, &[Decoration::Cactus, Decoration::Rock]),
                allow(Biome::Water, &[Decoration::Reed]),
                allow(Biome::Ice, &[Decoration::IceSpike, Decoration::Rock]),
            ],
        }
    }
}

/// Everything needed to turn level data into chunks and placements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub version: u32,
    /// Chunk size in world units
    pub chunk_size: f32,
    pub terrain: TerrainSettings,
    pub decoration: DecorationSettings,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            chunk_size: CHUNK_SIZE,
            terrain: TerrainSettings::default(),
            decoration: DecorationSettings::default(),
        }
    }
}

impl GenerationConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, DataError> {
        let config: GenerationConfig = ron::from_str(text)?;
        if config.version != CONFIG_VERSION {
            return Err(DataError::UnsupportedVersion {
                what: "generation config",
                found: config.version,
                expected: CONFIG_VERSION,
            });
        }
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = GenerationConfig::from_ron_str(
            "(version: 1, chunk_size: 64.0, decoration: (radius: 8.0))",
        )
        .unwrap();
        assert_eq!(config.chunk_size, 64.0);
        assert_eq!(config.decoration.radius, 8.0);
        assert_eq!(config.decoration.iterations, 5);
        assert_eq!(config.terrain, TerrainSettings::default());
        assert!(!config.decoration.presets.is_empty());
    }

    #[test]
    fn test_default_round_trips_through_ron() {
        let config = GenerationConfig::default();
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        assert_eq!(GenerationConfig::from_ron_str(&text).unwrap(), config);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let result = GenerationConfig::from_ron_str("(version: 7)");
        assert!(matches!(
            result,
            Err(DataError::UnsupportedVersion { found: 7, .. })
        ));
    }
}
