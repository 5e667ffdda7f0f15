//! Chunked course terrain.
//!
//! Builds per-chunk sample grids with an explicit neighbour graph, stitches them across chunk
//! borders (merging holes split by a border into one), and scatters decorations with
//! blue-noise sampling that keeps its spacing across chunks.

pub mod biome;
pub mod chunk;
pub mod chunk_store;
pub mod config;
pub mod decoration;
pub mod error;
pub mod generator;
pub mod hole;
pub mod host;
pub mod level;
pub mod loader;
pub mod placement_db;
pub mod poisson;
pub mod spatial;
pub mod terrain_map;

pub use biome::{Biome, CurveKey, HeightCurve, TerrainSettings};
pub use chunk::{Bounds, ChunkCoord, NeighbourDirection, CHUNK_SIZE, UP};
pub use chunk_store::{ChunkId, ChunkRecord, ChunkStore, StitchReport};
pub use config::{BiomeDecorations, DecorationSettings, GenerationConfig, PrefabPreset};
pub use decoration::{
    Decoration, DecorationPlacer, ObjectTransform, PrefabId, WorldObjectPlacement,
};
pub use error::{DataError, TerrainError};
pub use generator::{HoleSpec, LevelGenerator, LevelLayout};
pub use hole::{HoleId, HoleTable};
pub use host::{ChunkHost, HeadlessHost};
pub use level::{ChunkData, LevelData};
pub use loader::{LoadState, LoadStats, TerrainLoader};
pub use placement_db::{ChunkPlacements, PlacementDb};
pub use terrain_map::{MapSamples, Neighbour, Point, TerrainMap};
