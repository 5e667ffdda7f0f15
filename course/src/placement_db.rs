//! Placement database written by the `level_loader` tool.
//!
//! One entry per chunk, in level order, holding the pruned placements of that chunk.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::chunk::ChunkCoord;
use crate::chunk_store::ChunkStore;
use crate::decoration::{count_objects, WorldObjectPlacement};
use crate::error::DataError;

pub const PLACEMENT_DB_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPlacements {
    pub coord: ChunkCoord,
    pub placements: Vec<WorldObjectPlacement>,
}

/// Versioned database of every chunk's decoration placements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementDb {
    pub version: u32,
    pub chunks: Vec<ChunkPlacements>,
}

impl Default for PlacementDb {
    fn default() -> Self {
        Self {
            version: PLACEMENT_DB_VERSION,
            chunks: Vec::new(),
        }
    }
}

impl PlacementDb {
    /// Snapshot the placements of every decorated chunk in the store.
    pub fn from_store(store: &ChunkStore) -> Self {
        let chunks = store
            .all_chunks()
            .filter(|record| record.is_decorated())
            .map(|record| ChunkPlacements {
                coord: record.coord(),
                placements: record.placements().to_vec(),
            })
            .collect();
        Self {
            version: PLACEMENT_DB_VERSION,
            chunks,
        }
    }

    pub fn object_count(&self) -> usize {
        self.chunks.iter().map(|c| count_objects(&c.placements)).sum()
    }

    pub fn get(&self, coord: ChunkCoord) -> Option<&[WorldObjectPlacement]> {
        self.chunks
            .iter()
            .find(|c| c.coord == coord)
            .map(|c| c.placements.as_slice())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DataError> {
        Ok(bincode::serialize(self)?)
    }

    /// Load a placement DB from bytes (bincode).
    pub fn load_from_bytes(bytes: &[u8]) -> Result<Self, DataError> {
        let db: PlacementDb = bincode::deserialize(bytes)?;
        if db.version != PLACEMENT_DB_VERSION {
            return Err(DataError::UnsupportedVersion {
                what: "placement db",
                found: db.version,
                expected: PLACEMENT_DB_VERSION,
            });
        }
        Ok(db)
    }

    /// Load a placement DB from a file path (bincode).
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_bytes(&bytes)
    }
}
