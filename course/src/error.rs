//! Error types for terrain construction and level/config data.

use thiserror::Error;

use crate::chunk::ChunkCoord;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("trying to stitch terrain maps of different size: {width}x{height} vs {other_width}x{other_height}")]
    MismatchedDimensions {
        width: usize,
        height: usize,
        other_width: usize,
        other_height: usize,
    },
    #[error("grid dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    #[error("sample array `{name}` has {actual} entries, expected {expected}")]
    SampleLength {
        name: &'static str,
        actual: usize,
        expected: usize,
    },
    #[error("chunk {0} is not registered")]
    UnknownChunk(ChunkCoord),
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse RON: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("failed to write RON: {0}")]
    RonWrite(#[from] ron::Error),
    #[error("failed to encode/decode bincode: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("unsupported {what} version {found} (expected {expected})")]
    UnsupportedVersion {
        what: &'static str,
        found: u32,
        expected: u32,
    },
}
