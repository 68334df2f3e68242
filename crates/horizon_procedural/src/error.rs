//! # Procedural Error Types
//!
//! Range problems in settings are clamped, never raised. Only structural
//! problems (bad grid shapes, unreadable or inconsistent config files,
//! worker startup failures) surface as errors.

use std::path::PathBuf;

use horizon_core::TaskQueueError;
use thiserror::Error;

/// Errors raised when a height grid cannot be meshed at the requested LOD.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// Meshes are built from square grids only.
    #[error("height grid must be square, got {width}x{height}")]
    NotSquare {
        /// Grid width.
        width: usize,
        /// Grid height.
        height: usize,
    },

    /// The grid has no room for the border rings.
    #[error("height grid of {size} vertices per line is below the minimum of 5")]
    TooSmall {
        /// Vertices per line.
        size: usize,
    },

    /// The interior span does not divide evenly by the LOD stride.
    #[error("{size} vertices per line cannot be simplified at LOD {lod} (stride {skip})")]
    IncompatibleLod {
        /// Vertices per line.
        size: usize,
        /// Requested LOD.
        lod: u32,
        /// Stride for that LOD.
        skip: usize,
    },
}

/// Errors that can occur in the terrain pipeline.
#[derive(Error, Debug)]
pub enum ProceduralError {
    /// Config file could not be read.
    #[error("failed to read terrain config {path}: {source}")]
    ConfigIo {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for `TerrainConfig`.
    #[error("failed to parse terrain config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config parsed but is structurally unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Mesh building failed.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// Worker pool could not start.
    #[error(transparent)]
    Worker(#[from] TaskQueueError),
}

/// Result type for terrain pipeline operations.
pub type ProceduralResult<T> = Result<T, ProceduralError>;
