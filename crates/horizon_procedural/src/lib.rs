//! # HORIZON Procedural Terrain
//!
//! Deterministic, streamable terrain for open worlds.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same config and seed always produce the same terrain
//! 2. **Chunked**: The world is built in square chunks, each with its own height map
//! 3. **Seam-safe**: Neighboring chunks at any LOD share an identical border ring
//! 4. **Asynchronous**: Height maps and meshes are built off the update loop
//!
//! ## Core Components
//!
//! - `NoiseField`: Fractal simplex noise with Local/Global normalization
//! - `HeightMapBuilder`: Noise plus falloff and height curve, with height bounds
//! - `MeshBuilder`: LOD meshes with edge-connection stitching and baked normals
//! - `ChunkStreamer`: Viewer-driven chunk creation, LOD swaps and colliders
//!
//! ## Example
//!
//! ```rust,ignore
//! use horizon_procedural::{ChunkStreamer, TerrainConfig};
//! use horizon_shared::Vec2;
//!
//! let config = TerrainConfig::load("data/terrain.toml")?;
//! let mut streamer = ChunkStreamer::new(&config, my_host)?;
//!
//! // Once per frame
//! streamer.update(Vec2::new(viewer.x, viewer.z));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod chunk;
pub mod curve;
pub mod error;
pub mod falloff;
pub mod grid;
pub mod heightmap;
pub mod host;
pub mod lod;
pub mod mesh;
pub mod noise;
pub mod settings;
pub mod streamer;

pub use chunk::{ChunkCoord, ChunkState, TerrainChunk};
pub use curve::{CurveKey, HeightCurve};
pub use error::{MeshError, ProceduralError, ProceduralResult};
pub use falloff::{generate_falloff_map, FalloffBlend, FalloffSettings};
pub use grid::Grid;
pub use heightmap::{HeightMap, HeightMapBuilder};
pub use host::TerrainHost;
pub use lod::{select_lod_index, LodLevel};
pub use mesh::{interpolate_edge_height, MeshBuffer, MeshBuilder, MeshLayout, MeshNormals, VertexKind};
pub use noise::{NoiseField, SimplexNoise, WorldSeed};
pub use settings::{
    HeightMapSettings, MeshSettings, NoiseSettings, NormalizeMode, StreamingSettings, TerrainConfig,
};
pub use streamer::{ChunkStreamer, StreamerStats};
