//! # Host Interface
//!
//! The streamer never talks to a renderer or physics engine directly. The
//! host implements `TerrainHost` and receives every visible side effect
//! through it, on the thread that calls `ChunkStreamer::update`.
//!
//! ```text
//! horizon defines:        host implements:
//! ┌──────────────────┐    ┌──────────────────────┐
//! │ trait TerrainHost│ ←─ │ impl for renderer    │
//! └──────────────────┘    └──────────────────────┘
//! ```

use std::sync::Arc;

use crate::chunk::ChunkCoord;
use crate::mesh::MeshBuffer;

/// Receives chunk geometry, colliders and visibility changes.
pub trait TerrainHost {
    /// Replaces the chunk's displayed geometry.
    fn upload_mesh(&mut self, coord: ChunkCoord, mesh: &Arc<MeshBuffer>);

    /// Registers the chunk's collision mesh. Called at most once per chunk.
    fn assign_collider(&mut self, coord: ChunkCoord, mesh: &Arc<MeshBuffer>);

    /// Shows or hides the chunk.
    fn set_visible(&mut self, coord: ChunkCoord, visible: bool);
}
