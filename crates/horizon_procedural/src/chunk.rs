//! # Terrain Chunks
//!
//! One square of the world: its height map, one mesh slot per detail level,
//! and the LOD/visibility/collider state machine.
//!
//! A chunk never submits work itself. `update` and `update_collision` return
//! what should happen (mesh request, mesh to display, collider to assign,
//! visibility flip) and the streamer carries it out.

use std::sync::Arc;

use horizon_shared::{Bounds2, Vec2};
use serde::{Deserialize, Serialize};

use crate::heightmap::HeightMap;
use crate::lod::{select_lod_index, LodLevel};
use crate::mesh::MeshBuffer;

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// X coordinate, in chunks.
    pub x: i32,
    /// Y coordinate (world Z), in chunks.
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk whose center is nearest to a ground-plane position.
    #[inline]
    #[must_use]
    pub fn containing(position: Vec2, mesh_world_size: f32) -> Self {
        Self {
            x: (position.x / mesh_world_size).round() as i32,
            y: (position.y / mesh_world_size).round() as i32,
        }
    }

    /// Ground-plane position of the chunk's center.
    #[inline]
    #[must_use]
    pub fn world_center(self, mesh_world_size: f32) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32) * mesh_world_size
    }
}

/// Where a chunk is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    /// Not tracked by the streamer.
    Unloaded,
    /// Height map task in flight.
    HeightPending,
    /// Height map received, nothing displayed yet.
    HeightReady,
    /// Waiting for the mesh of this detail level.
    MeshPending {
        /// Index into the detail levels.
        lod_index: usize,
    },
    /// Displaying the mesh of this detail level.
    MeshReady {
        /// Index into the detail levels.
        lod_index: usize,
    },
}

/// Mesh slot for one detail level.
#[derive(Clone, Debug)]
pub struct LodMesh {
    /// LOD the mesh is built at.
    pub lod: u32,
    mesh: Option<Arc<MeshBuffer>>,
    requested: bool,
}

impl LodMesh {
    fn new(lod: u32) -> Self {
        Self {
            lod,
            mesh: None,
            requested: false,
        }
    }

    /// Built mesh, if it has arrived.
    #[must_use]
    pub fn mesh(&self) -> Option<&Arc<MeshBuffer>> {
        self.mesh.as_ref()
    }

    /// True once a build has been submitted.
    #[must_use]
    pub fn has_requested(&self) -> bool {
        self.requested
    }
}

/// Outcome of a LOD/visibility update.
#[derive(Clone, Debug, Default)]
pub struct ChunkUpdate {
    /// Detail level whose mesh must be built.
    pub request_mesh: Option<usize>,
    /// Mesh to display now.
    pub display: Option<Arc<MeshBuffer>>,
    /// New visibility, when it flipped.
    pub visibility_changed: Option<bool>,
}

/// Outcome of a collider update.
#[derive(Clone, Debug, Default)]
pub struct CollisionUpdate {
    /// Detail level whose mesh must be built for the collider.
    pub request_mesh: Option<usize>,
    /// Mesh to register as the collider.
    pub assign: Option<Arc<MeshBuffer>>,
}

/// One terrain chunk.
#[derive(Debug)]
pub struct TerrainChunk {
    coord: ChunkCoord,
    sample_center: Vec2,
    bounds: Bounds2,
    height_map: Option<Arc<HeightMap>>,
    lod_meshes: Vec<LodMesh>,
    /// Detail level currently displayed.
    previous_lod_index: Option<usize>,
    /// Detail level last selected for display.
    target_lod_index: Option<usize>,
    visible: bool,
    has_set_collider: bool,
}

impl TerrainChunk {
    /// Creates an empty, hidden chunk with one mesh slot per level.
    #[must_use]
    pub fn new(coord: ChunkCoord, mesh_world_size: f32, mesh_scale: f32, levels: &[LodLevel]) -> Self {
        let position = coord.world_center(mesh_world_size);
        Self {
            coord,
            sample_center: Vec2::new(position.x / mesh_scale, position.y / mesh_scale),
            bounds: Bounds2::new(position, Vec2::splat(mesh_world_size)),
            height_map: None,
            lod_meshes: levels.iter().map(|level| LodMesh::new(level.lod)).collect(),
            previous_lod_index: None,
            target_lod_index: None,
            visible: false,
            has_set_collider: false,
        }
    }

    /// Grid coordinate.
    #[must_use]
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Noise-space center passed to the height map builder.
    #[must_use]
    pub fn sample_center(&self) -> Vec2 {
        self.sample_center
    }

    /// Ground-plane bounds.
    #[must_use]
    pub fn bounds(&self) -> Bounds2 {
        self.bounds
    }

    /// Height map, once received.
    #[must_use]
    pub fn height_map(&self) -> Option<&Arc<HeightMap>> {
        self.height_map.as_ref()
    }

    /// Mesh slot for a detail level.
    #[must_use]
    pub fn lod_mesh(&self, lod_index: usize) -> Option<&LodMesh> {
        self.lod_meshes.get(lod_index)
    }

    /// Detail level currently displayed.
    #[must_use]
    pub fn displayed_lod_index(&self) -> Option<usize> {
        self.previous_lod_index
    }

    /// Visibility flag.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// True once the collider has been assigned.
    #[must_use]
    pub fn has_collider(&self) -> bool {
        self.has_set_collider
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> ChunkState {
        if self.height_map.is_none() {
            return ChunkState::HeightPending;
        }
        match (self.target_lod_index, self.previous_lod_index) {
            (Some(target), displayed)
                if displayed != Some(target) && !self.has_mesh(target) =>
            {
                ChunkState::MeshPending { lod_index: target }
            }
            (_, Some(lod_index)) => ChunkState::MeshReady { lod_index },
            _ => ChunkState::HeightReady,
        }
    }

    /// Stores the received height map.
    pub fn set_height_map(&mut self, height_map: Arc<HeightMap>) {
        self.height_map = Some(height_map);
    }

    /// Stores a received mesh. Out-of-range indices are ignored.
    pub fn set_mesh(&mut self, lod_index: usize, mesh: Arc<MeshBuffer>) {
        if let Some(slot) = self.lod_meshes.get_mut(lod_index) {
            slot.mesh = Some(mesh);
        }
    }

    /// Forgets that a mesh build was submitted, so the next update can
    /// request it again. Used when a build is lost to a worker panic.
    pub fn clear_mesh_request(&mut self, lod_index: usize) {
        if let Some(slot) = self.lod_meshes.get_mut(lod_index) {
            if slot.mesh.is_none() {
                slot.requested = false;
            }
        }
    }

    /// Re-evaluates visibility and LOD for the viewer's position.
    ///
    /// Does nothing until the height map has arrived. When the selected LOD
    /// differs from the displayed one, either the cached mesh is returned
    /// for display or a build is requested, never both, and never twice.
    pub fn update(&mut self, viewer: Vec2, levels: &[LodLevel]) -> ChunkUpdate {
        let mut update = ChunkUpdate::default();
        if self.height_map.is_none() {
            return update;
        }

        let viewer_distance = self.bounds.distance(viewer);
        let max_view_distance = levels
            .last()
            .map_or(0.0, |level| level.visible_distance_threshold);
        let visible = viewer_distance <= max_view_distance;

        if visible {
            let lod_index = select_lod_index(levels, viewer_distance);
            self.target_lod_index = Some(lod_index);

            if self.previous_lod_index != Some(lod_index) {
                if let Some(slot) = self.lod_meshes.get_mut(lod_index) {
                    if let Some(mesh) = &slot.mesh {
                        self.previous_lod_index = Some(lod_index);
                        update.display = Some(Arc::clone(mesh));
                    } else if !slot.requested {
                        slot.requested = true;
                        update.request_mesh = Some(lod_index);
                    }
                }
            }
        }

        if visible != self.visible {
            self.visible = visible;
            update.visibility_changed = Some(visible);
        }
        update
    }

    /// Collider policy for the designated collider level.
    ///
    /// Requests its mesh once the viewer is inside that level's threshold,
    /// and hands the mesh out as the collider once the viewer is within
    /// `sqr_collider_distance` of the bounds. Assigns at most once.
    pub fn update_collision(
        &mut self,
        viewer: Vec2,
        collider_lod_index: usize,
        levels: &[LodLevel],
        sqr_collider_distance: f32,
    ) -> CollisionUpdate {
        let mut update = CollisionUpdate::default();
        if self.has_set_collider {
            return update;
        }
        let (Some(level), Some(slot)) = (
            levels.get(collider_lod_index),
            self.lod_meshes.get_mut(collider_lod_index),
        ) else {
            return update;
        };

        let sqr_distance = self.bounds.sqr_distance(viewer);

        if sqr_distance < level.sqr_visible_distance_threshold()
            && !slot.requested
            && self.height_map.is_some()
        {
            slot.requested = true;
            update.request_mesh = Some(collider_lod_index);
        }

        if sqr_distance < sqr_collider_distance {
            if let Some(mesh) = &slot.mesh {
                update.assign = Some(Arc::clone(mesh));
                self.has_set_collider = true;
            }
        }
        update
    }

    fn has_mesh(&self, lod_index: usize) -> bool {
        self.lod_meshes
            .get(lod_index)
            .is_some_and(|slot| slot.mesh.is_some())
    }
}
