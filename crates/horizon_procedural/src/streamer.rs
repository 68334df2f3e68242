//! # Chunk Streamer
//!
//! Keeps the chunks around a moving viewer loaded at the right LOD.
//!
//! ## Per-tick flow
//!
//! ```text
//! update(viewer)
//!   ├─ drain completed tasks ──> ChunkEvent ──> chunk state + host calls
//!   ├─ viewer moved at all?   ──> collider check on visible chunks
//!   └─ moved past threshold?  ──> rebuild visible set, create new chunks
//! ```
//!
//! Workers only see immutable inputs (`Arc<HeightMapBuilder>`, a copied
//! `MeshBuilder`, `Arc<HeightMap>`) and report back through the task queue.
//! All chunk state is touched on the caller's thread only.
//!
//! Chunks are only dropped when their height map build panics. A chunk that
//! leaves range while a task is in flight still stores the result.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use horizon_core::{QueueStats, TaskPanicked, TaskQueue, TaskQueueConfig};
use horizon_shared::Vec2;
use tracing::{debug, error, info};

use crate::chunk::{ChunkCoord, ChunkState, TerrainChunk};
use crate::error::{MeshError, ProceduralResult};
use crate::heightmap::{HeightMap, HeightMapBuilder};
use crate::host::TerrainHost;
use crate::mesh::{MeshBuffer, MeshBuilder};
use crate::settings::TerrainConfig;

/// Result of a background task, tagged with the chunk it belongs to.
#[derive(Debug)]
enum ChunkEvent {
    HeightMapReady {
        coord: ChunkCoord,
        result: Result<Arc<HeightMap>, TaskPanicked>,
    },
    MeshReady {
        coord: ChunkCoord,
        lod_index: usize,
        result: Result<MeshBuffer, MeshError>,
    },
    MeshPanicked {
        coord: ChunkCoord,
        lod_index: usize,
        error: TaskPanicked,
    },
}

/// Streaming counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamerStats {
    /// Chunks created.
    pub chunks_created: u64,
    /// Height maps delivered.
    pub height_maps_received: u64,
    /// Height map builds that panicked. The chunk is dropped and rebuilt
    /// the next time the visible set is refreshed.
    pub height_map_failures: u64,
    /// Mesh builds submitted.
    pub mesh_requests: u64,
    /// Meshes delivered.
    pub meshes_received: u64,
    /// Mesh builds that failed or panicked.
    pub mesh_failures: u64,
    /// Colliders handed to the host.
    pub colliders_assigned: u64,
}

/// Viewer-driven terrain streaming.
pub struct ChunkStreamer<H: TerrainHost> {
    config: TerrainConfig,
    height_map_builder: Arc<HeightMapBuilder>,
    mesh_builder: MeshBuilder,
    queue: TaskQueue<Vec<ChunkEvent>>,
    chunks: HashMap<ChunkCoord, TerrainChunk>,
    visible_chunks: Vec<ChunkCoord>,
    viewer_position: Vec2,
    last_tick_position: Option<Vec2>,
    last_update_position: Option<Vec2>,
    mesh_world_size: f32,
    vertices_per_line: usize,
    chunks_visible_in_view_distance: i32,
    host: H,
    stats: StreamerStats,
}

impl<H: TerrainHost> ChunkStreamer<H> {
    /// Creates a streamer and starts its worker pool.
    ///
    /// The config is validated again here, so hand-built configs get the
    /// same clamps as loaded ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is structurally invalid or the
    /// workers cannot start.
    pub fn new(config: &TerrainConfig, host: H) -> ProceduralResult<Self> {
        let mut config = config.clone();
        config.validate()?;

        let queue = TaskQueue::new(TaskQueueConfig {
            worker_threads: config.streaming.worker_threads,
            thread_name: "horizon-terrain".into(),
        })?;

        let mesh_world_size = config.mesh.mesh_world_size();
        let chunks_visible_in_view_distance =
            (config.max_view_distance() / mesh_world_size).round() as i32;

        info!(
            chunk_world_size = mesh_world_size,
            view_distance = config.max_view_distance(),
            chunk_radius = chunks_visible_in_view_distance,
            workers = queue.worker_count(),
            "chunk streamer started"
        );

        Ok(Self {
            height_map_builder: Arc::new(HeightMapBuilder::new(config.height_map.clone())),
            mesh_builder: MeshBuilder::from_settings(&config.mesh),
            vertices_per_line: config.mesh.vertices_per_line(),
            config,
            queue,
            chunks: HashMap::new(),
            visible_chunks: Vec::new(),
            viewer_position: Vec2::ZERO,
            last_tick_position: None,
            last_update_position: None,
            mesh_world_size,
            chunks_visible_in_view_distance,
            host,
            stats: StreamerStats::default(),
        })
    }

    /// Per-tick update. Never blocks.
    pub fn update(&mut self, viewer: Vec2) {
        self.viewer_position = viewer;

        let mut events = Vec::new();
        self.queue.poll(&mut events);
        self.handle_events(events);

        if self.last_tick_position != Some(viewer) {
            for coord in self.visible_chunks.clone() {
                self.update_collision(coord);
            }
        }
        self.last_tick_position = Some(viewer);

        let threshold = self.config.streaming.sqr_viewer_move_threshold();
        let rebuild = self
            .last_update_position
            .map_or(true, |last| last.distance_squared(viewer) > threshold);
        if rebuild {
            self.last_update_position = Some(viewer);
            self.update_visible_chunks();
        }
    }

    /// Blocks until every in-flight task, including ones triggered by
    /// delivered results, has been handled, or `timeout` passes.
    ///
    /// Returns true if nothing is left in flight. For load screens and
    /// tests; the per-tick path is `update`.
    pub fn flush(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.queue.pending() > 0 {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let mut events = Vec::new();
            self.queue.wait(&mut events, deadline - now);
            self.handle_events(events);
        }
        self.queue.pending() == 0
    }

    /// Lifecycle state of a chunk.
    #[must_use]
    pub fn chunk_state(&self, coord: ChunkCoord) -> ChunkState {
        self.chunks
            .get(&coord)
            .map_or(ChunkState::Unloaded, TerrainChunk::state)
    }

    /// A tracked chunk.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    /// Number of tracked chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Chunks currently visible, in the order they became visible.
    #[must_use]
    pub fn visible_chunks(&self) -> &[ChunkCoord] {
        &self.visible_chunks
    }

    /// Tasks submitted but not yet handled.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.queue.pending()
    }

    /// Side length of a chunk in world units.
    #[must_use]
    pub fn mesh_world_size(&self) -> f32 {
        self.mesh_world_size
    }

    /// Validated config in use.
    #[must_use]
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Streaming counters.
    #[must_use]
    pub fn stats(&self) -> StreamerStats {
        self.stats
    }

    /// Task queue counters.
    #[must_use]
    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// The host.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The host, mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn handle_events(&mut self, events: Vec<ChunkEvent>) {
        for event in events {
            match event {
                ChunkEvent::HeightMapReady {
                    coord,
                    result: Err(err),
                } => {
                    self.stats.height_map_failures += 1;
                    error!(?coord, error = %err, "height map build panicked");
                    self.chunks.remove(&coord);
                }
                ChunkEvent::HeightMapReady {
                    coord,
                    result: Ok(height_map),
                } => {
                    self.stats.height_maps_received += 1;
                    if let Some(chunk) = self.chunks.get_mut(&coord) {
                        chunk.set_height_map(height_map);
                        debug!(?coord, "height map received");
                    }
                    self.update_chunk(coord);
                }
                ChunkEvent::MeshReady {
                    coord,
                    lod_index,
                    result: Ok(mesh),
                } => {
                    self.stats.meshes_received += 1;
                    if let Some(chunk) = self.chunks.get_mut(&coord) {
                        chunk.set_mesh(lod_index, Arc::new(mesh));
                        debug!(?coord, lod_index, "mesh received");
                    }
                    self.update_chunk(coord);
                    if lod_index == self.config.streaming.collider_lod_index {
                        self.update_collision(coord);
                    }
                }
                ChunkEvent::MeshReady {
                    coord,
                    lod_index,
                    result: Err(err),
                } => {
                    self.stats.mesh_failures += 1;
                    error!(?coord, lod_index, error = %err, "mesh build failed");
                }
                ChunkEvent::MeshPanicked {
                    coord,
                    lod_index,
                    error,
                } => {
                    self.stats.mesh_failures += 1;
                    error!(?coord, lod_index, %error, "mesh build panicked");
                    if let Some(chunk) = self.chunks.get_mut(&coord) {
                        chunk.clear_mesh_request(lod_index);
                    }
                }
            }
        }
    }

    fn update_visible_chunks(&mut self) {
        let mut already_updated = HashSet::new();
        for &coord in self.visible_chunks.clone().iter().rev() {
            already_updated.insert(coord);
            self.update_chunk(coord);
        }

        let current = ChunkCoord::containing(self.viewer_position, self.mesh_world_size);
        let radius = self.chunks_visible_in_view_distance;
        for y_offset in -radius..=radius {
            for x_offset in -radius..=radius {
                let coord = ChunkCoord::new(current.x + x_offset, current.y + y_offset);
                if self.chunks.contains_key(&coord) {
                    if !already_updated.contains(&coord) {
                        self.update_chunk(coord);
                    }
                } else {
                    self.load_chunk(coord);
                }
            }
        }
    }

    fn load_chunk(&mut self, coord: ChunkCoord) {
        let chunk = TerrainChunk::new(
            coord,
            self.mesh_world_size,
            self.config.mesh.mesh_scale,
            &self.config.detail_levels,
        );
        let builder = Arc::clone(&self.height_map_builder);
        let size = self.vertices_per_line;
        let sample_center = chunk.sample_center();

        self.chunks.insert(coord, chunk);
        self.stats.chunks_created += 1;
        debug!(?coord, "chunk created");

        self.queue.submit(
            move || Arc::new(builder.build(size, size, sample_center)),
            move |result, events: &mut Vec<ChunkEvent>| {
                events.push(ChunkEvent::HeightMapReady { coord, result });
            },
        );
    }

    fn update_chunk(&mut self, coord: ChunkCoord) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        let update = chunk.update(self.viewer_position, &self.config.detail_levels);
        let height_map = chunk.height_map().cloned();

        if let (Some(lod_index), Some(height_map)) = (update.request_mesh, height_map) {
            self.request_mesh(coord, lod_index, height_map);
        }
        if let Some(mesh) = update.display {
            debug!(?coord, lod = mesh.lod, "mesh displayed");
            self.host.upload_mesh(coord, &mesh);
        }
        if let Some(visible) = update.visibility_changed {
            debug!(?coord, visible, "visibility changed");
            self.host.set_visible(coord, visible);
            if visible {
                self.visible_chunks.push(coord);
            } else {
                self.visible_chunks.retain(|&c| c != coord);
            }
        }
    }

    fn update_collision(&mut self, coord: ChunkCoord) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        let streaming = &self.config.streaming;
        let update = chunk.update_collision(
            self.viewer_position,
            streaming.collider_lod_index,
            &self.config.detail_levels,
            streaming.sqr_collider_generation_distance(),
        );
        let height_map = chunk.height_map().cloned();

        if let (Some(lod_index), Some(height_map)) = (update.request_mesh, height_map) {
            self.request_mesh(coord, lod_index, height_map);
        }
        if let Some(mesh) = update.assign {
            self.stats.colliders_assigned += 1;
            debug!(?coord, "collider assigned");
            self.host.assign_collider(coord, &mesh);
        }
    }

    fn request_mesh(&mut self, coord: ChunkCoord, lod_index: usize, height_map: Arc<HeightMap>) {
        let Some(level) = self.config.detail_levels.get(lod_index) else {
            return;
        };
        let lod = level.lod;
        let builder = self.mesh_builder;

        self.stats.mesh_requests += 1;
        debug!(?coord, lod_index, lod, "mesh requested");

        self.queue.submit(
            move || builder.build(&height_map.values, lod),
            move |result, events: &mut Vec<ChunkEvent>| {
                events.push(match result {
                    Ok(result) => ChunkEvent::MeshReady {
                        coord,
                        lod_index,
                        result,
                    },
                    // Cleared so a later update can ask for the mesh again.
                    Err(error) => ChunkEvent::MeshPanicked {
                        coord,
                        lod_index,
                        error,
                    },
                });
            },
        );
    }
}
