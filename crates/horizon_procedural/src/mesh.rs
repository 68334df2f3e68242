//! # LOD Mesh Builder
//!
//! Turns a height grid into a renderable mesh at a given LOD without cracks
//! against neighbors built at any other LOD.
//!
//! ## Grid Rings
//!
//! ```text
//!   O O O O O O O O O      O  out-of-mesh: normals only, never rendered
//!   O E E E E E E E O      E  mesh edge: always full resolution
//!   O E M c c c M E O      M  main: the simplified grid (stride = skip)
//!   O E c . . . c E O      c  edge connection: height interpolated
//!   O E c . . . c E O         between the two nearest main vertices
//!   O E M c c c M E O      .  skipped
//!   O E E E E E E E O
//!   O O O O O O O O O
//! ```
//!
//! Every buffer is sized from closed-form counts before the first write and
//! filled through cursors; an over-fill is an index panic and an under-fill
//! leaves a sentinel behind that the tests look for.

use horizon_shared::{Vec2, Vec3};
use tracing::trace;

use crate::error::MeshError;
use crate::grid::Grid;
use crate::settings::MeshSettings;

/// Smallest grid that still has an interior: two border rings each side plus one main vertex.
pub const MIN_VERTICES_PER_LINE: usize = 5;

const SENTINEL_POSITION: Vec3 = Vec3::splat(f32::NAN);
const SENTINEL_UV: Vec2 = Vec2::splat(f32::NAN);
const SENTINEL_INDEX: u32 = u32::MAX;

/// Stride between main vertices at `lod`.
#[inline]
#[must_use]
pub fn skip_increment(lod: u32) -> usize {
    if lod == 0 {
        1
    } else {
        lod as usize * 2
    }
}

/// Height of an edge-connection vertex `percent` of the way from main vertex A to B.
#[inline]
#[must_use]
pub fn interpolate_edge_height(height_a: f32, height_b: f32, percent: f32) -> f32 {
    height_a * (1.0 - percent) + height_b * percent
}

/// Role of a grid cell in the mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexKind {
    /// Outermost ring. Contributes to border normals only.
    OutOfMesh,
    /// Second ring. Always rendered at full resolution.
    MeshEdge,
    /// On the simplified grid.
    Main,
    /// Third ring, between main vertices. Height interpolated.
    EdgeConnection,
    /// Interior cell dropped at this LOD.
    Skipped,
}

/// Where a vertex lives: the rendered array or the normals-only border array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VertexRef {
    Mesh(u32),
    OutOfMesh(u32),
}

/// Closed-form sizes for one `(vertices_per_line, lod)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshLayout {
    /// Grid samples per side, border rings included.
    pub vertices_per_line: usize,
    /// LOD index.
    pub lod: u32,
    /// Stride between main vertices.
    pub skip: usize,
    /// Main vertices per row of the simplified grid.
    pub main_vertices_per_line: usize,
    /// Vertices on the mesh-edge ring.
    pub mesh_edge_vertices: usize,
    /// Edge-connection vertices.
    pub edge_connection_vertices: usize,
    /// Main vertices.
    pub main_vertices: usize,
    /// Out-of-mesh vertices.
    pub out_of_mesh_vertices: usize,
    /// Rendered triangles.
    pub mesh_triangles: usize,
    /// Triangles touching the out-of-mesh ring.
    pub out_of_mesh_triangles: usize,
}

impl MeshLayout {
    /// Computes the layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid is too small or its interior span does
    /// not divide by the LOD stride.
    pub fn new(vertices_per_line: usize, lod: u32) -> Result<Self, MeshError> {
        let n = vertices_per_line;
        if n < MIN_VERTICES_PER_LINE {
            return Err(MeshError::TooSmall { size: n });
        }
        let skip = skip_increment(lod);
        if (n - 5) % skip != 0 {
            return Err(MeshError::IncompatibleLod { size: n, lod, skip });
        }

        let m = (n - 5) / skip + 1;
        Ok(Self {
            vertices_per_line: n,
            lod,
            skip,
            main_vertices_per_line: m,
            mesh_edge_vertices: (n - 2) * 4 - 4,
            edge_connection_vertices: (skip - 1) * (n - 5) / skip * 4,
            main_vertices: m * m,
            out_of_mesh_vertices: n * 4 - 4,
            mesh_triangles: 8 * (n - 4) + 2 * (m - 1) * (m - 1),
            out_of_mesh_triangles: 8 * (n - 2),
        })
    }

    /// Rendered vertices: mesh edge, edge connection and main.
    #[must_use]
    pub fn mesh_vertices(&self) -> usize {
        self.mesh_edge_vertices + self.edge_connection_vertices + self.main_vertices
    }

    /// Classifies cell `(x, y)`.
    #[must_use]
    pub fn classify(&self, x: usize, y: usize) -> VertexKind {
        let n = self.vertices_per_line;
        if x == 0 || y == 0 || x == n - 1 || y == n - 1 {
            VertexKind::OutOfMesh
        } else if x == 1 || y == 1 || x == n - 2 || y == n - 2 {
            VertexKind::MeshEdge
        } else if (x - 2) % self.skip == 0 && (y - 2) % self.skip == 0 {
            VertexKind::Main
        } else if x == 2 || y == 2 || x == n - 3 || y == n - 3 {
            VertexKind::EdgeConnection
        } else {
            VertexKind::Skipped
        }
    }
}

/// How the host gets normals for a mesh.
#[derive(Clone, Debug, PartialEq)]
pub enum MeshNormals {
    /// Smooth normals, one per vertex, border-corrected.
    Baked(Vec<Vec3>),
    /// Flat-shaded mesh; normals come from face geometry.
    Recompute,
}

/// A finished mesh for one chunk at one LOD. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshBuffer {
    /// LOD this mesh was built at.
    pub lod: u32,
    /// Chunk-local positions, Y up.
    pub vertices: Vec<Vec3>,
    /// Texture coordinates, `[0, 1]` across the rendered area.
    pub uvs: Vec<Vec2>,
    /// Triangle list, three indices per triangle.
    pub triangles: Vec<u32>,
    /// Normals or the recompute flag.
    pub normals: MeshNormals,
}

impl MeshBuffer {
    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// True for flat-shaded meshes.
    #[must_use]
    pub fn is_flat_shaded(&self) -> bool {
        matches!(self.normals, MeshNormals::Recompute)
    }

    /// Vertex positions as raw bytes for a GPU vertex buffer.
    #[must_use]
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Triangle indices as raw bytes for a GPU index buffer.
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }

    /// Face normal of each vertex's triangle.
    ///
    /// Meant for flat-shaded buffers, where no vertex is shared. On a shared
    /// vertex the last triangle touching it wins.
    #[must_use]
    pub fn recalculate_flat_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        for triangle in self.triangles.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
            let normal = surface_normal(self.vertices[a], self.vertices[b], self.vertices[c])
                .normalize_or_zero();
            normals[a] = normal;
            normals[b] = normal;
            normals[c] = normal;
        }
        normals
    }
}

/// Builds meshes for a fixed world size and shading mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshBuilder {
    mesh_world_size: f32,
    use_flat_shading: bool,
}

impl MeshBuilder {
    /// Creates a builder.
    #[must_use]
    pub const fn new(mesh_world_size: f32, use_flat_shading: bool) -> Self {
        Self {
            mesh_world_size,
            use_flat_shading,
        }
    }

    /// Creates a builder from mesh settings.
    #[must_use]
    pub fn from_settings(settings: &MeshSettings) -> Self {
        Self::new(settings.mesh_world_size(), settings.use_flat_shading)
    }

    /// Side length of a built mesh in world units.
    #[must_use]
    pub fn mesh_world_size(&self) -> f32 {
        self.mesh_world_size
    }

    /// Builds the mesh for `heights` at `lod`.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid is not square, too small, or cannot be
    /// simplified at `lod`.
    pub fn build(&self, heights: &Grid, lod: u32) -> Result<MeshBuffer, MeshError> {
        let data = self.build_data(heights, lod)?;
        let mesh = if self.use_flat_shading {
            data.into_flat_shaded(lod)
        } else {
            data.into_smooth_shaded(lod)
        };
        trace!(
            lod,
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "mesh built"
        );
        Ok(mesh)
    }

    fn build_data(&self, heights: &Grid, lod: u32) -> Result<MeshData, MeshError> {
        if heights.width() != heights.height() {
            return Err(MeshError::NotSquare {
                width: heights.width(),
                height: heights.height(),
            });
        }
        let layout = MeshLayout::new(heights.width(), lod)?;
        let n = layout.vertices_per_line;
        let skip = layout.skip;

        // Pass 1: assign every non-skipped cell a slot.
        let mut refs = Vec::with_capacity(n * n);
        let mut mesh_index = 0u32;
        let mut out_of_mesh_index = 0u32;
        for y in 0..n {
            for x in 0..n {
                refs.push(match layout.classify(x, y) {
                    VertexKind::Skipped => None,
                    VertexKind::OutOfMesh => {
                        out_of_mesh_index += 1;
                        Some(VertexRef::OutOfMesh(out_of_mesh_index - 1))
                    }
                    _ => {
                        mesh_index += 1;
                        Some(VertexRef::Mesh(mesh_index - 1))
                    }
                });
            }
        }
        let slot = |x: usize, y: usize| refs[y * n + x];

        // Pass 2: positions, heights and triangles.
        let mut data = MeshData::new(&layout);
        let span = (n - 3) as f32;
        let top_left = Vec2::new(-1.0, 1.0) * (self.mesh_world_size / 2.0);

        for y in 0..n {
            for x in 0..n {
                let Some(vertex) = slot(x, y) else {
                    continue;
                };
                let kind = layout.classify(x, y);

                let height = if kind == VertexKind::EdgeConnection {
                    let link = edge_link(x, y, n, skip);
                    let height_a = heights.get(link.a.0, link.a.1);
                    let height_b = heights.get(link.b.0, link.b.1);
                    interpolate_edge_height(height_a, height_b, link.percent)
                } else {
                    heights.get(x, y)
                };

                let percent = Vec2::new((x as f32 - 1.0) / span, (y as f32 - 1.0) / span);
                let ground = top_left + Vec2::new(percent.x, -percent.y) * self.mesh_world_size;
                data.set_vertex(vertex, Vec3::new(ground.x, height, ground.y), percent);

                let corner_connection = kind == VertexKind::EdgeConnection && (x == 2 || y == 2);
                if x < n - 1 && y < n - 1 && !corner_connection {
                    let step = if kind == VertexKind::Main && x != n - 3 && y != n - 3 {
                        skip
                    } else {
                        1
                    };
                    let (Some(b), Some(c), Some(d)) =
                        (slot(x + step, y), slot(x, y + step), slot(x + step, y + step))
                    else {
                        unreachable!("triangle at ({x}, {y}) reaches a skipped cell");
                    };
                    data.add_triangle(vertex, d, c);
                    data.add_triangle(d, vertex, b);
                }
            }
        }

        data.assert_filled();
        Ok(data)
    }
}

/// Main vertices bracketing an edge-connection cell.
struct EdgeLink {
    a: (usize, usize),
    b: (usize, usize),
    percent: f32,
}

fn edge_link(x: usize, y: usize, n: usize, skip: usize) -> EdgeLink {
    let vertical = x == 2 || x == n - 3;
    let along = if vertical { y - 2 } else { x - 2 };
    let to_a = along % skip;
    let to_b = skip - to_a;
    let percent = to_a as f32 / skip as f32;
    if vertical {
        EdgeLink {
            a: (x, y - to_a),
            b: (x, y + to_b),
            percent,
        }
    } else {
        EdgeLink {
            a: (x - to_a, y),
            b: (x + to_b, y),
            percent,
        }
    }
}

/// Unnormalized normal of triangle `(a, b, c)`; length is twice its area.
#[inline]
fn surface_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a)
}

/// Mesh under construction.
struct MeshData {
    vertices: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<u32>,
    triangle_cursor: usize,
    out_of_mesh_vertices: Vec<Vec3>,
    out_of_mesh_triangles: Vec<[VertexRef; 3]>,
    out_of_mesh_triangle_cursor: usize,
}

impl MeshData {
    fn new(layout: &MeshLayout) -> Self {
        let mesh_vertices = layout.mesh_vertices();
        Self {
            vertices: vec![SENTINEL_POSITION; mesh_vertices],
            uvs: vec![SENTINEL_UV; mesh_vertices],
            triangles: vec![SENTINEL_INDEX; layout.mesh_triangles * 3],
            triangle_cursor: 0,
            out_of_mesh_vertices: vec![SENTINEL_POSITION; layout.out_of_mesh_vertices],
            out_of_mesh_triangles: vec![
                [VertexRef::OutOfMesh(SENTINEL_INDEX); 3];
                layout.out_of_mesh_triangles
            ],
            out_of_mesh_triangle_cursor: 0,
        }
    }

    fn set_vertex(&mut self, vertex: VertexRef, position: Vec3, uv: Vec2) {
        match vertex {
            VertexRef::Mesh(index) => {
                self.vertices[index as usize] = position;
                self.uvs[index as usize] = uv;
            }
            VertexRef::OutOfMesh(index) => self.out_of_mesh_vertices[index as usize] = position,
        }
    }

    fn add_triangle(&mut self, a: VertexRef, b: VertexRef, c: VertexRef) {
        match (a, b, c) {
            (VertexRef::Mesh(a), VertexRef::Mesh(b), VertexRef::Mesh(c)) => {
                let start = self.triangle_cursor * 3;
                self.triangles[start..start + 3].copy_from_slice(&[a, b, c]);
                self.triangle_cursor += 1;
            }
            _ => {
                self.out_of_mesh_triangles[self.out_of_mesh_triangle_cursor] = [a, b, c];
                self.out_of_mesh_triangle_cursor += 1;
            }
        }
    }

    fn position(&self, vertex: VertexRef) -> Vec3 {
        match vertex {
            VertexRef::Mesh(index) => self.vertices[index as usize],
            VertexRef::OutOfMesh(index) => self.out_of_mesh_vertices[index as usize],
        }
    }

    fn assert_filled(&self) {
        debug_assert_eq!(self.triangle_cursor * 3, self.triangles.len());
        debug_assert_eq!(
            self.out_of_mesh_triangle_cursor,
            self.out_of_mesh_triangles.len()
        );
    }

    fn bake_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];

        for triangle in self.triangles.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
            let normal = surface_normal(self.vertices[a], self.vertices[b], self.vertices[c]);
            normals[a] += normal;
            normals[b] += normal;
            normals[c] += normal;
        }

        for triangle in &self.out_of_mesh_triangles {
            let [a, b, c] = triangle.map(|vertex| self.position(vertex));
            let normal = surface_normal(a, b, c);
            for vertex in triangle {
                if let VertexRef::Mesh(index) = vertex {
                    normals[*index as usize] += normal;
                }
            }
        }

        for normal in &mut normals {
            *normal = normal.normalize_or_zero();
        }
        normals
    }

    fn into_smooth_shaded(self, lod: u32) -> MeshBuffer {
        let normals = self.bake_normals();
        MeshBuffer {
            lod,
            vertices: self.vertices,
            uvs: self.uvs,
            triangles: self.triangles,
            normals: MeshNormals::Baked(normals),
        }
    }

    fn into_flat_shaded(self, lod: u32) -> MeshBuffer {
        let vertices = self
            .triangles
            .iter()
            .map(|&i| self.vertices[i as usize])
            .collect();
        let uvs = self.triangles.iter().map(|&i| self.uvs[i as usize]).collect();
        let triangles = (0..self.triangles.len() as u32).collect();
        MeshBuffer {
            lod,
            vertices,
            uvs,
            triangles,
            normals: MeshNormals::Recompute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLD_SIZE: f32 = 100.0;

    fn noisy_grid(n: usize) -> Grid {
        Grid::from_fn(n, n, |x, y| ((x * 7 + y * 13) % 11) as f32 * 0.5 + (x as f32 * 0.3).sin())
    }

    fn smooth_normals(mesh: &MeshBuffer) -> &[Vec3] {
        match &mesh.normals {
            MeshNormals::Baked(normals) => normals,
            MeshNormals::Recompute => panic!("expected baked normals"),
        }
    }

    fn vertex_at_cell(mesh: &MeshBuffer, n: usize, x: usize, y: usize) -> usize {
        let span = (n - 3) as f32;
        let uv = Vec2::new((x as f32 - 1.0) / span, (y as f32 - 1.0) / span);
        mesh.uvs
            .iter()
            .position(|candidate| candidate.distance_squared(uv) < 1e-10)
            .expect("no vertex for cell")
    }

    #[test]
    fn test_skip_increment() {
        assert_eq!(skip_increment(0), 1);
        assert_eq!(skip_increment(1), 2);
        assert_eq!(skip_increment(4), 8);
    }

    #[test]
    fn test_layout_counts_match_classification() {
        for (n, lod) in [(5, 0), (9, 1), (13, 2), (29, 3), (53, 0), (53, 4), (77, 2)] {
            let layout = MeshLayout::new(n, lod).unwrap();
            let mut counts = std::collections::HashMap::new();
            for y in 0..n {
                for x in 0..n {
                    *counts.entry(layout.classify(x, y)).or_insert(0usize) += 1;
                }
            }
            let count = |kind| counts.get(&kind).copied().unwrap_or(0);
            assert_eq!(count(VertexKind::OutOfMesh), layout.out_of_mesh_vertices, "n={n} lod={lod}");
            assert_eq!(count(VertexKind::MeshEdge), layout.mesh_edge_vertices, "n={n} lod={lod}");
            assert_eq!(count(VertexKind::Main), layout.main_vertices, "n={n} lod={lod}");
            assert_eq!(
                count(VertexKind::EdgeConnection),
                layout.edge_connection_vertices,
                "n={n} lod={lod}"
            );
        }
    }

    #[test]
    fn test_every_slot_written_exactly_once() {
        let builder = MeshBuilder::new(WORLD_SIZE, false);
        for (n, lod) in [(5, 0), (9, 1), (13, 2), (29, 3), (53, 1), (53, 4), (77, 2)] {
            let data = builder.build_data(&noisy_grid(n), lod).unwrap();
            let layout = MeshLayout::new(n, lod).unwrap();

            assert_eq!(data.vertices.len(), layout.mesh_vertices());
            assert!(data.vertices.iter().all(|v| !v.is_nan()), "n={n} lod={lod}");
            assert!(data.uvs.iter().all(|uv| !uv.is_nan()), "n={n} lod={lod}");
            assert!(data.out_of_mesh_vertices.iter().all(|v| !v.is_nan()));

            assert_eq!(data.triangle_cursor, layout.mesh_triangles);
            assert!(data.triangles.iter().all(|&i| i != SENTINEL_INDEX));
            assert!(data.triangles.iter().all(|&i| (i as usize) < data.vertices.len()));

            assert_eq!(data.out_of_mesh_triangle_cursor, layout.out_of_mesh_triangles);
            for triangle in &data.out_of_mesh_triangles {
                assert!(triangle.iter().any(|v| matches!(v, VertexRef::OutOfMesh(_))));
                for vertex in triangle {
                    match *vertex {
                        VertexRef::Mesh(i) => assert!((i as usize) < data.vertices.len()),
                        VertexRef::OutOfMesh(i) => {
                            assert!((i as usize) < data.out_of_mesh_vertices.len());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_rejects_bad_grids() {
        let builder = MeshBuilder::new(WORLD_SIZE, false);
        assert_eq!(
            builder.build(&Grid::filled(9, 8, 0.0), 0),
            Err(MeshError::NotSquare { width: 9, height: 8 })
        );
        assert_eq!(
            builder.build(&Grid::filled(4, 4, 0.0), 0),
            Err(MeshError::TooSmall { size: 4 })
        );
        assert_eq!(
            builder.build(&Grid::filled(10, 10, 0.0), 1),
            Err(MeshError::IncompatibleLod { size: 10, lod: 1, skip: 2 })
        );
    }

    #[test]
    fn test_corners_span_world_size() {
        let n = 13;
        let mesh = MeshBuilder::new(WORLD_SIZE, false).build(&Grid::filled(n, n, 0.0), 0).unwrap();

        let top_left = mesh.vertices[vertex_at_cell(&mesh, n, 1, 1)];
        assert_eq!(top_left, Vec3::new(-50.0, 0.0, 50.0));
        let bottom_right = mesh.vertices[vertex_at_cell(&mesh, n, n - 2, n - 2)];
        assert_eq!(bottom_right, Vec3::new(50.0, 0.0, -50.0));
    }

    #[test]
    fn test_lod0_triangle_count() {
        let n = 29;
        let mesh = MeshBuilder::new(WORLD_SIZE, false).build(&noisy_grid(n), 0).unwrap();
        assert_eq!(mesh.triangle_count(), 2 * (n - 3) * (n - 3));
        assert_eq!(mesh.vertex_count(), (n - 2) * (n - 2));
    }

    #[test]
    fn test_edge_interpolation_exact_at_ends() {
        assert_eq!(interpolate_edge_height(3.25, -7.5, 0.0), 3.25);
        assert_eq!(interpolate_edge_height(3.25, -7.5, 1.0), -7.5);
        assert!((interpolate_edge_height(0.0, 8.0, 0.25) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_edge_connection_heights_follow_main_vertices() {
        // skip = 4; heights vary quadratically so interpolation is visible.
        let n = 13;
        let grid = Grid::from_fn(n, n, |x, y| (x * x + y * y) as f32);
        let mesh = MeshBuilder::new(WORLD_SIZE, false).build(&grid, 2).unwrap();

        // (2, 3) sits 1/4 of the way from main (2, 2) to main (2, 6).
        let v = mesh.vertices[vertex_at_cell(&mesh, n, 2, 3)];
        let expected = interpolate_edge_height(grid.get(2, 2), grid.get(2, 6), 0.25);
        assert!((v.y - expected).abs() < 1e-5);
        assert!((v.y - grid.get(2, 3)).abs() > 1.0);

        // (8, 10) on the last row: halfway between (6, 10) and (10, 10).
        let v = mesh.vertices[vertex_at_cell(&mesh, n, 8, 10)];
        let expected = interpolate_edge_height(grid.get(6, 10), grid.get(10, 10), 0.5);
        assert!((v.y - expected).abs() < 1e-5);

        // Mesh-edge vertices keep their sampled height at every LOD.
        let v = mesh.vertices[vertex_at_cell(&mesh, n, 5, 1)];
        assert_eq!(v.y, grid.get(5, 1));
    }

    #[test]
    fn test_flat_grid_normals_point_up() {
        let n = 13;
        for lod in [0, 1, 2] {
            let mesh = MeshBuilder::new(WORLD_SIZE, false).build(&Grid::filled(n, n, 4.0), lod).unwrap();
            for normal in smooth_normals(&mesh) {
                assert!((*normal - Vec3::Y).length() < 1e-5, "lod {lod}: {normal:?}");
            }
        }
    }

    #[test]
    fn test_sloped_plane_normals_include_border() {
        // Height rises one unit per cell along +X; every normal, edges
        // included, must match the plane.
        let n = 17;
        let grid = Grid::from_fn(n, n, |x, _| x as f32);
        let mesh = MeshBuilder::new(WORLD_SIZE, false).build(&grid, 1).unwrap();

        let cell = WORLD_SIZE / (n - 3) as f32;
        let expected = Vec3::new(-1.0, cell, 0.0).normalize_or_zero();
        for normal in smooth_normals(&mesh) {
            assert!((*normal - expected).length() < 1e-4, "{normal:?} vs {expected:?}");
        }
    }

    #[test]
    fn test_normals_accumulate_every_triangle() {
        // Edge-connection vertices get no special treatment: each normal is
        // the normalized sum of the raw face normals around it, border
        // triangles included.
        let n = 13;
        let builder = MeshBuilder::new(WORLD_SIZE, false);
        let data = builder.build_data(&noisy_grid(n), 2).unwrap();

        let mut expected = vec![Vec3::ZERO; data.vertices.len()];
        let mut accumulate = |triangle: [VertexRef; 3]| {
            let [a, b, c] = triangle.map(|vertex| data.position(vertex));
            let face = (b - a).cross(c - a);
            for vertex in triangle {
                if let VertexRef::Mesh(index) = vertex {
                    expected[index as usize] += face;
                }
            }
        };
        for triangle in data.triangles.chunks_exact(3) {
            accumulate([triangle[0], triangle[1], triangle[2]].map(VertexRef::Mesh));
        }
        for &triangle in &data.out_of_mesh_triangles {
            accumulate(triangle);
        }

        let layout = MeshLayout::new(n, 2).unwrap();
        let baked = data.bake_normals();
        let mut index = 0;
        for y in 0..n {
            for x in 0..n {
                match layout.classify(x, y) {
                    VertexKind::Skipped | VertexKind::OutOfMesh => {}
                    kind => {
                        let want = expected[index].normalize_or_zero();
                        assert!(
                            (baked[index] - want).length() < 1e-5,
                            "{kind:?} at ({x}, {y}): {:?} vs {want:?}",
                            baked[index]
                        );
                        index += 1;
                    }
                }
            }
        }
        assert_eq!(index, baked.len());
    }

    #[test]
    fn test_flat_shading_duplicates_vertices() {
        let n = 21;
        let mesh = MeshBuilder::new(WORLD_SIZE, true).build(&noisy_grid(n), 2).unwrap();
        assert!(mesh.is_flat_shaded());
        assert_eq!(mesh.vertex_count(), mesh.triangle_count() * 3);
        assert_eq!(mesh.uvs.len(), mesh.vertex_count());
        for (i, &index) in mesh.triangles.iter().enumerate() {
            assert_eq!(index as usize, i);
        }
    }

    #[test]
    fn test_recalculated_flat_normals() {
        let n = 9;
        let mesh = MeshBuilder::new(WORLD_SIZE, true).build(&Grid::filled(n, n, 1.0), 0).unwrap();
        let normals = mesh.recalculate_flat_normals();
        assert_eq!(normals.len(), mesh.vertex_count());
        assert!(normals.iter().all(|normal| (*normal - Vec3::Y).length() < 1e-6));
    }

    #[test]
    fn test_position_bytes() {
        let n = 9;
        let mesh = MeshBuilder::new(WORLD_SIZE, false).build(&Grid::filled(n, n, 0.0), 0).unwrap();
        assert_eq!(mesh.position_bytes().len(), mesh.vertex_count() * 12);
        assert_eq!(mesh.index_bytes().len(), mesh.triangles.len() * 4);
    }
}
