//! # Terrain Pipeline Integration Test
//!
//! Noise -> height map -> LOD mesh, and seams between neighboring chunks.

use std::collections::HashMap;

use horizon_procedural::{
    ChunkCoord, HeightMapBuilder, HeightMapSettings, LodLevel, MeshBuffer, MeshBuilder,
    MeshNormals, MeshSettings, NoiseSettings, NormalizeMode, TerrainChunk,
};
use horizon_shared::{Vec2, Vec3};

fn noise_settings() -> NoiseSettings {
    NoiseSettings {
        scale: 50.0,
        octaves: 4,
        persistence: 0.5,
        lacunarity: 2.0,
        seed: 21,
        normalize_mode: NormalizeMode::Global,
        ..NoiseSettings::default()
    }
}

fn height_settings() -> HeightMapSettings {
    HeightMapSettings {
        noise: noise_settings(),
        use_falloff: false,
        height_multiplier: 25.0,
        ..HeightMapSettings::default()
    }
}

fn mesh_settings() -> MeshSettings {
    MeshSettings {
        chunk_size_index: 0,
        mesh_scale: 2.5,
        ..MeshSettings::default()
    }
}

/// Builds a chunk's mesh and returns it with the chunk's world offset.
fn chunk_mesh(coord: ChunkCoord, lod: u32) -> (MeshBuffer, Vec2) {
    let mesh_settings = mesh_settings();
    let world_size = mesh_settings.mesh_world_size();
    let n = mesh_settings.vertices_per_line();

    let chunk = TerrainChunk::new(coord, world_size, mesh_settings.mesh_scale, &[LodLevel::new(lod, 1.0)]);
    let height_map = HeightMapBuilder::new(height_settings()).build(n, n, chunk.sample_center());
    let mesh = MeshBuilder::from_settings(&mesh_settings)
        .build(&height_map.values, lod)
        .unwrap();
    (mesh, chunk.bounds().center)
}

/// World-space position and normal of every vertex whose uv lies on `edge`,
/// keyed by its cell index along the edge.
fn edge_vertices(
    mesh: &MeshBuffer,
    offset: Vec2,
    on_edge: impl Fn(Vec2) -> Option<f32>,
) -> HashMap<i32, (Vec3, Vec3)> {
    let cells = (mesh_settings().vertices_per_line() - 3) as f32;
    let MeshNormals::Baked(normals) = &mesh.normals else {
        panic!("expected baked normals");
    };
    mesh.uvs
        .iter()
        .enumerate()
        .filter_map(|(i, &uv)| {
            on_edge(uv).map(|along| {
                let world = mesh.vertices[i] + Vec3::new(offset.x, 0.0, offset.y);
                ((along * cells).round() as i32, (world, normals[i]))
            })
        })
        .collect()
}

#[test]
fn test_end_to_end_241_lod0() {
    let n = 241;
    let height_map = HeightMapBuilder::new(height_settings()).build(n, n, Vec2::ZERO);
    assert!(height_map.values.values().iter().all(|&h| h >= 0.0));

    let world_size = (n - 3) as f32 * 2.5;
    let mesh = MeshBuilder::new(world_size, false)
        .build(&height_map.values, 0)
        .unwrap();

    assert_eq!(mesh.triangle_count(), 2 * (n - 3) * (n - 3));
    assert_eq!(mesh.vertex_count(), (n - 2) * (n - 2));
    assert!(mesh.triangles.iter().all(|&i| (i as usize) < mesh.vertex_count()));

    let MeshNormals::Baked(normals) = &mesh.normals else {
        panic!("expected baked normals");
    };
    assert_eq!(normals.len(), mesh.vertex_count());
    for normal in normals {
        assert!((normal.length() - 1.0).abs() < 1e-4);
        assert!(normal.y > 0.0, "terrain normal points down: {normal:?}");
    }
}

#[test]
fn test_same_config_same_mesh() {
    let (a, _) = chunk_mesh(ChunkCoord::new(3, -7), 1);
    let (b, _) = chunk_mesh(ChunkCoord::new(3, -7), 1);
    assert_eq!(a, b);
}

#[test]
fn test_seam_between_east_west_neighbors_same_lod() {
    let (west, west_offset) = chunk_mesh(ChunkCoord::new(0, 0), 0);
    let (east, east_offset) = chunk_mesh(ChunkCoord::new(1, 0), 0);

    let west_edge = edge_vertices(&west, west_offset, |uv| (uv.x == 1.0).then_some(uv.y));
    let east_edge = edge_vertices(&east, east_offset, |uv| (uv.x == 0.0).then_some(uv.y));

    assert_eq!(west_edge.len(), mesh_settings().vertices_per_line() - 2);
    assert_eq!(west_edge.len(), east_edge.len());
    for (key, (position, normal)) in &west_edge {
        let (other, other_normal) = east_edge[key];
        assert!((*position - other).length() < 1e-4, "crack at {key}: {position:?} vs {other:?}");
        assert!((*normal - other_normal).length() < 1e-3, "normal seam at {key}");
    }
}

#[test]
fn test_seam_between_north_south_neighbors_same_lod() {
    // +Y in chunk coordinates is +Z in the world: the north chunk's last
    // uv row meets the south chunk's first.
    let (south, south_offset) = chunk_mesh(ChunkCoord::new(0, 0), 1);
    let (north, north_offset) = chunk_mesh(ChunkCoord::new(0, 1), 1);

    let south_edge = edge_vertices(&south, south_offset, |uv| (uv.y == 0.0).then_some(uv.x));
    let north_edge = edge_vertices(&north, north_offset, |uv| (uv.y == 1.0).then_some(uv.x));

    assert_eq!(south_edge.len(), north_edge.len());
    for (key, (position, _)) in &south_edge {
        let (other, _) = north_edge[key];
        assert!((*position - other).length() < 1e-4, "crack at {key}: {position:?} vs {other:?}");
    }
}

#[test]
fn test_seam_between_different_lods() {
    let (fine, fine_offset) = chunk_mesh(ChunkCoord::new(0, 0), 0);
    let (coarse, coarse_offset) = chunk_mesh(ChunkCoord::new(1, 0), 2);
    assert!(coarse.triangle_count() < fine.triangle_count());

    let fine_edge = edge_vertices(&fine, fine_offset, |uv| (uv.x == 1.0).then_some(uv.y));
    let coarse_edge = edge_vertices(&coarse, coarse_offset, |uv| (uv.x == 0.0).then_some(uv.y));

    assert_eq!(fine_edge.len(), coarse_edge.len());
    for (key, (position, _)) in &fine_edge {
        let (other, _) = coarse_edge[key];
        assert!((*position - other).length() < 1e-4, "crack at {key}: {position:?} vs {other:?}");
    }
}

#[test]
fn test_global_heights_stay_non_negative_across_chunks() {
    let settings = mesh_settings();
    let n = settings.vertices_per_line();
    let builder = HeightMapBuilder::new(height_settings());
    for x in -3..3 {
        for y in -3..3 {
            let chunk = TerrainChunk::new(
                ChunkCoord::new(x, y),
                settings.mesh_world_size(),
                settings.mesh_scale,
                &[LodLevel::new(0, 1.0)],
            );
            let map = builder.build(n, n, chunk.sample_center());
            assert!(map.min_value >= 0.0);
            assert!(map.max_value <= height_settings().height_multiplier * 1.5);
        }
    }
}
