//! # Terrain Settings
//!
//! Everything the pipeline reads from configuration. `TerrainConfig` is the
//! root document of a `terrain.toml` file; every table is optional and falls
//! back to its defaults.
//!
//! Out-of-range values are clamped by `validate()`, once, at load time. The
//! builders assume the clamped ranges as preconditions.

use std::path::Path;

use horizon_shared::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::curve::HeightCurve;
use crate::error::{ProceduralError, ProceduralResult};
use crate::falloff::FalloffSettings;
use crate::lod::LodLevel;

/// Smallest usable noise scale.
pub const MIN_NOISE_SCALE: f32 = 0.01;

/// Smallest world size of one mesh quad.
pub const MIN_MESH_SCALE: f32 = 0.01;

/// Number of LODs a mesh can be built at (0 = full detail).
pub const NUM_SUPPORTED_LODS: u32 = 5;

/// Chunk sizes (rendered quads per side at LOD 0).
///
/// Each is divisible by every LOD stride (1, 2, 4, 6, 8).
pub const SUPPORTED_CHUNK_SIZES: [usize; 9] = [48, 72, 96, 120, 144, 168, 192, 216, 240];

/// Flat shading triples the vertex count, so only the smallest sizes allow it.
pub const NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES: usize = 3;

/// How raw octave sums are mapped into a bounded range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMode {
    /// Remap each grid's own min/max onto `[0, 1]`. Neighboring chunks will not line up.
    Local,
    /// Divide by the theoretical maximum amplitude. Continuous across chunks.
    #[default]
    Global,
}

/// Fractal noise parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    /// Feature size in samples. Larger is smoother.
    pub scale: f32,
    /// Number of layers.
    pub octaves: u32,
    /// Amplitude multiplier per octave, in `[0, 1]`.
    pub persistence: f32,
    /// Frequency multiplier per octave, at least 1.
    pub lacunarity: f32,
    /// Seed for the octave offsets and the simplex permutation.
    pub seed: u64,
    /// Extra offset added to every octave.
    pub offset: Vec2,
    /// Normalization policy.
    pub normalize_mode: NormalizeMode,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            scale: 50.0,
            octaves: 6,
            persistence: 0.6,
            lacunarity: 2.0,
            seed: 21,
            offset: Vec2::ZERO,
            normalize_mode: NormalizeMode::Global,
        }
    }
}

impl NoiseSettings {
    /// Clamps every field into its valid range.
    pub fn validate(&mut self) {
        if self.scale.is_nan() || self.scale < MIN_NOISE_SCALE {
            warn!(scale = self.scale, "noise scale clamped to {MIN_NOISE_SCALE}");
            self.scale = MIN_NOISE_SCALE;
        }
        if self.octaves < 1 {
            warn!("noise octaves clamped to 1");
            self.octaves = 1;
        }
        if self.lacunarity.is_nan() || self.lacunarity < 1.0 {
            warn!(lacunarity = self.lacunarity, "noise lacunarity clamped to 1");
            self.lacunarity = 1.0;
        }
        if !(0.0..=1.0).contains(&self.persistence) {
            warn!(persistence = self.persistence, "noise persistence clamped to [0, 1]");
            self.persistence = if self.persistence.is_nan() {
                0.0
            } else {
                self.persistence.clamp(0.0, 1.0)
            };
        }
    }

    /// Returns a clamped copy.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.validate();
        self
    }
}

/// Height map parameters: noise plus the shaping applied on top of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightMapSettings {
    /// Noise field parameters.
    pub noise: NoiseSettings,
    /// Apply the radial falloff mask.
    pub use_falloff: bool,
    /// Falloff mask shape.
    pub falloff: FalloffSettings,
    /// World height of a curve output of 1.
    pub height_multiplier: f32,
    /// Remap from normalized noise to height fraction.
    pub height_curve: HeightCurve,
}

impl Default for HeightMapSettings {
    fn default() -> Self {
        Self {
            noise: NoiseSettings::default(),
            use_falloff: false,
            falloff: FalloffSettings::default(),
            height_multiplier: 10.0,
            height_curve: HeightCurve::linear(),
        }
    }
}

impl HeightMapSettings {
    /// World height of the lowest normalized sample.
    #[must_use]
    pub fn min_height(&self) -> f32 {
        self.height_multiplier * self.height_curve.evaluate(0.0)
    }

    /// World height of the highest normalized sample.
    #[must_use]
    pub fn max_height(&self) -> f32 {
        self.height_multiplier * self.height_curve.evaluate(1.0)
    }
}

/// Mesh resolution and world scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// World units per grid cell.
    pub mesh_scale: f32,
    /// Duplicate vertices per triangle for a faceted look.
    pub use_flat_shading: bool,
    /// Index into `SUPPORTED_CHUNK_SIZES`.
    pub chunk_size_index: usize,
    /// Index into the first `NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES` sizes.
    pub flat_shaded_chunk_size_index: usize,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            mesh_scale: 2.5,
            use_flat_shading: false,
            chunk_size_index: 4,
            flat_shaded_chunk_size_index: 0,
        }
    }
}

impl MeshSettings {
    /// Clamps indices and scale into range.
    pub fn validate(&mut self) {
        if self.chunk_size_index >= SUPPORTED_CHUNK_SIZES.len() {
            warn!(index = self.chunk_size_index, "chunk size index clamped");
            self.chunk_size_index = SUPPORTED_CHUNK_SIZES.len() - 1;
        }
        if self.flat_shaded_chunk_size_index >= NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES {
            warn!(
                index = self.flat_shaded_chunk_size_index,
                "flat shaded chunk size index clamped"
            );
            self.flat_shaded_chunk_size_index = NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES - 1;
        }
        if self.mesh_scale.is_nan() || self.mesh_scale < MIN_MESH_SCALE {
            warn!(mesh_scale = self.mesh_scale, "mesh scale clamped to {MIN_MESH_SCALE}");
            self.mesh_scale = MIN_MESH_SCALE;
        }
    }

    /// Rendered quads per side at LOD 0.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        let index = if self.use_flat_shading {
            self.flat_shaded_chunk_size_index
                .min(NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES - 1)
        } else {
            self.chunk_size_index.min(SUPPORTED_CHUNK_SIZES.len() - 1)
        };
        SUPPORTED_CHUNK_SIZES[index]
    }

    /// Height map samples per side, including the two border rings each side.
    ///
    /// `chunk_size + 1` rendered vertices, plus 2 for the out-of-mesh ring and
    /// 2 for the edge-connection bookkeeping ring.
    #[must_use]
    pub fn vertices_per_line(&self) -> usize {
        self.chunk_size() + 5
    }

    /// Side length of one chunk in world units.
    #[must_use]
    pub fn mesh_world_size(&self) -> f32 {
        (self.vertices_per_line() - 3) as f32 * self.mesh_scale
    }
}

/// Chunk streaming tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// Viewer movement that triggers a full visible-set rebuild.
    pub viewer_move_threshold: f32,
    /// Distance from chunk bounds at which the collider is assigned.
    pub collider_generation_distance: f32,
    /// Index into `detail_levels` whose mesh doubles as the collider.
    pub collider_lod_index: usize,
    /// Background workers. 0 = available parallelism.
    pub worker_threads: usize,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            viewer_move_threshold: 25.0,
            collider_generation_distance: 5.0,
            collider_lod_index: 0,
            worker_threads: 0,
        }
    }
}

impl StreamingSettings {
    /// Squared rebuild threshold.
    #[must_use]
    pub fn sqr_viewer_move_threshold(&self) -> f32 {
        self.viewer_move_threshold * self.viewer_move_threshold
    }

    /// Squared collider assignment distance.
    #[must_use]
    pub fn sqr_collider_generation_distance(&self) -> f32 {
        self.collider_generation_distance * self.collider_generation_distance
    }
}

/// Root terrain configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Height map generation.
    pub height_map: HeightMapSettings,
    /// Mesh resolution and scale.
    pub mesh: MeshSettings,
    /// LOD levels, ascending by distance threshold.
    pub detail_levels: Vec<LodLevel>,
    /// Streaming behavior.
    pub streaming: StreamingSettings,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            height_map: HeightMapSettings::default(),
            mesh: MeshSettings::default(),
            detail_levels: vec![
                LodLevel::new(0, 200.0),
                LodLevel::new(1, 400.0),
                LodLevel::new(4, 600.0),
            ],
            streaming: StreamingSettings::default(),
        }
    }
}

impl TerrainConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or the config is
    /// structurally invalid.
    pub fn from_toml_str(source: &str) -> ProceduralResult<Self> {
        let mut config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails `from_toml_str`.
    pub fn load(path: impl AsRef<Path>) -> ProceduralResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ProceduralError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        info!(
            path = %path.display(),
            levels = config.detail_levels.len(),
            chunk_size = config.mesh.chunk_size(),
            "terrain config loaded"
        );
        Ok(config)
    }

    /// Applies every clamp and checks structural consistency.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if there are no detail levels or the collider
    /// LOD index points past them.
    pub fn validate(&mut self) -> ProceduralResult<()> {
        self.height_map.noise.validate();
        self.height_map.height_curve.sort_keys();
        self.mesh.validate();

        if self.detail_levels.is_empty() {
            return Err(ProceduralError::InvalidConfig(
                "at least one detail level is required".into(),
            ));
        }
        for level in &mut self.detail_levels {
            level.validate();
        }
        self.detail_levels.sort_by(|a, b| {
            a.visible_distance_threshold
                .total_cmp(&b.visible_distance_threshold)
        });

        if self.streaming.collider_lod_index >= self.detail_levels.len() {
            return Err(ProceduralError::InvalidConfig(format!(
                "collider_lod_index {} out of range for {} detail levels",
                self.streaming.collider_lod_index,
                self.detail_levels.len()
            )));
        }
        if self.streaming.viewer_move_threshold.is_nan()
            || self.streaming.viewer_move_threshold < 0.0
        {
            warn!("viewer move threshold clamped to 0");
            self.streaming.viewer_move_threshold = 0.0;
        }
        if self.streaming.collider_generation_distance.is_nan()
            || self.streaming.collider_generation_distance < 0.0
        {
            warn!("collider generation distance clamped to 0");
            self.streaming.collider_generation_distance = 0.0;
        }
        Ok(())
    }

    /// Streaming radius: the last detail level's threshold.
    #[must_use]
    pub fn max_view_distance(&self) -> f32 {
        self.detail_levels
            .last()
            .map_or(0.0, |level| level.visible_distance_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = include_str!("../data/terrain.toml");

    #[test]
    fn test_noise_clamps() {
        let mut noise = NoiseSettings {
            scale: 0.0,
            octaves: 0,
            persistence: 1.5,
            lacunarity: 0.5,
            ..NoiseSettings::default()
        };
        noise.validate();
        assert_eq!(noise.scale, MIN_NOISE_SCALE);
        assert_eq!(noise.octaves, 1);
        assert_eq!(noise.persistence, 1.0);
        assert_eq!(noise.lacunarity, 1.0);
    }

    #[test]
    fn test_mesh_scale_clamps() {
        for bad in [-1.0, 0.0, 0.001, f32::NAN] {
            let mut mesh = MeshSettings {
                mesh_scale: bad,
                ..MeshSettings::default()
            };
            mesh.validate();
            assert_eq!(mesh.mesh_scale, MIN_MESH_SCALE, "{bad}");
        }

        let mut mesh = MeshSettings::default();
        mesh.validate();
        assert_eq!(mesh.mesh_scale, 2.5);
    }

    #[test]
    fn test_vertices_per_line_and_world_size() {
        let mesh = MeshSettings {
            chunk_size_index: 0,
            ..MeshSettings::default()
        };
        assert_eq!(mesh.vertices_per_line(), 53);
        assert_eq!(mesh.mesh_world_size(), 125.0);
    }

    #[test]
    fn test_every_size_supports_every_lod() {
        for size in SUPPORTED_CHUNK_SIZES {
            for lod in 1..NUM_SUPPORTED_LODS as usize {
                assert_eq!(size % (lod * 2), 0, "size {size} lod {lod}");
            }
        }
    }

    #[test]
    fn test_flat_shading_uses_small_sizes() {
        let mesh = MeshSettings {
            use_flat_shading: true,
            chunk_size_index: 8,
            flat_shaded_chunk_size_index: 2,
            ..MeshSettings::default()
        };
        assert_eq!(mesh.chunk_size(), 96);
    }

    #[test]
    fn test_height_bounds_follow_curve() {
        let settings = HeightMapSettings {
            height_multiplier: 40.0,
            ..HeightMapSettings::default()
        };
        assert_eq!(settings.min_height(), 0.0);
        assert_eq!(settings.max_height(), 40.0);
    }

    #[test]
    fn test_sample_config_parses() {
        let config = TerrainConfig::from_toml_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.height_map.noise.seed, 21);
        assert_eq!(config.height_map.noise.normalize_mode, NormalizeMode::Global);
        assert_eq!(config.detail_levels.len(), 3);
        assert_eq!(config.max_view_distance(), 600.0);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = TerrainConfig::from_toml_str("[mesh]\nmesh_scale = 1.0\n").unwrap();
        assert_eq!(config.mesh.mesh_scale, 1.0);
        assert_eq!(config.height_map, HeightMapSettings::default());
        assert_eq!(config.streaming, StreamingSettings::default());
    }

    #[test]
    fn test_levels_sorted_and_clamped() {
        let source = r#"
            [[detail_levels]]
            lod = 9
            visible_distance_threshold = 500.0

            [[detail_levels]]
            lod = 0
            visible_distance_threshold = 100.0
        "#;
        let config = TerrainConfig::from_toml_str(source).unwrap();
        assert_eq!(config.detail_levels[0], LodLevel::new(0, 100.0));
        assert_eq!(config.detail_levels[1], LodLevel::new(NUM_SUPPORTED_LODS - 1, 500.0));
    }

    #[test]
    fn test_structural_errors() {
        let empty = TerrainConfig::from_toml_str("detail_levels = []\n");
        assert!(matches!(empty, Err(ProceduralError::InvalidConfig(_))));

        let collider = TerrainConfig::from_toml_str("[streaming]\ncollider_lod_index = 7\n");
        assert!(matches!(collider, Err(ProceduralError::InvalidConfig(_))));

        let garbage = TerrainConfig::from_toml_str("[mesh\n");
        assert!(matches!(garbage, Err(ProceduralError::ConfigParse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = TerrainConfig::load("/definitely/not/here/terrain.toml");
        assert!(matches!(result, Err(ProceduralError::ConfigIo { .. })));
    }
}
