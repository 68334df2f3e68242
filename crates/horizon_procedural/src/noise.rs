//! # Noise Field
//!
//! Deterministic fractal noise over an infinite plane, sampled one grid at a
//! time.
//!
//! ## Layers
//!
//! - `SimplexNoise`: a single 2D simplex layer in `[-1, 1]`, seeded
//!   permutation table.
//! - `NoiseField`: sums `octaves` simplex layers at falling amplitude and
//!   rising frequency, then normalizes.
//!
//! ## Determinism Guarantee
//!
//! For fixed settings and sample center, `NoiseField::generate` returns
//! bit-identical grids on every call. Octave offsets come from a ChaCha8
//! stream, so they do not depend on the platform's RNG either.

use horizon_shared::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::grid::Grid;
use crate::settings::{NoiseSettings, NormalizeMode};

/// Octave offsets are drawn from `[-OCTAVE_OFFSET_RANGE, OCTAVE_OFFSET_RANGE)`.
const OCTAVE_OFFSET_RANGE: i32 = 100_000;

/// Sub-seed purpose for the simplex permutation table.
const PERMUTATION_STREAM: u64 = 0x5150_5EED;

/// Global normalization divides by this fraction of the theoretical maximum.
const GLOBAL_HEADROOM: f64 = 0.9;

/// Seed for deterministic generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives an independent sub-seed for a specific purpose.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }
}

/// Pre-computed permutation table for simplex noise.
struct PermutationTable {
    /// 256 entries, doubled to avoid index wrapping.
    perm: [u8; 512],
}

impl PermutationTable {
    /// 12 gradient directions for 2D simplex.
    #[rustfmt::skip]
    const GRADIENTS: [[i8; 2]; 12] = [
        [1, 0], [1, 1], [0, 1], [-1, 1],
        [-1, 0], [-1, -1], [0, -1], [1, -1],
        [1, 0], [0, 1], [-1, 0], [0, -1],
    ];

    fn new(seed: WorldSeed) -> Self {
        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().take(256).enumerate() {
            *slot = i as u8;
        }

        // Fisher-Yates with xorshift64; a zero state would never advance.
        let mut state = match seed.value() {
            0 => 0x9e37_79b9_7f4a_7c15,
            value => value,
        };
        for i in (1..256).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let j = (state as usize) % (i + 1);
            perm.swap(i, j);
        }

        let (low, high) = perm.split_at_mut(256);
        high.copy_from_slice(low);

        Self { perm }
    }

    #[inline]
    fn get(&self, index: usize) -> u8 {
        self.perm[index & 511]
    }

    #[inline]
    fn gradient(hash: u8) -> [i8; 2] {
        Self::GRADIENTS[(hash % 12) as usize]
    }
}

/// 2D simplex noise generator, values in `[-1, 1]`.
pub struct SimplexNoise {
    perm_table: PermutationTable,
}

impl SimplexNoise {
    /// Skewing factor for 2D simplex grid: (sqrt(3) - 1) / 2.
    const F2: f64 = 0.366_025_403_784_439;
    /// Unskewing factor for 2D simplex grid: (3 - sqrt(3)) / 6.
    const G2: f64 = 0.211_324_865_405_187;

    /// Creates a new simplex noise generator from a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            perm_table: PermutationTable::new(seed),
        }
    }

    /// Samples 2D simplex noise at the given coordinates.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        // Skew input coordinates to simplex grid
        let skew = (x + y) * Self::F2;
        let i = fast_floor(x + skew);
        let j = fast_floor(y + skew);

        let unskew = f64::from(i + j) * Self::G2;
        let x0 = x - (f64::from(i) - unskew);
        let y0 = y - (f64::from(j) - unskew);

        // Upper or lower triangle
        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - f64::from(i1) + Self::G2;
        let y1 = y0 - f64::from(j1) + Self::G2;
        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let y2 = y0 - 1.0 + 2.0 * Self::G2;

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;
        let table = &self.perm_table;

        let gi0 = table.get(ii + table.get(jj) as usize);
        let gi1 = table.get(ii + i1 as usize + table.get(jj + j1 as usize) as usize);
        let gi2 = table.get(ii + 1 + table.get(jj + 1) as usize);

        // 70 scales the corner sum to [-1, 1]
        70.0 * (contribution(x0, y0, gi0) + contribution(x1, y1, gi1) + contribution(x2, y2, gi2))
    }
}

#[inline]
fn contribution(x: f64, y: f64, gradient_index: u8) -> f64 {
    let t = 0.5 - x * x - y * y;
    if t < 0.0 {
        0.0
    } else {
        let grad = PermutationTable::gradient(gradient_index);
        let t2 = t * t;
        t2 * t2 * (x * f64::from(grad[0]) + y * f64::from(grad[1]))
    }
}

/// Floor to `i32` without going through `f64::floor`.
#[inline]
fn fast_floor(x: f64) -> i32 {
    let xi = x as i32;
    if x < f64::from(xi) {
        xi - 1
    } else {
        xi
    }
}

/// Fractal noise field for height map generation.
pub struct NoiseField {
    settings: NoiseSettings,
    simplex: SimplexNoise,
}

impl NoiseField {
    /// Creates a field. Settings are clamped into range first.
    #[must_use]
    pub fn new(settings: &NoiseSettings) -> Self {
        let settings = settings.clone().validated();
        let seed = WorldSeed::new(settings.seed);
        Self {
            simplex: SimplexNoise::new(seed.derive(PERMUTATION_STREAM)),
            settings,
        }
    }

    /// The clamped settings in use.
    #[must_use]
    pub fn settings(&self) -> &NoiseSettings {
        &self.settings
    }

    /// Sum of all octave amplitudes: the largest raw magnitude possible.
    #[must_use]
    pub fn max_possible_height(&self) -> f64 {
        let persistence = f64::from(self.settings.persistence);
        let mut amplitude = 1.0;
        let mut total = 0.0;
        for _ in 0..self.settings.octaves {
            total += amplitude;
            amplitude *= persistence;
        }
        total
    }

    /// Per-octave sample offsets for a grid centered on `sample_center`.
    ///
    /// X adds the offset and center, Y subtracts them, so a chunk further
    /// along +Y samples further along -Y of the noise plane. This matches
    /// the way mesh rows run toward -Z in world space.
    #[must_use]
    pub fn octave_offsets(&self, sample_center: Vec2) -> Vec<(f64, f64)> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.settings.seed);
        let offset = self.settings.offset;
        (0..self.settings.octaves)
            .map(|_| {
                let ox = f64::from(rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE))
                    + f64::from(offset.x)
                    + f64::from(sample_center.x);
                let oy = f64::from(rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE))
                    - f64::from(offset.y)
                    - f64::from(sample_center.y);
                (ox, oy)
            })
            .collect()
    }

    /// Generates a `width x height` grid around `sample_center`.
    ///
    /// Global mode yields values `>= 0` that may exceed 1; Local mode maps
    /// this grid's own range onto `[0, 1]`.
    #[must_use]
    pub fn generate(&self, width: usize, height: usize, sample_center: Vec2) -> Grid {
        let offsets = self.octave_offsets(sample_center);
        let scale = f64::from(self.settings.scale);
        let persistence = f64::from(self.settings.persistence);
        let lacunarity = f64::from(self.settings.lacunarity);
        let half_width = width as f64 / 2.0;
        let half_height = height as f64 / 2.0;

        let mut raw = Vec::with_capacity(width * height);
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for y in 0..height {
            for x in 0..width {
                let mut amplitude = 1.0;
                let mut frequency = 1.0;
                let mut value = 0.0;

                for &(ox, oy) in &offsets {
                    let sample_x = (x as f64 - half_width + ox) / scale * frequency;
                    let sample_y = (y as f64 - half_height + oy) / scale * frequency;
                    value += self.simplex.sample(sample_x, sample_y) * amplitude;

                    amplitude *= persistence;
                    frequency *= lacunarity;
                }

                min = min.min(value);
                max = max.max(value);
                raw.push(value);
            }
        }

        let mut grid = Grid::filled(width, height, 0.0);
        match self.settings.normalize_mode {
            NormalizeMode::Global => {
                let divisor = self.max_possible_height() / GLOBAL_HEADROOM;
                for (cell, value) in grid.values_mut().iter_mut().zip(raw) {
                    *cell = ((value + 1.0) / divisor).max(0.0) as f32;
                }
            }
            NormalizeMode::Local => {
                let range = max - min;
                for (cell, value) in grid.values_mut().iter_mut().zip(raw) {
                    *cell = if range > 0.0 {
                        ((value - min) / range) as f32
                    } else {
                        0.0
                    };
                }
            }
        }
        grid
    }
}
