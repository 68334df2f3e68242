//! Radial falloff mask.
//!
//! Values rise from 0 at the center to 1 at the edges, pushing terrain down
//! toward the border so a single map reads as an island.

use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// How the falloff mask combines with noise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FalloffBlend {
    /// `max(noise - falloff, 0)`.
    #[default]
    Subtract,
    /// `noise * (1 - falloff)`.
    Multiply,
}

impl FalloffBlend {
    /// Combines one noise sample with one mask sample.
    #[inline]
    #[must_use]
    pub fn apply(self, noise: f32, falloff: f32) -> f32 {
        match self {
            Self::Subtract => (noise - falloff).max(0.0),
            Self::Multiply => noise * (1.0 - falloff),
        }
    }
}

/// Shape parameters for the falloff curve `v^a / (v^a + (b - b*v)^a)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FalloffSettings {
    /// Steepness.
    pub a: f32,
    /// Shift of the transition toward the edge.
    pub b: f32,
    /// Combination with noise.
    pub blend: FalloffBlend,
}

impl Default for FalloffSettings {
    fn default() -> Self {
        Self {
            a: 3.0,
            b: 2.2,
            blend: FalloffBlend::Subtract,
        }
    }
}

impl FalloffSettings {
    /// Applies the falloff curve to a square-distance value in `[0, 1]`.
    #[must_use]
    pub fn evaluate(&self, v: f32) -> f32 {
        let num = v.powf(self.a);
        let den = num + (self.b - self.b * v).powf(self.a);
        if den <= 0.0 {
            return 0.0;
        }
        num / den
    }
}

/// Builds a `width x height` falloff mask.
#[must_use]
pub fn generate_falloff_map(width: usize, height: usize, settings: &FalloffSettings) -> Grid {
    Grid::from_fn(width, height, |x, y| {
        let u = x as f32 / width as f32 * 2.0 - 1.0;
        let v = y as f32 / height as f32 * 2.0 - 1.0;
        settings.evaluate(u.abs().max(v.abs()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_low_edges_high() {
        let map = generate_falloff_map(64, 64, &FalloffSettings::default());
        assert!(map.get(32, 32) < 0.01);
        assert!(map.get(0, 0) > 0.99);
        assert!(map.get(0, 32) > 0.99);
    }

    #[test]
    fn test_values_stay_in_unit_range() {
        let map = generate_falloff_map(33, 17, &FalloffSettings::default());
        for &v in map.values() {
            assert!((0.0..=1.0).contains(&v), "falloff {v} out of range");
        }
    }

    #[test]
    fn test_blend_modes() {
        assert_eq!(FalloffBlend::Subtract.apply(0.3, 0.5), 0.0);
        assert!((FalloffBlend::Subtract.apply(0.8, 0.5) - 0.3).abs() < 1e-6);
        assert!((FalloffBlend::Multiply.apply(0.8, 0.5) - 0.4).abs() < 1e-6);
    }
}
