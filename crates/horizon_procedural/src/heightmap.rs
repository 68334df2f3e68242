//! # Height Maps
//!
//! Noise shaped into world heights: optional falloff mask, then the height
//! curve and multiplier. The builder is immutable and shared by workers.

use horizon_shared::Vec2;

use crate::falloff::generate_falloff_map;
use crate::grid::Grid;
use crate::noise::NoiseField;
use crate::settings::HeightMapSettings;

/// A height grid with its observed bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightMap {
    /// World-space heights, `vertices_per_line` on each side.
    pub values: Grid,
    /// Lowest height in `values`.
    pub min_value: f32,
    /// Highest height in `values`.
    pub max_value: f32,
}

/// Builds height maps from fixed settings.
pub struct HeightMapBuilder {
    settings: HeightMapSettings,
    noise: NoiseField,
}

impl HeightMapBuilder {
    /// Creates a builder. Noise settings are clamped into range.
    #[must_use]
    pub fn new(settings: HeightMapSettings) -> Self {
        let noise = NoiseField::new(&settings.noise);
        Self { settings, noise }
    }

    /// Settings in use.
    #[must_use]
    pub fn settings(&self) -> &HeightMapSettings {
        &self.settings
    }

    /// Builds a `width x height` map around `sample_center`.
    ///
    /// Callers pass the full mesh grid size, border rings included.
    #[must_use]
    pub fn build(&self, width: usize, height: usize, sample_center: Vec2) -> HeightMap {
        let mut values = self.noise.generate(width, height, sample_center);

        if self.settings.use_falloff {
            let falloff = generate_falloff_map(width, height, &self.settings.falloff);
            let blend = self.settings.falloff.blend;
            for (value, &mask) in values.values_mut().iter_mut().zip(falloff.values()) {
                *value = blend.apply(*value, mask);
            }
        }

        let curve = &self.settings.height_curve;
        let multiplier = self.settings.height_multiplier;
        for value in values.values_mut() {
            *value *= curve.evaluate(*value) * multiplier;
        }

        let (min_value, max_value) = values.min_max().unwrap_or((0.0, 0.0));
        HeightMap {
            values,
            min_value,
            max_value,
        }
    }
}
