//! LOD levels and distance-based selection.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::settings::NUM_SUPPORTED_LODS;

/// One detail level: which LOD to build, and out to what distance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    /// LOD index, 0 = full detail.
    pub lod: u32,
    /// Viewer distance (from chunk bounds) up to which this level is used.
    pub visible_distance_threshold: f32,
}

impl LodLevel {
    /// Creates a level.
    #[must_use]
    pub const fn new(lod: u32, visible_distance_threshold: f32) -> Self {
        Self {
            lod,
            visible_distance_threshold,
        }
    }

    /// Squared threshold, for comparing against squared distances.
    #[must_use]
    pub fn sqr_visible_distance_threshold(&self) -> f32 {
        self.visible_distance_threshold * self.visible_distance_threshold
    }

    pub(crate) fn validate(&mut self) {
        if self.lod >= NUM_SUPPORTED_LODS {
            warn!(lod = self.lod, "detail level LOD clamped to {}", NUM_SUPPORTED_LODS - 1);
            self.lod = NUM_SUPPORTED_LODS - 1;
        }
    }
}

/// Index of the level to display at `viewer_distance`.
///
/// The first level whose threshold is not exceeded, or the last level when
/// the distance is beyond every threshold. `levels` must be ascending.
#[must_use]
pub fn select_lod_index(levels: &[LodLevel], viewer_distance: f32) -> usize {
    let mut index = 0;
    for (i, level) in levels.iter().enumerate().take(levels.len().saturating_sub(1)) {
        if viewer_distance > level.visible_distance_threshold {
            index = i + 1;
        } else {
            break;
        }
    }
    index
}
