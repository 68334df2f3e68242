//! Piecewise-linear height curve.
//!
//! Remaps normalized noise before it is scaled into world height, e.g. to
//! flatten water and lowlands while keeping mountains steep.

use serde::{Deserialize, Serialize};

/// One control point of a `HeightCurve`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    /// Input value.
    pub time: f32,
    /// Output value at `time`.
    pub value: f32,
}

impl CurveKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// Curve through sorted keys, linear between them and flat outside them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightCurve {
    /// Control points, ascending by `time`.
    pub keys: Vec<CurveKey>,
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl HeightCurve {
    /// Identity over `[0, 1]`.
    #[must_use]
    pub fn linear() -> Self {
        Self {
            keys: vec![CurveKey::new(0.0, 0.0), CurveKey::new(1.0, 1.0)],
        }
    }

    /// Builds a curve from keys in any order.
    #[must_use]
    pub fn from_keys(keys: impl IntoIterator<Item = CurveKey>) -> Self {
        let mut curve = Self {
            keys: keys.into_iter().collect(),
        };
        curve.sort_keys();
        curve
    }

    /// Sorts keys by time. Called by config validation.
    pub fn sort_keys(&mut self) {
        self.keys.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Evaluates the curve at `t`. An empty curve returns `t` unchanged.
    #[must_use]
    pub fn evaluate(&self, t: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return t;
        };
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        // First key strictly after t; t > first.time guarantees upper >= 1.
        let upper = self.keys.partition_point(|key| key.time <= t);
        let a = self.keys[upper - 1];
        let b = self.keys[upper];
        let span = b.time - a.time;
        if span <= f32::EPSILON {
            return b.value;
        }
        a.value + (b.value - a.value) * ((t - a.time) / span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_is_identity_inside_range() {
        let curve = HeightCurve::linear();
        for t in [0.0, 0.25, 0.5, 0.9, 1.0] {
            assert!((curve.evaluate(t) - t).abs() < 1e-6);
        }
    }

    #[test]
    fn test_clamps_outside_keys() {
        let curve = HeightCurve::linear();
        assert_eq!(curve.evaluate(-2.0), 0.0);
        assert_eq!(curve.evaluate(1.7), 1.0);
    }

    #[test]
    fn test_piecewise_interpolation() {
        let curve = HeightCurve::from_keys([
            CurveKey::new(1.0, 1.0),
            CurveKey::new(0.0, 0.0),
            CurveKey::new(0.4, 0.0),
        ]);
        assert_eq!(curve.evaluate(0.2), 0.0);
        assert!((curve.evaluate(0.7) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_empty_curve_passes_through() {
        let curve = HeightCurve { keys: Vec::new() };
        assert_eq!(curve.evaluate(3.5), 3.5);
    }
}
