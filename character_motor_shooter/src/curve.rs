use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};

/// Normalized speed profile sampled over `t ∈ [0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EaseCurve {
    /// Full strength for the whole duration.
    Constant,
    /// Linear fall-off from 1 to 0.
    Linear,
    /// Smoothstep from 1 to 0.
    #[default]
    EaseInOut,
    /// Quadratic fall-off, fast at the start.
    EaseOut,
}

impl EaseCurve {
    pub fn evaluate(self, t: Real) -> Real {
        let t = t.clamp(0.0, 1.0);
        match self {
            EaseCurve::Constant => 1.0,
            EaseCurve::Linear => 1.0 - t,
            EaseCurve::EaseInOut => 1.0 - t * t * (3.0 - 2.0 * t),
            EaseCurve::EaseOut => (1.0 - t) * (1.0 - t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curves_start_full_and_end_empty() {
        for curve in [EaseCurve::Linear, EaseCurve::EaseInOut, EaseCurve::EaseOut] {
            assert_eq!(curve.evaluate(0.0), 1.0);
            assert_eq!(curve.evaluate(1.0), 0.0);
            assert_eq!(curve.evaluate(2.0), 0.0);
        }
        assert_eq!(EaseCurve::Constant.evaluate(0.7), 1.0);
        assert!((EaseCurve::EaseInOut.evaluate(0.5) - 0.5).abs() < 1.0e-6);
    }
}
