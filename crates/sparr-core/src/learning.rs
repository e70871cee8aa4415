//! Adaptive learning profile.
//!
//! The profile is five bounded scalars handed to the scenario agent on every
//! turn. Only p2 (confrontation intensity) is currently driven by a
//! heuristic; p1, p3, p4 and p5 are reserved and stay at whatever value they
//! were created with.

use serde::{Deserialize, Serialize};

use crate::config::LearningConfig;
use crate::error::{Result, SparrError};

/// Value every scalar starts at and returns to on restart.
pub const DEFAULT_PARAMETER_VALUE: f64 = 0.5;

/// Bounded 5-scalar personalization state.
///
/// Every value is guaranteed to lie in `[0.0, 1.0]`; the only ways to obtain
/// an instance are [`ParameterVector::default`], the validating
/// [`ParameterVector::new`] and [`ParameterVector::update`], which clamps.
/// Serde goes through `new` too, as a plain `[p1, p2, p3, p4, p5]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 5]", into = "[f64; 5]")]
pub struct ParameterVector {
    p1: f64,
    p2: f64,
    p3: f64,
    p4: f64,
    p5: f64,
}

impl Default for ParameterVector {
    fn default() -> Self {
        Self {
            p1: DEFAULT_PARAMETER_VALUE,
            p2: DEFAULT_PARAMETER_VALUE,
            p3: DEFAULT_PARAMETER_VALUE,
            p4: DEFAULT_PARAMETER_VALUE,
            p5: DEFAULT_PARAMETER_VALUE,
        }
    }
}

impl ParameterVector {
    /// Builds a vector from explicit values, rejecting anything outside
    /// `[0.0, 1.0]` (including NaN).
    pub fn new(p1: f64, p2: f64, p3: f64, p4: f64, p5: f64) -> Result<Self> {
        for (name, value) in [("p1", p1), ("p2", p2), ("p3", p3), ("p4", p4), ("p5", p5)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SparrError::validation(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(Self { p1, p2, p3, p4, p5 })
    }

    pub fn p1(&self) -> f64 {
        self.p1
    }

    /// Confrontation intensity of the scenario counterpart.
    pub fn p2(&self) -> f64 {
        self.p2
    }

    pub fn p3(&self) -> f64 {
        self.p3
    }

    pub fn p4(&self) -> f64 {
        self.p4
    }

    pub fn p5(&self) -> f64 {
        self.p5
    }

    /// All five values in order, for rendering.
    pub fn values(&self) -> [f64; 5] {
        [self.p1, self.p2, self.p3, self.p4, self.p5]
    }

    /// Applies the confrontation heuristic after a scenario turn.
    ///
    /// `turn_count` is the number of user turns including the one just sent.
    /// Below the threshold p2 decreases by `step`, from the threshold on it
    /// increases by `step`; the result is clamped to `[0.0, 1.0]`. All other
    /// scalars are copied unchanged.
    pub fn update(&self, turn_count: u32, config: &LearningConfig) -> Self {
        let p2 = if turn_count < config.turn_threshold {
            (self.p2 - config.step).max(0.0)
        } else {
            (self.p2 + config.step).min(1.0)
        };
        Self { p2, ..*self }
    }
}

impl TryFrom<[f64; 5]> for ParameterVector {
    type Error = SparrError;

    fn try_from([p1, p2, p3, p4, p5]: [f64; 5]) -> Result<Self> {
        Self::new(p1, p2, p3, p4, p5)
    }
}

impl From<ParameterVector> for [f64; 5] {
    fn from(vector: ParameterVector) -> Self {
        vector.values()
    }
}

/// [`ParameterVector::update`] with the default threshold and step.
pub fn update(vector: &ParameterVector, turn_count: u32) -> ParameterVector {
    vector.update(turn_count, &LearningConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn sample_vectors() -> Vec<ParameterVector> {
        let grid = [0.0, 0.01, 0.04, 0.05, 0.3, 0.5, 0.96, 0.99, 1.0];
        let mut out = Vec::new();
        for &a in &grid {
            for &b in &grid {
                out.push(ParameterVector::new(a, b, 1.0 - a, b / 2.0, 0.5).unwrap());
            }
        }
        out
    }

    #[test]
    fn test_default_is_all_half() {
        assert_eq!(ParameterVector::default().values(), [0.5; 5]);
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(ParameterVector::new(0.5, 1.01, 0.5, 0.5, 0.5).is_err());
        assert!(ParameterVector::new(-0.1, 0.5, 0.5, 0.5, 0.5).is_err());
        assert!(ParameterVector::new(0.5, 0.5, 0.5, 0.5, f64::NAN).is_err());
        assert!(ParameterVector::new(0.0, 1.0, 0.0, 1.0, 0.0).is_ok());
    }

    #[test]
    fn test_update_stays_bounded_and_only_touches_p2() {
        for vector in sample_vectors() {
            for turn_count in 0..10 {
                let next = update(&vector, turn_count);
                for value in next.values() {
                    assert!((0.0..=1.0).contains(&value), "{value} out of range");
                }
                assert_eq!(next.p1(), vector.p1());
                assert_eq!(next.p3(), vector.p3());
                assert_eq!(next.p4(), vector.p4());
                assert_eq!(next.p5(), vector.p5());
            }
        }
    }

    #[test]
    fn test_update_branch_boundary_at_threshold() {
        let start = ParameterVector::default();
        let after_one = update(&start, 1);
        assert!((after_one.p2() - 0.45).abs() < EPS);

        let after_two = update(&after_one, 2);
        assert!((after_two.p2() - 0.40).abs() < EPS);

        // turn_count == 3 is not below the threshold, so p2 increases again
        let after_three = update(&after_two, 3);
        assert!((after_three.p2() - 0.45).abs() < EPS);
    }

    #[test]
    fn test_update_clamps_at_both_ends() {
        let low = ParameterVector::new(0.5, 0.02, 0.5, 0.5, 0.5).unwrap();
        assert_eq!(update(&low, 0).p2(), 0.0);

        let high = ParameterVector::new(0.5, 0.98, 0.5, 0.5, 0.5).unwrap();
        assert_eq!(update(&high, 7).p2(), 1.0);
    }

    #[test]
    fn test_update_is_deterministic() {
        let vector = ParameterVector::new(0.1, 0.7, 0.2, 0.3, 0.4).unwrap();
        assert_eq!(update(&vector, 4), update(&vector, 4));
    }

    #[test]
    fn test_update_honours_configured_threshold_and_step() {
        let config = LearningConfig {
            turn_threshold: 1,
            step: 0.1,
        };
        let next = ParameterVector::default().update(1, &config);
        assert!((next.p2() - 0.6).abs() < EPS);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_values() {
        let err = serde_json::from_str::<ParameterVector>("[0.5, 1.5, 0.5, 0.5, 0.5]").unwrap_err();
        assert!(err.to_string().contains("p2 must be within [0, 1]"));
        assert!(serde_json::from_str::<ParameterVector>("[0.5, -0.1, 0.5, 0.5, 0.5]").is_err());
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let vector = ParameterVector::new(0.1, 0.2, 0.3, 0.4, 0.5).unwrap();
        let json = serde_json::to_string(&vector).unwrap();
        assert_eq!(json, "[0.1,0.2,0.3,0.4,0.5]");
        assert_eq!(serde_json::from_str::<ParameterVector>(&json).unwrap(), vector);
    }
}
