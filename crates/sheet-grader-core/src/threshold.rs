//! Pass/fail threshold for a grading run.

use crate::error::GradingError;

/// Minimum similarity a question needs to pass, in `[0.0, 1.0]`.
///
/// Supplied per grading run; the engine has no default of its own.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f64);

impl Threshold {
    /// # Errors
    ///
    /// [`GradingError::InvalidThreshold`] for NaN, infinities, or values
    /// outside `[0.0, 1.0]`.
    pub fn new(value: f64) -> Result<Self, GradingError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(GradingError::InvalidThreshold(value))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Inclusive comparison: a similarity equal to the threshold passes.
    pub fn admits(self, similarity: f64) -> bool {
        similarity >= self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_inclusive() {
        assert!(Threshold::new(0.0).is_ok());
        assert!(Threshold::new(1.0).is_ok());
        assert!(Threshold::new(0.7).is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        for v in [-0.01, 1.01, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(
                matches!(Threshold::new(v), Err(GradingError::InvalidThreshold(_))),
                "{} should be rejected",
                v
            );
        }
    }

    #[test]
    fn test_admits_uses_greater_or_equal() {
        let t = Threshold::new(0.8).unwrap();
        assert!(t.admits(0.8));
        assert!(t.admits(0.81));
        assert!(!t.admits(0.7999));
        assert!(Threshold::new(0.0).unwrap().admits(0.0));
    }
}
