//! Precondition failures raised by the grading engine.
//!
//! Every variant is detected before any question is scored, so a failed
//! grading run never produces a partial record.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradingError {
    /// The answer key is empty or contains a blank entry.
    #[error("invalid answer key: {0}")]
    InvalidKey(String),

    /// The threshold is not a finite number in `[0.0, 1.0]`.
    #[error("invalid threshold: {0} (must be between 0.0 and 1.0)")]
    InvalidThreshold(f64),

    /// Extracted answers are not an ordered sequence of strings.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl GradingError {
    /// Machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            GradingError::InvalidKey(_) => "invalid_key",
            GradingError::InvalidThreshold(_) => "invalid_threshold",
            GradingError::MalformedInput(_) => "malformed_input",
        }
    }
}
