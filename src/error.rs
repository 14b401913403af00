//! Error types for morphfield.
//!
//! Configuration problems fail fast at construction. Landmark and capture
//! errors never reach the render tick: the classifier skips malformed frames
//! and the capture pipeline turns failures into a status string.

use thiserror::Error;

/// Invalid [`KernelConfig`](crate::KernelConfig) values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The field must contain at least one particle.
    #[error("particle count must be greater than zero")]
    ZeroParticles,
    /// The particle count exceeds the hard allocation limit.
    #[error("particle count {count} exceeds the limit of {max}")]
    TooManyParticles { count: usize, max: usize },
    /// A coefficient is NaN or infinite.
    #[error("`{name}` must be finite, got {value}")]
    NonFinite { name: &'static str, value: f32 },
    /// A coefficient that must be strictly positive is not.
    #[error("`{name}` must be greater than zero, got {value}")]
    NotPositive { name: &'static str, value: f32 },
    /// A coefficient that must not be negative is.
    #[error("`{name}` must not be negative, got {value}")]
    Negative { name: &'static str, value: f32 },
    /// A value lies outside its allowed range.
    #[error("`{name}` = {value} is outside {min}..={max}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    /// A `[min, max)` range is empty or inverted.
    #[error("`{name}` range {min}..{max} is empty")]
    EmptyRange { name: &'static str, min: f32, max: f32 },
    /// The color palette has no entries.
    #[error("color palette must contain at least one color")]
    EmptyPalette,
    /// The debounce window is zero.
    #[error("debounce window must be greater than zero")]
    ZeroDebounce,
}

/// A landmark frame that cannot be classified.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LandmarkError {
    /// The detector produced the wrong number of points.
    #[error("expected {expected} hand landmarks, got {got}")]
    WrongCount { expected: usize, got: usize },
    /// A landmark coordinate is NaN or infinite.
    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// Failures of the landmark capture collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    /// The capture device could not be opened (missing, busy, permission denied).
    #[error("{0}")]
    Unavailable(String),
    /// A frame could not be read or processed.
    #[error("frame capture failed: {0}")]
    Frame(String),
    /// The source has no more frames.
    #[error("capture source ended")]
    Ended,
}

impl CaptureError {
    /// Human-readable status line for the UI collaborator.
    pub fn status(&self) -> String {
        format!("Camera Error: {}", self)
    }
}
