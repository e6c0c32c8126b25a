//! Error types for meshing operations.

use thiserror::Error;

/// Invalid meshing parameters. Raised before anything is mutated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The grid must have at least one sample per axis.
    #[error("bound size must be positive, got {0}")]
    NonPositiveBoundSize(i64),

    /// The grid would hold more samples than can be addressed.
    #[error("bound size {0} is too large for one grid")]
    BoundSizeTooLarge(usize),

    /// The world-space distance between samples must be positive.
    #[error("step must be positive, got {0}")]
    NonPositiveStep(f32),

    /// Brushes need a positive radius to touch anything.
    #[error("brush radius must be positive, got {0}")]
    NonPositiveBrushRadius(f32),

    /// A supplied value field does not hold `bound_size³` samples.
    #[error("value field holds {got} samples but the grid needs {expected}")]
    GridLengthMismatch {
        /// Number of samples the grid needs.
        expected: usize,
        /// Number of samples supplied.
        got: usize,
    },

    /// The parallel execution context could not be created.
    #[error("accelerator unavailable: {0}")]
    AcceleratorUnavailable(String),
}

/// Errors surfaced by the meshing subsystem.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The requested meshing strategy has no working implementation.
    #[error("meshing strategy `{0}` is not implemented")]
    UnimplementedStrategy(&'static str),
}

/// Result alias for meshing operations.
pub type Result<T> = std::result::Result<T, Error>;

#[test]
fn error_display() {
    let err: Error = ConfigError::NonPositiveBoundSize(0).into();
    assert_eq!(err.to_string(), "configuration error: bound size must be positive, got 0");

    let err = ConfigError::GridLengthMismatch { expected: 8, got: 7 };
    assert_eq!(err.to_string(), "value field holds 7 samples but the grid needs 8");

    let err = ConfigError::BoundSizeTooLarge(1 << 22);
    assert_eq!(err.to_string(), "bound size 4194304 is too large for one grid");

    let err = Error::UnimplementedStrategy("sparse-octree");
    assert_eq!(err.to_string(), "meshing strategy `sparse-octree` is not implemented");
}
