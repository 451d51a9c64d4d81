use thiserror::Error;

/// Shared lightweight error type for core primitive operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Two byte arrays that must share a width did not.
    #[error("length mismatch: {left} vs {right} bytes")]
    LengthMismatch { left: usize, right: usize },
    /// A slice could not be viewed as a fixed-width identifier.
    #[error("invalid width: expected {expected} bytes, got {actual}")]
    InvalidWidth { expected: usize, actual: usize },
}
