//! Error types for ndexpr

use thiserror::Error;

/// Result type alias using ndexpr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or evaluating tensor expressions
///
/// Every variant is raised eagerly: when a lazy node is constructed, or at
/// the start of `matmul`, `a_operator` and evaluation. A traversal that has
/// started never fails.
#[derive(Error, Debug)]
pub enum Error {
    /// Shapes broadcast together but not to the shape the operation requires
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Shapes cannot be broadcast together
    #[error("Cannot broadcast shapes {lhs:?} and {rhs:?}")]
    BroadcastError {
        /// First of the two conflicting shapes
        lhs: Vec<usize>,
        /// Second of the two conflicting shapes
        rhs: Vec<usize>,
    },

    /// Invalid dimension index
    #[error("Invalid dimension {dim} for tensor with {ndim} dimensions")]
    InvalidDimension {
        /// The invalid dimension
        dim: isize,
        /// Number of dimensions
        ndim: usize,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Tensor is not contiguous when contiguous memory is required
    #[error("Operation requires contiguous tensor")]
    NotContiguous,

    /// A worker thread could not be started
    #[error("Failed to spawn worker thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create a broadcast error
    pub fn broadcast(lhs: &[usize], rhs: &[usize]) -> Self {
        Self::BroadcastError {
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// True for the errors NumPy reports as `ValueError`
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch { .. } | Self::BroadcastError { .. } | Self::InvalidArgument { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_message() {
        let err = Error::broadcast(&[2, 3], &[2, 4]);
        assert_eq!(err.to_string(), "Cannot broadcast shapes [2, 3] and [2, 4]");
        assert!(err.is_value_error());
    }

    #[test]
    fn test_not_value_error() {
        assert!(!Error::NotContiguous.is_value_error());
        let err = Error::InvalidDimension { dim: 3, ndim: 2 };
        assert!(!err.is_value_error());
    }
}
