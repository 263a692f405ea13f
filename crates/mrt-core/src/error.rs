//! Unified error types for the MRT ecosystem
//!
//! This module provides a common error type [`MrtError`] that can represent
//! errors from any part of the system. Domain-specific error types can be
//! converted to `MrtError` for uniform error handling at API boundaries.
//!
//! # Example
//!
//! ```ignore
//! use mrt_core::{MrtError, MrtResult, Observations};
//!
//! fn score(prices: Vec<f64>, quantities: Vec<f64>) -> MrtResult<()> {
//!     let obs = Observations::new(2, 3, prices, quantities)?;
//!     run_measures(&obs)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all MRT operations.
///
/// This enum provides a common error representation for the MRT ecosystem,
/// allowing errors from validation, the ILP oracle, and the iterative
/// solvers to be handled uniformly.
#[derive(Error, Debug)]
pub enum MrtError {
    /// Input validation errors (wrong shapes, non-positive prices,
    /// zero income, negative quantities, non-finite values)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// ILP oracle errors (infeasible, unbounded, backend failure)
    #[error("ILP oracle error: {0}")]
    Ilp(String),

    /// The cycle-cover outer loop exceeded its iteration cap.
    /// Diagnostic only; does not happen with a correct oracle.
    #[error("solver exceeded {iterations} iterations without converging")]
    NonConvergence {
        /// Number of outer iterations performed before giving up
        iterations: usize,
    },

    /// The caller requested cancellation; partial results are discarded
    #[error("operation cancelled")]
    Cancelled,

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using MrtError.
pub type MrtResult<T> = Result<T, MrtError>;

// Conversion from anyhow::Error
impl From<anyhow::Error> for MrtError {
    fn from(err: anyhow::Error) -> Self {
        MrtError::Other(err.to_string())
    }
}

// Conversion from string-like types for convenience
impl From<String> for MrtError {
    fn from(s: String) -> Self {
        MrtError::Other(s)
    }
}

impl From<&str> for MrtError {
    fn from(s: &str) -> Self {
        MrtError::Other(s.to_string())
    }
}

// JSON serialization errors
impl From<serde_json::Error> for MrtError {
    fn from(err: serde_json::Error) -> Self {
        MrtError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MrtError::Ilp("infeasible cover".into());
        assert!(err.to_string().contains("ILP oracle error"));
        assert!(err.to_string().contains("infeasible cover"));
    }

    #[test]
    fn test_nonconvergence_display() {
        let err = MrtError::NonConvergence { iterations: 40 };
        assert!(err.to_string().contains("40"));
    }

    #[test]
    fn test_result_type_alias() {
        fn example_fn() -> MrtResult<i32> {
            Ok(42)
        }
        assert_eq!(example_fn().unwrap(), 42);
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> MrtResult<()> {
            Err(MrtError::InvalidInput("test".into()))
        }

        fn outer() -> MrtResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
