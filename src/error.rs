//! Error type shared by the estimator, the propagators and the space-point builder.

use thiserror::Error;

/// Failure modes of every fallible operation in this crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// An iterative solve did not reach its precision within the iteration cap,
    /// or ran into a numerically degenerate configuration.
    #[error("numerical failure after {iterations} iterations: {reason}")]
    NumericalFailure {
        /// Iterations performed before giving up.
        iterations: u32,
        /// What went wrong.
        reason: String,
    },

    /// The propagator could not reach the requested target surface.
    #[error("propagation failure: {0}")]
    PropagationFailure(String),

    /// Malformed or inconsistent caller-supplied data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub(crate) fn numerical(iterations: u32, reason: impl Into<String>) -> Self {
        Error::NumericalFailure {
            iterations,
            reason: reason.into(),
        }
    }

    pub(crate) fn propagation(reason: impl Into<String>) -> Self {
        Error::PropagationFailure(reason.into())
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidInput(reason.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
