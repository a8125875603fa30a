//! Vertex hypotheses tested against tracks.
//!
//! The covariance is optional; without it the compatibility only uses the
//! track covariance.

use crate::error::{Error, Result};
use crate::{Matrix3, Vector3};

/// A vertex hypothesis: position and, optionally, its covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    position: Vector3,
    covariance: Option<Matrix3>,
}

impl Vertex {
    pub fn new(position: Vector3) -> Self {
        Self {
            position,
            covariance: None,
        }
    }

    /// Vertex with a position covariance. The matrix must be finite and
    /// symmetric.
    pub fn with_covariance(position: Vector3, covariance: Matrix3) -> Result<Self> {
        if covariance.iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid("non-finite vertex covariance"));
        }
        let scale = covariance.amax().max(f64::MIN_POSITIVE);
        if (covariance - covariance.transpose()).amax() > 1e-9 * scale {
            return Err(Error::invalid("vertex covariance is not symmetric"));
        }
        Ok(Self {
            position,
            covariance: Some(covariance),
        })
    }

    pub fn position(&self) -> &Vector3 {
        &self.position
    }

    pub fn covariance(&self) -> Option<&Matrix3> {
        self.covariance.as_ref()
    }
}

impl From<Vector3> for Vertex {
    fn from(position: Vector3) -> Self {
        Self::new(position)
    }
}
