//! Bound track parameters: a trajectory state relative to a reference surface.
//!
//! The five parameters are `(loc0, loc1, phi, theta, q/p)`: two local
//! coordinates on the reference surface, the global azimuth and polar angle of
//! the momentum direction, and charge over absolute momentum. A track with
//! `q/p == 0` is treated as neutral (infinite momentum, straight line).

use std::f64::consts::PI;

use crate::context::GeometryContext;
use crate::error::{Error, Result};
use crate::surface::Surface;
use crate::{Matrix5, Vector2, Vector3, Vector5};

/// Index of the first local coordinate.
pub const E_LOC0: usize = 0;
/// Index of the second local coordinate.
pub const E_LOC1: usize = 1;
/// Index of the azimuthal angle.
pub const E_PHI: usize = 2;
/// Index of the polar angle.
pub const E_THETA: usize = 3;
/// Index of charge over momentum.
pub const E_QOP: usize = 4;

/// Relative asymmetry tolerated in a supplied covariance.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Wrap an angle into `[-π, π)`.
pub fn wrap_phi(phi: f64) -> f64 {
    (phi + PI).rem_euclid(2.0 * PI) - PI
}

/// Track parameters bound to a reference surface, with optional covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameters {
    parameters: Vector5,
    covariance: Option<Matrix5>,
    surface: Surface,
}

impl BoundParameters {
    /// Create bound parameters, validating the values.
    ///
    /// `phi` is wrapped into `[-π, π)`. `theta` must lie strictly inside
    /// `(0, π)`, all values must be finite and the covariance, if given,
    /// symmetric.
    pub fn new(surface: Surface, parameters: Vector5, covariance: Option<Matrix5>) -> Result<Self> {
        if parameters.iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid("non-finite track parameter"));
        }
        let theta = parameters[E_THETA];
        if theta <= 0.0 || theta >= PI {
            return Err(Error::invalid(format!("theta {} outside (0, π)", theta)));
        }
        if let Some(cov) = &covariance {
            if cov.iter().any(|v| !v.is_finite()) {
                return Err(Error::invalid("non-finite covariance entry"));
            }
            let scale = cov.amax().max(f64::MIN_POSITIVE);
            if (cov - cov.transpose()).amax() > SYMMETRY_TOLERANCE * scale {
                return Err(Error::invalid("covariance is not symmetric"));
            }
        }
        let mut parameters = parameters;
        parameters[E_PHI] = wrap_phi(parameters[E_PHI]);
        Ok(Self {
            parameters,
            covariance,
            surface,
        })
    }

    /// Perigee parameters `(d0, z0, phi, theta, q/p)` around `center`.
    #[allow(clippy::too_many_arguments)]
    pub fn perigee(
        center: Vector3,
        d0: f64,
        z0: f64,
        phi: f64,
        theta: f64,
        qop: f64,
        covariance: Option<Matrix5>,
    ) -> Result<Self> {
        Self::new(
            Surface::perigee(center),
            Vector5::new(d0, z0, phi, theta, qop),
            covariance,
        )
    }

    /// Construct from a global position and direction on a given surface.
    ///
    /// The position is converted into the surface's local coordinates.
    pub fn from_global(
        gctx: &GeometryContext,
        surface: Surface,
        position: &Vector3,
        direction: &Vector3,
        qop: f64,
        covariance: Option<Matrix5>,
    ) -> Result<Self> {
        let t = direction
            .try_normalize(0.0)
            .ok_or_else(|| Error::invalid("direction has zero length"))?;
        let local = surface.global_to_local(gctx, position, &t)?;
        let (phi, theta) = direction_angles(&t);
        Self::new(
            surface,
            Vector5::new(local.x, local.y, phi, theta, qop),
            covariance,
        )
    }

    /// All five parameters.
    pub fn parameters(&self) -> &Vector5 {
        &self.parameters
    }

    /// Covariance matrix, if known.
    pub fn covariance(&self) -> Option<&Matrix5> {
        self.covariance.as_ref()
    }

    /// The surface these parameters are bound to.
    pub fn reference_surface(&self) -> &Surface {
        &self.surface
    }

    /// Local coordinates on the reference surface.
    pub fn local_position(&self) -> Vector2 {
        Vector2::new(self.parameters[E_LOC0], self.parameters[E_LOC1])
    }

    pub fn phi(&self) -> f64 {
        self.parameters[E_PHI]
    }

    pub fn theta(&self) -> f64 {
        self.parameters[E_THETA]
    }

    pub fn qop(&self) -> f64 {
        self.parameters[E_QOP]
    }

    /// Unit momentum direction.
    pub fn direction(&self) -> Vector3 {
        unit_direction(self.phi(), self.theta())
    }

    /// Global position of the track on its reference surface.
    pub fn position(&self, gctx: &GeometryContext) -> Result<Vector3> {
        self.surface
            .local_to_global(gctx, &self.local_position(), &self.direction())
    }

    /// Charge sign (`+1`, `-1`, or `0` for a neutral track).
    pub fn charge(&self) -> f64 {
        if self.qop() == 0.0 {
            0.0
        } else {
            self.qop().signum()
        }
    }

    /// Absolute momentum; infinite for a neutral track.
    pub fn absolute_momentum(&self) -> f64 {
        1.0 / self.qop().abs()
    }

    /// Transverse momentum.
    pub fn transverse_momentum(&self) -> f64 {
        self.absolute_momentum() * self.theta().sin()
    }

    /// Momentum vector.
    pub fn momentum(&self) -> Vector3 {
        self.absolute_momentum() * self.direction()
    }
}

/// Unit vector for azimuth `phi` and polar angle `theta`.
pub fn unit_direction(phi: f64, theta: f64) -> Vector3 {
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Vector3::new(cos_phi * sin_theta, sin_phi * sin_theta, cos_theta)
}

/// Azimuth and polar angle of a unit direction.
pub fn direction_angles(direction: &Vector3) -> (f64, f64) {
    let phi = direction.y.atan2(direction.x);
    let theta = direction.z.clamp(-1.0, 1.0).acos();
    (phi, theta)
}
