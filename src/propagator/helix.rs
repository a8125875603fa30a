//! Analytic helix propagation in a homogeneous field along z.
//!
//! The field is evaluated once at the start position and only its z component
//! is used. With `κ = -(q/p)·Bz` the azimuth advances as `φ(s) = φ0 + κ s` and
//!
//! ```text
//! x(s) = x0 + sinθ · c(s) · cos(φ0 + κs/2)
//! y(s) = y0 + sinθ · c(s) · sin(φ0 + κs/2)
//! z(s) = z0 + s · cosθ
//! ```
//!
//! with the chord factor `c(s) = 2 sin(κs/2) / κ`, which tends to `s` for
//! vanishing curvature.

use tracing::trace;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::field::MagneticFieldProvider;
use crate::surface::Surface;
use crate::track_parameters::{unit_direction, BoundParameters};
use crate::Vector3;

use super::straight_line::{line_path_to_surface, StraightLinePropagator};
use super::{check_path_length, FreeState, Propagator, PropagatorOptions};

/// Below this |κ s| the chord factor uses its small-angle limit.
const SMALL_TURN: f64 = 1e-9;

/// A helix segment: start point, start angles and curvature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Helix {
    pub origin: Vector3,
    pub phi0: f64,
    pub theta: f64,
    /// Azimuth change per unit path length.
    pub kappa: f64,
}

impl Helix {
    /// Helix of a track with charge over momentum `qop` in field `bz`.
    pub fn new(origin: Vector3, phi0: f64, theta: f64, qop: f64, bz: f64) -> Self {
        Self {
            origin,
            phi0,
            theta,
            kappa: -qop * bz,
        }
    }

    fn chord(&self, s: f64) -> f64 {
        let half = 0.5 * self.kappa * s;
        if half.abs() < SMALL_TURN {
            s
        } else {
            2.0 * half.sin() / self.kappa
        }
    }

    /// Position after path length `s`.
    pub fn position(&self, s: f64) -> Vector3 {
        let (sin_t, cos_t) = self.theta.sin_cos();
        let mid = self.phi0 + 0.5 * self.kappa * s;
        let c = self.chord(s) * sin_t;
        self.origin + Vector3::new(c * mid.cos(), c * mid.sin(), s * cos_t)
    }

    /// Unit direction after path length `s`.
    pub fn direction(&self, s: f64) -> Vector3 {
        unit_direction(self.phi0 + self.kappa * s, self.theta)
    }

    /// Derivative of the direction with respect to `s`.
    pub fn direction_derivative(&self, s: f64) -> Vector3 {
        let phi = self.phi0 + self.kappa * s;
        let k = self.kappa * self.theta.sin();
        Vector3::new(-k * phi.sin(), k * phi.cos(), 0.0)
    }
}

/// Propagator following an analytic helix.
///
/// Field-free provider types delegate to [`StraightLinePropagator`].
#[derive(Debug, Clone, Default)]
pub struct HelixPropagator<F> {
    field: F,
}

impl<F: MagneticFieldProvider> HelixPropagator<F> {
    pub fn new(field: F) -> Self {
        Self { field }
    }

    pub fn field(&self) -> &F {
        &self.field
    }

    /// Newton iteration for the root of `f(s)` seeded at `s0`.
    fn solve_path<G>(&self, s0: f64, options: &PropagatorOptions, f: G) -> Result<f64>
    where
        G: Fn(f64) -> (f64, f64),
    {
        let mut s = s0;
        for iter in 0..options.max_iterations {
            let (value, slope) = f(s);
            if slope.abs() < f64::EPSILON || !slope.is_finite() {
                return Err(Error::propagation(format!(
                    "degenerate intersection at s = {:.6} mm",
                    s
                )));
            }
            let delta = value / slope;
            s -= delta;
            trace!("helix intersection iter {}: s = {:.12}, ds = {:.3e}", iter, s, delta);
            if delta.abs() < options.tolerance {
                return Ok(s);
            }
        }
        Err(Error::propagation(format!(
            "helix intersection did not converge in {} iterations",
            options.max_iterations
        )))
    }
}

impl<F: MagneticFieldProvider> Propagator for HelixPropagator<F> {
    fn step_to_surface(
        &self,
        ctx: &Context,
        start: &BoundParameters,
        target: &Surface,
        options: &PropagatorOptions,
    ) -> Result<FreeState> {
        if F::FIELD_FREE {
            return StraightLinePropagator.step_to_surface(ctx, start, target, options);
        }

        let origin = start.position(&ctx.geometry)?;
        let bz = self.field.field_at(&origin, &ctx.field).z;
        let helix = Helix::new(origin, start.phi(), start.theta(), start.qop(), bz);
        if helix.kappa == 0.0 {
            return StraightLinePropagator.step_to_surface(ctx, start, target, options);
        }

        let seed = line_path_to_surface(ctx, &origin, &start.direction(), target)?;
        let center = target.center(&ctx.geometry);

        let s = match target {
            Surface::Plane(plane) => {
                let n = plane.normal(&ctx.geometry);
                self.solve_path(seed, options, |s| {
                    (
                        (helix.position(s) - center).dot(&n),
                        helix.direction(s).dot(&n),
                    )
                })?
            }
            Surface::Perigee(_) => self.solve_path(seed, options, |s| {
                let d = helix.position(s) - center;
                let t = helix.direction(s);
                let dt = helix.direction_derivative(s);
                (
                    d.x * t.x + d.y * t.y,
                    t.x * t.x + t.y * t.y + d.x * dt.x + d.y * dt.y,
                )
            })?,
        };
        let s = check_path_length(s, options)?;

        Ok(FreeState {
            position: helix.position(s),
            direction: helix.direction(s),
            path_length: s,
        })
    }
}
