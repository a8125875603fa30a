//! Point of closest approach between a helix and a reference point.
//!
//! The helix through `P0` with start azimuth `φ0`, polar angle `θ` and signed
//! radius `ρ` is parametrized by its azimuth `φ = φ0 + u`:
//!
//! ```text
//! P(u) = P0 + ( -2ρ sin(u/2) cos(φ0 + u/2),
//!               -2ρ sin(u/2) sin(φ0 + u/2),
//!               -ρ cotθ · u )
//! ```
//!
//! With `d = P0 - V` the squared distance to `V` is stationary where
//!
//! ```text
//! g(u)  = dx cosφ + dy sinφ + cotθ dz - ρ (sin u + cot²θ · u) = 0
//! g'(u) = -dx sinφ + dy cosφ - ρ (cos u + cot²θ)
//! ```
//!
//! and it is a minimum where `ρ · g'(u) < 0`. The form is written relative to
//! `P0` so that it stays well conditioned for large radii.
//!
//! Newton alone only converges inside the convex basin around the minimum,
//! which spans less than a quarter turn. The iteration is therefore seeded
//! from the transverse closed form: the helix axis sits at
//! `P0.xy + ρ (sin φ0, -cos φ0)` and the closest circle point lies on the ray
//! from the axis through the vertex.

use std::f64::consts::TAU;

use tracing::trace;

use crate::error::{Error, Result};
use crate::track_parameters::{unit_direction, wrap_phi};
use crate::{Vector2, Vector3};

/// Largest azimuth offset (rad) the seed may pick from the vertex `z`.
const MAX_SEED_PHASE: f64 = 1.0e4;

/// Converged closest-approach solution on a helix or line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Approach {
    pub position: Vector3,
    pub direction: Vector3,
    pub phi: f64,
    pub iterations: u32,
}

/// Orthogonal projection of `vertex` onto the line `origin + s · direction`.
pub(crate) fn line_approach(origin: &Vector3, direction: &Vector3, vertex: &Vector3) -> Approach {
    let s = (vertex - origin).dot(direction);
    Approach {
        position: origin + s * direction,
        direction: *direction,
        phi: direction.y.atan2(direction.x),
        iterations: 0,
    }
}

/// Point on the helix at azimuth offset `u`.
pub(crate) fn helix_point(origin: &Vector3, phi0: f64, cot_theta: f64, rho: f64, u: f64) -> Vector3 {
    let chord = 2.0 * rho * (0.5 * u).sin();
    let mid = phi0 + 0.5 * u;
    origin + Vector3::new(-chord * mid.cos(), -chord * mid.sin(), -rho * cot_theta * u)
}

/// Starting azimuth offset for the Newton iteration.
///
/// Candidates are `u = 0` and the closed-form transverse solution: the
/// azimuth of `vertex` seen from the helix axis, taken on the turn nearest to
/// the vertex in `z` and its two neighbours. The candidate closest to the
/// vertex in 3D wins.
fn initial_phase(origin: &Vector3, phi0: f64, cot_theta: f64, rho: f64, vertex: &Vector3) -> f64 {
    let (sin_phi0, cos_phi0) = phi0.sin_cos();
    let axis = origin.xy() + rho * Vector2::new(sin_phi0, -cos_phi0);
    let w = vertex.xy() - axis;
    if w.norm_squared() == 0.0 {
        // On the axis every azimuth is equally close.
        return 0.0;
    }

    // P(φ) - axis = ρ (-sin φ, cos φ) points along w at the transverse minimum.
    let s = rho.signum();
    let base = wrap_phi((-s * w.x).atan2(s * w.y) - phi0);

    let u_z = (origin.z - vertex.z) / (rho * cot_theta);
    // A nearly flat helix gives no usable turn from z.
    let turn = if u_z.abs() < MAX_SEED_PHASE { ((u_z - base) / TAU).round() } else { 0.0 };

    let dist2 = |u: f64| (helix_point(origin, phi0, cot_theta, rho, u) - vertex).norm_squared();
    [0.0, base + TAU * (turn - 1.0), base + TAU * turn, base + TAU * (turn + 1.0)]
        .into_iter()
        .min_by(|a, b| dist2(*a).total_cmp(&dist2(*b)))
        .unwrap_or(0.0)
}

/// Newton iteration on the azimuth of the helix point closest to `vertex`.
///
/// Starts from [`initial_phase`] and stops when the azimuth update falls below
/// `precision`. Fails with [`Error::NumericalFailure`] after `max_iterations`
/// steps, on a vanishing derivative, or when the converged point is a
/// distance maximum.
pub(crate) fn helix_approach(
    origin: &Vector3,
    phi0: f64,
    theta: f64,
    rho: f64,
    vertex: &Vector3,
    max_iterations: u32,
    precision: f64,
) -> Result<Approach> {
    let cot_theta = theta.cos() / theta.sin();
    let cot2 = cot_theta * cot_theta;
    let d = origin - vertex;

    let stationarity = |u: f64| {
        let (sin_phi, cos_phi) = (phi0 + u).sin_cos();
        let (sin_u, cos_u) = u.sin_cos();
        let g = d.x * cos_phi + d.y * sin_phi + cot_theta * d.z - rho * (sin_u + cot2 * u);
        let dg = -d.x * sin_phi + d.y * cos_phi - rho * (cos_u + cot2);
        (g, dg)
    };

    let mut u = initial_phase(origin, phi0, cot_theta, rho, vertex);
    trace!("closest approach seed: phi = {:.12}", phi0 + u);

    for iter in 1..=max_iterations {
        let (g, dg) = stationarity(u);
        if !dg.is_finite() || dg == 0.0 {
            return Err(Error::numerical(
                iter,
                format!("vanishing derivative at phi = {:.6}", phi0 + u),
            ));
        }

        let delta = -g / dg;
        u += delta;
        trace!("closest approach iter {}: phi = {:.12}, dphi = {:.3e}", iter, phi0 + u, delta);

        if delta.abs() < precision {
            let (_, dg) = stationarity(u);
            if rho * dg >= 0.0 {
                return Err(Error::numerical(
                    iter,
                    format!("distance not convex at phi = {:.6}", phi0 + u),
                ));
            }
            return Ok(Approach {
                position: helix_point(origin, phi0, cot_theta, rho, u),
                direction: unit_direction(phi0 + u, theta),
                phi: wrap_phi(phi0 + u),
                iterations: iter,
            });
        }
    }

    Err(Error::numerical(
        max_iterations,
        format!("phase update did not fall below {:e}", precision),
    ))
}
