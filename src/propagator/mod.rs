//! Track propagation to a target surface.
//!
//! The estimator only needs one capability from a propagator: given bound
//! parameters, reach a target surface and return the bound parameters there.
//! Implementors provide [`Propagator::step_to_surface`], which moves the free
//! state (position, direction) onto the surface; the provided
//! [`Propagator::propagate`] turns that into bound parameters and transports
//! the covariance with a numerical Jacobian.
//!
//! Two reference implementations are shipped:
//!
//! - [`StraightLinePropagator`]: exact line intersections, no field.
//! - [`HelixPropagator`]: analytic helix in the z component of the field at
//!   the start position.

pub mod helix;
pub mod straight_line;

pub use helix::HelixPropagator;
pub use straight_line::StraightLinePropagator;

use tracing::debug;

use crate::context::{Context, GeometryContext};
use crate::error::{Error, Result};
use crate::surface::Surface;
use crate::track_parameters::{direction_angles, wrap_phi, BoundParameters, E_PHI};
use crate::{Matrix5, Vector3, Vector5};

/// Sign convention for the reported path length.
///
/// This is a convention only. It never changes which intersection a
/// propagator returns: the target is reached on whichever side of the start
/// it lies, and `Backward` negates [`PropagationResult::path_length`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// `+1.0` forward, `-1.0` backward.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

/// Options controlling a single propagation call.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagatorOptions {
    /// Sign convention of [`PropagationResult::path_length`]. Does not
    /// restrict the search to one side of the start. Default forward.
    pub direction: Direction,
    /// Maximum absolute path length in mm. Default 10 m.
    pub max_path_length: f64,
    /// Maximum Newton iterations for curved intersections. Default 50.
    pub max_iterations: u32,
    /// Path-length convergence tolerance in mm. Default 1e-9.
    pub tolerance: f64,
    /// Transport the covariance when the start parameters carry one. Default true.
    pub transport_covariance: bool,
}

impl Default for PropagatorOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Forward,
            max_path_length: 10_000.0,
            max_iterations: 50,
            tolerance: 1e-9,
            transport_covariance: true,
        }
    }
}

/// Position and direction of a track after stepping, before binding.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeState {
    pub position: Vector3,
    /// Unit direction.
    pub direction: Vector3,
    /// Signed path length travelled along the momentum.
    pub path_length: f64,
}

/// Outcome of a propagation.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationResult {
    /// Parameters bound to the target surface.
    pub parameters: BoundParameters,
    /// Path length in the requested direction (negative when the target lay
    /// on the other side).
    pub path_length: f64,
}

/// A propagator capable of reaching a target surface.
///
/// Implementations are used through shared references from several threads
/// and must not rely on interior mutability.
pub trait Propagator: Send + Sync {
    /// Move the free state of `start` onto `target`.
    fn step_to_surface(
        &self,
        ctx: &Context,
        start: &BoundParameters,
        target: &Surface,
        options: &PropagatorOptions,
    ) -> Result<FreeState>;

    /// Propagate bound parameters to `target`.
    fn propagate(
        &self,
        ctx: &Context,
        start: &BoundParameters,
        target: &Surface,
        options: &PropagatorOptions,
    ) -> Result<PropagationResult> {
        let state = self.step_to_surface(ctx, start, target, options)?;

        let covariance = match start.covariance() {
            Some(cov) if options.transport_covariance => {
                let jac = bound_jacobian(self, ctx, start, target, options)?;
                let transported = jac * cov * jac.transpose();
                Some((transported + transported.transpose()) * 0.5)
            }
            _ => None,
        };

        let parameters = BoundParameters::from_global(
            &ctx.geometry,
            target.clone(),
            &state.position,
            &state.direction,
            start.qop(),
            covariance,
        )?;

        debug!(
            "propagated {:.4} mm ({:?}) to surface at {:?}",
            state.path_length,
            options.direction,
            target.center(&ctx.geometry).as_slice(),
        );

        Ok(PropagationResult {
            parameters,
            path_length: state.path_length * options.direction.sign(),
        })
    }
}

impl<P: Propagator + ?Sized> Propagator for std::sync::Arc<P> {
    fn step_to_surface(
        &self,
        ctx: &Context,
        start: &BoundParameters,
        target: &Surface,
        options: &PropagatorOptions,
    ) -> Result<FreeState> {
        (**self).step_to_surface(ctx, start, target, options)
    }
}

/// Check a solved path length against the configured limit.
pub(crate) fn check_path_length(s: f64, options: &PropagatorOptions) -> Result<f64> {
    if !s.is_finite() {
        return Err(Error::propagation("no intersection with target surface"));
    }
    if s.abs() > options.max_path_length {
        return Err(Error::propagation(format!(
            "target at {:.3} mm exceeds path limit {:.3} mm",
            s, options.max_path_length
        )));
    }
    Ok(s)
}

/// Bound parameter vector of a free state expressed on `target`.
fn bound_vector(
    gctx: &GeometryContext,
    target: &Surface,
    state: &FreeState,
    qop: f64,
) -> Result<Vector5> {
    let local = target.global_to_local(gctx, &state.position, &state.direction)?;
    let (phi, theta) = direction_angles(&state.direction);
    Ok(Vector5::new(local.x, local.y, phi, theta, qop))
}

/// Finite-difference step per bound parameter.
fn jacobian_steps(params: &Vector5) -> Vector5 {
    Vector5::new(
        1e-6,
        1e-6,
        1e-8,
        1e-8,
        (params[4].abs() * 1e-6).max(1e-12),
    )
}

/// Central-difference Jacobian of the bound-to-bound mapping start -> target.
fn bound_jacobian<P: Propagator + ?Sized>(
    propagator: &P,
    ctx: &Context,
    start: &BoundParameters,
    target: &Surface,
    options: &PropagatorOptions,
) -> Result<Matrix5> {
    let base = *start.parameters();
    let steps = jacobian_steps(&base);
    let mut jac = Matrix5::zeros();

    for i in 0..5 {
        let mut shifted = [Vector5::zeros(); 2];
        for (k, sign) in [1.0, -1.0].into_iter().enumerate() {
            let mut p = base;
            p[i] += sign * steps[i];
            let varied = BoundParameters::new(start.reference_surface().clone(), p, None)?;
            let state = propagator.step_to_surface(ctx, &varied, target, options)?;
            shifted[k] = bound_vector(&ctx.geometry, target, &state, varied.qop())?;
        }
        let mut diff = shifted[0] - shifted[1];
        diff[E_PHI] = wrap_phi(diff[E_PHI]);
        jac.set_column(i, &(diff / (2.0 * steps[i])));
    }

    Ok(jac)
}
