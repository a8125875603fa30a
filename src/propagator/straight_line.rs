//! Field-free propagation along straight lines.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::surface::Surface;
use crate::track_parameters::BoundParameters;
use crate::Vector3;

use super::{check_path_length, FreeState, Propagator, PropagatorOptions};

/// Below this |t·n| (or transverse direction norm²) a line counts as parallel
/// to the target.
const PARALLEL_LIMIT: f64 = 1e-12;

/// Propagator for neutral tracks or field-free setups.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StraightLinePropagator;

impl StraightLinePropagator {
    pub fn new() -> Self {
        Self
    }
}

/// Path length from `position` along `direction` to `target`.
///
/// For a plane this is the exact intersection; for a perigee line it is the
/// transverse point of closest approach.
pub(crate) fn line_path_to_surface(
    ctx: &Context,
    position: &Vector3,
    direction: &Vector3,
    target: &Surface,
) -> Result<f64> {
    let offset = target.center(&ctx.geometry) - position;
    match target {
        Surface::Plane(plane) => {
            let n = plane.normal(&ctx.geometry);
            let cos_incidence = direction.dot(&n);
            if cos_incidence.abs() < PARALLEL_LIMIT {
                return Err(Error::propagation("track parallel to target plane"));
            }
            Ok(offset.dot(&n) / cos_incidence)
        }
        Surface::Perigee(_) => {
            let t2 = direction.x * direction.x + direction.y * direction.y;
            if t2 < PARALLEL_LIMIT {
                return Err(Error::propagation("track parallel to perigee line"));
            }
            Ok((offset.x * direction.x + offset.y * direction.y) / t2)
        }
    }
}

impl Propagator for StraightLinePropagator {
    fn step_to_surface(
        &self,
        ctx: &Context,
        start: &BoundParameters,
        target: &Surface,
        options: &PropagatorOptions,
    ) -> Result<FreeState> {
        let position = start.position(&ctx.geometry)?;
        let direction = start.direction();
        let s = line_path_to_surface(ctx, &position, &direction, target)?;
        let s = check_path_length(s, options)?;
        Ok(FreeState {
            position: position + s * direction,
            direction,
            path_length: s,
        })
    }
}
