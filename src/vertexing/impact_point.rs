//! 3D impact point estimation between a track and a reference point.
//!
//! [`ImpactPoint3dEstimator`] finds the point of the track closest to a
//! vertex hypothesis, re-expresses the track there, and scores how compatible
//! the two are. The track is modeled as a helix in the z component of the
//! field at its reference position and the approach is found by Newton
//! iteration on the helix phase. A field-free provider type or a vanishing
//! curvature reduces the helix to a straight line.

use nalgebra::Matrix2x3;
use tracing::debug;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::field::MagneticFieldProvider;
use crate::propagator::Propagator;
use crate::surface::{PlaneSurface, Surface};
use crate::track_parameters::BoundParameters;
use crate::{Matrix2, Matrix3, Vector3};

use super::config::ImpactPointConfig;
use super::helix_approach::{helix_approach, line_approach, Approach};
use super::vertex::Vertex;

/// Helix radius in mm beyond which a track is treated as a straight line.
pub const STRAIGHT_LINE_RADIUS: f64 = 1e10;

/// Solver result: point of closest approach and the geometry around it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosestApproach {
    /// Point on the track closest to the reference point.
    pub position: Vector3,
    /// Unit track direction at `position`.
    pub direction: Vector3,
    /// Reference point minus `position`; orthogonal to `direction`.
    pub delta_r: Vector3,
    /// Track azimuth at `position`.
    pub phi: f64,
    /// Signed helix radius in mm, infinite for a straight line.
    pub radius: f64,
    /// Newton iterations used (0 for a straight line).
    pub iterations: u32,
}

impl ClosestApproach {
    /// Euclidean distance between the track and the reference point.
    pub fn distance(&self) -> f64 {
        self.delta_r.norm()
    }

    fn from_approach(approach: Approach, vertex: &Vector3, radius: f64) -> Self {
        Self {
            delta_r: vertex - approach.position,
            position: approach.position,
            direction: approach.direction,
            phi: approach.phi,
            radius,
            iterations: approach.iterations,
        }
    }
}

/// Closest-approach estimator for a propagator `P` and field provider `F`.
///
/// Holds only its finalized configuration; every method takes `&self`.
#[derive(Debug)]
pub struct ImpactPoint3dEstimator<P, F> {
    config: ImpactPointConfig<P, F>,
}

impl<P: Propagator, F: MagneticFieldProvider> ImpactPoint3dEstimator<P, F> {
    pub fn new(config: ImpactPointConfig<P, F>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImpactPointConfig<P, F> {
        &self.config
    }

    /// Point of closest approach of the track to `vertex`.
    pub fn closest_approach(
        &self,
        ctx: &Context,
        params: &BoundParameters,
        vertex: &Vector3,
    ) -> Result<ClosestApproach> {
        let origin = params.position(&ctx.geometry)?;

        let result = if F::FIELD_FREE {
            ClosestApproach::from_approach(
                line_approach(&origin, &params.direction(), vertex),
                vertex,
                f64::INFINITY,
            )
        } else {
            let bz = self.config.field().field_at(&origin, &ctx.field).z;
            let rho = params.theta().sin() / (params.qop() * bz);
            if !rho.is_finite() || rho.abs() > STRAIGHT_LINE_RADIUS {
                ClosestApproach::from_approach(
                    line_approach(&origin, &params.direction(), vertex),
                    vertex,
                    f64::INFINITY,
                )
            } else {
                let approach = helix_approach(
                    &origin,
                    params.phi(),
                    params.theta(),
                    rho,
                    vertex,
                    self.config.max_iterations(),
                    self.config.precision(),
                )?;
                ClosestApproach::from_approach(approach, vertex, rho)
            }
        };

        debug!(
            "closest approach at {:?}: distance {:.6} mm, radius {:.3e} mm, {} iterations",
            result.position.as_slice(),
            result.distance(),
            result.radius,
            result.iterations,
        );
        Ok(result)
    }

    /// 3D distance between the track and `vertex`.
    pub fn calculate_distance(
        &self,
        ctx: &Context,
        params: &BoundParameters,
        vertex: &Vector3,
    ) -> Result<f64> {
        Ok(self.closest_approach(ctx, params, vertex)?.distance())
    }

    /// Track parameters on the plane through `vertex` orthogonal to the track
    /// at its point of closest approach.
    ///
    /// The plane's local `u` axis points from the approach point to the
    /// vertex, so `loc0` is minus the distance and `loc1` is zero
    /// up to numerical precision.
    pub fn params_at_closest_approach(
        &self,
        ctx: &Context,
        params: &BoundParameters,
        vertex: &Vector3,
    ) -> Result<BoundParameters> {
        let approach = self.closest_approach(ctx, params, vertex)?;
        let surface: Surface =
            PlaneSurface::from_frame(*vertex, approach.delta_r, approach.direction)?.into();

        let result = self.config.propagator().propagate(
            ctx,
            params,
            &surface,
            self.config.propagator_options(),
        )?;
        debug!(
            "parameters at closest approach: local {:?}, path {:.4} mm",
            result.parameters.local_position().as_slice(),
            result.path_length,
        );
        Ok(result.parameters)
    }

    /// Chi-square-like compatibility of the track with the point `vertex`.
    ///
    /// `params` are expected on a surface through the vertex, typically from
    /// [`Self::params_at_closest_approach`]. The residual between the track's
    /// local position and the vertex in that surface's frame is weighted with
    /// the inverse of the track's local 2x2 covariance.
    pub fn vertex_compatibility(
        &self,
        ctx: &Context,
        params: Option<&BoundParameters>,
        vertex: &Vector3,
    ) -> Result<f64> {
        compatibility(ctx, params, vertex, None)
    }

    /// As [`Self::vertex_compatibility`], adding the vertex covariance (if
    /// any) projected onto the surface's local axes.
    pub fn vertex_compatibility_with_vertex(
        &self,
        ctx: &Context,
        params: Option<&BoundParameters>,
        vertex: &Vertex,
    ) -> Result<f64> {
        compatibility(ctx, params, vertex.position(), vertex.covariance())
    }
}

fn compatibility(
    ctx: &Context,
    params: Option<&BoundParameters>,
    vertex: &Vector3,
    vertex_cov: Option<&Matrix3>,
) -> Result<f64> {
    let params = params.ok_or_else(|| Error::invalid("missing track parameters"))?;
    let cov = params
        .covariance()
        .ok_or_else(|| Error::invalid("track parameters carry no covariance"))?;

    let surface = params.reference_surface();
    let direction = params.direction();
    let residual =
        params.local_position() - surface.global_to_local(&ctx.geometry, vertex, &direction)?;

    let mut local_cov: Matrix2 = cov.fixed_view::<2, 2>(0, 0).into_owned();
    if let Some(vcov) = vertex_cov {
        let (u, v) = surface.local_axes(&ctx.geometry, &direction)?;
        let proj = Matrix2x3::from_rows(&[u.transpose(), v.transpose()]);
        local_cov += proj * vcov * proj.transpose();
    }

    let weight = local_cov
        .try_inverse()
        .filter(|w| w.iter().all(|x| x.is_finite()))
        .ok_or_else(|| Error::invalid("local covariance is singular"))?;

    let chi2 = residual.dot(&(weight * residual));
    debug!("vertex compatibility {:.6} (residual {:?})", chi2, residual.as_slice());
    Ok(chi2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{ConstantField, NullField};
    use crate::propagator::{HelixPropagator, StraightLinePropagator};
    use crate::units::{GEV, T};
    use crate::{Matrix5, Vector5};
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;
    use std::sync::Arc;

    fn line_estimator() -> ImpactPoint3dEstimator<StraightLinePropagator, NullField> {
        let config = ImpactPointConfig::builder(NullField, Arc::new(StraightLinePropagator))
            .build()
            .unwrap();
        ImpactPoint3dEstimator::new(config)
    }

    fn helix_estimator(
        bz: f64,
    ) -> ImpactPoint3dEstimator<HelixPropagator<ConstantField>, ConstantField> {
        let field = ConstantField::along_z(bz);
        let config = ImpactPointConfig::builder(field, Arc::new(HelixPropagator::new(field)))
            .build()
            .unwrap();
        ImpactPoint3dEstimator::new(config)
    }

    fn cov_diag(s0: f64, s1: f64) -> Matrix5 {
        Matrix5::from_diagonal(&Vector5::new(s0 * s0, s1 * s1, 1e-6, 1e-6, 1e-8))
    }

    #[test]
    fn test_line_along_x() {
        let ctx = Context::default();
        let est = line_estimator();
        let track =
            BoundParameters::perigee(Vector3::zeros(), 0.0, 0.0, 0.0, FRAC_PI_2, 1.0, None)
                .unwrap();
        let a = est
            .closest_approach(&ctx, &track, &Vector3::new(0.0, 3.0, 4.0))
            .unwrap();
        assert_relative_eq!(a.position, Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(a.distance(), 5.0, epsilon = 1e-12);
        assert!(a.radius.is_infinite());
        assert_eq!(a.iterations, 0);
    }

    #[test]
    fn test_zero_field_takes_line_branch() {
        let ctx = Context::default();
        let track =
            BoundParameters::perigee(Vector3::zeros(), 1.0, -2.0, 0.4, 1.0, 0.5, None).unwrap();
        let v = Vector3::new(10.0, 20.0, -5.0);
        let a = helix_estimator(0.0).closest_approach(&ctx, &track, &v).unwrap();
        let b = line_estimator().closest_approach(&ctx, &track, &v).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_neutral_track_takes_line_branch() {
        let ctx = Context::default();
        let track =
            BoundParameters::perigee(Vector3::zeros(), 0.0, 0.0, 0.0, FRAC_PI_2, 0.0, None)
                .unwrap();
        let a = helix_estimator(2.0 * T)
            .closest_approach(&ctx, &track, &Vector3::new(5.0, 1.0, 0.0))
            .unwrap();
        assert!(a.radius.is_infinite());
        assert_relative_eq!(a.distance(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_helix_reaches_point_on_circle() {
        // 1 GeV positive track along +x in 2 T bends clockwise around (0, -R).
        let ctx = Context::default();
        let bz = 2.0 * T;
        let r = 1.0 / bz;
        let track =
            BoundParameters::perigee(Vector3::zeros(), 0.0, 0.0, 0.0, FRAC_PI_2, 1.0 / GEV, None)
                .unwrap();
        let angle = 0.3_f64;
        let on_circle = Vector3::new(r * angle.sin(), -r + r * angle.cos(), 0.0);
        let a = helix_estimator(bz)
            .closest_approach(&ctx, &track, &on_circle)
            .unwrap();
        assert!(a.distance() < 1e-6);
        assert_relative_eq!(a.radius, r, max_relative = 1e-12);
        assert_relative_eq!(a.phi, -angle, epsilon = 1e-9);
    }

    #[test]
    fn test_compatibility_requires_covariance() {
        let ctx = Context::default();
        let est = line_estimator();
        let track =
            BoundParameters::perigee(Vector3::zeros(), 0.0, 0.0, 0.0, 1.0, 1.0, None).unwrap();
        assert!(matches!(
            est.vertex_compatibility(&ctx, None, &Vector3::zeros()),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            est.vertex_compatibility(&ctx, Some(&track), &Vector3::zeros()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_compatibility_of_perigee_residual() {
        // On a perigee surface the residual is (d0, z0) directly.
        let ctx = Context::default();
        let est = line_estimator();
        let track = BoundParameters::perigee(
            Vector3::zeros(),
            0.3,
            -0.4,
            0.0,
            FRAC_PI_2,
            1.0,
            Some(cov_diag(0.1, 0.2)),
        )
        .unwrap();
        let chi2 = est
            .vertex_compatibility(&ctx, Some(&track), &Vector3::zeros())
            .unwrap();
        assert_relative_eq!(chi2, 9.0 + 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_vertex_covariance_reduces_compatibility() {
        let ctx = Context::default();
        let est = line_estimator();
        let track = BoundParameters::perigee(
            Vector3::zeros(),
            0.3,
            0.0,
            0.0,
            FRAC_PI_2,
            1.0,
            Some(cov_diag(0.1, 0.1)),
        )
        .unwrap();
        let vertex =
            Vertex::with_covariance(Vector3::zeros(), Matrix3::identity() * 0.03).unwrap();
        let plain = est
            .vertex_compatibility(&ctx, Some(&track), vertex.position())
            .unwrap();
        let with_cov = est
            .vertex_compatibility_with_vertex(&ctx, Some(&track), &vertex)
            .unwrap();
        assert_relative_eq!(plain, 9.0, epsilon = 1e-9);
        assert_relative_eq!(with_cov, 0.09 / 0.04, epsilon = 1e-9);
    }

    #[test]
    fn test_singular_covariance_rejected() {
        let ctx = Context::default();
        let est = line_estimator();
        let track = BoundParameters::perigee(
            Vector3::zeros(),
            0.3,
            0.0,
            0.0,
            FRAC_PI_2,
            1.0,
            Some(Matrix5::zeros()),
        )
        .unwrap();
        assert!(matches!(
            est.vertex_compatibility(&ctx, Some(&track), &Vector3::zeros()),
            Err(Error::InvalidInput(_))
        ));
    }
}
