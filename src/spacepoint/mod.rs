//! Space points: 3D positions built from digitized hits.
//!
//! A builder first stages hits with [`SpacePointBuilder::add_hits`], which
//! appends one pending [`SpacePoint`] per hit to a caller-owned vector, and
//! later fills in positions and covariances with
//! [`SpacePointBuilder::calculate_space_points`].

pub mod one_hit;

pub use one_hit::OneHitSpacePointBuilder;

use crate::context::GeometryContext;
use crate::digitization::PlanarModuleCluster;
use crate::error::Result;
use crate::{Matrix3, Vector2, Vector3};

/// A 3D measurement and the hits it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct SpacePoint<'a> {
    position: Option<Vector3>,
    covariance: Matrix3,
    hits: Vec<&'a PlanarModuleCluster>,
}

impl<'a> SpacePoint<'a> {
    /// A space point whose position has not been computed yet.
    pub fn pending(hits: Vec<&'a PlanarModuleCluster>) -> Self {
        Self {
            position: None,
            covariance: Matrix3::zeros(),
            hits,
        }
    }

    /// Global position, once computed.
    pub fn position(&self) -> Option<&Vector3> {
        self.position.as_ref()
    }

    /// Global 3×3 covariance in mm². Zero while pending.
    pub fn covariance(&self) -> &Matrix3 {
        &self.covariance
    }

    /// Hits this point was built from.
    pub fn hits(&self) -> &[&'a PlanarModuleCluster] {
        &self.hits
    }

    pub fn is_calculated(&self) -> bool {
        self.position.is_some()
    }

    /// Transverse distance from the z axis, once computed.
    pub fn radius(&self) -> Option<f64> {
        self.position.map(|p| p.xy().norm())
    }

    pub(crate) fn set_measurement(&mut self, position: Vector3, covariance: Matrix3) {
        self.position = Some(position);
        self.covariance = covariance;
    }
}

/// Turns digitized hits into space points.
pub trait SpacePointBuilder {
    /// Append one pending space point per staged hit.
    ///
    /// `hits` is grouped per surface: `hits[surface][hit]`. Existing entries of
    /// `space_points` are left untouched.
    fn add_hits<'a>(
        &self,
        space_points: &mut Vec<SpacePoint<'a>>,
        hits: &[Vec<&'a PlanarModuleCluster>],
    ) -> Result<()>;

    /// Compute position and covariance of every pending space point.
    fn calculate_space_points(
        &self,
        gctx: &GeometryContext,
        space_points: &mut [SpacePoint<'_>],
    ) -> Result<()>;

    /// Local coordinates of a hit on its module.
    fn local_coords(&self, hit: &PlanarModuleCluster) -> Vector2;

    /// Global coordinates of a hit.
    fn global_coords(&self, gctx: &GeometryContext, hit: &PlanarModuleCluster) -> Result<Vector3>;
}
