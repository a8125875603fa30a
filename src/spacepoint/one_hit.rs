//! Space points from single hits on pixel-like modules.
//!
//! Every hit maps to exactly one space point: its local position is placed in
//! the global frame with the module's transform, and its local uncertainty is
//! rotated along. No pairing across surfaces takes place.

use std::sync::Arc;

use nalgebra::Matrix3x2;
use tracing::debug;

use crate::context::GeometryContext;
use crate::digitization::{DetectorGeometry, DigitizationModule, PlanarModuleCluster};
use crate::error::{Error, Result};
use crate::{Matrix3, Vector2, Vector3};

use super::{SpacePoint, SpacePointBuilder};

/// Builder producing one space point per hit.
#[derive(Debug)]
pub struct OneHitSpacePointBuilder<G> {
    geometry: Arc<G>,
}

impl<G> Clone for OneHitSpacePointBuilder<G> {
    fn clone(&self) -> Self {
        Self {
            geometry: Arc::clone(&self.geometry),
        }
    }
}

impl<G: DetectorGeometry> OneHitSpacePointBuilder<G> {
    pub fn new(geometry: Arc<G>) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    fn module_of(&self, hit: &PlanarModuleCluster) -> Result<&DigitizationModule> {
        self.geometry.module(hit.geometry_id()).ok_or_else(|| {
            Error::invalid(format!("no detector module for {}", hit.geometry_id()))
        })
    }

    /// Global position and covariance of a single hit.
    fn measure(&self, gctx: &GeometryContext, hit: &PlanarModuleCluster) -> Result<(Vector3, Matrix3)> {
        let module = self.module_of(hit)?;
        let surface = module.surface();

        let position = surface.local_to_global(gctx, hit.local_position());

        let local_cov = hit
            .local_covariance()
            .copied()
            .unwrap_or_else(|| module.segmentation().resolution());
        let (u, v) = surface.axes(gctx);
        let rot = Matrix3x2::from_columns(&[u, v]);
        let cov = rot * local_cov * rot.transpose();

        Ok((position, cov))
    }
}

impl<G: DetectorGeometry> SpacePointBuilder for OneHitSpacePointBuilder<G> {
    fn add_hits<'a>(
        &self,
        space_points: &mut Vec<SpacePoint<'a>>,
        hits: &[Vec<&'a PlanarModuleCluster>],
    ) -> Result<()> {
        for (i, group) in hits.iter().enumerate() {
            if let Some(first) = group.first() {
                let id = first.geometry_id();
                if let Some(other) = group.iter().find(|h| h.geometry_id() != id) {
                    return Err(Error::invalid(format!(
                        "hit group {} mixes surfaces {} and {}",
                        i,
                        id,
                        other.geometry_id()
                    )));
                }
            }
        }

        let before = space_points.len();
        space_points.extend(
            hits.iter()
                .flatten()
                .map(|&hit| SpacePoint::pending(vec![hit])),
        );
        debug!(
            "staged {} hits from {} surfaces",
            space_points.len() - before,
            hits.len()
        );
        Ok(())
    }

    /// Compute pending space points in order.
    ///
    /// Stops at the first hit whose module cannot be resolved; points computed
    /// before it keep their values and are skipped by a later call.
    fn calculate_space_points(
        &self,
        gctx: &GeometryContext,
        space_points: &mut [SpacePoint<'_>],
    ) -> Result<()> {
        let mut computed = 0usize;
        for sp in space_points.iter_mut().filter(|sp| !sp.is_calculated()) {
            let hit = match sp.hits() {
                [hit] => *hit,
                other => {
                    return Err(Error::invalid(format!(
                        "single-hit space point built from {} hits",
                        other.len()
                    )))
                }
            };
            let (position, covariance) = self.measure(gctx, hit)?;
            sp.set_measurement(position, covariance);
            computed += 1;
        }
        debug!("calculated {} space points", computed);
        Ok(())
    }

    fn local_coords(&self, hit: &PlanarModuleCluster) -> Vector2 {
        *hit.local_position()
    }

    fn global_coords(&self, gctx: &GeometryContext, hit: &PlanarModuleCluster) -> Result<Vector3> {
        let module = self.module_of(hit)?;
        Ok(module.surface().local_to_global(gctx, hit.local_position()))
    }
}
