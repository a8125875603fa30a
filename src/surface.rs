//! Reference surfaces that bound track parameters are expressed on.
//!
//! Two surface kinds are needed by this crate:
//!
//! - [`PerigeeSurface`]: a line parallel to the global z axis through a point.
//!   Local coordinates are the signed transverse impact parameter `d0` and the
//!   longitudinal offset `z0` of the point of closest approach to that line.
//! - [`PlaneSurface`]: a plane with a full local frame (`u`, `v`, normal).
//!   Local coordinates are the projections on `u` and `v`.
//!
//! # Conventions
//!
//! ```text
//! perigee:  global = center + d0 · r̂ + z0 · ẑ,   r̂ = normalize(ẑ × t)
//! plane:    global = center + l0 · û + l1 · v̂
//! ```
//!
//! where `t` is the unit track direction. The sign of `d0` therefore follows
//! the angular momentum of the track around the line.

use nalgebra::{Point3, Rotation3, Translation3, UnitQuaternion};

use crate::context::GeometryContext;
use crate::error::{Error, Result};
use crate::{Isometry3, Matrix3, Vector2, Vector3};

/// Transverse direction norm below which a direction counts as parallel to z.
const MIN_TRANSVERSE: f64 = 1e-12;

/// Plane with an orthonormal local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneSurface {
    transform: Isometry3,
}

impl PlaneSurface {
    /// Plane from a full local-to-global transform.
    ///
    /// The rotation columns are the local `u`, `v` and normal axes expressed in
    /// the global frame; the translation is the plane center.
    pub fn new(transform: Isometry3) -> Self {
        Self { transform }
    }

    /// Plane through `center` with the given normal.
    ///
    /// The local `u` axis is `ẑ × n` unless the normal is nearly parallel to z,
    /// in which case `x̂ × n` is used; `v = n × u`.
    pub fn from_point_and_normal(center: Vector3, normal: Vector3) -> Result<Self> {
        let n = normal
            .try_normalize(MIN_TRANSVERSE)
            .ok_or_else(|| Error::invalid("plane normal has zero length"))?;
        let u = if n.z.abs() < 0.99 {
            Vector3::z().cross(&n).normalize()
        } else {
            Vector3::x().cross(&n).normalize()
        };
        let v = n.cross(&u);
        let rotation = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[u, v, n]));
        Ok(Self::new(Isometry3::from_parts(
            Translation3::from(center),
            UnitQuaternion::from_rotation_matrix(&rotation),
        )))
    }

    /// Plane through `center` with the given normal and a preferred local `u`
    /// axis.
    ///
    /// `u_hint` is orthogonalized against the normal. If it is (nearly)
    /// parallel to the normal the default frame of
    /// [`PlaneSurface::from_point_and_normal`] is used instead.
    pub fn from_frame(center: Vector3, u_hint: Vector3, normal: Vector3) -> Result<Self> {
        let n = normal
            .try_normalize(MIN_TRANSVERSE)
            .ok_or_else(|| Error::invalid("plane normal has zero length"))?;
        let Some(u) = (u_hint - u_hint.dot(&n) * n).try_normalize(MIN_TRANSVERSE) else {
            return Self::from_point_and_normal(center, n);
        };
        let v = n.cross(&u);
        let rotation = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[u, v, n]));
        Ok(Self::new(Isometry3::from_parts(
            Translation3::from(center),
            UnitQuaternion::from_rotation_matrix(&rotation),
        )))
    }

    /// Local-to-global transform.
    pub fn transform(&self, _gctx: &GeometryContext) -> &Isometry3 {
        &self.transform
    }

    /// Plane center in global coordinates.
    pub fn center(&self, _gctx: &GeometryContext) -> Vector3 {
        self.transform.translation.vector
    }

    /// Unit normal in global coordinates.
    pub fn normal(&self, _gctx: &GeometryContext) -> Vector3 {
        self.transform.rotation * Vector3::z()
    }

    /// Local `u` and `v` axes in global coordinates.
    pub fn axes(&self, _gctx: &GeometryContext) -> (Vector3, Vector3) {
        (
            self.transform.rotation * Vector3::x(),
            self.transform.rotation * Vector3::y(),
        )
    }

    /// Map local plane coordinates to a global position.
    pub fn local_to_global(&self, _gctx: &GeometryContext, local: &Vector2) -> Vector3 {
        (self.transform * Point3::new(local.x, local.y, 0.0)).coords
    }

    /// Project a global position onto the plane's local coordinates.
    ///
    /// The out-of-plane component is dropped; use
    /// [`PlaneSurface::distance_to_plane`] to check it.
    pub fn global_to_local(&self, _gctx: &GeometryContext, global: &Vector3) -> Vector2 {
        let local = self.transform.inverse_transform_point(&Point3::from(*global));
        Vector2::new(local.x, local.y)
    }

    /// Signed distance of a global position from the plane along its normal.
    pub fn distance_to_plane(&self, gctx: &GeometryContext, global: &Vector3) -> f64 {
        (global - self.center(gctx)).dot(&self.normal(gctx))
    }
}

/// Line parallel to the global z axis, used for perigee parametrization.
#[derive(Debug, Clone, PartialEq)]
pub struct PerigeeSurface {
    center: Vector3,
}

impl PerigeeSurface {
    pub fn new(center: Vector3) -> Self {
        Self { center }
    }

    /// A point on the line.
    pub fn center(&self, _gctx: &GeometryContext) -> Vector3 {
        self.center
    }

    /// Radial axis `normalize(ẑ × t)` for a track direction `t`.
    pub fn radial_axis(&self, direction: &Vector3) -> Result<Vector3> {
        Vector3::z()
            .cross(direction)
            .try_normalize(MIN_TRANSVERSE)
            .ok_or_else(|| Error::invalid("direction parallel to perigee line"))
    }
}

/// Reference surface of bound track parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    /// Line along z, local `(d0, z0)`.
    Perigee(PerigeeSurface),
    /// Plane, local `(u, v)`.
    Plane(PlaneSurface),
}

impl Surface {
    /// Perigee surface through `center`.
    pub fn perigee(center: Vector3) -> Self {
        Surface::Perigee(PerigeeSurface::new(center))
    }

    /// Plane through `center` with the given normal.
    pub fn plane(center: Vector3, normal: Vector3) -> Result<Self> {
        PlaneSurface::from_point_and_normal(center, normal).map(Surface::Plane)
    }

    /// Reference point of the surface.
    pub fn center(&self, gctx: &GeometryContext) -> Vector3 {
        match self {
            Surface::Perigee(s) => s.center(gctx),
            Surface::Plane(s) => s.center(gctx),
        }
    }

    /// Global unit vectors of the two local axes for a track with direction `t`.
    ///
    /// For a plane these are fixed; for the perigee line they depend on `t`.
    pub fn local_axes(
        &self,
        gctx: &GeometryContext,
        direction: &Vector3,
    ) -> Result<(Vector3, Vector3)> {
        match self {
            Surface::Perigee(s) => Ok((s.radial_axis(direction)?, Vector3::z())),
            Surface::Plane(s) => Ok(s.axes(gctx)),
        }
    }

    /// Global position of local coordinates for a track with direction `t`.
    pub fn local_to_global(
        &self,
        gctx: &GeometryContext,
        local: &Vector2,
        direction: &Vector3,
    ) -> Result<Vector3> {
        match self {
            Surface::Perigee(s) => {
                let r = s.radial_axis(direction)?;
                Ok(s.center(gctx) + local.x * r + local.y * Vector3::z())
            }
            Surface::Plane(s) => Ok(s.local_to_global(gctx, local)),
        }
    }

    /// Local coordinates of a global position for a track with direction `t`.
    ///
    /// For the perigee line the position is expected to be the transverse point
    /// of closest approach; any component along `t` is ignored.
    pub fn global_to_local(
        &self,
        gctx: &GeometryContext,
        global: &Vector3,
        direction: &Vector3,
    ) -> Result<Vector2> {
        match self {
            Surface::Perigee(s) => {
                let r = s.radial_axis(direction)?;
                let d = global - s.center(gctx);
                Ok(Vector2::new(d.dot(&r), d.z))
            }
            Surface::Plane(s) => Ok(s.global_to_local(gctx, global)),
        }
    }
}

impl From<PlaneSurface> for Surface {
    fn from(s: PlaneSurface) -> Self {
        Surface::Plane(s)
    }
}

impl From<PerigeeSurface> for Surface {
    fn from(s: PerigeeSurface) -> Self {
        Surface::Perigee(s)
    }
}
