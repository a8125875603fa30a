//! # trkgeom
//!
//! Track geometry for charged-particle reconstruction: **closest approach of a
//! track to a vertex** and **space points from single detector hits**.
//!
//! Given bound track parameters and a vertex hypothesis, the
//! [`ImpactPoint3dEstimator`] finds the point of the track closest to the
//! vertex, re-expresses the track on a plane through the vertex, and scores
//! their compatibility. Given digitized clusters on planar modules, the
//! [`OneHitSpacePointBuilder`] places each cluster in the global frame with a
//! 3D covariance.
//!
//! ## Features
//!
//! - **Helix closest approach**: Newton iteration on the helix phase, seeded
//!   from the transverse closed form and checked for a minimum on convergence
//! - **Static field dispatch**: field-free provider types take the
//!   straight-line reduction without touching the field
//! - **Pluggable collaborators**: propagators, field providers and detector
//!   geometry are traits; straight-line and helix propagators are included
//! - **Covariance aware**: numerical Jacobian transport, compatibility with
//!   optional vertex covariance, segmentation-based hit resolution
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use trkgeom::{
//!     BoundParameters, ConstantField, Context, HelixPropagator, ImpactPoint3dEstimator,
//!     ImpactPointConfig, Vector3,
//! };
//! use trkgeom::units::{GEV, T};
//!
//! let field = ConstantField::along_z(2.0 * T);
//! let config = ImpactPointConfig::builder(field, Arc::new(HelixPropagator::new(field)))
//!     .build()
//!     .unwrap();
//! let estimator = ImpactPoint3dEstimator::new(config);
//!
//! // 1 GeV track through the origin, transverse to the field
//! let track = BoundParameters::perigee(
//!     Vector3::zeros(), 0.0, 0.0, 0.3, 1.2, 1.0 / GEV, None,
//! ).unwrap();
//!
//! let ctx = Context::default();
//! let vertex = Vector3::new(1.0, -0.5, 2.0);
//! let distance = estimator.calculate_distance(&ctx, &track, &vertex).unwrap();
//! assert!(distance > 0.0);
//! ```
//!
//! ## Units
//!
//! Lengths in mm, momenta in GeV, charges in units of e. Field values are in
//! GeV/(e·mm); multiply Tesla values by [`units::T`].

pub mod context;
pub mod digitization;
mod error;
pub mod field;
pub mod propagator;
pub mod spacepoint;
pub mod surface;
pub mod track_parameters;
pub mod units;
pub mod vertexing;

pub use context::{Context, GeometryContext, MagneticFieldContext};
pub use digitization::{
    CartesianSegmentation, DetectorGeometry, DigitizationCell, DigitizationModule, GeometryId,
    InMemoryGeometry, PlanarModuleCluster,
};
pub use error::{Error, Result};
pub use field::{ConstantField, MagneticFieldProvider, NullField};
pub use propagator::{
    Direction, HelixPropagator, PropagationResult, Propagator, PropagatorOptions,
    StraightLinePropagator,
};
pub use spacepoint::{OneHitSpacePointBuilder, SpacePoint, SpacePointBuilder};
pub use surface::{PerigeeSurface, PlaneSurface, Surface};
pub use track_parameters::BoundParameters;
pub use vertexing::{
    ClosestApproach, ImpactPoint3dEstimator, ImpactPointConfig, ImpactPointConfigBuilder, Vertex,
};

// Commonly used types
// All geometry is double precision; residuals of micrometres over metres of
// path do not survive f32.
pub type Vector2 = nalgebra::Vector2<f64>;
pub type Vector3 = nalgebra::Vector3<f64>;
pub type Vector5 = nalgebra::Vector5<f64>;
pub type Matrix2 = nalgebra::Matrix2<f64>;
pub type Matrix3 = nalgebra::Matrix3<f64>;
pub type Matrix5 = nalgebra::Matrix5<f64>;
pub type Isometry3 = nalgebra::Isometry3<f64>;
