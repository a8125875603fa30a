//! Digitized hits on planar detector modules.
//!
//! A [`PlanarModuleCluster`] is the reduced form of a group of fired cells:
//! a local 2D position on its module with an uncertainty. The cluster refers
//! to its module through a [`GeometryId`]; the module itself (plane placement
//! and [`CartesianSegmentation`]) is looked up in a [`DetectorGeometry`].

pub mod cluster;
pub mod geometry;
pub mod segmentation;

pub use cluster::{DigitizationCell, GeometryId, PlanarModuleCluster};
pub use geometry::{DetectorGeometry, DigitizationModule, InMemoryGeometry};
pub use segmentation::CartesianSegmentation;
