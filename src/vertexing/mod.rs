//! Track-to-vertex closest approach and compatibility.

pub mod config;
mod helix_approach;
pub mod impact_point;
pub mod vertex;

pub use config::{ImpactPointConfig, ImpactPointConfigBuilder};
pub use impact_point::{ClosestApproach, ImpactPoint3dEstimator, STRAIGHT_LINE_RADIUS};
pub use vertex::Vertex;
