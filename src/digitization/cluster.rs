//! Digitized measurements on planar modules.

use std::fmt;

use crate::error::{Error, Result};
use crate::{Matrix2, Vector2};

use super::segmentation::CartesianSegmentation;

/// Identifier of a detector module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GeometryId(pub u64);

impl fmt::Display for GeometryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "geo#{}", self.0)
    }
}

impl From<u64> for GeometryId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A fired readout cell with its deposited signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DigitizationCell {
    pub channel0: usize,
    pub channel1: usize,
    /// Signal amount, used as centroid weight.
    pub data: f64,
}

impl DigitizationCell {
    pub fn new(channel0: usize, channel1: usize, data: f64) -> Self {
        Self {
            channel0,
            channel1,
            data,
        }
    }
}

/// Cluster of cells on one planar module, reduced to a local position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarModuleCluster {
    geometry_id: GeometryId,
    local_position: Vector2,
    /// Local 2×2 covariance in mm², if digitization provided one.
    local_covariance: Option<Matrix2>,
    cells: Vec<DigitizationCell>,
}

impl PlanarModuleCluster {
    pub fn new(
        geometry_id: GeometryId,
        local_position: Vector2,
        local_covariance: Option<Matrix2>,
        cells: Vec<DigitizationCell>,
    ) -> Self {
        Self {
            geometry_id,
            local_position,
            local_covariance,
            cells,
        }
    }

    /// Build a cluster from fired cells of a module.
    ///
    /// The position is the signal-weighted centroid of the cell centers. The
    /// covariance is the weighted second moment of the cell centers around it
    /// plus the segmentation's binary resolution.
    pub fn from_cells(
        geometry_id: GeometryId,
        cells: Vec<DigitizationCell>,
        segmentation: &CartesianSegmentation,
    ) -> Result<Self> {
        if cells.is_empty() {
            return Err(Error::invalid(format!("no cells for cluster on {}", geometry_id)));
        }

        let mut centers = Vec::with_capacity(cells.len());
        let mut sum_w = 0.0;
        let mut sum = Vector2::zeros();
        for cell in &cells {
            if !(cell.data.is_finite() && cell.data >= 0.0) {
                return Err(Error::invalid(format!(
                    "cell ({}, {}) has invalid signal {}",
                    cell.channel0, cell.channel1, cell.data
                )));
            }
            let center = segmentation
                .cell_center(cell.channel0, cell.channel1)
                .ok_or_else(|| {
                    Error::invalid(format!(
                        "cell ({}, {}) outside segmentation of {}",
                        cell.channel0, cell.channel1, geometry_id
                    ))
                })?;
            sum_w += cell.data;
            sum += cell.data * center;
            centers.push(center);
        }
        if sum_w <= 0.0 {
            return Err(Error::invalid(format!("cluster on {} carries no signal", geometry_id)));
        }
        let centroid = sum / sum_w;

        let mut spread = Matrix2::zeros();
        for (cell, center) in cells.iter().zip(&centers) {
            let d = center - centroid;
            spread += cell.data * d * d.transpose();
        }
        let covariance = spread / sum_w + segmentation.resolution();

        Ok(Self::new(geometry_id, centroid, Some(covariance), cells))
    }

    pub fn geometry_id(&self) -> GeometryId {
        self.geometry_id
    }

    pub fn local_position(&self) -> &Vector2 {
        &self.local_position
    }

    pub fn local_covariance(&self) -> Option<&Matrix2> {
        self.local_covariance.as_ref()
    }

    pub fn cells(&self) -> &[DigitizationCell] {
        &self.cells
    }
}
