//! Rectangular cell grid on a planar module.

use crate::error::{Error, Result};
use crate::{Matrix2, Vector2};

/// Regular grid of `bins.0 x bins.1` cells centered on the module origin.
///
/// Channel `(0, 0)` is the cell at the most negative local `x` and `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct CartesianSegmentation {
    bins: (usize, usize),
    pitch: Vector2,
}

impl CartesianSegmentation {
    /// Grid with `bins` cells per axis and cell size `pitch` (mm).
    pub fn new(bins: (usize, usize), pitch: Vector2) -> Result<Self> {
        if bins.0 == 0 || bins.1 == 0 {
            return Err(Error::invalid(format!("empty cell grid {:?}", bins)));
        }
        if !(pitch.x.is_finite() && pitch.y.is_finite() && pitch.x > 0.0 && pitch.y > 0.0) {
            return Err(Error::invalid(format!(
                "cell pitch must be positive, got ({}, {})",
                pitch.x, pitch.y
            )));
        }
        Ok(Self { bins, pitch })
    }

    pub fn bins(&self) -> (usize, usize) {
        self.bins
    }

    pub fn pitch(&self) -> &Vector2 {
        &self.pitch
    }

    /// Half extent of the sensitive area along local x and y.
    pub fn half_lengths(&self) -> Vector2 {
        Vector2::new(
            0.5 * self.bins.0 as f64 * self.pitch.x,
            0.5 * self.bins.1 as f64 * self.pitch.y,
        )
    }

    /// Local center of a cell, `None` outside the grid.
    pub fn cell_center(&self, channel0: usize, channel1: usize) -> Option<Vector2> {
        if channel0 >= self.bins.0 || channel1 >= self.bins.1 {
            return None;
        }
        let half = self.half_lengths();
        Some(Vector2::new(
            (channel0 as f64 + 0.5) * self.pitch.x - half.x,
            (channel1 as f64 + 0.5) * self.pitch.y - half.y,
        ))
    }

    /// Cell containing a local position, `None` outside the sensitive area.
    pub fn cell_of(&self, local: &Vector2) -> Option<(usize, usize)> {
        let half = self.half_lengths();
        let fx = ((local.x + half.x) / self.pitch.x).floor();
        let fy = ((local.y + half.y) / self.pitch.y).floor();
        if !(fx >= 0.0 && fy >= 0.0) {
            return None;
        }
        let (ix, iy) = (fx as usize, fy as usize);
        (ix < self.bins.0 && iy < self.bins.1).then_some((ix, iy))
    }

    /// Binary resolution: `pitch² / 12` on each axis.
    pub fn resolution(&self) -> Matrix2 {
        Matrix2::new(
            self.pitch.x * self.pitch.x / 12.0,
            0.0,
            0.0,
            self.pitch.y * self.pitch.y / 12.0,
        )
    }
}
