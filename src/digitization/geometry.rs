//! Detector modules and the lookup from geometry identifiers to modules.

use std::collections::HashMap;
use std::sync::Arc;

use crate::surface::PlaneSurface;

use super::cluster::GeometryId;
use super::segmentation::CartesianSegmentation;

/// A planar sensor: its surface placement and readout segmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitizationModule {
    surface: PlaneSurface,
    segmentation: CartesianSegmentation,
}

impl DigitizationModule {
    pub fn new(surface: PlaneSurface, segmentation: CartesianSegmentation) -> Self {
        Self {
            surface,
            segmentation,
        }
    }

    pub fn surface(&self) -> &PlaneSurface {
        &self.surface
    }

    pub fn segmentation(&self) -> &CartesianSegmentation {
        &self.segmentation
    }
}

/// Resolves geometry identifiers to detector modules.
///
/// Implementations must be safe for concurrent read access.
pub trait DetectorGeometry: Send + Sync {
    fn module(&self, id: GeometryId) -> Option<&DigitizationModule>;
}

impl<G: DetectorGeometry + ?Sized> DetectorGeometry for Arc<G> {
    fn module(&self, id: GeometryId) -> Option<&DigitizationModule> {
        (**self).module(id)
    }
}

/// Geometry held in a hash map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGeometry {
    modules: HashMap<GeometryId, DigitizationModule>,
}

impl InMemoryGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, returning the one previously stored under `id`.
    pub fn insert(
        &mut self,
        id: GeometryId,
        module: DigitizationModule,
    ) -> Option<DigitizationModule> {
        self.modules.insert(id, module)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl DetectorGeometry for InMemoryGeometry {
    fn module(&self, id: GeometryId) -> Option<&DigitizationModule> {
        self.modules.get(&id)
    }
}

impl FromIterator<(GeometryId, DigitizationModule)> for InMemoryGeometry {
    fn from_iter<I: IntoIterator<Item = (GeometryId, DigitizationModule)>>(iter: I) -> Self {
        Self {
            modules: iter.into_iter().collect(),
        }
    }
}
