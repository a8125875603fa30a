//! Magnetic field providers.
//!
//! The closest-approach estimator and the helix propagator are generic over a
//! [`MagneticFieldProvider`]. Whether a field exists at all is a property of
//! the provider *type* ([`MagneticFieldProvider::FIELD_FREE`]), so the
//! straight-line reduction is chosen when the estimator type is instantiated
//! rather than tested on every call.

use crate::context::MagneticFieldContext;
use crate::Vector3;

/// Source of magnetic field values, in GeV/(e·mm) (see [`crate::units::T`]).
///
/// Implementations must be safe for concurrent read access.
pub trait MagneticFieldProvider: Send + Sync {
    /// `true` for providers that can never return a non-zero field.
    const FIELD_FREE: bool = false;

    /// Field vector at a global position.
    fn field_at(&self, position: &Vector3, mctx: &MagneticFieldContext) -> Vector3;
}

/// Provider for setups without a magnetic field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NullField;

impl MagneticFieldProvider for NullField {
    const FIELD_FREE: bool = true;

    fn field_at(&self, _position: &Vector3, _mctx: &MagneticFieldContext) -> Vector3 {
        Vector3::zeros()
    }
}

/// Homogeneous field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantField {
    field: Vector3,
}

impl ConstantField {
    pub fn new(field: Vector3) -> Self {
        Self { field }
    }

    /// Solenoid-like field along z with the given strength.
    pub fn along_z(bz: f64) -> Self {
        Self::new(Vector3::new(0.0, 0.0, bz))
    }

    pub fn field(&self) -> &Vector3 {
        &self.field
    }
}

impl MagneticFieldProvider for ConstantField {
    fn field_at(&self, _position: &Vector3, _mctx: &MagneticFieldContext) -> Vector3 {
        self.field
    }
}

impl<F: MagneticFieldProvider> MagneticFieldProvider for std::sync::Arc<F> {
    const FIELD_FREE: bool = F::FIELD_FREE;

    fn field_at(&self, position: &Vector3, mctx: &MagneticFieldContext) -> Vector3 {
        (**self).field_at(position, mctx)
    }
}
