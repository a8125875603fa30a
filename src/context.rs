//! Opaque condition tokens threaded through geometric computations.
//!
//! Neither token is inspected by the algorithms in this crate; they exist so
//! that alignment- or conditions-dependent collaborators (geometry, field)
//! can be handed the state of the event being processed.

/// Geometry (alignment) conditions for the current event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GeometryContext {
    iov: u64,
}

impl GeometryContext {
    /// Create a context for the given interval of validity.
    pub fn new(iov: u64) -> Self {
        Self { iov }
    }

    /// Interval of validity this context refers to.
    pub fn iov(&self) -> u64 {
        self.iov
    }
}

/// Magnetic field conditions for the current event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MagneticFieldContext {
    iov: u64,
}

impl MagneticFieldContext {
    /// Create a context for the given interval of validity.
    pub fn new(iov: u64) -> Self {
        Self { iov }
    }

    /// Interval of validity this context refers to.
    pub fn iov(&self) -> u64 {
        self.iov
    }
}

/// Both contexts bundled, as passed to the closest-approach estimator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Context {
    /// Geometry conditions.
    pub geometry: GeometryContext,
    /// Field conditions.
    pub field: MagneticFieldContext,
}

impl Context {
    pub fn new(geometry: GeometryContext, field: MagneticFieldContext) -> Self {
        Self { geometry, field }
    }
}
