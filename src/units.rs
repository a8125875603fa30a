//! Unit constants.
//!
//! Lengths are in millimetres, momenta in GeV and charges in units of the
//! elementary charge. Magnetic fields are stored in GeV/(e·mm) so that the
//! signed helix radius is simply `p_T / (q · B)`; multiply a value in tesla by
//! [`T`] to convert.

/// Millimetre (base length unit).
pub const MM: f64 = 1.0;
/// Centimetre.
pub const CM: f64 = 10.0 * MM;
/// Metre.
pub const M: f64 = 1000.0 * MM;
/// Micrometre.
pub const UM: f64 = 1e-3 * MM;

/// GeV (base momentum unit).
pub const GEV: f64 = 1.0;
/// MeV.
pub const MEV: f64 = 1e-3 * GEV;

/// Elementary charge.
pub const E: f64 = 1.0;

/// Tesla expressed in GeV/(e·mm).
pub const T: f64 = 0.000_299_792_458;
