//! Configuration of the closest-approach estimator.
//!
//! [`ImpactPointConfig`] has no setters: every adjustment (in particular
//! forcing backward propagation) happens in [`ImpactPointConfigBuilder::build`],
//! so a configuration is complete the moment it exists and can be shared
//! between threads freely.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::propagator::{Direction, PropagatorOptions};

/// Default Newton iteration cap.
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;
/// Default precision on the azimuth update.
pub const DEFAULT_PRECISION: f64 = 1e-10;

/// Finalized estimator configuration.
#[derive(Debug)]
pub struct ImpactPointConfig<P, F> {
    field: F,
    propagator: Arc<P>,
    propagator_options: PropagatorOptions,
    max_iterations: u32,
    precision: f64,
}

impl<P, F> ImpactPointConfig<P, F> {
    /// Start building a configuration for the given field and shared propagator.
    pub fn builder(field: F, propagator: Arc<P>) -> ImpactPointConfigBuilder<P, F> {
        ImpactPointConfigBuilder::new(field, propagator)
    }

    pub fn field(&self) -> &F {
        &self.field
    }

    /// The shared propagator. Only ever used through `&self`.
    pub fn propagator(&self) -> &Arc<P> {
        &self.propagator
    }

    pub fn propagator_options(&self) -> &PropagatorOptions {
        &self.propagator_options
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn precision(&self) -> f64 {
        self.precision
    }
}

impl<P, F: Clone> Clone for ImpactPointConfig<P, F> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            propagator: Arc::clone(&self.propagator),
            propagator_options: self.propagator_options.clone(),
            max_iterations: self.max_iterations,
            precision: self.precision,
        }
    }
}

/// Builder for [`ImpactPointConfig`].
#[derive(Debug)]
pub struct ImpactPointConfigBuilder<P, F> {
    field: F,
    propagator: Arc<P>,
    propagator_options: PropagatorOptions,
    backward_propagation: bool,
    max_iterations: u32,
    precision: f64,
}

impl<P, F> ImpactPointConfigBuilder<P, F> {
    /// Defaults: default propagator options, backward propagation, 20
    /// iterations, precision 1e-10.
    pub fn new(field: F, propagator: Arc<P>) -> Self {
        Self {
            field,
            propagator,
            propagator_options: PropagatorOptions::default(),
            backward_propagation: true,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            precision: DEFAULT_PRECISION,
        }
    }

    pub fn propagator_options(mut self, options: PropagatorOptions) -> Self {
        self.propagator_options = options;
        self
    }

    /// Force the propagation direction to backward (default `true`).
    pub fn backward_propagation(mut self, backward: bool) -> Self {
        self.backward_propagation = backward;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    /// Validate and finalize.
    pub fn build(self) -> Result<ImpactPointConfig<P, F>> {
        if self.max_iterations == 0 {
            return Err(Error::invalid("max_iterations must be at least 1"));
        }
        if !(self.precision.is_finite() && self.precision > 0.0) {
            return Err(Error::invalid(format!(
                "precision must be positive, got {}",
                self.precision
            )));
        }

        let mut propagator_options = self.propagator_options;
        if self.backward_propagation {
            propagator_options.direction = Direction::Backward;
        }

        Ok(ImpactPointConfig {
            field: self.field,
            propagator: self.propagator,
            propagator_options,
            max_iterations: self.max_iterations,
            precision: self.precision,
        })
    }
}
