//! Configuration module for tmc2130.
//!
//! Provides the configuration source abstraction, the declared option
//! schema, the derivation of register values from physical quantities, and
//! loading from TOML files (with `std` feature).

mod derive;
mod driver;
#[cfg(feature = "std")]
mod loader;
pub mod options;
mod source;

use serde::Deserialize;

pub use derive::{
    clamp_threshold, current_bits, derive_current, derive_microstep_exponent, derive_stealthchop,
    CurrentScale, StealthChop, DEFAULT_SENSE_RESISTOR, MAX_CURRENT, MICROSTEP_CHOICES,
    THRESHOLD_MAX, TMC_FREQUENCY,
};
pub use driver::DriverConfig;
pub use source::{ConfigSource, FloatBounds};

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config, TomlConfig, TomlSection, DRIVER_TABLE};

/// Geometry of the stepper a driver is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct StepperGeometry {
    /// Distance travelled per full step.
    pub step_distance: f32,
}
