//! # tmc2130
//!
//! Register-level driver for the Trinamic TMC2130 stepper driver over SPI,
//! with embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **Field codec**: Named bit fields packed into cached 32-bit register words
//! - **Configuration-driven**: Currents, microstepping and stealthChop threshold
//!   derived from physical quantities, loadable from TOML files
//! - **embedded-hal 1.0**: Uses `SpiDevice` for the register link
//! - **no_std compatible**: Core library works without standard library
//! - **Sensorless homing**: Endstop overlay that arms stallGuard on DIAG1 and
//!   restores the driver afterwards
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tmc2130::{ExecutionUnit, SpiTransport, Tmc2130};
//!
//! // Load configuration from TOML
//! let config = tmc2130::load_config("printer.toml")?;
//! let section = config.driver_section("stepper_x")?;
//! let geometry = config.stepper_geometry("stepper_x")?;
//!
//! // Create the driver on an embedded-hal SPI device
//! let transport = SpiTransport::new(spi_device, ExecutionUnit(0));
//! let mut driver = Tmc2130::from_config("stepper_x", transport, &section, geometry.step_distance)?;
//! driver.init_registers()?;
//!
//! // Dump diagnostic registers
//! driver.dump_to(&mut |line: &str| println!("{}", line))?;
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `defmt`: Enables defmt logging for embedded targets
//! - `log`: Enables logging through the `log` facade

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

// Must come first so the logging macros are visible below
#[macro_use]
mod fmt;

// Core modules
pub mod codec;
pub mod config;
pub mod driver;
pub mod endstop;
pub mod error;
pub mod registers;
pub mod transport;

// Re-exports for ergonomic API
pub use codec::{decode_signed, DumpLine, RegisterCache, RegisterFieldCodec};
pub use config::{ConfigSource, DriverConfig, StepperGeometry};
pub use driver::{DiagnosticSink, Tmc2130};
pub use endstop::{Endstop, HomingState, PinParams, SensorlessEndstop};
pub use error::{Error, Result};
pub use registers::{FieldTable, Register};
pub use transport::{ExecutionUnit, RegisterTransport, SpiTransport};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::load_config;
