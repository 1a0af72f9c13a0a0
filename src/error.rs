//! Error types for the tmc2130 library.
//!
//! Provides unified error handling across configuration, register transport,
//! and endstop operations.

use core::fmt;

use embedded_hal::spi::ErrorKind;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Bounded name used in error payloads (option, field, register names).
pub type ErrorName = heapless::String<32>;

/// Unified error type for all tmc2130 operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Register transport error
    Transport(TransportError),
    /// Endstop operation error
    Endstop(EndstopError),
}

/// Configuration-related errors.
///
/// All of these are raised while building tables, loading options or
/// constructing the driver and endstop, before any hardware access.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Config section not present
    SectionNotFound(ErrorName),
    /// Required option missing and no default given
    MissingOption(ErrorName),
    /// Option present but of the wrong type
    WrongType {
        /// Option name
        option: ErrorName,
        /// Expected type name
        expected: &'static str,
    },
    /// Option value below its declared minimum
    BelowMinimum {
        /// Option name
        option: ErrorName,
        /// Configured value
        value: f32,
        /// Declared minimum
        min: f32,
    },
    /// Option value above its declared maximum
    AboveMaximum {
        /// Option name
        option: ErrorName,
        /// Configured value
        value: f32,
        /// Declared maximum
        max: f32,
    },
    /// Option value must be strictly above a bound
    NotAbove {
        /// Option name
        option: ErrorName,
        /// Configured value
        value: f32,
        /// Exclusive lower bound
        bound: f32,
    },
    /// Option value is not one of the allowed choices
    InvalidChoice {
        /// Option name
        option: ErrorName,
        /// Configured value
        value: i64,
    },
    /// A field mask has no bits set
    EmptyMask {
        /// Register name
        register: &'static str,
        /// Field name
        field: &'static str,
    },
    /// A field mask is not a single run of set bits
    NonContiguousMask {
        /// Register name
        register: &'static str,
        /// Field name
        field: &'static str,
    },
    /// Two fields of the same register claim the same bits
    OverlappingFields {
        /// Register name
        register: &'static str,
        /// First field
        first: &'static str,
        /// Second field
        second: &'static str,
    },
    /// A field name appears more than once in the table
    AmbiguousField(&'static str),
    /// Register given more than one entry in a field table
    DuplicateRegister(&'static str),
    /// Field name not present in the field table
    UnknownField(ErrorName),
    /// Register name not present in the register map
    UnknownRegister(ErrorName),
    /// Virtual endstop requested without a diag1 pin
    DiagPinRequired,
    /// Endstop and driver are not on the same controller
    ControllerMismatch,
    /// Virtual endstop pin may not be inverted or pulled up
    InvalidVirtualPin,
    /// Pin name other than `virtual_endstop`
    UnknownVirtualPin(ErrorName),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Register transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Underlying SPI bus error
    Spi(ErrorKind),
    /// Driver is already borrowed by another user on this bus
    Busy,
}

/// Endstop operation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum EndstopError {
    /// Homing did not trigger before the deadline
    Timeout,
    /// Endstop-specific failure
    Failed(heapless::String<64>),
}

/// Copy `s` into a bounded name, or an empty name if it does not fit.
pub(crate) fn error_name(s: &str) -> ErrorName {
    heapless::String::try_from(s).unwrap_or_default()
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Transport(e) => write!(f, "Transport error: {}", e),
            Error::Endstop(e) => write!(f, "Endstop error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::SectionNotFound(name) => write!(f, "Section '{}' not found", name),
            ConfigError::MissingOption(name) => write!(f, "Option '{}' is required", name),
            ConfigError::WrongType { option, expected } => {
                write!(f, "Option '{}' must be of type {}", option, expected)
            }
            ConfigError::BelowMinimum { option, value, min } => {
                write!(f, "Option '{}' must have minimum of {} (got {})", option, min, value)
            }
            ConfigError::AboveMaximum { option, value, max } => {
                write!(f, "Option '{}' must have maximum of {} (got {})", option, max, value)
            }
            ConfigError::NotAbove { option, value, bound } => {
                write!(f, "Option '{}' must be above {} (got {})", option, bound, value)
            }
            ConfigError::InvalidChoice { option, value } => {
                write!(f, "Choice '{}' for option '{}' is not valid", value, option)
            }
            ConfigError::EmptyMask { register, field } => {
                write!(f, "Field {}.{} has an empty mask", register, field)
            }
            ConfigError::NonContiguousMask { register, field } => {
                write!(f, "Field {}.{} mask is not contiguous", register, field)
            }
            ConfigError::OverlappingFields { register, first, second } => {
                write!(f, "Fields '{}' and '{}' overlap in {}", first, second, register)
            }
            ConfigError::AmbiguousField(name) => {
                write!(f, "Field '{}' is defined more than once", name)
            }
            ConfigError::DuplicateRegister(name) => {
                write!(f, "Register '{}' is listed more than once", name)
            }
            ConfigError::UnknownField(name) => write!(f, "Unknown field '{}'", name),
            ConfigError::UnknownRegister(name) => write!(f, "Unknown register '{}'", name),
            ConfigError::DiagPinRequired => {
                write!(f, "tmc2130 virtual endstop requires diag1_pin")
            }
            ConfigError::ControllerMismatch => {
                write!(f, "tmc2130 virtual endstop must be on same controller")
            }
            ConfigError::InvalidVirtualPin => {
                write!(f, "Can not pullup/invert tmc2130 virtual endstop")
            }
            ConfigError::UnknownVirtualPin(pin) => {
                write!(f, "Unknown tmc2130 virtual endstop '{}'", pin)
            }
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Spi(kind) => write!(f, "SPI error: {}", kind),
            TransportError::Busy => write!(f, "Driver is busy"),
        }
    }
}

impl fmt::Display for EndstopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndstopError::Timeout => write!(f, "Timeout during endstop homing"),
            EndstopError::Failed(msg) => write!(f, "Endstop failure: {}", msg),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

impl From<EndstopError> for Error {
    fn from(e: EndstopError) -> Self {
        Error::Endstop(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for TransportError {}

#[cfg(feature = "std")]
impl std::error::Error for EndstopError {}
