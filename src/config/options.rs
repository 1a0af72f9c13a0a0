//! Declared driver option schema.
//!
//! Every option the driver reads is listed here once with its type,
//! default and bounds. `DriverConfig::load` reads them all up front.

use super::derive::{MAX_CURRENT, MICROSTEP_CHOICES};
use super::source::{ConfigSource, FloatBounds};
use crate::error::ConfigError;

/// A float option.
#[derive(Debug, Clone, Copy)]
pub struct FloatOption {
    /// Option name.
    pub name: &'static str,
    /// Static default, if any.
    pub default: Option<f32>,
    /// Value bounds.
    pub bounds: FloatBounds,
}

impl FloatOption {
    /// Read with the declared default.
    pub fn read<S: ConfigSource + ?Sized>(&self, source: &S) -> Result<f32, ConfigError> {
        source.get_float(self.name, self.default, self.bounds)
    }

    /// Read with a default computed from other options.
    pub fn read_or<S: ConfigSource + ?Sized>(&self, source: &S, default: f32) -> Result<f32, ConfigError> {
        source.get_float(self.name, Some(default), self.bounds)
    }
}

/// An integer option.
#[derive(Debug, Clone, Copy)]
pub struct IntOption {
    /// Option name.
    pub name: &'static str,
    /// Static default, if any.
    pub default: Option<i64>,
    /// Inclusive minimum.
    pub min: Option<i64>,
    /// Inclusive maximum.
    pub max: Option<i64>,
}

impl IntOption {
    /// Read with the declared default and bounds.
    pub fn read<S: ConfigSource + ?Sized>(&self, source: &S) -> Result<i64, ConfigError> {
        source.get_int(self.name, self.default, self.min, self.max)
    }

    /// Read an option whose bounds fit in a byte.
    pub fn read_u8<S: ConfigSource + ?Sized>(&self, source: &S) -> Result<u8, ConfigError> {
        // Declared bounds of every u8 option lie within [0, 255].
        self.read(source).map(|v| v as u8)
    }
}

/// A boolean option.
#[derive(Debug, Clone, Copy)]
pub struct BoolOption {
    /// Option name.
    pub name: &'static str,
    /// Static default, if any.
    pub default: Option<bool>,
}

impl BoolOption {
    /// Read with the declared default.
    pub fn read<S: ConfigSource + ?Sized>(&self, source: &S) -> Result<bool, ConfigError> {
        source.get_bool(self.name, self.default)
    }
}

/// An integer option restricted to a set of choices.
#[derive(Debug, Clone, Copy)]
pub struct ChoiceOption<T: 'static> {
    /// Option name.
    pub name: &'static str,
    /// Allowed values and what they map to.
    pub choices: &'static [(i64, T)],
    /// Static default, if any.
    pub default: Option<i64>,
}

impl<T: Copy> ChoiceOption<T> {
    /// Read and map through the choices.
    pub fn read<S: ConfigSource>(&self, source: &S) -> Result<T, ConfigError> {
        source.get_choice(self.name, self.choices, self.default)
    }
}

const CURRENT_BOUNDS: FloatBounds = FloatBounds::NONE.above(0.0).max(MAX_CURRENT);

/// Run current in amps (required).
pub const RUN_CURRENT: FloatOption = FloatOption {
    name: "run_current",
    default: None,
    bounds: CURRENT_BOUNDS,
};

/// Hold current in amps; defaults to the run current.
pub const HOLD_CURRENT: FloatOption = FloatOption {
    name: "hold_current",
    default: None,
    bounds: CURRENT_BOUNDS,
};

/// Current used during sensorless homing; defaults to the run current.
pub const HOMING_CURRENT: FloatOption = FloatOption {
    name: "homing_current",
    default: None,
    bounds: CURRENT_BOUNDS,
};

/// Sense resistor in ohms.
pub const SENSE_RESISTOR: FloatOption = FloatOption {
    name: "sense_resistor",
    default: Some(super::derive::DEFAULT_SENSE_RESISTOR),
    bounds: FloatBounds::NONE.above(0.0),
};

/// Velocity below which stealthChop is used; 0 disables stealthChop.
pub const STEALTHCHOP_THRESHOLD: FloatOption = FloatOption {
    name: "stealthchop_threshold",
    default: Some(0.0),
    bounds: FloatBounds::NONE.min(0.0),
};

/// Microstep resolution, mapped to the MRES exponent (required).
pub const MICROSTEPS: ChoiceOption<u8> = ChoiceOption {
    name: "microsteps",
    choices: &MICROSTEP_CHOICES,
    default: None,
};

/// Step input interpolation to 256 microsteps.
pub const INTERPOLATE: BoolOption = BoolOption {
    name: "interpolate",
    default: Some(true),
};

/// Delay from run to hold current.
pub const IHOLDDELAY: IntOption = IntOption {
    name: "driver_IHOLDDELAY",
    default: Some(8),
    min: Some(0),
    max: Some(15),
};

/// Delay before standstill power down.
pub const TPOWERDOWN: IntOption = IntOption {
    name: "driver_TPOWERDOWN",
    default: Some(0),
    min: Some(0),
    max: Some(255),
};

/// Comparator blank time select.
pub const BLANK_TIME_SELECT: IntOption = IntOption {
    name: "driver_BLANK_TIME_SELECT",
    default: Some(1),
    min: Some(0),
    max: Some(3),
};

/// Chopper off time.
pub const TOFF: IntOption = IntOption {
    name: "driver_TOFF",
    default: Some(4),
    min: Some(1),
    max: Some(15),
};

/// Hysteresis end.
pub const HEND: IntOption = IntOption {
    name: "driver_HEND",
    default: Some(7),
    min: Some(0),
    max: Some(15),
};

/// Hysteresis start.
pub const HSTRT: IntOption = IntOption {
    name: "driver_HSTRT",
    default: Some(0),
    min: Some(0),
    max: Some(7),
};

/// stallGuard threshold, signed.
pub const SGT: IntOption = IntOption {
    name: "driver_SGT",
    default: Some(0),
    min: Some(-64),
    max: Some(63),
};

/// stealthChop PWM amplitude autoscaling.
pub const PWM_AUTOSCALE: BoolOption = BoolOption {
    name: "driver_PWM_AUTOSCALE",
    default: Some(true),
};

/// stealthChop PWM frequency select.
pub const PWM_FREQ: IntOption = IntOption {
    name: "driver_PWM_FREQ",
    default: Some(1),
    min: Some(0),
    max: Some(3),
};

/// stealthChop PWM gradient.
pub const PWM_GRAD: IntOption = IntOption {
    name: "driver_PWM_GRAD",
    default: Some(4),
    min: Some(0),
    max: Some(255),
};

/// stealthChop PWM amplitude.
pub const PWM_AMPL: IntOption = IntOption {
    name: "driver_PWM_AMPL",
    default: Some(128),
    min: Some(0),
    max: Some(255),
};

/// coolStep/stallGuard lower velocity threshold, clamped when written.
pub const TCOOLTHRS: IntOption = IntOption {
    name: "driver_TCOOLTHRS",
    default: Some(0),
    min: None,
    max: None,
};

/// Name of the pin wired to DIAG1.
pub const DIAG1_PIN: &str = "diag1_pin";

/// Raw fields set through `set_config_field`, with power-on defaults.
pub const RAW_FIELDS: [(&str, u32); 11] = [
    ("semin", 0),
    ("seup", 0),
    ("semax", 0),
    ("sedn", 0),
    ("seimin", 0),
    ("sfilt", 0),
    ("pwm_symmetric", 0),
    ("freewheel", 0),
    ("chm", 0),
    ("disfdcc", 0),
    ("rndtf", 0),
];
