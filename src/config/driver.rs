//! Immutable driver configuration derived from user options.

use heapless::String;

use super::derive::{
    check_current, clamp_threshold, derive_current, derive_microstep_exponent, derive_stealthchop,
    CurrentScale, StealthChop, DEFAULT_SENSE_RESISTOR, TMC_FREQUENCY,
};
use super::options;
use super::source::ConfigSource;
use crate::error::{error_name, ConfigError};

/// Driver configuration, derived once and validated on every path that
/// builds it.
///
/// Values are read through accessors; the `with_*` setters re-run the
/// same checks as [`DriverConfig::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub(crate) run_current: f32,
    pub(crate) hold_current: f32,
    pub(crate) homing_current: f32,
    pub(crate) sense_resistor: f32,
    pub(crate) current: CurrentScale,
    pub(crate) stealthchop: StealthChop,
    stealthchop_velocity: f32,
    step_distance: f32,
    pub(crate) interpolate: bool,
    pub(crate) iholddelay: u8,
    pub(crate) tpowerdown: u8,
    pub(crate) blank_time_select: u8,
    pub(crate) toff: u8,
    pub(crate) hend: u8,
    pub(crate) hstrt: u8,
    pub(crate) sgt: u8,
    pub(crate) pwm_autoscale: bool,
    pub(crate) pwm_freq: u8,
    pub(crate) pwm_grad: u8,
    pub(crate) pwm_ampl: u8,
    pub(crate) tcoolthrs: i64,
    pub(crate) diag1_pin: Option<String<32>>,
}

impl DriverConfig {
    /// Read every declared option from `source`.
    ///
    /// `step_distance` is the distance of one full step of the stepper the
    /// driver controls; it only matters when stealthChop is enabled.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` met: a missing required option, a
    /// value out of bounds, or an invalid microstep choice.
    pub fn load<S: ConfigSource>(source: &S, step_distance: f32) -> Result<Self, ConfigError> {
        let run_current = options::RUN_CURRENT.read(source)?;
        let hold_current = options::HOLD_CURRENT.read_or(source, run_current)?;
        let homing_current = options::HOMING_CURRENT.read_or(source, run_current)?;
        let sense_resistor = options::SENSE_RESISTOR.read(source)?;
        let current = derive_current(run_current, Some(hold_current), Some(sense_resistor))?;

        let mres = options::MICROSTEPS.read(source)?;
        let velocity = options::STEALTHCHOP_THRESHOLD.read(source)?;
        let stealthchop = derive_stealthchop(mres, velocity, TMC_FREQUENCY, step_distance);

        let diag1_pin = match source.raw_string(options::DIAG1_PIN)? {
            Some(pin) => Some(pin_name(pin)?),
            None => None,
        };

        Ok(Self {
            run_current,
            hold_current,
            homing_current,
            sense_resistor,
            current,
            stealthchop,
            stealthchop_velocity: velocity,
            step_distance,
            interpolate: options::INTERPOLATE.read(source)?,
            iholddelay: options::IHOLDDELAY.read_u8(source)?,
            tpowerdown: options::TPOWERDOWN.read_u8(source)?,
            blank_time_select: options::BLANK_TIME_SELECT.read_u8(source)?,
            toff: options::TOFF.read_u8(source)?,
            hend: options::HEND.read_u8(source)?,
            hstrt: options::HSTRT.read_u8(source)?,
            sgt: (options::SGT.read(source)? & 0x7f) as u8,
            pwm_autoscale: options::PWM_AUTOSCALE.read(source)?,
            pwm_freq: options::PWM_FREQ.read_u8(source)?,
            pwm_grad: options::PWM_GRAD.read_u8(source)?,
            pwm_ampl: options::PWM_AMPL.read_u8(source)?,
            tcoolthrs: options::TCOOLTHRS.read(source)?,
            diag1_pin,
        })
    }

    /// Configuration with the given run current and every other option at
    /// its default: 16 microsteps, stealthChop off, no diag1 pin.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `run_current` is outside `(0, 2.0]`.
    pub fn with_current(run_current: f32) -> Result<Self, ConfigError> {
        let current = derive_current(run_current, None, None)?;
        let mres = derive_microstep_exponent(16)?;
        Ok(Self {
            run_current,
            hold_current: run_current,
            homing_current: run_current,
            sense_resistor: DEFAULT_SENSE_RESISTOR,
            current,
            stealthchop: derive_stealthchop(mres, 0.0, TMC_FREQUENCY, 0.0),
            stealthchop_velocity: 0.0,
            step_distance: 0.0,
            interpolate: true,
            iholddelay: 8,
            tpowerdown: 0,
            blank_time_select: 1,
            toff: 4,
            hend: 7,
            hstrt: 0,
            sgt: 0,
            pwm_autoscale: true,
            pwm_freq: 1,
            pwm_grad: 4,
            pwm_ampl: 128,
            tcoolthrs: 0,
            diag1_pin: None,
        })
    }

    /// Set the diag1 pin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::WrongType` if the name does not fit.
    pub fn with_diag1_pin(mut self, pin: &str) -> Result<Self, ConfigError> {
        self.diag1_pin = Some(pin_name(pin)?);
        Ok(self)
    }

    /// Set the homing current in amps.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `amps` is outside `(0, 2.0]`.
    pub fn with_homing_current(mut self, amps: f32) -> Result<Self, ConfigError> {
        check_current(options::HOMING_CURRENT.name, amps)?;
        self.homing_current = amps;
        Ok(self)
    }

    /// Set the configured TCOOLTHRS; clamped to register range when written.
    pub fn with_tcoolthrs(mut self, value: i64) -> Self {
        self.tcoolthrs = value;
        self
    }

    /// Set the microstep resolution and rederive the stealthChop threshold.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidChoice` unless `microsteps` is a power
    /// of two from 1 to 256.
    pub fn with_microsteps(mut self, microsteps: u16) -> Result<Self, ConfigError> {
        let mres = derive_microstep_exponent(microsteps)?;
        self.stealthchop =
            derive_stealthchop(mres, self.stealthchop_velocity, TMC_FREQUENCY, self.step_distance);
        Ok(self)
    }

    /// Run current in amps.
    #[inline]
    pub fn run_current(&self) -> f32 {
        self.run_current
    }

    /// Hold current in amps.
    #[inline]
    pub fn hold_current(&self) -> f32 {
        self.hold_current
    }

    /// Current used while sensorless homing, in amps.
    #[inline]
    pub fn homing_current(&self) -> f32 {
        self.homing_current
    }

    /// Sense resistor in ohms.
    #[inline]
    pub fn sense_resistor(&self) -> f32 {
        self.sense_resistor
    }

    /// Quantized run/hold current and vsense selection.
    #[inline]
    pub fn current(&self) -> CurrentScale {
        self.current
    }

    /// Microstep exponent and stealthChop threshold.
    #[inline]
    pub fn stealthchop(&self) -> StealthChop {
        self.stealthchop
    }

    /// sgt field as 7-bit two's complement.
    #[inline]
    pub fn sgt(&self) -> u8 {
        self.sgt
    }

    /// Pin wired to DIAG1, needed for sensorless homing.
    #[inline]
    pub fn diag1_pin(&self) -> Option<&str> {
        self.diag1_pin.as_deref()
    }

    /// Microstep resolution exponent.
    #[inline]
    pub fn mres(&self) -> u8 {
        self.stealthchop.mres
    }

    /// Microsteps per full step.
    #[inline]
    pub fn microsteps(&self) -> u32 {
        256 >> self.stealthchop.mres
    }

    /// TCOOLTHRS clamped to register range.
    #[inline]
    pub fn tcoolthrs_word(&self) -> u32 {
        clamp_threshold(self.tcoolthrs)
    }
}

fn pin_name(pin: &str) -> Result<String<32>, ConfigError> {
    String::try_from(pin).map_err(|_| ConfigError::WrongType {
        option: error_name(options::DIAG1_PIN),
        expected: "pin name",
    })
}
