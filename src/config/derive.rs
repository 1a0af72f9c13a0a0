//! Derivation of register values from physical quantities.
//!
//! Pure functions: amps to current scale, microsteps to MRES, velocity to
//! the stealthChop threshold.

use crate::error::{error_name, ConfigError};

/// Driver internal clock frequency in Hz.
pub const TMC_FREQUENCY: f32 = 13_200_000.0;

/// Default sense resistor in ohms.
pub const DEFAULT_SENSE_RESISTOR: f32 = 0.110;

/// Maximum configurable coil current in amps.
pub const MAX_CURRENT: f32 = 2.0;

/// Largest value of the 20-bit velocity threshold registers.
pub const THRESHOLD_MAX: u32 = 0xfffff;

/// Board trace resistance added to the sense resistor.
const TRACE_RESISTANCE: f32 = 0.020;

/// Sense voltage with vsense=0 (low sensitivity).
const VSENSE_LOW: f32 = 0.32;

/// Sense voltage with vsense=1 (high sensitivity).
const VSENSE_HIGH: f32 = 0.18;

/// Largest current scale value.
const CS_MAX: f32 = 31.0;

/// Microstep resolution to MRES exponent.
pub const MICROSTEP_CHOICES: [(i64, u8); 9] = [
    (256, 0),
    (128, 1),
    (64, 2),
    (32, 3),
    (16, 4),
    (8, 5),
    (4, 6),
    (2, 7),
    (1, 8),
];

/// Quantized coil currents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CurrentScale {
    /// High sensitivity sense voltage selected.
    pub vsense: bool,
    /// Run current scale, 0..=31.
    pub irun: u8,
    /// Hold current scale, 0..=31.
    pub ihold: u8,
}

/// stealthChop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StealthChop {
    /// Microstep resolution exponent (MRES).
    pub mres: u8,
    /// stealthChop enabled below the threshold.
    pub enabled: bool,
    /// TPWMTHRS register value.
    pub threshold: u32,
}

/// Current scale for `current` amps through `sense_resistor` ohms.
pub fn current_bits(current: f32, sense_resistor: f32, high_sensitivity: bool) -> u8 {
    let resistor = sense_resistor + TRACE_RESISTANCE;
    let vref = if high_sensitivity { VSENSE_HIGH } else { VSENSE_LOW };
    let cs = libm::floorf(32.0 * current * resistor * libm::sqrtf(2.0) / vref - 1.0 + 0.5);
    cs.clamp(0.0, CS_MAX) as u8
}

/// Current scales for run and hold current.
///
/// High sensitivity is selected when both scales would otherwise fall
/// below 16, trading range for resolution.
///
/// # Errors
///
/// Returns a `ConfigError` if a current is outside `(0, 2.0]` or the
/// sense resistor is not positive.
pub fn derive_current(
    run_current: f32,
    hold_current: Option<f32>,
    sense_resistor: Option<f32>,
) -> Result<CurrentScale, ConfigError> {
    let hold_current = hold_current.unwrap_or(run_current);
    let sense_resistor = sense_resistor.unwrap_or(DEFAULT_SENSE_RESISTOR);
    check_current("run_current", run_current)?;
    check_current("hold_current", hold_current)?;
    if sense_resistor <= 0.0 {
        return Err(ConfigError::NotAbove {
            option: error_name("sense_resistor"),
            value: sense_resistor,
            bound: 0.0,
        });
    }

    let mut vsense = false;
    let mut irun = current_bits(run_current, sense_resistor, vsense);
    let mut ihold = current_bits(hold_current, sense_resistor, vsense);
    if irun < 16 && ihold < 16 {
        vsense = true;
        irun = current_bits(run_current, sense_resistor, vsense);
        ihold = current_bits(hold_current, sense_resistor, vsense);
    }
    Ok(CurrentScale { vsense, irun, ihold })
}

/// Check a current against `(0, MAX_CURRENT]`.
pub(crate) fn check_current(option: &str, current: f32) -> Result<(), ConfigError> {
    if current.is_nan() || current <= 0.0 {
        return Err(ConfigError::NotAbove {
            option: error_name(option),
            value: current,
            bound: 0.0,
        });
    }
    if current > MAX_CURRENT {
        return Err(ConfigError::AboveMaximum {
            option: error_name(option),
            value: current,
            max: MAX_CURRENT,
        });
    }
    Ok(())
}

/// MRES exponent for a microstep resolution: `log2(256 / microsteps)`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidChoice` unless `microsteps` is a power of
/// two from 1 to 256.
pub fn derive_microstep_exponent(microsteps: u16) -> Result<u8, ConfigError> {
    MICROSTEP_CHOICES
        .iter()
        .find(|(choice, _)| *choice == i64::from(microsteps))
        .map(|(_, mres)| *mres)
        .ok_or_else(|| ConfigError::InvalidChoice {
            option: error_name("microsteps"),
            value: i64::from(microsteps),
        })
}

/// stealthChop settings for a velocity threshold.
///
/// A zero `velocity` disables stealthChop. Otherwise the threshold is the
/// number of driver clocks per microstep at that velocity, rounded and
/// clamped to 20 bits.
pub fn derive_stealthchop(mres: u8, velocity: f32, tmc_frequency: f32, step_distance: f32) -> StealthChop {
    if velocity == 0.0 {
        return StealthChop {
            mres,
            enabled: false,
            threshold: 0,
        };
    }
    let microstep_distance = f64::from(step_distance) / f64::from(1u32 << mres.min(8));
    let threshold = libm::floor(f64::from(tmc_frequency) * microstep_distance / f64::from(velocity) + 0.5);
    StealthChop {
        mres,
        enabled: true,
        threshold: threshold.clamp(0.0, f64::from(THRESHOLD_MAX)) as u32,
    }
}

/// Clamp a configured 20-bit threshold into register range.
#[inline]
pub fn clamp_threshold(value: i64) -> u32 {
    value.clamp(0, i64::from(THRESHOLD_MAX)) as u32
}
