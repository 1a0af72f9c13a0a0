//! Property-based tests for microstep resolution and phase normalization.

use proptest::prelude::*;
use tmc2130::config::{CurrentScale, MICROSTEP_CHOICES};
use tmc2130::error::TransportError;
use tmc2130::{DriverConfig, ExecutionUnit, RegisterTransport, Tmc2130};

/// Answers every read with `word`.
struct FixedWord(u32);

impl RegisterTransport for FixedWord {
    fn send(&mut self, _data: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn transfer(&mut self, data: &mut [u8]) -> Result<(), TransportError> {
        data[1..5].copy_from_slice(&self.0.to_be_bytes());
        Ok(())
    }

    fn execution_unit(&self) -> ExecutionUnit {
        ExecutionUnit(0)
    }
}

fn config_with_exponent(mres: u8) -> DriverConfig {
    let microsteps = 256u16 >> mres;
    DriverConfig::with_current(1.0)
        .unwrap()
        .with_microsteps(microsteps)
        .unwrap()
}

#[test]
fn test_microsteps_for_every_exponent() {
    for (choice, mres) in MICROSTEP_CHOICES {
        let driver = Tmc2130::new("stepper_x", FixedWord(0), config_with_exponent(mres)).unwrap();
        assert_eq!(driver.microsteps(), 256 >> mres);
        assert_eq!(i64::from(driver.microsteps()), choice);
    }
}

#[test]
fn test_microstep_exponent_follows_choice() {
    for (choice, mres) in MICROSTEP_CHOICES {
        let config = DriverConfig::with_current(1.0)
            .unwrap()
            .with_microsteps(choice as u16)
            .unwrap();
        assert_eq!(config.mres(), mres);
    }
}

#[test]
fn test_current_scale_in_range() {
    let config = DriverConfig::with_current(2.0).unwrap();
    let CurrentScale { irun, ihold, .. } = config.current();
    assert!(irun <= 31 && ihold <= 31);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Phase never leaves the normalized electrical cycle.
    #[test]
    fn prop_phase_bounded(mres in 0u8..=8, word in any::<u32>()) {
        let mut driver = Tmc2130::new("stepper_x", FixedWord(word), config_with_exponent(mres)).unwrap();
        let phase = driver.phase().unwrap();
        prop_assert!(phase <= 1023 >> mres, "phase {} at exponent {}", phase, mres);
        prop_assert_eq!(phase, (word & 0x3ff) >> mres);
    }
}
