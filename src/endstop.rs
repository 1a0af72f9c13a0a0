//! Endstop interface and the stallGuard homing overlay.
//!
//! [`SensorlessEndstop`] wraps the endstop that watches the driver's DIAG1
//! pin. While homing it routes stallGuard to DIAG1, switches to the homing
//! current and forces coolStep active at every velocity; afterwards it
//! puts the driver back exactly as it was.

use core::cell::RefCell;

use heapless::String;

use crate::config::THRESHOLD_MAX;
use crate::driver::{Tmc2130, GCONF_DIAG1_STALL, GCONF_EN_PWM_MODE};
use crate::error::{error_name, ConfigError, Result, TransportError};
use crate::registers::Register;
use crate::transport::{ExecutionUnit, RegisterTransport};

/// Name of a stepper attached to an endstop.
pub type StepperName = String<32>;

/// Pin name accepted by [`SensorlessEndstop::from_pin`].
pub const VIRTUAL_ENDSTOP_PIN: &str = "virtual_endstop";

/// A homing endstop.
///
/// Times are print times in seconds.
pub trait Endstop {
    /// Controller the endstop is sampled on.
    fn execution_unit(&self) -> ExecutionUnit;

    /// Register `stepper` as stopped by this endstop.
    fn attach_stepper(&mut self, stepper: &str) -> Result<()>;

    /// Steppers stopped by this endstop.
    fn steppers(&self) -> &[StepperName];

    /// Start sampling for a trigger.
    fn home_start(
        &mut self,
        print_time: f64,
        sample_time: f64,
        sample_count: u32,
        rest_time: f64,
    ) -> Result<()>;

    /// Wait for homing to finish by `home_end_time`.
    fn home_wait(&mut self, home_end_time: f64) -> Result<()>;

    /// Request the trigger state at `print_time`.
    fn query_trigger(&mut self, print_time: f64) -> Result<()>;

    /// Wait for the answer to [`Endstop::query_trigger`].
    fn query_trigger_wait(&mut self) -> Result<bool>;

    /// Called before homing moves start.
    fn home_prepare(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called after homing moves end, whatever their outcome.
    fn home_finalize(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Pin reference as written in an endstop option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinParams<'a> {
    /// Pin name on the chip.
    pub pin: &'a str,
    /// Inverted (`!`).
    pub invert: bool,
    /// Pull-up requested (`^`).
    pub pullup: bool,
}

/// Homing overlay state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingState {
    /// Registers hold their configured values.
    Idle,
    /// Homing configuration applied; the words to restore are kept.
    HomingActive {
        /// GCONF before homing.
        saved_gconf: u32,
        /// TCOOLTHRS before homing.
        saved_tcoolthrs: u32,
    },
}

/// Endstop that triggers on a stallGuard stall reported via DIAG1.
///
/// The driver is shared with other users through a `RefCell`; a borrow
/// conflict surfaces as [`TransportError::Busy`].
pub struct SensorlessEndstop<'a, T, E> {
    driver: &'a RefCell<Tmc2130<T>>,
    endstop: E,
    state: HomingState,
}

impl<'a, T: RegisterTransport, E: Endstop> SensorlessEndstop<'a, T, E> {
    /// Wrap `endstop`, which samples the driver's DIAG1 pin.
    ///
    /// # Errors
    ///
    /// - `ConfigError::DiagPinRequired` if no diag1 pin is configured
    /// - `ConfigError::ControllerMismatch` if `endstop` and the driver run
    ///   on different controllers
    pub fn new(driver: &'a RefCell<Tmc2130<T>>, endstop: E) -> Result<Self> {
        {
            let d = driver.try_borrow().map_err(|_| TransportError::Busy)?;
            if d.diag1_pin().is_none() {
                return Err(ConfigError::DiagPinRequired.into());
            }
            if endstop.execution_unit() != d.execution_unit() {
                return Err(ConfigError::ControllerMismatch.into());
            }
        }
        Ok(Self {
            driver,
            endstop,
            state: HomingState::Idle,
        })
    }

    /// Like [`SensorlessEndstop::new`], checking the pin reference first.
    ///
    /// # Errors
    ///
    /// - `ConfigError::UnknownVirtualPin` unless the pin is `virtual_endstop`
    /// - `ConfigError::InvalidVirtualPin` if the pin is inverted or pulled up
    /// - any error of [`SensorlessEndstop::new`]
    pub fn from_pin(driver: &'a RefCell<Tmc2130<T>>, pin: PinParams<'_>, endstop: E) -> Result<Self> {
        if pin.pin != VIRTUAL_ENDSTOP_PIN {
            return Err(ConfigError::UnknownVirtualPin(error_name(pin.pin)).into());
        }
        if pin.invert || pin.pullup {
            return Err(ConfigError::InvalidVirtualPin.into());
        }
        Self::new(driver, endstop)
    }

    /// Current overlay state.
    #[inline]
    pub fn state(&self) -> HomingState {
        self.state
    }

    /// Wrapped endstop.
    #[inline]
    pub fn inner(&self) -> &E {
        &self.endstop
    }

    /// Unwrap the overlay.
    pub fn into_inner(self) -> E {
        self.endstop
    }

    fn apply_homing(&mut self) -> Result<()> {
        let mut driver = self.driver.try_borrow_mut().map_err(|_| TransportError::Busy)?;

        let (saved_gconf, saved_tcoolthrs) = match self.state {
            HomingState::HomingActive {
                saved_gconf,
                saved_tcoolthrs,
            } => {
                warn!("{}: homing already prepared", driver.name());
                (saved_gconf, saved_tcoolthrs)
            }
            HomingState::Idle => (
                driver.codec().register(Register::GCONF),
                driver.codec().register(Register::TCOOLTHRS),
            ),
        };
        self.state = HomingState::HomingActive {
            saved_gconf,
            saved_tcoolthrs,
        };

        let gconf = (saved_gconf & !GCONF_EN_PWM_MODE) | GCONF_DIAG1_STALL;
        driver.write_register(Register::GCONF, gconf)?;
        let homing_current = driver.config().homing_current();
        driver.set_current(homing_current, homing_current)?;
        driver.write_register(Register::TCOOLTHRS, THRESHOLD_MAX)?;
        debug!("{}: sensorless homing armed", driver.name());
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        let mut driver = self.driver.try_borrow_mut().map_err(|_| TransportError::Busy)?;

        let (gconf, tcoolthrs) = match self.state {
            HomingState::HomingActive {
                saved_gconf,
                saved_tcoolthrs,
            } => (saved_gconf, saved_tcoolthrs),
            HomingState::Idle => {
                warn!("{}: homing finalized without prepare", driver.name());
                (driver.default_gconf(), driver.config().tcoolthrs_word())
            }
        };

        driver.write_register(Register::GCONF, gconf)?;
        let (run, hold) = (driver.config().run_current(), driver.config().hold_current());
        driver.set_current(run, hold)?;
        driver.write_register(Register::TCOOLTHRS, tcoolthrs)?;
        self.state = HomingState::Idle;
        debug!("{}: sensorless homing released", driver.name());
        Ok(())
    }
}

impl<'a, T: RegisterTransport, E: Endstop> Endstop for SensorlessEndstop<'a, T, E> {
    fn execution_unit(&self) -> ExecutionUnit {
        self.endstop.execution_unit()
    }

    fn attach_stepper(&mut self, stepper: &str) -> Result<()> {
        self.endstop.attach_stepper(stepper)
    }

    fn steppers(&self) -> &[StepperName] {
        self.endstop.steppers()
    }

    fn home_start(
        &mut self,
        print_time: f64,
        sample_time: f64,
        sample_count: u32,
        rest_time: f64,
    ) -> Result<()> {
        self.endstop
            .home_start(print_time, sample_time, sample_count, rest_time)
    }

    fn home_wait(&mut self, home_end_time: f64) -> Result<()> {
        self.endstop.home_wait(home_end_time)
    }

    fn query_trigger(&mut self, print_time: f64) -> Result<()> {
        self.endstop.query_trigger(print_time)
    }

    fn query_trigger_wait(&mut self) -> Result<bool> {
        self.endstop.query_trigger_wait()
    }

    fn home_prepare(&mut self) -> Result<()> {
        self.apply_homing()?;
        self.endstop.home_prepare()
    }

    fn home_finalize(&mut self) -> Result<()> {
        self.restore()?;
        self.endstop.home_finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::error::{EndstopError, Error};

    struct Loopback;

    impl RegisterTransport for Loopback {
        fn send(&mut self, _data: &[u8]) -> core::result::Result<(), TransportError> {
            Ok(())
        }

        fn transfer(&mut self, _data: &mut [u8]) -> core::result::Result<(), TransportError> {
            Ok(())
        }

        fn execution_unit(&self) -> ExecutionUnit {
            ExecutionUnit(1)
        }
    }

    #[derive(Default)]
    struct Pin {
        steppers: heapless::Vec<StepperName, 4>,
        prepared: bool,
        finalized: bool,
    }

    impl Endstop for Pin {
        fn execution_unit(&self) -> ExecutionUnit {
            ExecutionUnit(1)
        }

        fn attach_stepper(&mut self, stepper: &str) -> Result<()> {
            self.steppers
                .push(StepperName::try_from(stepper).unwrap_or_default())
                .map_err(|_| Error::Endstop(EndstopError::Timeout))
        }

        fn steppers(&self) -> &[StepperName] {
            &self.steppers
        }

        fn home_start(&mut self, _: f64, _: f64, _: u32, _: f64) -> Result<()> {
            Ok(())
        }

        fn home_wait(&mut self, _: f64) -> Result<()> {
            Ok(())
        }

        fn query_trigger(&mut self, _: f64) -> Result<()> {
            Ok(())
        }

        fn query_trigger_wait(&mut self) -> Result<bool> {
            Ok(true)
        }

        fn home_prepare(&mut self) -> Result<()> {
            self.prepared = true;
            Ok(())
        }

        fn home_finalize(&mut self) -> Result<()> {
            self.finalized = true;
            Ok(())
        }
    }

    fn driver(config: DriverConfig) -> RefCell<Tmc2130<Loopback>> {
        RefCell::new(Tmc2130::new("stepper_x", Loopback, config).unwrap())
    }

    #[test]
    fn test_prepare_then_finalize_forwards_and_cycles_state() {
        let cell = driver(DriverConfig::with_current(0.8).unwrap().with_diag1_pin("PA1").unwrap());
        let mut endstop = SensorlessEndstop::new(&cell, Pin::default()).unwrap();
        assert_eq!(endstop.state(), HomingState::Idle);

        endstop.home_prepare().unwrap();
        assert!(endstop.inner().prepared);
        assert_eq!(
            endstop.state(),
            HomingState::HomingActive {
                saved_gconf: 0,
                saved_tcoolthrs: 0
            }
        );
        assert_eq!(cell.borrow().codec().register(Register::GCONF), GCONF_DIAG1_STALL);
        assert_eq!(cell.borrow().codec().register(Register::TCOOLTHRS), THRESHOLD_MAX);

        endstop.home_finalize().unwrap();
        assert!(endstop.inner().finalized);
        assert_eq!(endstop.state(), HomingState::Idle);
        assert_eq!(cell.borrow().codec().register(Register::GCONF), 0);
        assert_eq!(cell.borrow().codec().register(Register::TCOOLTHRS), 0);
    }

    #[test]
    fn test_forwarded_calls() {
        let cell = driver(DriverConfig::with_current(0.8).unwrap().with_diag1_pin("PA1").unwrap());
        let mut endstop = SensorlessEndstop::new(&cell, Pin::default()).unwrap();
        endstop.attach_stepper("stepper_x").unwrap();
        assert_eq!(endstop.steppers().len(), 1);
        assert_eq!(endstop.execution_unit(), ExecutionUnit(1));
        assert!(endstop.query_trigger_wait().unwrap());
    }

    #[test]
    fn test_requires_diag_pin() {
        let cell = driver(DriverConfig::with_current(0.8).unwrap());
        assert!(matches!(
            SensorlessEndstop::new(&cell, Pin::default()),
            Err(Error::Config(ConfigError::DiagPinRequired))
        ));
    }

    #[test]
    fn test_pin_modifiers_rejected() {
        let cell = driver(DriverConfig::with_current(0.8).unwrap().with_diag1_pin("PA1").unwrap());
        let pin = PinParams {
            pin: VIRTUAL_ENDSTOP_PIN,
            invert: true,
            pullup: false,
        };
        assert!(matches!(
            SensorlessEndstop::from_pin(&cell, pin, Pin::default()),
            Err(Error::Config(ConfigError::InvalidVirtualPin))
        ));
        let pin = PinParams {
            pin: "PA2",
            invert: false,
            pullup: false,
        };
        assert!(matches!(
            SensorlessEndstop::from_pin(&cell, pin, Pin::default()),
            Err(Error::Config(ConfigError::UnknownVirtualPin(_)))
        ));
    }

    #[test]
    fn test_busy_driver() {
        let cell = driver(DriverConfig::with_current(0.8).unwrap().with_diag1_pin("PA1").unwrap());
        let mut endstop = SensorlessEndstop::new(&cell, Pin::default()).unwrap();
        let _held = cell.borrow_mut();
        assert_eq!(
            endstop.home_prepare(),
            Err(Error::Transport(TransportError::Busy))
        );
        assert_eq!(endstop.state(), HomingState::Idle);
    }
}
