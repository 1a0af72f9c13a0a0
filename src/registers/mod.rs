//! TMC2130 register map.
//!
//! Register names, SPI addresses and the static field table.

pub(crate) mod fields;

pub use fields::{FieldDef, FieldTable, RegisterFields, TMC2130_FIELDS};

use crate::error::{error_name, ConfigError};

/// Address bit set on every write datagram.
pub const WRITE_BIT: u8 = 0x80;

/// A 32-bit addressable register of the TMC2130.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(non_camel_case_types)]
pub enum Register {
    /// Global configuration flags
    GCONF,
    /// Global status flags
    GSTAT,
    /// Input pin states and silicon version
    IOIN,
    /// Driver current control
    IHOLD_IRUN,
    /// Delay before power down in stand still
    TPOWERDOWN,
    /// Actual measured time between two microsteps
    TSTEP,
    /// Upper velocity for stealthChop voltage PWM mode
    TPWMTHRS,
    /// Lower threshold velocity for coolStep and stallGuard output
    TCOOLTHRS,
    /// Velocity threshold for high velocity modes
    THIGH,
    /// Direct coil current control
    XDIRECT,
    /// Velocity threshold for dcStep
    VDCMIN,
    /// Microstep counter
    MSCNT,
    /// Actual microstep current
    MSCURACT,
    /// Chopper configuration
    CHOPCONF,
    /// coolStep and stallGuard configuration
    COOLCONF,
    /// dcStep configuration
    DCCTRL,
    /// Driver status flags and stallGuard result
    DRV_STATUS,
    /// stealthChop PWM configuration
    PWMCONF,
    /// Actual stealthChop PWM amplitude
    PWM_SCALE,
    /// Encoder mode configuration
    ENCM_CTRL,
    /// Number of steps lost by dcStep
    LOST_STEPS,
}

impl Register {
    /// All registers, in address order.
    pub const ALL: [Register; 21] = [
        Register::GCONF,
        Register::GSTAT,
        Register::IOIN,
        Register::IHOLD_IRUN,
        Register::TPOWERDOWN,
        Register::TSTEP,
        Register::TPWMTHRS,
        Register::TCOOLTHRS,
        Register::THIGH,
        Register::XDIRECT,
        Register::VDCMIN,
        Register::MSCNT,
        Register::MSCURACT,
        Register::CHOPCONF,
        Register::COOLCONF,
        Register::DCCTRL,
        Register::DRV_STATUS,
        Register::PWMCONF,
        Register::PWM_SCALE,
        Register::ENCM_CTRL,
        Register::LOST_STEPS,
    ];

    /// SPI address of the register (write bit clear).
    pub const fn address(self) -> u8 {
        match self {
            Register::GCONF => 0x00,
            Register::GSTAT => 0x01,
            Register::IOIN => 0x04,
            Register::IHOLD_IRUN => 0x10,
            Register::TPOWERDOWN => 0x11,
            Register::TSTEP => 0x12,
            Register::TPWMTHRS => 0x13,
            Register::TCOOLTHRS => 0x14,
            Register::THIGH => 0x15,
            Register::XDIRECT => 0x2d,
            Register::VDCMIN => 0x33,
            Register::MSCNT => 0x6a,
            Register::MSCURACT => 0x6b,
            Register::CHOPCONF => 0x6c,
            Register::COOLCONF => 0x6d,
            Register::DCCTRL => 0x6e,
            Register::DRV_STATUS => 0x6f,
            Register::PWMCONF => 0x70,
            Register::PWM_SCALE => 0x71,
            Register::ENCM_CTRL => 0x72,
            Register::LOST_STEPS => 0x73,
        }
    }

    /// Datasheet name of the register.
    pub const fn name(self) -> &'static str {
        match self {
            Register::GCONF => "GCONF",
            Register::GSTAT => "GSTAT",
            Register::IOIN => "IOIN",
            Register::IHOLD_IRUN => "IHOLD_IRUN",
            Register::TPOWERDOWN => "TPOWERDOWN",
            Register::TSTEP => "TSTEP",
            Register::TPWMTHRS => "TPWMTHRS",
            Register::TCOOLTHRS => "TCOOLTHRS",
            Register::THIGH => "THIGH",
            Register::XDIRECT => "XDIRECT",
            Register::VDCMIN => "VDCMIN",
            Register::MSCNT => "MSCNT",
            Register::MSCURACT => "MSCURACT",
            Register::CHOPCONF => "CHOPCONF",
            Register::COOLCONF => "COOLCONF",
            Register::DCCTRL => "DCCTRL",
            Register::DRV_STATUS => "DRV_STATUS",
            Register::PWMCONF => "PWMCONF",
            Register::PWM_SCALE => "PWM_SCALE",
            Register::ENCM_CTRL => "ENCM_CTRL",
            Register::LOST_STEPS => "LOST_STEPS",
        }
    }

    /// Look up a register by its datasheet name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownRegister` if no register has that name.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.name() == name)
            .ok_or_else(|| ConfigError::UnknownRegister(error_name(name)))
    }
}

impl core::fmt::Display for Register {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only diagnostic registers, in dump order.
pub const READ_REGISTERS: [Register; 11] = [
    Register::GCONF,
    Register::GSTAT,
    Register::IOIN,
    Register::TSTEP,
    Register::XDIRECT,
    Register::MSCNT,
    Register::MSCURACT,
    Register::CHOPCONF,
    Register::DRV_STATUS,
    Register::PWM_SCALE,
    Register::LOST_STEPS,
];
