//! TMC2130 driver controller.
//!
//! Owns the transport, the field codec and the derived configuration.
//! Generic over any [`RegisterTransport`].

use heapless::String;

use crate::codec::{DumpLine, RegisterFieldCodec};
use crate::config::{current_bits, options, ConfigSource, DriverConfig};
use crate::error::Result;
use crate::registers::{Register, READ_REGISTERS, WRITE_BIT};
use crate::transport::{ExecutionUnit, RegisterTransport};

/// Length of a TMC2130 SPI datagram.
pub const FRAME_LEN: usize = 5;

/// GCONF bit enabling stealthChop.
pub const GCONF_EN_PWM_MODE: u32 = 1 << 2;

/// GCONF bit routing stallGuard to DIAG1.
pub const GCONF_DIAG1_STALL: u32 = 1 << 8;

/// Raw microstep counter range.
const MSCNT_MASK: u32 = 0x3ff;

/// Registers written by `init_registers`, in order.
pub const CONFIGURED_REGISTERS: [Register; 8] = [
    Register::GCONF,
    Register::CHOPCONF,
    Register::IHOLD_IRUN,
    Register::TPOWERDOWN,
    Register::TPWMTHRS,
    Register::TCOOLTHRS,
    Register::COOLCONF,
    Register::PWMCONF,
];

/// Consumer of diagnostic text lines.
pub trait DiagnosticSink {
    /// Accept one line.
    fn respond_info(&mut self, line: &str);
}

impl<F: FnMut(&str)> DiagnosticSink for F {
    fn respond_info(&mut self, line: &str) {
        self(line)
    }
}

/// TMC2130 stepper driver on a register transport.
///
/// # Example
///
/// ```rust,ignore
/// use tmc2130::{DriverConfig, ExecutionUnit, SpiTransport, Tmc2130};
///
/// let transport = SpiTransport::new(spi_device, ExecutionUnit(0));
/// let mut driver = Tmc2130::new("stepper_x", transport, DriverConfig::with_current(0.8)?)?;
/// driver.init_registers()?;
/// let phase = driver.phase()?;
/// ```
#[derive(Debug)]
pub struct Tmc2130<T> {
    name: String<32>,
    transport: T,
    codec: RegisterFieldCodec,
    config: DriverConfig,
    default_gconf: u32,
}

impl<T: RegisterTransport> Tmc2130<T> {
    /// Create a driver and compute the initial register words.
    ///
    /// No bytes are sent; call [`Tmc2130::init_registers`] to program the
    /// device.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the field table fails validation.
    pub fn new(name: &str, transport: T, config: DriverConfig) -> Result<Self> {
        let mut driver = Self {
            name: String::try_from(name).unwrap_or_default(),
            transport,
            codec: RegisterFieldCodec::tmc2130()?,
            config,
            default_gconf: 0,
        };
        driver.apply_config()?;
        driver.default_gconf = driver.codec.register(Register::GCONF);
        Ok(driver)
    }

    /// Create a driver from a configuration section.
    ///
    /// Besides the declared options, the raw coolStep and PWM fields are
    /// taken from their `driver_<FIELD>` options.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for any missing or invalid option.
    pub fn from_config<S: ConfigSource>(
        name: &str,
        transport: T,
        source: &S,
        step_distance: f32,
    ) -> Result<Self> {
        let config = DriverConfig::load(source, step_distance)?;
        let mut driver = Self::new(name, transport, config)?;
        for (field, default) in options::RAW_FIELDS {
            driver.codec.set_config_field(source, field, default)?;
        }
        Ok(driver)
    }

    fn apply_config(&mut self) -> Result<()> {
        let c = &self.config;
        let codec = &mut self.codec;
        codec.set_field("toff", c.toff.into(), None)?;
        codec.set_field("hstrt", c.hstrt.into(), None)?;
        codec.set_field("hend", c.hend.into(), None)?;
        codec.set_field("TBL", c.blank_time_select.into(), None)?;
        codec.set_field("vsense", c.current.vsense.into(), None)?;
        codec.set_field("MRES", c.stealthchop.mres.into(), None)?;
        codec.set_field("intpol", c.interpolate.into(), None)?;
        codec.set_field("IHOLD", c.current.ihold.into(), None)?;
        codec.set_field("IRUN", c.current.irun.into(), None)?;
        codec.set_field("IHOLDDELAY", c.iholddelay.into(), None)?;
        codec.set_field("TPOWERDOWN", c.tpowerdown.into(), None)?;
        codec.set_field("TPWMTHRS", c.stealthchop.threshold, None)?;
        codec.set_field("sgt", c.sgt.into(), None)?;
        codec.set_field("PWM_AMPL", c.pwm_ampl.into(), None)?;
        codec.set_field("PWM_GRAD", c.pwm_grad.into(), None)?;
        codec.set_field("pwm_freq", c.pwm_freq.into(), None)?;
        codec.set_field("pwm_autoscale", c.pwm_autoscale.into(), None)?;
        codec.set_field("en_pwm_mode", c.stealthchop.enabled.into(), None)?;
        codec.set_field("TCOOLTHRS", c.tcoolthrs_word(), None)?;
        Ok(())
    }

    /// Write every configured register to the device.
    ///
    /// # Errors
    ///
    /// Returns the first transport error.
    pub fn init_registers(&mut self) -> Result<()> {
        for register in CONFIGURED_REGISTERS {
            let word = self.codec.register(register);
            self.write_register(register, word)?;
        }
        Ok(())
    }

    /// Read a register.
    ///
    /// The device answers each datagram with the result of the previous
    /// one, so the read datagram is sent twice and only the second
    /// response is decoded. No other access may reach the bus in between.
    ///
    /// # Errors
    ///
    /// Returns the transport error of either exchange.
    pub fn read_register(&mut self, register: Register) -> Result<u32> {
        let request: [u8; FRAME_LEN] = [register.address(), 0, 0, 0, 0];

        let mut stale = request;
        self.transport.transfer(&mut stale)?;

        let mut response = request;
        self.transport.transfer(&mut response)?;

        let word = u32::from_be_bytes([response[1], response[2], response[3], response[4]]);
        trace!("{} read {} = {:#x}", self.name.as_str(), register.name(), word);
        self.codec.store(register, word);
        Ok(word)
    }

    /// Write a register and record the word in the cache.
    ///
    /// # Errors
    ///
    /// Returns the transport error.
    pub fn write_register(&mut self, register: Register, word: u32) -> Result<()> {
        let [b3, b2, b1, b0] = word.to_be_bytes();
        let frame: [u8; FRAME_LEN] = [register.address() | WRITE_BIT, b3, b2, b1, b0];
        trace!("{} write {} = {:#x}", self.name.as_str(), register.name(), word);
        self.transport.send(&frame)?;
        self.codec.store(register, word);
        Ok(())
    }

    /// Set run and hold current in amps and write IHOLD_IRUN.
    ///
    /// The sense voltage selection stays as configured.
    ///
    /// # Errors
    ///
    /// Returns the transport error.
    pub fn set_current(&mut self, run_current: f32, hold_current: f32) -> Result<()> {
        let vsense = self.config.current.vsense;
        let irun = current_bits(run_current, self.config.sense_resistor, vsense);
        let ihold = current_bits(hold_current, self.config.sense_resistor, vsense);
        let (_, word) = self.codec.compose_field("IRUN", irun.into(), None)?;
        let (register, word) = self.codec.compose_field("IHOLD", ihold.into(), Some(word))?;
        self.write_register(register, word)
    }

    /// Microsteps per full step.
    #[inline]
    pub fn microsteps(&self) -> u32 {
        self.config.microsteps()
    }

    /// Position within the electrical cycle, in configured microsteps.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the MSCNT read.
    pub fn phase(&mut self) -> Result<u32> {
        let mscnt = self.read_register(Register::MSCNT)?;
        Ok((mscnt & MSCNT_MASK) >> self.config.mres())
    }

    /// Lazily read and format each diagnostic register.
    ///
    /// Every call starts a fresh pass over live hardware state.
    pub fn dump(&mut self) -> Dump<'_, T> {
        Dump {
            driver: self,
            next: 0,
        }
    }

    /// Feed a full register dump to `sink`.
    ///
    /// # Errors
    ///
    /// Returns the first transport error; lines before it are delivered.
    pub fn dump_to<D: DiagnosticSink + ?Sized>(&mut self, sink: &mut D) -> Result<()> {
        info!("DUMP_TMC {}", self.name.as_str());
        for line in self.dump() {
            let line = line?;
            info!("{}", line.as_str());
            sink.respond_info(&line);
        }
        Ok(())
    }

    /// Driver name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Derived configuration.
    #[inline]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Field codec and register cache.
    #[inline]
    pub fn codec(&self) -> &RegisterFieldCodec {
        &self.codec
    }

    /// Pin wired to DIAG1, if configured.
    #[inline]
    pub fn diag1_pin(&self) -> Option<&str> {
        self.config.diag1_pin()
    }

    /// GCONF as derived from configuration.
    #[inline]
    pub fn default_gconf(&self) -> u32 {
        self.default_gconf
    }

    /// Controller the transport runs on.
    #[inline]
    pub fn execution_unit(&self) -> ExecutionUnit {
        self.transport.execution_unit()
    }

    /// Release the transport.
    pub fn release(self) -> T {
        self.transport
    }
}

/// Iterator over formatted diagnostic registers, see [`Tmc2130::dump`].
pub struct Dump<'a, T> {
    driver: &'a mut Tmc2130<T>,
    next: usize,
}

impl<'a, T: RegisterTransport> Iterator for Dump<'a, T> {
    type Item = Result<DumpLine>;

    fn next(&mut self) -> Option<Self::Item> {
        let register = *READ_REGISTERS.get(self.next)?;
        self.next += 1;
        let word = match self.driver.read_register(register) {
            Ok(word) => word,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(self.driver.codec.pretty_format(register, word)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = READ_REGISTERS.len().saturating_sub(self.next);
        (left, Some(left))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, TransportError};

    /// Loopback transport: answers every read with a fixed word.
    struct Fixed {
        word: u32,
        frames: usize,
    }

    impl RegisterTransport for Fixed {
        fn send(&mut self, _data: &[u8]) -> core::result::Result<(), TransportError> {
            self.frames += 1;
            Ok(())
        }

        fn transfer(&mut self, data: &mut [u8]) -> core::result::Result<(), TransportError> {
            self.frames += 1;
            data[1..5].copy_from_slice(&self.word.to_be_bytes());
            Ok(())
        }

        fn execution_unit(&self) -> ExecutionUnit {
            ExecutionUnit(0)
        }
    }

    fn driver(word: u32) -> Tmc2130<Fixed> {
        let config = DriverConfig::with_current(0.8).unwrap();
        Tmc2130::new("stepper_x", Fixed { word, frames: 0 }, config).unwrap()
    }

    #[test]
    fn test_gconf_bits_match_field_table() {
        let codec = RegisterFieldCodec::tmc2130().unwrap();
        let table = codec.table();
        assert_eq!(table.mask_of(Register::GCONF, "en_pwm_mode").unwrap(), GCONF_EN_PWM_MODE);
        assert_eq!(table.mask_of(Register::GCONF, "diag1_stall").unwrap(), GCONF_DIAG1_STALL);
    }

    #[test]
    fn test_initial_words() {
        let d = driver(0);
        let codec = d.codec();
        assert_eq!(codec.get_field("toff", None).unwrap(), 4);
        assert_eq!(codec.get_field("hend", None).unwrap(), 7);
        assert_eq!(codec.get_field("TBL", None).unwrap(), 1);
        assert_eq!(codec.get_field("MRES", None).unwrap(), 4);
        assert_eq!(codec.get_field("intpol", None).unwrap(), 1);
        assert_eq!(codec.get_field("IHOLDDELAY", None).unwrap(), 8);
        assert_eq!(codec.get_field("PWM_AMPL", None).unwrap(), 128);
        assert_eq!(codec.get_field("en_pwm_mode", None).unwrap(), 0);
        assert_eq!(d.default_gconf(), 0);
        // Nothing sent yet.
        assert_eq!(d.transport.frames, 0);
    }

    #[test]
    fn test_init_registers_writes_each_once() {
        let mut d = driver(0);
        d.init_registers().unwrap();
        assert_eq!(d.transport.frames, CONFIGURED_REGISTERS.len());
    }

    #[test]
    fn test_phase_normalized() {
        let mut d = driver(0x3ff);
        // 16 microsteps: 1023 >> 4
        assert_eq!(d.phase().unwrap(), 63);
        assert_eq!(d.microsteps(), 16);
    }

    #[test]
    fn test_phase_ignores_bits_above_counter() {
        let mut d = driver(0xffff_fc00 | 0x20);
        assert_eq!(d.phase().unwrap(), 2);
    }

    #[test]
    fn test_dump_is_finite_and_restartable() {
        let mut d = driver(0);
        assert_eq!(d.dump().count(), READ_REGISTERS.len());
        assert_eq!(d.dump().count(), READ_REGISTERS.len());
        assert_eq!(d.transport.frames, 4 * READ_REGISTERS.len());
    }

    #[test]
    fn test_dump_to_closure_sink() {
        let mut d = driver(0);
        let mut lines: heapless::Vec<DumpLine, 16> = heapless::Vec::new();
        d.dump_to(&mut |line: &str| {
            lines.push(DumpLine::try_from(line).unwrap()).unwrap();
        })
        .unwrap();
        assert_eq!(lines.len(), READ_REGISTERS.len());
        assert_eq!(lines[0], "GCONF: 0x00000000");
        assert_eq!(lines[8], "DRV_STATUS: 0x00000000 CS_ACTUAL=0(Reset?)");
    }

    /// Rejects every frame.
    struct Rejecting;

    impl RegisterTransport for Rejecting {
        fn send(&mut self, _data: &[u8]) -> core::result::Result<(), TransportError> {
            Err(TransportError::Spi(embedded_hal::spi::ErrorKind::Other))
        }

        fn transfer(&mut self, _data: &mut [u8]) -> core::result::Result<(), TransportError> {
            Err(TransportError::Spi(embedded_hal::spi::ErrorKind::Other))
        }

        fn execution_unit(&self) -> ExecutionUnit {
            ExecutionUnit(0)
        }
    }

    #[test]
    fn test_failed_current_write_keeps_cache() {
        let config = DriverConfig::with_current(0.8).unwrap();
        let mut d = Tmc2130::new("stepper_x", Rejecting, config).unwrap();
        let before = d.codec().register(Register::IHOLD_IRUN);
        let err = d.set_current(0.3, 0.3).unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::Spi(embedded_hal::spi::ErrorKind::Other)));
        assert_eq!(d.codec().register(Register::IHOLD_IRUN), before);
    }
}
