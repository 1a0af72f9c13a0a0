//! Register transport.
//!
//! A synchronous, byte-oriented, full-duplex link to the driver. The SPI
//! adapter runs every datagram as one chip-select framed transaction.

use embedded_hal::spi::{Error as _, SpiDevice};

use crate::error::TransportError;

/// Identity of the controller (MCU) a transport or endstop runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExecutionUnit(pub u8);

/// Byte-level link to a register-based device.
///
/// Multi-step protocols assume nobody else uses the bus in between; bus
/// sharing must be serialized by the caller.
pub trait RegisterTransport {
    /// Send `data`, discarding whatever the device clocks back.
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Exchange `data` in place: on return it holds the response, which
    /// has the same length as the request.
    fn transfer(&mut self, data: &mut [u8]) -> Result<(), TransportError>;

    /// Controller this transport executes on.
    fn execution_unit(&self) -> ExecutionUnit;
}

/// [`RegisterTransport`] over an `embedded-hal` SPI device.
#[derive(Debug)]
pub struct SpiTransport<SPI> {
    spi: SPI,
    unit: ExecutionUnit,
}

impl<SPI: SpiDevice> SpiTransport<SPI> {
    /// Wrap `spi`, which is attached to controller `unit`.
    pub fn new(spi: SPI, unit: ExecutionUnit) -> Self {
        Self { spi, unit }
    }

    /// Release the SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI: SpiDevice> RegisterTransport for SpiTransport<SPI> {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.spi.write(data).map_err(|e| TransportError::Spi(e.kind()))
    }

    fn transfer(&mut self, data: &mut [u8]) -> Result<(), TransportError> {
        self.spi
            .transfer_in_place(data)
            .map_err(|e| TransportError::Spi(e.kind()))
    }

    fn execution_unit(&self) -> ExecutionUnit {
        self.unit
    }
}

impl<T: RegisterTransport + ?Sized> RegisterTransport for &mut T {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).send(data)
    }

    fn transfer(&mut self, data: &mut [u8]) -> Result<(), TransportError> {
        (**self).transfer(data)
    }

    fn execution_unit(&self) -> ExecutionUnit {
        (**self).execution_unit()
    }
}
