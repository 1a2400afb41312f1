//! MCP4922 dual 12-bit DAC.
//!
//! Every write is one 16-bit command sent MSB first inside a CS window:
//!
//! | bit 15 | bit 14 | bit 13 | bit 12 | bits 11..0 |
//! |--------|--------|--------|--------|------------|
//! | A/B    | BUF    | /GA    | /SHDN  | D11..D0    |

use super::*;
use hal::blocking::spi::Write;
use hal::digital::v2::OutputPin;

/// Largest code the converters accept
pub const MAX_CODE: u16 = 0x0FFF;
/// /SHDN set, output driven
const ACTIVE: u8 = 0x10;

/// Output selected by bit 15
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Channel {
    A = 0x00,
    B = 0x80,
}

/// VREF input buffer, bit 14
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum VrefBuffer {
    #[default]
    Unbuffered = 0x00,
    Buffered = 0x40,
}

/// Output gain, bit 13 is active low
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Gain {
    /// Vout = 2 * Vref * D / 4096
    #[default]
    X2 = 0x00,
    /// Vout = Vref * D / 4096
    X1 = 0x20,
}

/// MCP4922 on an SPI bus with its CS line
pub struct Mcp4922<SPI, CS> {
    spi: SPI,
    cs: CS,
    vref: VrefBuffer,
    gain: Gain,
}

impl<SPI, S, P, CS> Mcp4922<SPI, CS>
where
    SPI: Write<u8, Error = S>,
    CS: OutputPin<Error = P>,
{
    /// Take the bus and the chip select, unbuffered reference and gain x2
    pub fn new(spi: SPI, cs: CS) -> Result<Self, Error<S, P>> {
        let mut dac = Mcp4922 {
            spi,
            cs,
            vref: VrefBuffer::default(),
            gain: Gain::default(),
        };
        dac.cs.set_high().map_err(Error::PinError)?;
        Ok(dac)
    }

    /// Reference buffer and gain used by the following writes
    pub fn set_configuration(&mut self, vref: VrefBuffer, gain: Gain) {
        self.vref = vref;
        self.gain = gain;
    }

    /// Return the reference buffer and gain sent with every write
    pub fn configuration(&self) -> (VrefBuffer, Gain) {
        (self.vref, self.gain)
    }

    /// Set the output of `channel` to `code`
    pub fn write(&mut self, channel: Channel, code: u16) -> SpiRes<S, P> {
        if code > MAX_CODE {
            return Err(Error::InvalidArgument);
        }
        let high = channel as u8 | self.vref as u8 | self.gain as u8 | ACTIVE | (code >> 8) as u8;
        self.send([high, code as u8])
    }

    /// Put `channel` in shutdown, its output goes high impedance
    pub fn shutdown(&mut self, channel: Channel) -> SpiRes<S, P> {
        let high = channel as u8 | self.vref as u8 | self.gain as u8;
        self.send([high, 0x00])
    }

    fn send(&mut self, command: [u8; 2]) -> SpiRes<S, P> {
        self.cs.set_low().map_err(Error::PinError)?;
        self.spi.write(&command).map_err(Error::SpiError)?;
        self.cs.set_high().map_err(Error::PinError)?;
        Ok(())
    }

    /// Destroy the driver and return the bus and the chip select
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}
