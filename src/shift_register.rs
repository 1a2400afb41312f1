//! 74HC595 serial-in, parallel-out shift register.
//!
//! Bits are shifted in on the rising edge of SH_CP and copied to the outputs on
//! the rising edge of ST_CP, so the outputs keep their old value until the latch
//! pulse that ends every transfer.

use super::*;
use crate::bitbang::{BitClock, BitOrder};
use hal::blocking::delay::DelayUs;
use hal::digital::v2::OutputPin;

/// Timing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShiftRegisterConfig {
    /// High time of the shift and latch pulses in microseconds
    pub pulse_us: u16,
}

impl Default for ShiftRegisterConfig {
    fn default() -> Self {
        ShiftRegisterConfig { pulse_us: 1 }
    }
}

/// A 74HC595, or several chained through Q7'
pub struct ShiftRegister595<DATA, CLK, LATCH, D> {
    /// DS as data line, SH_CP as clock line
    clock: BitClock<DATA, CLK, D>,
    /// ST_CP
    latch: LATCH,
}

impl<DATA, CLK, LATCH, D, P> ShiftRegister595<DATA, CLK, LATCH, D>
where
    DATA: OutputPin<Error = P>,
    CLK: OutputPin<Error = P>,
    LATCH: OutputPin<Error = P>,
    D: DelayUs<u16>,
{
    /// Take the lines and drive all three low
    pub fn new(
        data: DATA,
        clk: CLK,
        latch: LATCH,
        delay: D,
        config: ShiftRegisterConfig,
    ) -> Result<Self, Error<core::convert::Infallible, P>> {
        let mut register = ShiftRegister595 {
            clock: BitClock::new(data, clk, delay, false, config.pulse_us),
            latch,
        };
        register.clock.set_data(false).map_err(Error::PinError)?;
        register.clock.idle().map_err(Error::PinError)?;
        register.latch.set_low().map_err(Error::PinError)?;
        Ok(register)
    }

    /// Shift a byte in, bit 0 first, and latch it
    pub fn send_byte_lsb_first(&mut self, byte: u8) -> PinRes<P> {
        self.send_byte(byte, BitOrder::LsbFirst)
    }

    /// Shift a byte in, bit 7 first, and latch it
    pub fn send_byte_msb_first(&mut self, byte: u8) -> PinRes<P> {
        self.send_byte(byte, BitOrder::MsbFirst)
    }

    /// Shift a byte in with the given bit order and latch it
    pub fn send_byte(&mut self, byte: u8, order: BitOrder) -> PinRes<P> {
        self.send_bytes(&[byte], order)
    }

    /// Shift several bytes through a chain of registers with a single latch at the end.
    /// The last byte lands in the register wired to the controller.
    pub fn send_bytes(&mut self, bytes: &[u8], order: BitOrder) -> PinRes<P> {
        for byte in bytes {
            self.clock.write_byte(*byte, order).map_err(Error::PinError)?;
        }
        self.strobe()
    }

    /// Copy the shift stage to the outputs
    pub fn strobe(&mut self) -> PinRes<P> {
        self.clock.pulse(&mut self.latch).map_err(Error::PinError)
    }

    /// Destroy the driver and return the lines and the delay provider
    pub fn release(self) -> (DATA, CLK, LATCH, D) {
        let (data, clk, delay) = self.clock.release();
        (data, clk, self.latch, delay)
    }
}
