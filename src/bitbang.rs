//! Clocked serial output on two GPIO lines.
//!
//! Every software serial driver in this crate (SPI, 74HC595, HCMS-29xx) moves
//! bits the same way: put the bit on the data line, then take the clock from its
//! idle level to the active level and back, waiting the hold time around each
//! edge. `BitClock` owns the two lines and the delay provider and does exactly that.

use bit_field::BitField;
use hal::blocking::delay::DelayUs;
use hal::digital::v2::OutputPin;

/// Order in which the bits of a byte leave the data line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Bit 7 first
    MsbFirst,
    /// Bit 0 first
    LsbFirst,
}

/// Data and clock line pair with a hold time
pub struct BitClock<DATA, CLK, D> {
    /// Data output
    data: DATA,
    /// Clock output
    clk: CLK,
    /// Delay provider for the hold time
    delay: D,
    /// Clock level between bits
    idle_high: bool,
    /// Wait in microseconds around each clock edge, zero for none
    hold_us: u16,
}

impl<DATA, CLK, D, P> BitClock<DATA, CLK, D>
where
    DATA: OutputPin<Error = P>,
    CLK: OutputPin<Error = P>,
    D: DelayUs<u16>,
{
    /// Create the pair. Lines are not touched until `idle()` or the first bit.
    pub fn new(data: DATA, clk: CLK, delay: D, idle_high: bool, hold_us: u16) -> Self {
        BitClock {
            data,
            clk,
            delay,
            idle_high,
            hold_us,
        }
    }

    /// Drive the clock to its idle level
    pub fn idle(&mut self) -> Result<(), P> {
        self.set_clock(self.idle_high)
    }

    /// Change the idle clock level, applied on the next bit or `idle()`
    pub fn set_idle_high(&mut self, idle_high: bool) {
        self.idle_high = idle_high;
    }

    /// Return true if the clock idles high
    pub fn idle_high(&self) -> bool {
        self.idle_high
    }

    /// Change the hold time
    pub fn set_hold_us(&mut self, hold_us: u16) {
        self.hold_us = hold_us;
    }

    /// Put one bit on the data line and clock it out
    pub fn write_bit(&mut self, bit: bool) -> Result<(), P> {
        self.clock_bit(bit, || Ok(false)).map(|_| ())
    }

    /// Clock one bit out, calling `sample` right after the active edge and returning its level
    pub fn clock_bit<F>(&mut self, bit: bool, sample: F) -> Result<bool, P>
    where
        F: FnOnce() -> Result<bool, P>,
    {
        self.set_data(bit)?;
        self.wait();
        self.set_clock(!self.idle_high)?;
        let level = sample()?;
        self.wait();
        self.set_clock(self.idle_high)?;
        Ok(level)
    }

    /// Clock out the eight bits of `byte` in the requested order
    pub fn write_byte(&mut self, byte: u8, order: BitOrder) -> Result<(), P> {
        for i in 0..8 {
            self.write_bit(byte.get_bit(bit_index(i, order)))?;
        }
        Ok(())
    }

    /// Drive the data line
    pub fn set_data(&mut self, high: bool) -> Result<(), P> {
        if high {
            self.data.set_high()
        } else {
            self.data.set_low()
        }
    }

    /// Wait the hold time
    pub fn wait(&mut self) {
        if self.hold_us > 0 {
            self.delay.delay_us(self.hold_us);
        }
    }

    /// Pulse `pin` high for the hold time, leaving it low
    pub fn pulse<PIN: OutputPin<Error = P>>(&mut self, pin: &mut PIN) -> Result<(), P> {
        pin.set_high()?;
        self.wait();
        pin.set_low()
    }

    /// Borrow the delay provider for waits outside the bit timing
    pub fn delay(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Destroy the pair and return the lines and the delay provider
    pub fn release(self) -> (DATA, CLK, D) {
        (self.data, self.clk, self.delay)
    }

    fn set_clock(&mut self, high: bool) -> Result<(), P> {
        if high {
            self.clk.set_high()
        } else {
            self.clk.set_low()
        }
    }
}

/// Position in the byte of the `i`th bit sent
pub(crate) fn bit_index(i: usize, order: BitOrder) -> usize {
    match order {
        BitOrder::MsbFirst => 7 - i,
        BitOrder::LsbFirst => i,
    }
}
