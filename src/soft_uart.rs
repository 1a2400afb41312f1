//! 8N1 UART on plain GPIO lines.
//!
//! Timing comes from the delay provider alone, so interrupts that fire in the
//! middle of a frame stretch the bits. Keep them off while a byte is on the wire.

use super::*;
use core::convert::Infallible;
use hal::blocking::delay::DelayUs;
use hal::digital::v2::{InputPin, OutputPin};
use hal::serial;

/// Data bits per frame
const DATA_BITS: u8 = 8;

/// Line settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SoftUartConfig {
    /// Bits per second, 16 to 1 000 000
    pub baud_rate: u32,
    /// Reads of the RX line before `read_byte` gives up on a start bit
    pub start_bit_polls: u32,
}

impl Default for SoftUartConfig {
    fn default() -> Self {
        SoftUartConfig {
            baud_rate: 9600,
            start_bit_polls: 10_000,
        }
    }
}

impl SoftUartConfig {
    /// Length of one bit in microseconds, `None` if it does not fit the delay provider
    pub fn bit_us(&self) -> Option<u16> {
        if self.baud_rate == 0 {
            return None;
        }
        match 1_000_000 / self.baud_rate {
            0 => None,
            us => u16::try_from(us).ok(),
        }
    }
}

/// 8N1 UART on two GPIO lines
pub struct SoftUart<TX, RX, D> {
    tx: TX,
    rx: RX,
    delay: D,
    bit_us: u16,
    start_bit_polls: u32,
}

impl<TX, RX, D, P> SoftUart<TX, RX, D>
where
    TX: OutputPin<Error = P>,
    RX: InputPin<Error = P>,
    D: DelayUs<u16>,
{
    /// Take the lines and put TX at the idle (high) level
    pub fn new(tx: TX, rx: RX, delay: D, config: SoftUartConfig) -> Result<Self, Error<Infallible, P>> {
        let bit_us = config.bit_us().ok_or(Error::InvalidArgument)?;
        let mut uart = SoftUart {
            tx,
            rx,
            delay,
            bit_us,
            start_bit_polls: config.start_bit_polls,
        };
        uart.tx.set_high().map_err(Error::PinError)?;
        Ok(uart)
    }

    /// Return the bit time in microseconds
    pub fn bit_us(&self) -> u16 {
        self.bit_us
    }

    /// Send one frame: start bit, 8 data bits LSB first, stop bit
    pub fn write_byte(&mut self, byte: u8) -> PinRes<P> {
        self.drive(false)?;
        for i in 0..DATA_BITS {
            self.drive(byte & (1 << i) != 0)?;
        }
        self.drive(true)
    }

    /// Send every byte of `s`
    pub fn write_str(&mut self, s: &str) -> PinRes<P> {
        for byte in s.bytes() {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// Wait for a start bit and receive one frame.
    ///
    /// Gives up with `Timeout` after `start_bit_polls` reads of an idle line. Every
    /// bit is sampled at its middle, a low stop bit is a `FramingError`.
    pub fn read_byte(&mut self) -> Result<u8, Error<Infallible, P>> {
        let mut polls = 0;
        while !self.rx.is_low().map_err(Error::PinError)? {
            polls += 1;
            if polls >= self.start_bit_polls {
                return Err(Error::Timeout);
            }
        }
        self.delay.delay_us(self.bit_us);
        self.delay.delay_us(self.bit_us / 2);

        let mut byte = 0u8;
        for i in 0..DATA_BITS {
            if i > 0 {
                self.delay.delay_us(self.bit_us);
            }
            if self.rx.is_high().map_err(Error::PinError)? {
                byte |= 1 << i;
            }
        }
        self.delay.delay_us(self.bit_us);
        if !self.rx.is_high().map_err(Error::PinError)? {
            return Err(Error::FramingError);
        }
        Ok(byte)
    }

    /// Destroy the driver and return the lines and the delay provider
    pub fn release(self) -> (TX, RX, D) {
        (self.tx, self.rx, self.delay)
    }

    fn drive(&mut self, high: bool) -> PinRes<P> {
        if high {
            self.tx.set_high().map_err(Error::PinError)?;
        } else {
            self.tx.set_low().map_err(Error::PinError)?;
        }
        self.delay.delay_us(self.bit_us);
        Ok(())
    }
}

impl<TX, RX, D, P> serial::Write<u8> for SoftUart<TX, RX, D>
where
    TX: OutputPin<Error = P>,
    RX: InputPin<Error = P>,
    D: DelayUs<u16>,
{
    type Error = Error<Infallible, P>;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        self.write_byte(word).map_err(nb::Error::Other)
    }

    /// Frames leave the line complete, nothing to flush
    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}

impl<TX, RX, D, P> serial::Read<u8> for SoftUart<TX, RX, D>
where
    TX: OutputPin<Error = P>,
    RX: InputPin<Error = P>,
    D: DelayUs<u16>,
{
    type Error = Error<Infallible, P>;

    /// No start bit within the poll budget is reported as `WouldBlock`
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        match self.read_byte() {
            Ok(byte) => Ok(byte),
            Err(Error::Timeout) => Err(nb::Error::WouldBlock),
            Err(e) => Err(nb::Error::Other(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{uart_decode, Bench, SimDelay, SimInput, SimPin};
    use hal::serial::{Read, Write};
    use std::vec::Vec;

    const TX: u8 = 0;
    const RX: u8 = 1;

    fn uart(bench: &Bench, rx: &[bool], polls: u32) -> SoftUart<SimPin, SimInput, SimDelay> {
        let config = SoftUartConfig {
            baud_rate: 9600,
            start_bit_polls: polls,
        };
        SoftUart::new(bench.pin(TX), bench.input(RX, rx, true), bench.delay(), config).unwrap()
    }

    /// Idle, start bit, data LSB first, stop bit
    fn frame(idle: usize, byte: u8, stop: bool) -> Vec<bool> {
        let mut levels = vec![true; idle];
        levels.push(false);
        levels.extend((0..8).map(|i| byte & (1 << i) != 0));
        levels.push(stop);
        levels
    }

    #[test]
    fn bit_time_from_baud_rate() {
        let config = |baud_rate| SoftUartConfig {
            baud_rate,
            ..SoftUartConfig::default()
        };
        assert_eq!(config(9600).bit_us(), Some(104));
        assert_eq!(config(115_200).bit_us(), Some(8));
        assert_eq!(config(0).bit_us(), None);
        assert_eq!(config(2_000_000).bit_us(), None);
        assert_eq!(config(10).bit_us(), None);
    }

    #[test]
    fn written_frames_decode() {
        let bench = Bench::new();
        let mut uart = uart(&bench, &[], 1);
        uart.write_str("Hi!").unwrap();
        uart.write(0x00).unwrap();
        assert_eq!(uart_decode(&bench.edges(), TX, 104), b"Hi!\0".to_vec());
        assert_eq!(bench.now_us(), 4 * 10 * 104);
    }

    #[test]
    fn bits_are_sampled_mid_bit() {
        let bench = Bench::new();
        let mut uart = uart(&bench, &frame(2, 0xA5, true), 100);
        assert_eq!(uart.read_byte(), Ok(0xA5));

        let samples = bench.samples();
        assert_eq!(samples.len(), 3 + 8 + 1);
        let start = samples[2].1;
        for (bit, sample) in samples[3..].iter().enumerate() {
            assert_eq!(sample.1 - start, 156 + 104 * bit as u64);
        }
    }

    #[test]
    fn low_stop_bit_is_a_framing_error() {
        let bench = Bench::new();
        let mut uart = uart(&bench, &frame(0, 0x3C, false), 100);
        assert_eq!(uart.read_byte(), Err(Error::FramingError));
    }

    #[test]
    fn idle_line_times_out() {
        let bench = Bench::new();
        let mut uart = uart(&bench, &[], 5);
        assert_eq!(uart.read_byte(), Err(Error::Timeout));
        assert_eq!(bench.samples().len(), 5);
        assert!(matches!(uart.read(), Err(nb::Error::WouldBlock)));
    }
}
