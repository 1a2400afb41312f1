//! Two-digit multiplexed 7-segment display on one 8-bit port.
//!
//! Bits 0..6 drive segments a..g of both digits, bit 7 drives the common
//! cathode of the tens digit and, through an inverter, the units digit. Only one
//! digit is lit at a time, so `mux()` has to run from a periodic interrupt at
//! 120 Hz or faster. Share the driver with the interrupt through a critical
//! section mutex.

use super::*;
use crate::font::seven_segment;
use crate::port::OutputPort;
use bit_field::BitField;
use hal::digital::v2::OutputPin;

/// Port bit selecting the tens digit
const SELECT_BIT: usize = 7;
/// Largest number two digits can show
pub const MAX_NUMBER: u8 = 99;

/// Two-digit multiplexed seven segment display on an 8-bit port
pub struct Ssd2<P> {
    port: OutputPort<P, 8>,
    /// Segment patterns, tens then units
    digits: [u8; 2],
}

impl<P, E> Ssd2<P>
where
    P: OutputPin<Error = E>,
{
    /// Take the eight port pins, bit 0 first, and blank the display
    pub fn new(pins: [P; 8]) -> Result<Self, Error<core::convert::Infallible, E>> {
        let mut ssd = Ssd2 {
            port: OutputPort::new(pins),
            digits: [0; 2],
        };
        ssd.port.write(0x00).map_err(Error::PinError)?;
        Ok(ssd)
    }

    /// Show `number` from the next `mux()` on
    pub fn print_number(&mut self, number: u8) -> PinRes<E> {
        if number > MAX_NUMBER {
            return Err(Error::InvalidArgument);
        }
        self.digits = [
            seven_segment::DIGITS[(number / 10) as usize],
            seven_segment::DIGITS[(number % 10) as usize],
        ];
        Ok(())
    }

    /// Turn every segment off
    pub fn clear(&mut self) {
        self.digits = [0; 2];
    }

    /// Return the segment patterns, tens then units
    pub fn digits(&self) -> [u8; 2] {
        self.digits
    }

    /// Light the other digit
    pub fn mux(&mut self) -> PinRes<E> {
        let next = if self.port.value().get_bit(SELECT_BIT) {
            self.digits[1]
        } else {
            let mut tens = self.digits[0];
            tens.set_bit(SELECT_BIT, true);
            tens
        };
        self.port.write(next).map_err(Error::PinError)
    }

    /// Destroy the driver and return the port pins
    pub fn release(self) -> [P; 8] {
        self.port.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{level_at, Bench, SimPin};
    use std::vec::Vec;

    fn port_value(bench: &Bench) -> u8 {
        let edges = bench.edges();
        let now = bench.now_us();
        (0..8u8).fold(0, |acc, line| acc | (level_at(&edges, line, now, false) as u8) << line)
    }

    fn ssd(bench: &Bench) -> Ssd2<SimPin> {
        Ssd2::new([0, 1, 2, 3, 4, 5, 6, 7].map(|i| bench.pin(i))).unwrap()
    }

    #[test]
    fn mux_alternates_tens_and_units() {
        let bench = Bench::new();
        let mut ssd = ssd(&bench);
        assert_eq!(port_value(&bench), 0x00);
        ssd.print_number(42).unwrap();

        let mut seen = Vec::new();
        for _ in 0..4 {
            ssd.mux().unwrap();
            seen.push(port_value(&bench));
        }
        assert_eq!(seen, vec![0x80 | 0x66, 0x5B, 0x80 | 0x66, 0x5B]);
    }

    #[test]
    fn three_digit_numbers_are_rejected() {
        let bench = Bench::new();
        let mut ssd = ssd(&bench);
        ssd.print_number(7).unwrap();
        assert_eq!(ssd.print_number(100), Err(Error::InvalidArgument));
        assert_eq!(ssd.digits(), [0x3F, 0x07]);
    }

    #[test]
    fn cleared_display_only_toggles_the_select_line() {
        let bench = Bench::new();
        let mut ssd = ssd(&bench);
        ssd.print_number(88).unwrap();
        ssd.clear();
        ssd.mux().unwrap();
        assert_eq!(port_value(&bench), 0x80);
        ssd.mux().unwrap();
        assert_eq!(port_value(&bench), 0x00);
    }
}
