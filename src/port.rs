//! Several output pins written as one value.

use bit_field::BitField;
use hal::digital::v2::OutputPin;

/// `N` output pins, bit `i` of a written value lands on `pins[i]`
pub struct OutputPort<P, const N: usize> {
    pins: [P; N],
    /// Last value written
    value: u8,
}

impl<P, E, const N: usize> OutputPort<P, N>
where
    P: OutputPin<Error = E>,
{
    /// Group the pins, nothing is driven yet
    pub fn new(pins: [P; N]) -> Self {
        OutputPort { pins, value: 0 }
    }

    /// Drive every pin from the low `N` bits of `value`
    pub fn write(&mut self, value: u8) -> Result<(), E> {
        for (i, pin) in self.pins.iter_mut().enumerate().take(8) {
            if value.get_bit(i) {
                pin.set_high()?;
            } else {
                pin.set_low()?;
            }
        }
        self.value = value;
        Ok(())
    }

    /// Return the last value written
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Destroy the port and return its pins
    pub fn release(self) -> [P; N] {
        self.pins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::pin::{Mock as PinMock, State, Transaction as PinTransaction};

    #[test]
    fn bit_zero_drives_the_first_pin() {
        let pins = [
            PinMock::new(&[PinTransaction::set(State::High)]),
            PinMock::new(&[PinTransaction::set(State::Low)]),
            PinMock::new(&[PinTransaction::set(State::Low)]),
            PinMock::new(&[PinTransaction::set(State::High)]),
        ];
        let mut port = OutputPort::new(pins);
        port.write(0b1001).unwrap();
        assert_eq!(port.value(), 0b1001);
        for mut pin in port.release() {
            pin.done();
        }
    }
}
