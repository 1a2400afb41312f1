//! MAX7219 / MAX7221 register access over a daisy chain.
//!
//! Every chip in the chain has a 16-bit shift register and passes the bits it
//! shifts out on to the next chip. A frame with one 16-bit word per chip is sent
//! with CS held low, and every chip loads the word sitting in its shift register
//! on the CS rising edge. Chips that must keep their state get a no-op word.
//!
//! Chip 0 is the one wired to the controller, so its word goes last.

use super::*;
use hal::blocking::spi::Write;
use hal::digital::v2::OutputPin;

/// Register addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    /// Ignored by the chip, pads the frame for the others
    NoOp = 0x00,
    Digit0 = 0x01,
    Digit1 = 0x02,
    Digit2 = 0x03,
    Digit3 = 0x04,
    Digit4 = 0x05,
    Digit5 = 0x06,
    Digit6 = 0x07,
    Digit7 = 0x08,
    /// Code B decoding per digit, see `DecodeMode`
    DecodeMode = 0x09,
    /// Brightness, 0 to 15
    Intensity = 0x0A,
    /// Highest digit scanned, 0 to 7
    ScanLimit = 0x0B,
    /// See `Mode`
    Shutdown = 0x0C,
    /// 1 lights every segment
    DisplayTest = 0x0F,
}

impl Register {
    /// Digit (column) register for index 0..=7
    pub fn digit(index: u8) -> Option<Register> {
        const DIGITS: [Register; 8] = [
            Register::Digit0,
            Register::Digit1,
            Register::Digit2,
            Register::Digit3,
            Register::Digit4,
            Register::Digit5,
            Register::Digit6,
            Register::Digit7,
        ];
        DIGITS.get(index as usize).copied()
    }

    /// Address byte sent ahead of the value
    pub fn addr(self) -> u8 {
        self as u8
    }
}

/// Value of the shutdown register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    Shutdown = 0x00,
    Normal = 0x01,
}

/// Value of the decode-mode register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DecodeMode {
    /// Raw segment data on every digit
    NoDecode = 0x00,
    /// Code B font on digit 0
    CodeBDigit0 = 0x01,
    /// Code B font on digits 0 to 3
    CodeBDigits0To3 = 0x0F,
    /// Code B font on every digit
    CodeBAll = 0xFF,
}

/// Maximum brightness accepted by the intensity register
pub const MAX_INTENSITY: u8 = 0x0F;

/// Chain of MAX7219/MAX7221 drivers sharing one CS line
pub struct Max7219<SPI, CS> {
    /// SPI bus, MSB first, CPOL = 0
    spi: SPI,
    /// Load line, active low
    cs: CS,
    /// Number of chips in the chain
    devices: usize,
}

impl<SPI, S, P, CS> Max7219<SPI, CS>
where
    SPI: Write<u8, Error = S>,
    CS: OutputPin<Error = P>,
{
    /// Take the bus and the load line for a chain of `devices` chips
    pub fn new(spi: SPI, cs: CS, devices: usize) -> Result<Self, Error<S, P>> {
        if devices == 0 {
            return Err(Error::InvalidArgument);
        }
        let mut max = Max7219 { spi, cs, devices };
        max.cs.set_high().map_err(Error::PinError)?;
        Ok(max)
    }

    /// Return the number of chips in the chain
    pub fn devices(&self) -> usize {
        self.devices
    }

    /// Write `value` to `register` of one chip, every other chip receives a no-op
    pub fn set_register(&mut self, device: usize, register: Register, value: u8) -> SpiRes<S, P> {
        if device >= self.devices {
            return Err(Error::InvalidDevice);
        }
        self.frame(|pos| {
            if pos == device {
                [register.addr(), value]
            } else {
                [Register::NoOp.addr(), 0x00]
            }
        })
    }

    /// Write the same value to the same register of every chip in one frame
    pub fn set_register_for_all(&mut self, register: Register, value: u8) -> SpiRes<S, P> {
        self.frame(|_| [register.addr(), value])
    }

    /// Write one value per chip to the same register in one frame, `values[0]` goes to chip 0
    pub fn set_register_each(&mut self, register: Register, values: &[u8]) -> SpiRes<S, P> {
        if values.len() != self.devices {
            return Err(Error::InvalidArgument);
        }
        self.frame(|pos| [register.addr(), values[pos]])
    }

    /// Send one word per chip, farthest chip first, inside a single CS window
    fn frame<F: Fn(usize) -> [u8; 2]>(&mut self, word: F) -> SpiRes<S, P> {
        self.cs.set_low().map_err(Error::PinError)?;
        for pos in (0..self.devices).rev() {
            self.spi.write(&word(pos)).map_err(Error::SpiError)?;
        }
        self.cs.set_high().map_err(Error::PinError)?;
        Ok(())
    }

    /// Destroy the driver and return the bus and the load line
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{max7219_chain, Bench};
    use crate::soft_spi::{NoMiso, SoftSpi, SoftSpiConfig};
    use core::convert::Infallible;
    use embedded_hal_mock::pin::{Mock as PinMock, State, Transaction as PinTransaction};
    use embedded_hal_mock::spi::{Mock as SpiMock, Transaction as SpiTransaction};
    use proptest::prelude::*;

    const DIN: u8 = 0;
    const CLK: u8 = 1;
    const CS: u8 = 2;

    #[test]
    fn no_op_words_surround_the_addressed_chip() {
        let spi = SpiMock::new(&[
            SpiTransaction::write(vec![0x00, 0x00]),
            SpiTransaction::write(vec![0x0A, 0x07]),
            SpiTransaction::write(vec![0x00, 0x00]),
        ]);
        let cs = PinMock::new(&[
            PinTransaction::set(State::High),
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ]);
        let mut max = Max7219::new(spi, cs, 3).unwrap();
        max.set_register(1, Register::Intensity, 0x07).unwrap();
        let (mut spi, mut cs) = max.release();
        spi.done();
        cs.done();
    }

    #[test]
    fn out_of_range_device_touches_nothing() {
        let spi = SpiMock::new(&[]);
        let cs = PinMock::new(&[PinTransaction::set(State::High)]);
        let mut max = Max7219::new(spi, cs, 2).unwrap();
        assert!(matches!(
            max.set_register(2, Register::Digit0, 0xFF),
            Err(Error::InvalidDevice)
        ));
        let (mut spi, mut cs) = max.release();
        spi.done();
        cs.done();
    }

    #[test]
    fn empty_chain_is_rejected() {
        let spi = SpiMock::new(&[]);
        let cs = PinMock::new(&[]);
        assert!(matches!(Max7219::new(spi, cs, 0), Err(Error::InvalidArgument)));
    }

    #[test]
    fn register_each_maps_values_to_chips() {
        let bench = Bench::new();
        let spi = SoftSpi::new(
            bench.pin(CLK),
            bench.pin(DIN),
            NoMiso::<Infallible>::new(),
            bench.delay(),
            SoftSpiConfig::default(),
        )
        .unwrap();
        let mut max = Max7219::new(spi, bench.pin(CS), 3).unwrap();
        max.set_register_each(Register::Digit4, &[0x11, 0x22, 0x33]).unwrap();

        let chain = max7219_chain(&bench.edges(), 3, DIN, CLK, CS);
        assert_eq!(chain.registers[0][5], 0x11);
        assert_eq!(chain.registers[1][5], 0x22);
        assert_eq!(chain.registers[2][5], 0x33);

        bench.clear();
        assert_eq!(
            max.set_register_each(Register::Digit4, &[0x11]),
            Err(Error::InvalidArgument)
        );
        assert_eq!(
            max.set_register_each(Register::Digit4, &[0x11; 4]),
            Err(Error::InvalidArgument)
        );
        assert!(bench.edges().is_empty());
    }

    proptest! {
        #[test]
        fn only_the_addressed_chip_loads(
            devices in 1usize..=8,
            pick in any::<prop::sample::Index>(),
            digit in 0u8..8,
            value in any::<u8>(),
        ) {
            let device = pick.index(devices);
            let bench = Bench::new();
            let spi = SoftSpi::new(
                bench.pin(CLK),
                bench.pin(DIN),
                NoMiso::<Infallible>::new(),
                bench.delay(),
                SoftSpiConfig::default(),
            )
            .unwrap();
            let mut max = Max7219::new(spi, bench.pin(CS), devices).unwrap();
            let register = Register::digit(digit).unwrap();
            max.set_register(device, register, value).unwrap();

            let chain = max7219_chain(&bench.edges(), devices, DIN, CLK, CS);
            let last = chain.loads.last().cloned().unwrap_or_default();
            prop_assert_eq!(last, vec![(device, register.addr(), value)]);
        }
    }
}
