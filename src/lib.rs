/*!
This is a platform agnostic Rust driver collection for the small peripherals that
usually hang off an 8-bit microcontroller, based on the
[`embedded-hal`](https://github.com/rust-embedded/embedded-hal) traits.

Every driver is an owned instance: it takes its pins, bus and delay provider by
value, keeps its own buffers and hands them back through `release()`. Nothing is
global, so two displays of the same kind can be driven side by side.

This crate allows you to:

- Clock bits out of two GPIO lines with a configurable hold time. See: `bitbang::BitClock`.
- Talk SPI (modes 0,0 and 1,0) without an SPI peripheral. See: `SoftSpi`.
- Load and latch a 74HC595 shift register, MSB or LSB first. See: `ShiftRegister595`.
- Address one MAX7219/MAX7221 in a daisy chain without disturbing the others. See: `Max7219`.
- Draw on a chain of 8x8 LED matrices with buffered or immediate flushing. See: `LedMatrix`.
- Print text and numbers on HCMS-29xx alphanumeric displays. See: `Hcms29xx`.
- Read and set the DS1302 real-time clock and its battery-backed RAM. See: `Ds1302`.
- Drive HD44780 character LCDs over a 4-bit or 8-bit bus. See: `Lcd`.
- Set the outputs of the MCP4922 dual 12-bit DAC. See: `Mcp4922`.
- Multiplex a two-digit seven segment display. See: `Ssd2`.
- Send and receive 8N1 serial data on plain GPIO. See: `SoftUart`.
- Drive the PIC16F887 data EEPROM, ADC, MSSP and timers, and the PIC12F683 ADC,
  through a register abstraction. See: `peripheral`.
- Format integers and floats into byte buffers, convert BCD. See: `util`.

# Supported devices

| Device | Interface | Module |
|-------:|:----------|:-------|
| 74HC595 | data / clock / latch | `shift_register` |
| MAX7219 / MAX7221 | SPI, daisy chained | `max7219`, `led_matrix` |
| HCMS-29xx | data / clock / RS / CE | `hcms29xx` |
| DS1302 | 3-wire, LSB first | `ds1302` |
| HD44780 | 4-bit or 8-bit parallel | `lcd` |
| MCP4922 | SPI | `mcp4922` |
| 2-digit 7-segment | 8-bit port | `ssd2` |
| PIC16F887 EEPROM / ADC / MSSP / TMR0-2 | special function registers | `peripheral` |
| PIC12F683 ADC | special function registers | `peripheral::adc12f683` |

# Usage

Include the library as a dependency in your Cargo.toml

```toml
[dependencies]
picperiph = "0.1"
```

Some example usage:

```rust,ignore
use picperiph::*;

// 1. Bit-bang SPI on any three GPIO lines (MISO unused here)
let spi = SoftSpi::new(sck, mosi, NoMiso::new(), delay, SoftSpiConfig::default()).unwrap();

// 2. Two MAX7219 matrices in a chain, chip 0 is the one next to the MCU
let mut matrix: LedMatrix<_, _, 2> = LedMatrix::new(spi, cs).unwrap();
matrix.init(&mut timer).unwrap();

// 3. Draw into the buffer, then push the whole frame
matrix.draw_col(1, 0, 0b1010_1010).unwrap();
matrix.draw_pixel(0, 3, 4, true).unwrap();
matrix.flush_all().unwrap();

// 4. Or let every draw call refresh the matrix it touched
matrix.set_flush_mode(FlushMode::Immediate);
matrix.clear(1).unwrap();
```
*/
#![deny(unsafe_code)]
#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

extern crate bit_field;
extern crate embedded_hal as hal;

pub mod bitbang;
pub mod ds1302;
pub mod font;
pub mod hcms29xx;
pub mod lcd;
pub mod led_matrix;
pub mod max7219;
pub mod mcp4922;
pub mod peripheral;
pub mod port;
pub mod shift_register;
pub mod soft_spi;
pub mod soft_uart;
pub mod ssd2;
pub mod util;

#[cfg(test)]
mod sim;

pub use bitbang::{BitClock, BitOrder};
pub use ds1302::{DateTime, Ds1302, Weekday};
pub use hcms29xx::{Hcms29xx, Hcms29xxConfig};
pub use lcd::{Lcd, LcdConfig};
pub use led_matrix::LedMatrix;
pub use max7219::{Max7219, Register};
pub use mcp4922::Mcp4922;
pub use port::OutputPort;
pub use shift_register::{ShiftRegister595, ShiftRegisterConfig};
pub use soft_spi::{NoMiso, SoftSpi, SoftSpiConfig, SoftSpiMode};
pub use soft_uart::{SoftUart, SoftUartConfig};
pub use ssd2::Ssd2;

/// All possible errors in this crate
#[derive(Debug, PartialEq)]
pub enum Error<S, P> {
    /// SPI bus error
    SpiError(S),
    /// Pin error
    PinError(P),
    /// Device index is not part of the chain
    InvalidDevice,
    /// Argument is outside the range the device accepts
    InvalidArgument,
    /// Memory or register address is out of range
    InvalidAddress,
    /// Too much data passed for a buffer or a burst transfer
    TooMuchData,
    /// Device returned a value outside its documented range
    InvalidData,
    /// Device did not answer within the configured poll budget
    Timeout,
    /// Stop bit was not seen where expected
    FramingError,
}

#[cfg(feature = "defmt")]
impl<S, P> defmt::Format for Error<S, P> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::SpiError(_) => defmt::write!(f, "SpiError"),
            Error::PinError(_) => defmt::write!(f, "PinError"),
            Error::InvalidDevice => defmt::write!(f, "InvalidDevice"),
            Error::InvalidArgument => defmt::write!(f, "InvalidArgument"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
            Error::TooMuchData => defmt::write!(f, "TooMuchData"),
            Error::InvalidData => defmt::write!(f, "InvalidData"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::FramingError => defmt::write!(f, "FramingError"),
        }
    }
}

/// When buffered drawing reaches the hardware
///
/// In `Buffered` mode draw and clear calls only touch the in-memory copy and the
/// device keeps showing the old content until an explicit flush. In `Immediate`
/// mode every draw or clear call flushes the device it touched right after the
/// buffer is updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlushMode {
    /// Mutate the buffer only
    #[default]
    Buffered,
    /// Mutate the buffer and flush the affected device
    Immediate,
}

impl FlushMode {
    /// Return true if mutations are pushed to the device right away
    pub fn is_immediate(self) -> bool {
        self == FlushMode::Immediate
    }
}

type PinRes<P> = Result<(), Error<core::convert::Infallible, P>>;
type SpiRes<S, P> = Result<(), Error<S, P>>;
