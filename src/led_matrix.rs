//! Chain of 8x8 LED matrices driven by MAX7219s.
//!
//! The driver keeps one byte per column per matrix. Bit `r` of column `c` is the
//! LED in row `r`, and column `c` is shown by digit register `c`. Drawing only
//! changes that buffer unless the flush mode is `Immediate`.

use super::*;
use crate::max7219::{DecodeMode, Max7219, Mode, Register, MAX_INTENSITY};
use bit_field::BitField;
use hal::blocking::delay::DelayMs;
use hal::blocking::spi::Write;
use hal::digital::v2::OutputPin;

/// Columns per matrix
pub const COLUMNS: usize = 8;

/// `N` daisy-chained 8x8 matrices with a frame buffer
pub struct LedMatrix<SPI, CS, const N: usize> {
    /// Register level access to the chain
    max: Max7219<SPI, CS>,
    /// Column bytes for every matrix, matrix 0 is next to the controller
    buffer: [[u8; COLUMNS]; N],
    /// Whether draw calls reach the hardware on their own
    flush_mode: FlushMode,
}

impl<SPI, S, P, CS, const N: usize> LedMatrix<SPI, CS, N>
where
    SPI: Write<u8, Error = S>,
    CS: OutputPin<Error = P>,
{
    /// Take the bus and the load line, the buffer starts blank and buffered
    pub fn new(spi: SPI, cs: CS) -> Result<Self, Error<S, P>> {
        Ok(LedMatrix {
            max: Max7219::new(spi, cs, N)?,
            buffer: [[0; COLUMNS]; N],
            flush_mode: FlushMode::Buffered,
        })
    }

    /// Wake every chip: normal operation, all 8 digits scanned, lowest brightness, no decoding
    pub fn init<D: DelayMs<u8>>(&mut self, delay: &mut D) -> SpiRes<S, P> {
        delay.delay_ms(10);
        self.max.set_register_for_all(Register::DisplayTest, 0x00)?;
        self.max
            .set_register_for_all(Register::Shutdown, Mode::Normal as u8)?;
        self.max.set_register_for_all(Register::ScanLimit, 0x07)?;
        self.max.set_register_for_all(Register::Intensity, 0x00)?;
        self.max
            .set_register_for_all(Register::DecodeMode, DecodeMode::NoDecode as u8)?;
        self.flush_mode = FlushMode::Buffered;
        Ok(())
    }

    /// Return the current flush mode
    pub fn flush_mode(&self) -> FlushMode {
        self.flush_mode
    }

    /// Choose whether drawing reaches the matrices right away
    pub fn set_flush_mode(&mut self, mode: FlushMode) {
        self.flush_mode = mode;
    }

    /// Return the buffered columns of one matrix
    pub fn buffer(&self, device: usize) -> Option<&[u8; COLUMNS]> {
        self.buffer.get(device)
    }

    /// Turn one LED on or off
    pub fn draw_pixel(&mut self, device: usize, row: u8, col: u8, on: bool) -> SpiRes<S, P> {
        self.check_device(device)?;
        if row as usize >= 8 || col as usize >= COLUMNS {
            return Err(Error::InvalidArgument);
        }
        self.buffer[device][col as usize].set_bit(row as usize, on);
        self.touched(device, device)
    }

    /// Replace a whole column
    pub fn draw_col(&mut self, device: usize, col: u8, value: u8) -> SpiRes<S, P> {
        self.check_device(device)?;
        if col as usize >= COLUMNS {
            return Err(Error::InvalidArgument);
        }
        self.buffer[device][col as usize] = value;
        self.touched(device, device)
    }

    /// Copy consecutive columns starting at `start_col` of `device`. Columns past the
    /// last one of that matrix continue on the next matrix of the chain.
    pub fn draw_matrix(&mut self, device: usize, start_col: u8, columns: &[u8]) -> SpiRes<S, P> {
        self.check_device(device)?;
        if start_col as usize >= COLUMNS {
            return Err(Error::InvalidArgument);
        }
        let first = device * COLUMNS + start_col as usize;
        if first + columns.len() > N * COLUMNS {
            return Err(Error::TooMuchData);
        }
        if columns.is_empty() {
            return Ok(());
        }
        for (i, value) in columns.iter().enumerate() {
            let col = first + i;
            self.buffer[col / COLUMNS][col % COLUMNS] = *value;
        }
        self.touched(device, (first + columns.len() - 1) / COLUMNS)
    }

    /// Blank one matrix
    pub fn clear(&mut self, device: usize) -> SpiRes<S, P> {
        self.check_device(device)?;
        self.buffer[device] = [0; COLUMNS];
        self.touched(device, device)
    }

    /// Blank every matrix
    pub fn clear_all(&mut self) -> SpiRes<S, P> {
        self.buffer = [[0; COLUMNS]; N];
        if self.flush_mode.is_immediate() {
            self.flush_all()?;
        }
        Ok(())
    }

    /// Send the buffer of one matrix, leaving the others untouched
    pub fn flush(&mut self, device: usize) -> SpiRes<S, P> {
        self.check_device(device)?;
        for col in (0..COLUMNS).rev() {
            let register = digit_register(col);
            self.max
                .set_register(device, register, self.buffer[device][col])?;
        }
        Ok(())
    }

    /// Send the buffer of every matrix, one frame per column
    pub fn flush_all(&mut self) -> SpiRes<S, P> {
        for col in (0..COLUMNS).rev() {
            let mut values = [0u8; N];
            for (device, columns) in self.buffer.iter().enumerate() {
                values[device] = columns[col];
            }
            self.max.set_register_each(digit_register(col), &values)?;
        }
        Ok(())
    }

    /// Set the brightness of every matrix, 0 to 15
    pub fn set_intensity(&mut self, intensity: u8) -> SpiRes<S, P> {
        if intensity > MAX_INTENSITY {
            return Err(Error::InvalidArgument);
        }
        self.max.set_register_for_all(Register::Intensity, intensity)
    }

    /// Put one matrix into shutdown or normal operation
    pub fn set_mode(&mut self, device: usize, mode: Mode) -> SpiRes<S, P> {
        self.max.set_register(device, Register::Shutdown, mode as u8)
    }

    /// Put every matrix into shutdown
    pub fn shutdown_all(&mut self) -> SpiRes<S, P> {
        self.max
            .set_register_for_all(Register::Shutdown, Mode::Shutdown as u8)
    }

    /// Light every LED of every matrix regardless of the buffer
    pub fn set_display_test(&mut self, on: bool) -> SpiRes<S, P> {
        self.max
            .set_register_for_all(Register::DisplayTest, on as u8)
    }

    /// Borrow the register level driver
    pub fn max7219(&mut self) -> &mut Max7219<SPI, CS> {
        &mut self.max
    }

    /// Destroy the driver and return the bus and the load line
    pub fn release(self) -> (SPI, CS) {
        self.max.release()
    }

    fn check_device(&self, device: usize) -> SpiRes<S, P> {
        if device >= N {
            Err(Error::InvalidDevice)
        } else {
            Ok(())
        }
    }

    /// Flush matrices `first..=last` if the mode asks for it
    fn touched(&mut self, first: usize, last: usize) -> SpiRes<S, P> {
        if self.flush_mode.is_immediate() {
            for device in first..=last {
                self.flush(device)?;
            }
        }
        Ok(())
    }
}

fn digit_register(col: usize) -> Register {
    Register::digit(col as u8).unwrap_or(Register::NoOp)
}
