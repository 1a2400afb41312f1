//! HD44780 character LCD on a 4-bit or 8-bit parallel bus, write only.
//!
//! Without the RW line the busy flag cannot be read, so every write is preceded
//! by a fixed 1 ms wait.

use super::*;
use crate::port::OutputPort;
use hal::blocking::delay::{DelayMs, DelayUs};
use hal::digital::v2::OutputPin;

/// Instruction codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    ClearDisplay = 0x01,
    ReturnHome = 0x02,
    FunctionSet8Bit2Lines = 0x38,
    FunctionSet8Bit1Line = 0x30,
    FunctionSet4Bit2Lines = 0x28,
    FunctionSet4Bit1Line = 0x20,
    FunctionSet4Bit1Line5x10 = 0x24,
    DisplayOnCursorOn = 0x0E,
    DisplayOnCursorBlink = 0x0F,
    DisplayOnCursorOff = 0x0C,
    DisplayShiftLeft = 0x18,
    DisplayShiftRight = 0x1C,
    CursorShiftLeft = 0x10,
    CursorShiftRight = 0x14,
}

/// Set DDRAM address
const SET_DDRAM_ADDRESS: u8 = 0x80;
/// DDRAM offset of the second line
const LINE_OFFSET: u8 = 0x40;
/// Lines addressable by `set_cursor`
pub const MAX_LINES: u8 = 2;
/// Columns addressable by `set_cursor`
pub const MAX_COLUMNS: u8 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CursorStyle {
    Hidden,
    Underline,
    Blink,
}

/// Display geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LcdConfig {
    /// 1 or 2
    pub lines: u8,
}

impl Default for LcdConfig {
    fn default() -> Self {
        LcdConfig { lines: 2 }
    }
}

/// HD44780 with `N` data lines, 4 (D4..D7) or 8 (D0..D7)
pub struct Lcd<RS, EN, DB, D, const N: usize> {
    /// Register select, low for instructions
    rs: RS,
    /// Enable, data is taken on the falling edge
    en: EN,
    /// Data lines
    bus: OutputPort<DB, N>,
    delay: D,
    config: LcdConfig,
}

impl<RS, EN, DB, D, P> Lcd<RS, EN, DB, D, 4>
where
    RS: OutputPin<Error = P>,
    EN: OutputPin<Error = P>,
    DB: OutputPin<Error = P>,
    D: DelayUs<u16> + DelayMs<u16>,
{
    /// Take RS, EN and D4..D7. Call `init()` before anything else.
    pub fn new_4bit(rs: RS, en: EN, data: [DB; 4], delay: D, config: LcdConfig) -> Self {
        Lcd {
            rs,
            en,
            bus: OutputPort::new(data),
            delay,
            config,
        }
    }
}

impl<RS, EN, DB, D, P> Lcd<RS, EN, DB, D, 8>
where
    RS: OutputPin<Error = P>,
    EN: OutputPin<Error = P>,
    DB: OutputPin<Error = P>,
    D: DelayUs<u16> + DelayMs<u16>,
{
    /// Take RS, EN and D0..D7. Call `init()` before anything else.
    pub fn new_8bit(rs: RS, en: EN, data: [DB; 8], delay: D, config: LcdConfig) -> Self {
        Lcd {
            rs,
            en,
            bus: OutputPort::new(data),
            delay,
            config,
        }
    }
}

impl<RS, EN, DB, D, P, const N: usize> Lcd<RS, EN, DB, D, N>
where
    RS: OutputPin<Error = P>,
    EN: OutputPin<Error = P>,
    DB: OutputPin<Error = P>,
    D: DelayUs<u16> + DelayMs<u16>,
{
    /// Reset the controller into the bus width, then display on, cursor off, cleared
    pub fn init(&mut self) -> PinRes<P> {
        self.en.set_low().map_err(Error::PinError)?;
        self.rs.set_low().map_err(Error::PinError)?;
        self.delay.delay_ms(30);
        let two_lines = self.config.lines > 1;
        let function_set = if N == 4 {
            // 4-bit reset by instruction: 0x3, 0x3, 0x3, then 0x2
            for (nibble, wait_us) in [(0x3, 100_000u32), (0x3, 200), (0x3, 200), (0x2, 200)] {
                self.put(nibble)?;
                self.strobe()?;
                self.wait_us(wait_us);
            }
            if two_lines {
                Command::FunctionSet4Bit2Lines
            } else {
                Command::FunctionSet4Bit1Line
            }
        } else if two_lines {
            Command::FunctionSet8Bit2Lines
        } else {
            Command::FunctionSet8Bit1Line
        };
        self.command(function_set)?;
        self.delay.delay_us(50);
        self.command(Command::DisplayOnCursorOff)?;
        self.delay.delay_us(50);
        self.clear()?;
        self.return_home()
    }

    /// Send an instruction
    pub fn command(&mut self, cmd: Command) -> PinRes<P> {
        self.write(cmd as u8, false)
    }

    /// Write a character at the cursor
    pub fn print_char(&mut self, ch: u8) -> PinRes<P> {
        self.write(ch, true)
    }

    /// Print every byte of `s` from the cursor on
    pub fn print_str(&mut self, s: &str) -> PinRes<P> {
        for ch in s.bytes() {
            self.print_char(ch)?;
        }
        Ok(())
    }

    /// Blank the display and put the cursor home
    pub fn clear(&mut self) -> PinRes<P> {
        self.command(Command::ClearDisplay)?;
        self.delay.delay_ms(2);
        Ok(())
    }

    /// Cursor home, undoing any display shift
    pub fn return_home(&mut self) -> PinRes<P> {
        self.command(Command::ReturnHome)?;
        self.delay.delay_ms(2);
        Ok(())
    }

    /// Move the cursor, line 0..2, column 0..40
    pub fn set_cursor(&mut self, line: u8, column: u8) -> PinRes<P> {
        if line >= MAX_LINES || column >= MAX_COLUMNS {
            return Err(Error::InvalidArgument);
        }
        self.write(SET_DDRAM_ADDRESS | (line * LINE_OFFSET + column), false)
    }

    /// Shift the whole display one position
    pub fn shift_display(&mut self, direction: Direction) -> PinRes<P> {
        self.command(match direction {
            Direction::Left => Command::DisplayShiftLeft,
            Direction::Right => Command::DisplayShiftRight,
        })
    }

    /// Move the cursor one position
    pub fn shift_cursor(&mut self, direction: Direction) -> PinRes<P> {
        self.command(match direction {
            Direction::Left => Command::CursorShiftLeft,
            Direction::Right => Command::CursorShiftRight,
        })
    }

    /// Show or hide the cursor and its blinking block
    pub fn set_cursor_style(&mut self, style: CursorStyle) -> PinRes<P> {
        self.command(match style {
            CursorStyle::Hidden => Command::DisplayOnCursorOff,
            CursorStyle::Underline => Command::DisplayOnCursorOn,
            CursorStyle::Blink => Command::DisplayOnCursorBlink,
        })
    }

    /// Destroy the driver and return RS, EN, the data lines and the delay provider
    pub fn release(self) -> (RS, EN, [DB; N], D) {
        (self.rs, self.en, self.bus.release(), self.delay)
    }

    fn write(&mut self, value: u8, data: bool) -> PinRes<P> {
        self.delay.delay_ms(1);
        if data {
            self.rs.set_high().map_err(Error::PinError)?;
        } else {
            self.rs.set_low().map_err(Error::PinError)?;
        }
        if N == 4 {
            self.put(value >> 4)?;
            self.strobe()?;
            self.put(value & 0x0F)?;
        } else {
            self.put(value)?;
        }
        self.strobe()
    }

    fn put(&mut self, value: u8) -> PinRes<P> {
        self.bus.write(value).map_err(Error::PinError)
    }

    fn strobe(&mut self) -> PinRes<P> {
        self.en.set_high().map_err(Error::PinError)?;
        self.delay.delay_us(10);
        self.en.set_low().map_err(Error::PinError)
    }

    fn wait_us(&mut self, us: u32) {
        if us >= 1000 {
            self.delay.delay_ms((us / 1000) as u16);
        } else {
            self.delay.delay_us(us as u16);
        }
    }
}
