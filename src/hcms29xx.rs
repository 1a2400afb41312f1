//! HCMS-29xx serial LED alphanumeric displays.
//!
//! Each chip drives four 5x7 characters. The chips of a display are chained and
//! share Din, CLK, RS and CE. With RS low the bits shifted in while CE is low go
//! to the dot registers (five column bytes per character); with RS high the
//! first eight bits go to a control register.
//!
//! The driver keeps a text buffer with a cursor. The part of the buffer shown
//! is a window of `display_len` characters that `scroll` moves around.

use super::*;
use crate::bitbang::{BitClock, BitOrder};
use crate::font;
use crate::util::numfmt;
use hal::blocking::delay::DelayUs;
use hal::digital::v2::OutputPin;

/// Control word 0 select (bit 7 clear)
pub const CONTROL_WORD0: u8 = 0x00;
/// PWM brightness field of control word 0
pub const CW0_BRIGHTNESS_MASK: u8 = 0x0F;
/// Peak pixel current field of control word 0, 0x30 is the full 12.8 mA
pub const CW0_PEAK_CURRENT_MASK: u8 = 0x30;
/// Normal operation, cleared for sleep mode
pub const CW0_SLEEP_OFF: u8 = 0x40;
/// Control word 1 select (bit 7 set)
pub const CONTROL_WORD1: u8 = 0x80;
/// Data out follows data in, every chip loads the same control word
pub const CW1_SIMULTANEOUS: u8 = 0x01;
/// Data out is the last bit of the shift register
pub const CW1_SERIAL: u8 = 0x00;
/// Internal oscillator divided by 8
pub const CW1_PRESCALER_DIV8: u8 = 0x02;

/// Characters driven by one chip
pub const CHARS_PER_CHIP: u8 = 4;
/// Longest supported display
pub const MAX_DISPLAY_LEN: u8 = 32;

/// Display geometry and timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hcms29xxConfig {
    /// Characters on the display, a multiple of four
    pub display_len: u8,
    /// Wait around each clock edge in microseconds
    pub clock_delay_us: u16,
}

impl Default for Hcms29xxConfig {
    fn default() -> Self {
        Hcms29xxConfig {
            display_len: 8,
            clock_delay_us: 0,
        }
    }
}

/// HCMS-29xx display with a text buffer of `LEN` characters, at least `display_len`
pub struct Hcms29xx<DIN, CLK, RS, CE, D, const LEN: usize> {
    /// Din as data, CLK as clock, idle low
    clock: BitClock<DIN, CLK, D>,
    /// Register select, high for control registers
    rs: RS,
    /// Chip enable, active low
    ce: CE,
    /// Characters on the glass
    display_len: u8,
    /// Text shown through the window
    buffer: [u8; LEN],
    /// Next buffer position written by the print calls
    cursor: usize,
    /// Window offset, display position `p` shows buffer position `p - shift`
    shift: i8,
    /// Last control word 0 sent
    control: u8,
    flush_mode: FlushMode,
}

impl<DIN, CLK, RS, CE, D, P, const LEN: usize> Hcms29xx<DIN, CLK, RS, CE, D, LEN>
where
    DIN: OutputPin<Error = P>,
    CLK: OutputPin<Error = P>,
    RS: OutputPin<Error = P>,
    CE: OutputPin<Error = P>,
    D: DelayUs<u16>,
{
    /// Take the lines, leaving CE released and the clock low
    pub fn new(
        din: DIN,
        clk: CLK,
        rs: RS,
        ce: CE,
        delay: D,
        config: Hcms29xxConfig,
    ) -> Result<Self, Error<core::convert::Infallible, P>> {
        if config.display_len == 0
            || config.display_len > MAX_DISPLAY_LEN
            || config.display_len % CHARS_PER_CHIP != 0
            || LEN < config.display_len as usize
        {
            return Err(Error::InvalidArgument);
        }
        let mut display = Hcms29xx {
            clock: BitClock::new(din, clk, delay, false, config.clock_delay_us),
            rs,
            ce,
            display_len: config.display_len,
            buffer: [b' '; LEN],
            cursor: 0,
            shift: 0,
            control: CONTROL_WORD0 | CW0_PEAK_CURRENT_MASK | CW0_SLEEP_OFF | CW0_BRIGHTNESS_MASK,
            flush_mode: FlushMode::Buffered,
        };
        display.ce.set_high().map_err(Error::PinError)?;
        display.clock.idle().map_err(Error::PinError)?;
        Ok(display)
    }

    /// Hold the reset line low for 10 ms
    pub fn reset<RST: OutputPin<Error = P>>(&mut self, rst: &mut RST) -> PinRes<P> {
        rst.set_low().map_err(Error::PinError)?;
        self.clock.delay().delay_us(10_000);
        rst.set_high().map_err(Error::PinError)
    }

    /// Pulse the reset line, then `init`
    pub fn init_with_reset<RST: OutputPin<Error = P>>(&mut self, rst: &mut RST) -> PinRes<P> {
        self.reset(rst)?;
        self.init()
    }

    /// Blank the glass and wake every chip at full brightness
    pub fn init(&mut self) -> PinRes<P> {
        self.cursor = 0;
        self.shift = 0;
        self.buffer = [b' '; LEN];
        self.load_dot_register()?;
        self.control = CONTROL_WORD0 | CW0_PEAK_CURRENT_MASK | CW0_SLEEP_OFF | CW0_BRIGHTNESS_MASK;
        self.load_all_control_registers(self.control)
    }

    /// Return the current flush mode
    pub fn flush_mode(&self) -> FlushMode {
        self.flush_mode
    }

    /// Choose whether buffer changes reach the glass right away
    pub fn set_flush_mode(&mut self, mode: FlushMode) {
        self.flush_mode = mode;
    }

    /// Load the control register of the first chip in the chain
    pub fn load_control_register(&mut self, word: u8) -> PinRes<P> {
        self.rs.set_high().map_err(Error::PinError)?;
        self.clock.idle().map_err(Error::PinError)?;
        self.ce.set_low().map_err(Error::PinError)?;
        self.clock
            .write_byte(word, BitOrder::MsbFirst)
            .map_err(Error::PinError)?;
        self.ce.set_high().map_err(Error::PinError)
    }

    /// Load the same control word into every chip
    pub fn load_all_control_registers(&mut self, word: u8) -> PinRes<P> {
        for _ in 0..self.display_len / CHARS_PER_CHIP {
            self.load_control_register(CONTROL_WORD1 | CW1_SIMULTANEOUS)?;
        }
        self.load_control_register(word)?;
        self.load_control_register(CONTROL_WORD1 | CW1_SERIAL)
    }

    /// Stream one raw glyph into the dot registers. CE stays low until `latch()`.
    pub fn put_user_char(&mut self, map: &[u8; 5]) -> PinRes<P> {
        self.rs.set_low().map_err(Error::PinError)?;
        self.clock.idle().map_err(Error::PinError)?;
        self.ce.set_low().map_err(Error::PinError)?;
        for column in map {
            self.clock
                .write_byte(*column, BitOrder::MsbFirst)
                .map_err(Error::PinError)?;
        }
        Ok(())
    }

    /// Release CE, copying the streamed dots to the LEDs
    pub fn latch(&mut self) -> PinRes<P> {
        self.ce.set_high().map_err(Error::PinError)
    }

    /// Send the visible window of the buffer to the dot registers
    pub fn load_dot_register(&mut self) -> PinRes<P> {
        for pos in 0..self.display_len as isize {
            let index = pos - self.shift as isize;
            let map = if index >= 0 && (index as usize) < LEN {
                font::glyph(self.buffer[index as usize])
            } else {
                &font::BLANK
            };
            self.put_user_char(map)?;
        }
        self.latch()
    }

    /// Show the buffer
    pub fn flush(&mut self) -> PinRes<P> {
        self.load_dot_register()
    }

    /// Fill the buffer with spaces, the cursor stays where it is
    pub fn clear(&mut self) -> PinRes<P> {
        self.buffer = [b' '; LEN];
        self.touched()
    }

    /// Move the cursor
    pub fn set_cursor(&mut self, position: usize) -> PinRes<P> {
        if position >= LEN {
            return Err(Error::InvalidArgument);
        }
        self.cursor = position;
        Ok(())
    }

    /// Return the cursor position
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor to the start of the buffer
    pub fn home(&mut self) {
        self.cursor = 0;
    }

    /// Move the window by `direction` characters, positive values push the text right
    pub fn scroll(&mut self, direction: i8) -> PinRes<P> {
        self.shift = self.shift.saturating_add(direction);
        self.touched()
    }

    /// Return the window offset
    pub fn scroll_offset(&self) -> i8 {
        self.shift
    }

    /// Return the text buffer
    pub fn text(&self) -> &[u8; LEN] {
        &self.buffer
    }

    /// Put a character at the cursor and advance it
    pub fn print_char(&mut self, ch: u8) -> PinRes<P> {
        self.put_bytes(&[ch])
    }

    /// Put a string at the cursor and advance past it. Nothing is written if it does not fit.
    pub fn print_str(&mut self, s: &str) -> PinRes<P> {
        self.put_bytes(s.as_bytes())
    }

    /// Print an unsigned number in `base` (2 to 16)
    pub fn print_u16(&mut self, x: u16, base: u8) -> PinRes<P> {
        let mut buf = [0u8; 16];
        let len = numfmt::format_u16(x, base, &mut buf).map_err(|_| Error::InvalidArgument)?;
        self.put_bytes(&buf[..len])
    }

    /// Print a signed number in `base` (2 to 16)
    pub fn print_i16(&mut self, x: i16, base: u8) -> PinRes<P> {
        let mut buf = [0u8; 17];
        let len = numfmt::format_i16(x, base, &mut buf).map_err(|_| Error::InvalidArgument)?;
        self.put_bytes(&buf[..len])
    }

    /// Print a float rounded to `after_point` decimals
    pub fn print_f32(&mut self, x: f32, after_point: u8) -> PinRes<P> {
        let mut buf = [0u8; 24];
        let len =
            numfmt::format_f32(x, after_point, &mut buf).map_err(|_| Error::InvalidArgument)?;
        self.put_bytes(&buf[..len])
    }

    /// Set the PWM brightness of every chip, 0 to 15
    pub fn set_brightness(&mut self, brightness: u8) -> PinRes<P> {
        if brightness > CW0_BRIGHTNESS_MASK {
            return Err(Error::InvalidArgument);
        }
        let word = (self.control & !CW0_BRIGHTNESS_MASK) | brightness;
        self.set_control(word)
    }

    /// Put every chip to sleep or wake it, the brightness is kept
    pub fn sleep(&mut self, sleep: bool) -> PinRes<P> {
        let word = if sleep {
            self.control & !CW0_SLEEP_OFF
        } else {
            self.control | CW0_SLEEP_OFF
        };
        self.set_control(word)
    }

    /// Destroy the driver and return the lines and the delay provider
    pub fn release(self) -> (DIN, CLK, RS, CE, D) {
        let (din, clk, delay) = self.clock.release();
        (din, clk, self.rs, self.ce, delay)
    }

    fn set_control(&mut self, word: u8) -> PinRes<P> {
        self.load_all_control_registers(word)?;
        self.control = word;
        Ok(())
    }

    fn put_bytes(&mut self, bytes: &[u8]) -> PinRes<P> {
        let end = self.cursor + bytes.len();
        if end > LEN {
            return Err(Error::TooMuchData);
        }
        self.buffer[self.cursor..end].copy_from_slice(bytes);
        self.cursor = end;
        self.touched()
    }

    fn touched(&mut self) -> PinRes<P> {
        if self.flush_mode.is_immediate() {
            self.load_dot_register()?;
        }
        Ok(())
    }
}
