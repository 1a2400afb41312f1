//! DS1302 trickle-charge timekeeping chip.
//!
//! The DS1302 talks a 3-wire protocol: CE high, a command byte, then data, all
//! least significant bit first. On an MSB-first SPI bus every byte is therefore
//! bit-reversed before sending and after receiving. The I/O line must be wired
//! to both MOSI and MISO (MOSI through a resistor) so the chip can drive it
//! during reads.
//!
//! Clock registers hold BCD values.

use super::*;
use crate::util::bcd::{bcd_to_dec, dec_to_bcd};
use bit_field::BitField;
use core::ops::RangeInclusive;
use hal::blocking::delay::DelayUs;
use hal::blocking::spi::{Transfer, Write};
use hal::digital::v2::OutputPin;

/// Register addresses, write form (bit 0 clear)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Address {
    Seconds = 0x80,
    Minutes = 0x82,
    Hours = 0x84,
    Date = 0x86,
    Month = 0x88,
    Weekday = 0x8A,
    Year = 0x8C,
    Control = 0x8E,
    TrickleCharger = 0x90,
    ClockBurst = 0xBE,
    RamBurst = 0xFE,
}

/// Read flag of the command byte
const READ: u8 = 0x01;
/// First RAM byte
const RAM_START: u8 = 0xC0;
/// Battery-backed RAM bytes
pub const RAM_SIZE: usize = 31;

/// Clock halt flag in the seconds register
const CH_BIT: usize = 7;
/// Write protect flag in the control register
const WP_BIT: usize = 7;
/// 12-hour mode flag in the hours register
const HOUR_12_BIT: usize = 7;
/// PM flag in the hours register when in 12-hour mode
const PM_BIT: usize = 5;

/// CE setup time before the first clock
const CE_SETUP_US: u16 = 4;

/// Day of the week, 1 to 7 on the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Weekday {
    Sunday = 1,
    Monday = 2,
    Tuesday = 3,
    Wednesday = 4,
    Thursday = 5,
    Friday = 6,
    Saturday = 7,
}

impl Weekday {
    /// Chip value 1 to 7, `None` for anything else
    pub fn from_u8(day: u8) -> Option<Weekday> {
        match day {
            1 => Some(Weekday::Sunday),
            2 => Some(Weekday::Monday),
            3 => Some(Weekday::Tuesday),
            4 => Some(Weekday::Wednesday),
            5 => Some(Weekday::Thursday),
            6 => Some(Weekday::Friday),
            7 => Some(Weekday::Saturday),
            _ => None,
        }
    }
}

/// Calendar time as kept by the chip, hours in 24-hour form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    /// 0 to 59
    pub seconds: u8,
    /// 0 to 59
    pub minutes: u8,
    /// 0 to 23
    pub hours: u8,
    /// Day of the month, 1 to 31
    pub date: u8,
    /// 1 to 12
    pub month: u8,
    pub weekday: Weekday,
    /// 2000 to 2099
    pub year: u16,
}

impl DateTime {
    /// Return true if every field is in range for the chip
    pub fn is_valid(&self) -> bool {
        self.seconds <= 59
            && self.minutes <= 59
            && self.hours <= 23
            && (1..=31).contains(&self.date)
            && (1..=12).contains(&self.month)
            && (2000..=2099).contains(&self.year)
    }
}

/// Trickle charger setting, one or two diodes in series with a resistor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrickleCharger {
    Disabled,
    /// `diodes` is 1 or 2
    Enabled { diodes: u8, resistor: TrickleResistor },
}

/// Charge current limiting resistor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TrickleResistor {
    R2k = 0b01,
    R4k = 0b10,
    R8k = 0b11,
}

impl TrickleCharger {
    /// Register value, `None` for an unsupported diode count
    pub fn bits(self) -> Option<u8> {
        match self {
            TrickleCharger::Disabled => Some(0x5C),
            TrickleCharger::Enabled { diodes, resistor } => {
                let ds = match diodes {
                    1 => 0b01,
                    2 => 0b10,
                    _ => return None,
                };
                Some(0xA0 | ds << 2 | resistor as u8)
            }
        }
    }
}

/// DS1302 on an SPI bus with its CE line
pub struct Ds1302<SPI, CE, D> {
    /// SPI bus, MSB first, mode 0
    spi: SPI,
    /// Chip enable, active high
    ce: CE,
    /// Delay provider for the CE setup time
    delay: D,
}

impl<SPI, S, P, CE, D> Ds1302<SPI, CE, D>
where
    SPI: Transfer<u8, Error = S> + Write<u8, Error = S>,
    CE: OutputPin<Error = P>,
    D: DelayUs<u16>,
{
    /// Take the bus and the CE line, leaving CE low
    pub fn new(spi: SPI, ce: CE, delay: D) -> Result<Self, Error<S, P>> {
        let mut rtc = Ds1302 { spi, ce, delay };
        rtc.ce.set_low().map_err(Error::PinError)?;
        Ok(rtc)
    }

    /// Read one register as stored on the chip
    pub fn read_register(&mut self, address: Address) -> Result<u8, Error<S, P>> {
        self.read_raw(address as u8)
    }

    /// Write one register as stored on the chip
    pub fn write_register(&mut self, address: Address, value: u8) -> SpiRes<S, P> {
        self.write_raw(address as u8, value)
    }

    /// Seconds, 0 to 59
    pub fn seconds(&mut self) -> Result<u8, Error<S, P>> {
        decode_seconds(self.read_raw(Address::Seconds as u8)?).ok_or(Error::InvalidData)
    }

    /// Minutes, 0 to 59
    pub fn minutes(&mut self) -> Result<u8, Error<S, P>> {
        decode_minutes(self.read_raw(Address::Minutes as u8)?).ok_or(Error::InvalidData)
    }

    /// Hours in 24-hour form, whichever mode the chip is in
    pub fn hours(&mut self) -> Result<u8, Error<S, P>> {
        decode_hours(self.read_raw(Address::Hours as u8)?).ok_or(Error::InvalidData)
    }

    /// Day of the month, 1 to 31
    pub fn date(&mut self) -> Result<u8, Error<S, P>> {
        decode_date(self.read_raw(Address::Date as u8)?).ok_or(Error::InvalidData)
    }

    /// Month, 1 to 12
    pub fn month(&mut self) -> Result<u8, Error<S, P>> {
        decode_month(self.read_raw(Address::Month as u8)?).ok_or(Error::InvalidData)
    }

    /// Day of the week
    pub fn weekday(&mut self) -> Result<Weekday, Error<S, P>> {
        decode_weekday(self.read_raw(Address::Weekday as u8)?).ok_or(Error::InvalidData)
    }

    /// Year, 2000 to 2099
    pub fn year(&mut self) -> Result<u16, Error<S, P>> {
        decode_year(self.read_raw(Address::Year as u8)?).ok_or(Error::InvalidData)
    }

    /// Set the seconds, the clock halt flag is kept
    pub fn set_seconds(&mut self, seconds: u8) -> SpiRes<S, P> {
        if seconds > 59 {
            return Err(Error::InvalidArgument);
        }
        let old = self.read_raw(Address::Seconds as u8)?;
        self.write_raw(Address::Seconds as u8, (old & 0x80) | dec_to_bcd(seconds))
    }

    /// Set the minutes, 0 to 59
    pub fn set_minutes(&mut self, minutes: u8) -> SpiRes<S, P> {
        if minutes > 59 {
            return Err(Error::InvalidArgument);
        }
        self.write_raw(Address::Minutes as u8, dec_to_bcd(minutes))
    }

    /// Set the hours, switching the chip to 24-hour mode
    pub fn set_hours(&mut self, hours: u8) -> SpiRes<S, P> {
        if hours > 23 {
            return Err(Error::InvalidArgument);
        }
        self.write_raw(Address::Hours as u8, dec_to_bcd(hours))
    }

    /// Set the day of the month, 1 to 31
    pub fn set_date(&mut self, date: u8) -> SpiRes<S, P> {
        if !(1..=31).contains(&date) {
            return Err(Error::InvalidArgument);
        }
        self.write_raw(Address::Date as u8, dec_to_bcd(date))
    }

    /// Set the month, 1 to 12
    pub fn set_month(&mut self, month: u8) -> SpiRes<S, P> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidArgument);
        }
        self.write_raw(Address::Month as u8, dec_to_bcd(month))
    }

    /// Set the day of the week
    pub fn set_weekday(&mut self, weekday: Weekday) -> SpiRes<S, P> {
        self.write_raw(Address::Weekday as u8, weekday as u8)
    }

    /// Set the year, 0 to 99 counted from 2000
    pub fn set_year(&mut self, year: u8) -> SpiRes<S, P> {
        if year > 99 {
            return Err(Error::InvalidArgument);
        }
        self.write_raw(Address::Year as u8, dec_to_bcd(year))
    }

    /// Read all clock registers in one burst
    pub fn time(&mut self) -> Result<DateTime, Error<S, P>> {
        let mut buf = [0u8; 7];
        self.begin()?;
        self.send(&[(Address::ClockBurst as u8 | READ).reverse_bits()])?;
        self.spi.transfer(&mut buf).map_err(Error::SpiError)?;
        self.end()?;
        for byte in buf.iter_mut() {
            *byte = byte.reverse_bits();
        }
        Ok(DateTime {
            seconds: decode_seconds(buf[0]).ok_or(Error::InvalidData)?,
            minutes: decode_minutes(buf[1]).ok_or(Error::InvalidData)?,
            hours: decode_hours(buf[2]).ok_or(Error::InvalidData)?,
            date: decode_date(buf[3]).ok_or(Error::InvalidData)?,
            month: decode_month(buf[4]).ok_or(Error::InvalidData)?,
            weekday: decode_weekday(buf[5]).ok_or(Error::InvalidData)?,
            year: decode_year(buf[6]).ok_or(Error::InvalidData)?,
        })
    }

    /// Write all clock registers in one burst. The clock runs afterwards and the
    /// control byte that ends the burst clears write protection.
    pub fn set_time(&mut self, time: &DateTime) -> SpiRes<S, P> {
        if !time.is_valid() {
            return Err(Error::InvalidArgument);
        }
        let frame = [
            Address::ClockBurst as u8,
            dec_to_bcd(time.seconds),
            dec_to_bcd(time.minutes),
            dec_to_bcd(time.hours),
            dec_to_bcd(time.date),
            dec_to_bcd(time.month),
            time.weekday as u8,
            dec_to_bcd((time.year % 100) as u8),
            0x00,
        ];
        self.write_frame(&frame)
    }

    /// Return true if the oscillator is stopped
    pub fn is_halted(&mut self) -> Result<bool, Error<S, P>> {
        Ok(self.read_raw(Address::Seconds as u8)?.get_bit(CH_BIT))
    }

    /// Stop the oscillator, the seconds are kept
    pub fn halt(&mut self) -> SpiRes<S, P> {
        let mut seconds = self.read_raw(Address::Seconds as u8)?;
        seconds.set_bit(CH_BIT, true);
        self.write_raw(Address::Seconds as u8, seconds)
    }

    /// Start the oscillator, the seconds are kept
    pub fn start(&mut self) -> SpiRes<S, P> {
        let mut seconds = self.read_raw(Address::Seconds as u8)?;
        seconds.set_bit(CH_BIT, false);
        self.write_raw(Address::Seconds as u8, seconds)
    }

    /// Return true if writes to the chip are blocked
    pub fn write_protected(&mut self) -> Result<bool, Error<S, P>> {
        Ok(self.read_raw(Address::Control as u8)?.get_bit(WP_BIT))
    }

    /// Block or allow writes to every other register
    pub fn set_write_protect(&mut self, protect: bool) -> SpiRes<S, P> {
        let mut control = 0u8;
        control.set_bit(WP_BIT, protect);
        self.write_raw(Address::Control as u8, control)
    }

    /// Configure the trickle charger
    pub fn set_trickle_charger(&mut self, setting: TrickleCharger) -> SpiRes<S, P> {
        let bits = setting.bits().ok_or(Error::InvalidArgument)?;
        self.write_raw(Address::TrickleCharger as u8, bits)
    }

    /// Read one RAM byte, index 0 to 30
    pub fn read_ram(&mut self, index: usize) -> Result<u8, Error<S, P>> {
        let address = ram_address(index).ok_or(Error::InvalidAddress)?;
        self.read_raw(address)
    }

    /// Write one RAM byte, index 0 to 30
    pub fn write_ram(&mut self, index: usize, value: u8) -> SpiRes<S, P> {
        let address = ram_address(index).ok_or(Error::InvalidAddress)?;
        self.write_raw(address, value)
    }

    /// Read RAM from index 0 in one burst
    pub fn read_ram_burst(&mut self, data: &mut [u8]) -> SpiRes<S, P> {
        if data.len() > RAM_SIZE {
            return Err(Error::TooMuchData);
        }
        for byte in data.iter_mut() {
            *byte = 0;
        }
        self.begin()?;
        self.send(&[(Address::RamBurst as u8 | READ).reverse_bits()])?;
        self.spi.transfer(data).map_err(Error::SpiError)?;
        self.end()?;
        for byte in data.iter_mut() {
            *byte = byte.reverse_bits();
        }
        Ok(())
    }

    /// Write RAM from index 0 in one burst
    pub fn write_ram_burst(&mut self, data: &[u8]) -> SpiRes<S, P> {
        if data.len() > RAM_SIZE {
            return Err(Error::TooMuchData);
        }
        let mut frame = [0u8; RAM_SIZE + 1];
        frame[0] = Address::RamBurst as u8;
        frame[1..=data.len()].copy_from_slice(data);
        self.write_frame(&frame[..=data.len()])
    }

    /// Destroy the driver and return the bus, the CE line and the delay provider
    pub fn release(self) -> (SPI, CE, D) {
        (self.spi, self.ce, self.delay)
    }

    fn read_raw(&mut self, address: u8) -> Result<u8, Error<S, P>> {
        let mut buf = [0u8];
        self.begin()?;
        self.send(&[(address | READ).reverse_bits()])?;
        self.spi.transfer(&mut buf).map_err(Error::SpiError)?;
        self.end()?;
        Ok(buf[0].reverse_bits())
    }

    fn write_raw(&mut self, address: u8, value: u8) -> SpiRes<S, P> {
        self.write_frame(&[address, value])
    }

    /// Command and data bytes, reversed on the way out
    fn write_frame(&mut self, frame: &[u8]) -> SpiRes<S, P> {
        let mut wire = [0u8; RAM_SIZE + 1];
        for (w, byte) in wire.iter_mut().zip(frame) {
            *w = byte.reverse_bits();
        }
        self.begin()?;
        self.send(&wire[..frame.len()])?;
        self.end()
    }

    fn begin(&mut self) -> SpiRes<S, P> {
        self.ce.set_high().map_err(Error::PinError)?;
        self.delay.delay_us(CE_SETUP_US);
        Ok(())
    }

    fn end(&mut self) -> SpiRes<S, P> {
        self.ce.set_low().map_err(Error::PinError)
    }

    fn send(&mut self, bytes: &[u8]) -> SpiRes<S, P> {
        self.spi.write(bytes).map_err(Error::SpiError)
    }
}

fn ram_address(index: usize) -> Option<u8> {
    if index >= RAM_SIZE {
        return None;
    }
    Some(RAM_START + 2 * index as u8)
}

/// Masked BCD field, `None` for a nibble above 9 or a value outside `range`
fn decode_bcd(raw: u8, mask: u8, range: RangeInclusive<u8>) -> Option<u8> {
    let bcd = raw & mask;
    if bcd >> 4 > 9 || bcd & 0x0F > 9 {
        return None;
    }
    Some(bcd_to_dec(bcd)).filter(|value| range.contains(value))
}

fn decode_seconds(raw: u8) -> Option<u8> {
    decode_bcd(raw, 0x7F, 0..=59)
}

fn decode_minutes(raw: u8) -> Option<u8> {
    decode_bcd(raw, 0x7F, 0..=59)
}

fn decode_date(raw: u8) -> Option<u8> {
    decode_bcd(raw, 0x3F, 1..=31)
}

fn decode_month(raw: u8) -> Option<u8> {
    decode_bcd(raw, 0x1F, 1..=12)
}

/// Bits 7..3 always read as zero
fn decode_weekday(raw: u8) -> Option<Weekday> {
    Weekday::from_u8(raw)
}

fn decode_year(raw: u8) -> Option<u16> {
    decode_bcd(raw, 0xFF, 0..=99).map(|year| 2000 + year as u16)
}

/// Hours register to 0..=23
fn decode_hours(raw: u8) -> Option<u8> {
    if raw.get_bit(HOUR_12_BIT) {
        let hour = decode_bcd(raw, 0x1F, 1..=12)?;
        Some(match (hour, raw.get_bit(PM_BIT)) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        })
    } else {
        decode_bcd(raw, 0x3F, 0..=23)
    }
}
