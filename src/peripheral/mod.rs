//! PIC16F887 on-chip peripherals, plus the PIC12F683 ADC.
//!
//! The wrappers here only sequence accesses to special function registers. The
//! accesses themselves go through [`Registers`], which the board support
//! package implements with volatile reads and writes at [`Sfr::address`]
//! (or [`adc12f683::Register::address`] on the 12F683).

pub mod adc;
pub mod adc12f683;
pub mod eeprom;
pub mod mssp;
pub mod timer;

#[cfg(test)]
pub(crate) mod fake;

pub use adc::{Adc, AnalogPin};
pub use adc12f683::Adc12f683;
pub use eeprom::{Eeprom, EepromConfig};
pub use mssp::Mssp;
pub use timer::{Timer0, Timer1, Timer2};

/// PIC16F887 special function registers used by the peripheral wrappers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Sfr {
    Tmr0 = 0x001,
    Intcon = 0x00B,
    Pir1 = 0x00C,
    Tmr1l = 0x00E,
    Tmr1h = 0x00F,
    T1con = 0x010,
    Tmr2 = 0x011,
    T2con = 0x012,
    Sspbuf = 0x013,
    Sspcon = 0x014,
    Adresh = 0x01E,
    Adcon0 = 0x01F,
    OptionReg = 0x081,
    Trisa = 0x085,
    Trisb = 0x086,
    Trisc = 0x087,
    Trise = 0x089,
    Pie1 = 0x08C,
    Pr2 = 0x092,
    Sspstat = 0x094,
    Adresl = 0x09E,
    Adcon1 = 0x09F,
    Cm2con1 = 0x109,
    Eedat = 0x10C,
    Eeadr = 0x10D,
    Ansel = 0x188,
    Anselh = 0x189,
    Eecon1 = 0x18C,
    Eecon2 = 0x18D,
}

impl Sfr {
    /// Address in the banked data memory
    pub fn address(self) -> u16 {
        self as u16
    }
}

/// Byte-wide access to the special function registers of one chip, named by `Reg`
pub trait Registers<Reg: Copy = Sfr> {
    /// Current value of `register`
    fn read(&mut self, register: Reg) -> u8;

    /// Store `value` in `register`
    fn write(&mut self, register: Reg, value: u8);

    /// Read, transform and write back
    fn modify<F: FnOnce(u8) -> u8>(&mut self, register: Reg, f: F) {
        let value = self.read(register);
        self.write(register, f(value));
    }

    /// Set the bits of `mask`, keep the others
    fn set_bits(&mut self, register: Reg, mask: u8) {
        self.modify(register, |v| v | mask);
    }

    /// Clear the bits of `mask`, keep the others
    fn clear_bits(&mut self, register: Reg, mask: u8) {
        self.modify(register, |v| v & !mask);
    }
}

impl<Reg: Copy, T: Registers<Reg>> Registers<Reg> for &mut T {
    fn read(&mut self, register: Reg) -> u8 {
        (**self).read(register)
    }

    fn write(&mut self, register: Reg, value: u8) {
        (**self).write(register, value)
    }
}

/// Errors of the register-level wrappers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Status flag did not change within the poll budget
    Timeout,
    /// Address outside the memory
    InvalidAddress,
    /// Analog channel the converter does not have
    InvalidChannel,
    /// Transfer longer than the memory
    TooMuchData,
    /// Value the register cannot hold
    InvalidArgument,
}

/// Polls used when the caller does not configure a budget
pub const DEFAULT_MAX_POLLS: u32 = 10_000;

/// Read `register` until `done` accepts its value, at most `max_polls` times
pub(crate) fn poll<Reg, R, F>(regs: &mut R, register: Reg, max_polls: u32, done: F) -> Result<u8, Error>
where
    Reg: Copy,
    R: Registers<Reg>,
    F: Fn(u8) -> bool,
{
    for _ in 0..max_polls {
        let value = regs.read(register);
        if done(value) {
            return Ok(value);
        }
    }
    Err(Error::Timeout)
}
