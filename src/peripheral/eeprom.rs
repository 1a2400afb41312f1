//! 256-byte data EEPROM.
//!
//! A write only starts after the 0x55, 0xAA unlock sequence lands in EECON2
//! with WREN set, and nothing may interrupt the sequence, so global interrupts
//! are masked for those three writes and restored right after.

use super::{poll, Error, Registers, Sfr, DEFAULT_MAX_POLLS};

/// EECON1: program (1) or data (0) memory
const EEPGD: u8 = 1 << 7;
/// EECON1: write enable
const WREN: u8 = 1 << 2;
/// EECON1: write in progress
const WR: u8 = 1 << 1;
/// EECON1: read in progress
const RD: u8 = 1 << 0;
/// INTCON: global interrupt enable
const GIE: u8 = 1 << 7;

const UNLOCK: [u8; 2] = [0x55, 0xAA];

/// Bytes of data EEPROM
pub const SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EepromConfig {
    /// EECON1 reads before a pending read or write counts as stuck
    pub max_polls: u32,
}

impl Default for EepromConfig {
    fn default() -> Self {
        EepromConfig {
            max_polls: DEFAULT_MAX_POLLS,
        }
    }
}

/// Data EEPROM of a PIC16F887
pub struct Eeprom<R> {
    regs: R,
    config: EepromConfig,
}

impl<R: Registers> Eeprom<R> {
    /// Wrap the EEPROM registers
    pub fn new(regs: R, config: EepromConfig) -> Self {
        Eeprom { regs, config }
    }

    /// Read the byte at `address`
    pub fn read_byte(&mut self, address: u8) -> Result<u8, Error> {
        self.wait_idle()?;
        self.regs.write(Sfr::Eeadr, address);
        self.regs.modify(Sfr::Eecon1, |v| (v & !EEPGD) | RD);
        self.wait_idle()?;
        Ok(self.regs.read(Sfr::Eedat))
    }

    /// Write `data` at `address` and wait for the cell to be programmed
    pub fn write_byte(&mut self, address: u8, data: u8) -> Result<(), Error> {
        self.wait_idle()?;
        self.regs.write(Sfr::Eeadr, address);
        self.regs.write(Sfr::Eedat, data);
        self.regs.modify(Sfr::Eecon1, |v| (v & !EEPGD) | WREN);

        let interrupts = self.regs.read(Sfr::Intcon) & GIE;
        self.regs.clear_bits(Sfr::Intcon, GIE);
        for key in UNLOCK {
            self.regs.write(Sfr::Eecon2, key);
        }
        self.regs.set_bits(Sfr::Eecon1, WR);
        if interrupts != 0 {
            self.regs.set_bits(Sfr::Intcon, GIE);
        }

        let done = self.wait_idle();
        self.regs.clear_bits(Sfr::Eecon1, WREN);
        done
    }

    /// Fill `buf` from consecutive addresses starting at `address`
    pub fn read_bytes(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Error> {
        Self::check_range(address, buf.len())?;
        for (offset, byte) in buf.iter_mut().enumerate() {
            *byte = self.read_byte(address + offset as u8)?;
        }
        Ok(())
    }

    /// Write `data` to consecutive addresses starting at `address`
    pub fn write_bytes(&mut self, address: u8, data: &[u8]) -> Result<(), Error> {
        Self::check_range(address, data.len())?;
        for (offset, byte) in data.iter().enumerate() {
            self.write_byte(address + offset as u8, *byte)?;
        }
        Ok(())
    }

    /// Destroy the driver and return the registers
    pub fn release(self) -> R {
        self.regs
    }

    fn check_range(address: u8, len: usize) -> Result<(), Error> {
        if len > SIZE {
            return Err(Error::TooMuchData);
        }
        if address as usize + len > SIZE {
            return Err(Error::InvalidAddress);
        }
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<(), Error> {
        poll(&mut self.regs, Sfr::Eecon1, self.config.max_polls, |v| {
            v & (WR | RD) == 0
        })
        .map(|_| ())
    }
}
