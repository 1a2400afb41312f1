//! Hardware SPI through the MSSP module.
//!
//! Pins are fixed by the silicon: SCK on RC3, SDI on RC4, SDO on RC5 and the
//! slave select input on RA5.

use super::{poll, Error, Registers, Sfr, DEFAULT_MAX_POLLS};
use hal::blocking::spi::{Transfer, Write};

/// SSPCON: module enable
const SSPEN: u8 = 1 << 5;
/// SSPCON: clock idles high
const CKP: u8 = 1 << 4;
/// SSPSTAT: input sampled at the end of the output time
const SMP: u8 = 1 << 7;
/// SSPSTAT: output changes on the active-to-idle clock edge
const CKE: u8 = 1 << 6;
/// SSPSTAT: receive complete, SSPBUF full
const BF: u8 = 1 << 0;

const TRISC_SCK: u8 = 1 << 3;
const TRISC_SDI: u8 = 1 << 4;
const TRISC_SDO: u8 = 1 << 5;
const TRISA_SS: u8 = 1 << 5;

/// SSPM field: role and clock source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    MasterFoscDiv4 = 0b0000,
    MasterFoscDiv16 = 0b0001,
    MasterFoscDiv64 = 0b0010,
    /// Timer2 output divided by 2
    MasterTmr2Div2 = 0b0011,
    /// Slave, transfers gated by the SS pin
    SlaveSsEnabled = 0b0100,
    /// Slave, SS pin free for general I/O
    SlaveSsDisabled = 0b0101,
}

impl Mode {
    /// Return true for the slave modes
    pub fn is_slave(self) -> bool {
        self as u8 & 0b0100 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ClockPolarity {
    IdleLow = 0x00,
    IdleHigh = CKP,
}

/// Clock edge on which the output changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OutputEdge {
    IdleToActive = 0x00,
    ActiveToIdle = CKE,
}

/// When the master samples its input, ignored in slave modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum InputSampling {
    Middle = 0x00,
    End = SMP,
}

/// CKP and CKE together, named after the (CKP, CKE) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransmissionMode {
    Mode00 = CKE,
    Mode01 = 0x00,
    Mode10 = CKE | CKP,
    Mode11 = CKP,
}

/// MSSP module in SPI mode
pub struct Mssp<R> {
    regs: R,
    max_polls: u32,
}

impl<R: Registers> Mssp<R> {
    /// Wrap the module, call `initialize` before transferring
    pub fn new(regs: R) -> Self {
        Mssp {
            regs,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    /// SSPSTAT reads before a transfer counts as stuck
    pub fn set_max_polls(&mut self, max_polls: u32) {
        self.max_polls = max_polls;
    }

    /// Set pin directions, role, clock and sampling, then enable the module
    pub fn initialize(&mut self, mode: Mode, polarity: ClockPolarity, edge: OutputEdge, sampling: InputSampling) {
        self.regs.write(Sfr::Sspcon, 0x00);
        self.regs
            .modify(Sfr::Trisc, |v| (v & !TRISC_SDO) | TRISC_SDI);
        if mode.is_slave() {
            self.regs.set_bits(Sfr::Trisc, TRISC_SCK);
            self.regs.set_bits(Sfr::Trisa, TRISA_SS);
            self.regs.write(Sfr::Sspstat, edge as u8);
        } else {
            self.regs.clear_bits(Sfr::Trisc, TRISC_SCK);
            self.regs.write(Sfr::Sspstat, sampling as u8 | edge as u8);
        }
        self.regs.write(Sfr::Sspcon, mode as u8 | polarity as u8);
        self.regs.set_bits(Sfr::Sspcon, SSPEN);
    }

    /// Change clock polarity and phase with the module briefly disabled
    pub fn set_transmission_mode(&mut self, mode: TransmissionMode) {
        let mode = mode as u8;
        self.regs.clear_bits(Sfr::Sspcon, SSPEN);
        self.regs.modify(Sfr::Sspstat, |v| (v & !CKE) | (mode & CKE));
        self.regs.modify(Sfr::Sspcon, |v| (v & !CKP) | (mode & CKP));
        self.regs.set_bits(Sfr::Sspcon, SSPEN);
    }

    /// Send `byte` and return the byte shifted in at the same time
    pub fn send_byte(&mut self, byte: u8) -> Result<u8, Error> {
        self.regs.write(Sfr::Sspbuf, byte);
        poll(&mut self.regs, Sfr::Sspstat, self.max_polls, |v| v & BF != 0)?;
        Ok(self.regs.read(Sfr::Sspbuf))
    }

    /// Destroy the driver and return the registers
    pub fn release(self) -> R {
        self.regs
    }
}

impl<R: Registers> Write<u8> for Mssp<R> {
    type Error = Error;

    fn write(&mut self, words: &[u8]) -> Result<(), Error> {
        for word in words {
            self.send_byte(*word)?;
        }
        Ok(())
    }
}

impl<R: Registers> Transfer<u8> for Mssp<R> {
    type Error = Error;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Error> {
        for word in words.iter_mut() {
            *word = self.send_byte(*word)?;
        }
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripheral::fake::{FakeRegisters, RegisterFile};

    /// Loopback through an inverter: every byte sent comes back complemented
    fn inverting_loopback() -> FakeRegisters {
        FakeRegisters::new()
            .on_write(|file: &mut RegisterFile, reg, value| {
                if reg == Sfr::Sspbuf {
                    file.set(Sfr::Sspbuf, !value);
                    file.set(Sfr::Sspstat, file.get(Sfr::Sspstat) | BF);
                }
            })
            .on_read(|file: &mut RegisterFile, reg| {
                if reg == Sfr::Sspbuf {
                    file.set(Sfr::Sspstat, file.get(Sfr::Sspstat) & !BF);
                }
            })
    }

    #[test]
    fn master_initialization() {
        let mut regs = FakeRegisters::new();
        regs.set(Sfr::Trisc, 0xFF);
        let mut mssp = Mssp::new(&mut regs);
        mssp.initialize(
            Mode::MasterFoscDiv16,
            ClockPolarity::IdleHigh,
            OutputEdge::ActiveToIdle,
            InputSampling::End,
        );
        assert_eq!(regs.get(Sfr::Trisc), 0xFF & !TRISC_SDO & !TRISC_SCK);
        assert_eq!(regs.get(Sfr::Sspstat), SMP | CKE);
        assert_eq!(regs.get(Sfr::Sspcon), SSPEN | CKP | 0b0001);
        assert_eq!(regs.writes_to(Sfr::Sspcon)[0], 0x00);
    }

    #[test]
    fn slave_ignores_sampling() {
        let mut regs = FakeRegisters::new();
        let mut mssp = Mssp::new(&mut regs);
        mssp.initialize(
            Mode::SlaveSsEnabled,
            ClockPolarity::IdleLow,
            OutputEdge::IdleToActive,
            InputSampling::End,
        );
        assert_eq!(regs.get(Sfr::Sspstat), 0x00);
        assert_eq!(regs.get(Sfr::Trisc), TRISC_SDI | TRISC_SCK);
        assert_eq!(regs.get(Sfr::Trisa), TRISA_SS);
    }

    #[test]
    fn transmission_mode_sets_ckp_and_cke() {
        let mut regs = FakeRegisters::new();
        let mut mssp = Mssp::new(&mut regs);
        mssp.initialize(
            Mode::MasterFoscDiv4,
            ClockPolarity::IdleLow,
            OutputEdge::IdleToActive,
            InputSampling::Middle,
        );
        mssp.set_transmission_mode(TransmissionMode::Mode10);
        assert_eq!(regs.get(Sfr::Sspcon), SSPEN | CKP);
        assert_eq!(regs.get(Sfr::Sspstat), CKE);
        let mut mssp = Mssp::new(&mut regs);
        mssp.set_transmission_mode(TransmissionMode::Mode01);
        assert_eq!(regs.get(Sfr::Sspcon), SSPEN);
        assert_eq!(regs.get(Sfr::Sspstat), 0x00);
    }

    #[test]
    fn transfer_exchanges_bytes() {
        let mut regs = inverting_loopback();
        let mut mssp = Mssp::new(&mut regs);
        let mut words = [0x00, 0x5A, 0xFF];
        assert_eq!(mssp.transfer(&mut words), Ok(&[0xFF, 0xA5, 0x00][..]));
        assert_eq!(regs.writes_to(Sfr::Sspbuf), vec![0x00, 0x5A, 0xFF]);
    }

    #[test]
    fn missing_clock_times_out() {
        let mut regs = FakeRegisters::new();
        let mut mssp = Mssp::new(&mut regs);
        mssp.set_max_polls(3);
        assert_eq!(mssp.write(&[1]), Err(Error::Timeout));
    }
}
