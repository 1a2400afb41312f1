//! 10-bit ADC of the PIC12F683, channels AN0 to AN3.
//!
//! The 12F683 packs the converter into two registers: ADCON0 holds the result
//! format, reference, channel and GO/ADON, and ANSEL holds the conversion
//! clock next to the analog select bits. Its register map differs from the
//! 16F887, so the driver talks to its own [`Register`] set.

use super::{poll, Error, Registers, DEFAULT_MAX_POLLS};
use hal::blocking::delay::DelayUs;

/// ADCON0: right justified result
const ADFM: u8 = 1 << 7;
/// ADCON0: conversion in progress
const GO: u8 = 1 << 1;
/// ADCON0: converter powered
const ADON: u8 = 1 << 0;
/// ADCON0: channel select field, bits 3..2
const CHS_MASK: u8 = 0b0000_1100;
const CHS_SHIFT: u8 = 2;
/// ANSEL: conversion clock field, bits 6..4
const ADCS_MASK: u8 = 0b0111_0000;

/// Highest channel number
pub const MAX_CHANNEL: u8 = 3;
/// Acquisition time after switching the input
const ACQUISITION_US: u16 = 12;

/// TRISIO bit of the pin behind each analog channel, AN3 sits on GP4
const CHANNEL_PINS: [u8; 4] = [0, 1, 2, 4];

/// PIC12F683 registers used by the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Register {
    Adresh = 0x01E,
    Adcon0 = 0x01F,
    Trisio = 0x085,
    Adresl = 0x09E,
    Ansel = 0x09F,
}

impl Register {
    /// Address in the banked data memory
    pub fn address(self) -> u16 {
        self as u16
    }
}

/// Conversion clock, ANSEL bits 6..4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ConversionClock {
    FoscDiv2 = 0x00,
    FoscDiv4 = 0x40,
    #[default]
    FoscDiv8 = 0x10,
    FoscDiv16 = 0x50,
    FoscDiv32 = 0x20,
    FoscDiv64 = 0x60,
    /// Internal RC oscillator
    Frc = 0x30,
}

/// Positive reference, ADCON0 bit 6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum VoltageReference {
    #[default]
    Vdd = 0x00,
    /// External reference on the VREF pin
    Vref = 0x40,
}

/// How results are read back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    /// Right justified, ADRESH:ADRESL, 0..=1023
    #[default]
    TenBits,
    /// Left justified, ADRESH only, 0..=255
    EightBits,
}

/// Converter of a PIC12F683
pub struct Adc12f683<R, D> {
    regs: R,
    delay: D,
    resolution: Resolution,
    max_polls: u32,
}

impl<R: Registers<Register>, D: DelayUs<u16>> Adc12f683<R, D> {
    /// Configure format, reference and clock, clear the result, converter still off
    pub fn new(
        mut regs: R,
        delay: D,
        resolution: Resolution,
        vref: VoltageReference,
        clock: ConversionClock,
    ) -> Self {
        let format = match resolution {
            Resolution::TenBits => ADFM,
            Resolution::EightBits => 0,
        };
        regs.write(Register::Adcon0, format | vref as u8);
        regs.write(Register::Adresh, 0);
        regs.modify(Register::Ansel, |v| (v & !ADCS_MASK) | clock as u8);
        regs.write(Register::Adresl, 0);
        Adc12f683 {
            regs,
            delay,
            resolution,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    /// ADCON0 reads before a conversion counts as stuck
    pub fn set_max_polls(&mut self, max_polls: u32) {
        self.max_polls = max_polls;
    }

    /// Make `channel` an analog input, route it to the converter and power up
    pub fn select_channel(&mut self, channel: u8) -> Result<(), Error> {
        let bit = *CHANNEL_PINS
            .get(channel as usize)
            .ok_or(Error::InvalidChannel)?;
        self.regs.set_bits(Register::Trisio, 1 << bit);
        self.regs.set_bits(Register::Ansel, 1 << channel);
        self.regs
            .modify(Register::Adcon0, |v| (v & !CHS_MASK) | (channel << CHS_SHIFT) | ADON);
        Ok(())
    }

    /// Convert `channel` and wait for the result
    pub fn convert(&mut self, channel: u8) -> Result<u16, Error> {
        self.select_channel(channel)?;
        self.delay.delay_us(ACQUISITION_US);
        self.regs.set_bits(Register::Adcon0, GO);
        poll(&mut self.regs, Register::Adcon0, self.max_polls, |v| v & GO == 0)?;
        Ok(self.result())
    }

    /// Return true while a conversion is running
    pub fn is_busy(&mut self) -> bool {
        self.regs.read(Register::Adcon0) & GO != 0
    }

    /// Last result in the configured resolution
    pub fn result(&mut self) -> u16 {
        let high = self.regs.read(Register::Adresh) as u16;
        match self.resolution {
            Resolution::TenBits => {
                let low = self.regs.read(Register::Adresl) as u16;
                ((high << 8) | low) & 0x3FF
            }
            Resolution::EightBits => high,
        }
    }

    /// Power the converter down
    pub fn disable(&mut self) {
        self.regs.clear_bits(Register::Adcon0, ADON);
    }

    /// Destroy the driver and return the registers and the delay provider
    pub fn release(self) -> (R, D) {
        (self.regs, self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::delay::MockNoop;

    /// 12F683 data memory with a converter that finishes after `busy_reads` polls
    struct Chip {
        memory: [u8; 0x100],
        busy_reads: usize,
        remaining: usize,
        sample: u16,
    }

    impl Chip {
        fn new(busy_reads: usize, sample: u16) -> Self {
            Chip {
                memory: [0xFF; 0x100],
                busy_reads,
                remaining: 0,
                sample,
            }
        }

        fn get(&self, register: Register) -> u8 {
            self.memory[register.address() as usize]
        }
    }

    impl Registers<Register> for Chip {
        fn read(&mut self, register: Register) -> u8 {
            let adcon0 = self.get(Register::Adcon0);
            if register == Register::Adcon0 && adcon0 & GO != 0 {
                if self.remaining == 0 {
                    self.remaining = self.busy_reads;
                }
                self.remaining -= 1;
                if self.remaining == 0 {
                    // ADFM picks the alignment of the 10-bit sample
                    let (high, low) = if adcon0 & ADFM != 0 {
                        ((self.sample >> 8) as u8, self.sample as u8)
                    } else {
                        ((self.sample >> 2) as u8, (self.sample << 6) as u8)
                    };
                    self.memory[Register::Adresh.address() as usize] = high;
                    self.memory[Register::Adresl.address() as usize] = low;
                    self.memory[Register::Adcon0.address() as usize] = adcon0 & !GO;
                }
            }
            self.get(register)
        }

        fn write(&mut self, register: Register, value: u8) {
            self.memory[register.address() as usize] = value;
        }
    }

    #[test]
    fn new_sets_format_reference_and_clock() {
        let mut chip = Chip::new(1, 0);
        Adc12f683::new(
            &mut chip,
            MockNoop::new(),
            Resolution::TenBits,
            VoltageReference::Vref,
            ConversionClock::FoscDiv16,
        );
        assert_eq!(chip.get(Register::Adcon0), ADFM | 0x40);
        assert_eq!(chip.get(Register::Ansel), 0x8F | 0x50);
        assert_eq!(chip.get(Register::Adresh), 0);
        assert_eq!(chip.get(Register::Adresl), 0);
    }

    #[test]
    fn an3_lives_on_gp4() {
        let mut chip = Chip::new(1, 0);
        chip.memory[Register::Trisio.address() as usize] = 0;
        chip.memory[Register::Ansel.address() as usize] = 0;
        let mut adc = Adc12f683::new(
            &mut chip,
            MockNoop::new(),
            Resolution::default(),
            VoltageReference::default(),
            ConversionClock::default(),
        );
        adc.select_channel(3).unwrap();
        assert_eq!(adc.select_channel(4), Err(Error::InvalidChannel));
        assert_eq!(chip.get(Register::Trisio), 1 << 4);
        assert_eq!(chip.get(Register::Ansel), 0x10 | 1 << 3);
        assert_eq!(chip.get(Register::Adcon0), ADFM | 3 << 2 | ADON);
    }

    #[test]
    fn ten_bit_conversion() {
        let mut chip = Chip::new(3, 0x2C7);
        let mut adc = Adc12f683::new(
            &mut chip,
            MockNoop::new(),
            Resolution::TenBits,
            VoltageReference::Vdd,
            ConversionClock::FoscDiv8,
        );
        assert_eq!(adc.convert(1), Ok(0x2C7));
        assert!(!adc.is_busy());
    }

    #[test]
    fn eight_bit_conversion_reads_adresh_only() {
        let mut chip = Chip::new(2, 0x2C7);
        let mut adc = Adc12f683::new(
            &mut chip,
            MockNoop::new(),
            Resolution::EightBits,
            VoltageReference::Vdd,
            ConversionClock::FoscDiv8,
        );
        assert_eq!(adc.convert(0), Ok(0xB1));
    }

    #[test]
    fn stuck_converter_times_out() {
        let mut chip = Chip::new(usize::MAX, 0);
        let mut adc = Adc12f683::new(
            &mut chip,
            MockNoop::new(),
            Resolution::TenBits,
            VoltageReference::Vdd,
            ConversionClock::Frc,
        );
        adc.set_max_polls(4);
        assert_eq!(adc.convert(2), Err(Error::Timeout));
        adc.disable();
        assert_eq!(chip.get(Register::Adcon0) & ADON, 0);
    }
}
