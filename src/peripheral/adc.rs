//! 10-bit successive approximation ADC, channels AN0 to AN13.
//!
//! Results are right justified: ADRESH holds bits 9..8, ADRESL bits 7..0.

use super::{poll, Error, Registers, Sfr, DEFAULT_MAX_POLLS};
use core::marker::PhantomData;
use hal::adc::{Channel, OneShot};
use hal::blocking::delay::DelayUs;

/// ADCON0: conversion in progress
const GO: u8 = 1 << 1;
/// ADCON0: converter powered
const ADON: u8 = 1 << 0;
/// ADCON0: channel select field, bits 5..2
const CHS_MASK: u8 = 0b0011_1100;
const CHS_SHIFT: u8 = 2;
/// ADCON1: right justified result
const ADFM: u8 = 1 << 7;

/// Highest channel number
pub const MAX_CHANNEL: u8 = 13;
/// Acquisition time after switching the input
const ACQUISITION_US: u16 = 3;

/// Conversion clock, ADCON0 bits 7..6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ConversionClock {
    FoscDiv2 = 0x00,
    FoscDiv8 = 0x40,
    #[default]
    FoscDiv32 = 0x80,
    /// Internal RC oscillator
    Frc = 0xC0,
}

/// Reference voltages, ADCON1 bits 5..4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum VoltageReference {
    #[default]
    VddToVss = 0x00,
    VrefPlusToVss = 0x10,
    VddToVrefMinus = 0x20,
    VrefPlusToVrefMinus = 0x30,
}

/// TRIS register and bit of the pin behind each analog channel
const CHANNEL_PINS: [(Sfr, u8); 14] = [
    (Sfr::Trisa, 0),
    (Sfr::Trisa, 1),
    (Sfr::Trisa, 2),
    (Sfr::Trisa, 3),
    (Sfr::Trisa, 5),
    (Sfr::Trise, 0),
    (Sfr::Trise, 1),
    (Sfr::Trise, 2),
    (Sfr::Trisb, 2),
    (Sfr::Trisb, 3),
    (Sfr::Trisb, 1),
    (Sfr::Trisb, 4),
    (Sfr::Trisb, 0),
    (Sfr::Trisb, 5),
];

/// Marker for the converter in `embedded_hal::adc` bounds
pub struct AdcModule;

/// Analog input ANx as a type, for `OneShot`
pub struct AnalogPin<const CH: u8> {
    _private: PhantomData<()>,
}

impl<const CH: u8> AnalogPin<CH> {
    /// Token for channel `CH`
    pub fn new() -> Self {
        AnalogPin {
            _private: PhantomData,
        }
    }
}

impl<const CH: u8> Default for AnalogPin<CH> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CH: u8> Channel<AdcModule> for AnalogPin<CH> {
    type ID = u8;

    fn channel() -> u8 {
        CH
    }
}

/// Converter of a PIC16F887
pub struct Adc<R, D> {
    regs: R,
    delay: D,
    max_polls: u32,
    /// Channel of a conversion started by `OneShot::read`
    pending: Option<u8>,
}

impl<R: Registers, D: DelayUs<u16>> Adc<R, D> {
    /// Configure the clock and references, right justified, converter still off
    pub fn new(mut regs: R, delay: D, clock: ConversionClock, vref: VoltageReference) -> Self {
        regs.write(Sfr::Adcon0, clock as u8);
        regs.write(Sfr::Adcon1, ADFM | vref as u8);
        Adc {
            regs,
            delay,
            max_polls: DEFAULT_MAX_POLLS,
            pending: None,
        }
    }

    /// ADCON0 reads before a conversion counts as stuck
    pub fn set_max_polls(&mut self, max_polls: u32) {
        self.max_polls = max_polls;
    }

    /// Make `channel` an analog input, route it to the converter and power up
    pub fn select_channel(&mut self, channel: u8) -> Result<(), Error> {
        let (tris, bit) = *CHANNEL_PINS
            .get(channel as usize)
            .ok_or(Error::InvalidChannel)?;
        self.regs.set_bits(tris, 1 << bit);
        if channel < 8 {
            self.regs.set_bits(Sfr::Ansel, 1 << channel);
        } else {
            self.regs.set_bits(Sfr::Anselh, 1 << (channel - 8));
        }
        self.regs
            .modify(Sfr::Adcon0, |v| (v & !CHS_MASK) | (channel << CHS_SHIFT) | ADON);
        Ok(())
    }

    /// Convert `channel` and wait for the result
    pub fn convert(&mut self, channel: u8) -> Result<u16, Error> {
        self.start(channel)?;
        poll(&mut self.regs, Sfr::Adcon0, self.max_polls, |v| v & GO == 0)?;
        Ok(self.result())
    }

    /// Return true while a conversion is running
    pub fn is_busy(&mut self) -> bool {
        self.regs.read(Sfr::Adcon0) & GO != 0
    }

    /// Last result, 0..=1023
    pub fn result(&mut self) -> u16 {
        let high = self.regs.read(Sfr::Adresh) as u16;
        let low = self.regs.read(Sfr::Adresl) as u16;
        ((high << 8) | low) & 0x3FF
    }

    /// Power the converter down
    pub fn disable(&mut self) {
        self.regs.clear_bits(Sfr::Adcon0, ADON);
        self.pending = None;
    }

    /// Destroy the driver and return the registers and the delay provider
    pub fn release(self) -> (R, D) {
        (self.regs, self.delay)
    }

    fn start(&mut self, channel: u8) -> Result<(), Error> {
        self.select_channel(channel)?;
        self.delay.delay_us(ACQUISITION_US);
        self.regs.set_bits(Sfr::Adcon0, GO);
        Ok(())
    }
}

impl<R, D, const CH: u8> OneShot<AdcModule, u16, AnalogPin<CH>> for Adc<R, D>
where
    R: Registers,
    D: DelayUs<u16>,
{
    type Error = Error;

    /// Starts a conversion on the first call and returns `WouldBlock` until it is done
    fn read(&mut self, _pin: &mut AnalogPin<CH>) -> nb::Result<u16, Error> {
        let pending = self.pending;
        match pending {
            Some(_) if self.is_busy() => Err(nb::Error::WouldBlock),
            Some(channel) if channel == CH => {
                self.pending = None;
                Ok(self.result())
            }
            _ => {
                self.start(CH)?;
                self.pending = Some(CH);
                Err(nb::Error::WouldBlock)
            }
        }
    }
}
