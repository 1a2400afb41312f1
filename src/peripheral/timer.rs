//! Timer0, Timer1 and Timer2.

use super::{Error, Registers, Sfr};

/// OPTION_REG: Timer0 clock from the T0CKI pin
const T0CS: u8 = 1 << 5;
/// OPTION_REG: count on the falling edge of T0CKI
const T0SE: u8 = 1 << 4;
/// OPTION_REG: prescaler assigned to the watchdog
const PSA: u8 = 1 << 3;
const PS_MASK: u8 = 0b0000_0111;
/// INTCON: Timer0 overflow flag
const T0IF: u8 = 1 << 2;

/// T1CON: gate active high
const T1GINV: u8 = 1 << 7;
/// T1CON: gate enable
const TMR1GE: u8 = 1 << 6;
const T1CKPS_MASK: u8 = 0b0011_0000;
/// T1CON: LP oscillator enable
const T1OSCEN: u8 = 1 << 3;
/// T1CON: do not synchronize the external clock
const T1SYNC: u8 = 1 << 2;
/// T1CON: clock from T1CKI or the LP oscillator
const TMR1CS: u8 = 1 << 1;
const TMR1ON: u8 = 1 << 0;
/// CM2CON1: Timer1 gate from the T1G pin instead of comparator C2
const T1GSS: u8 = 1 << 1;
/// PIR1: Timer1 overflow flag
const TMR1IF: u8 = 1 << 0;

const TOUTPS_MASK: u8 = 0b0111_1000;
const TOUTPS_SHIFT: u8 = 3;
const TMR2ON: u8 = 1 << 2;
const T2CKPS_MASK: u8 = 0b0000_0011;
/// PIR1: TMR2 matched PR2, after the postscaler
const TMR2IF: u8 = 1 << 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Timer0Source {
    /// Instruction clock, Fosc/4
    Internal = 0x00,
    ExternalRising = T0CS,
    ExternalFalling = T0CS | T0SE,
}

/// Timer0 prescaler, `Div1` hands the prescaler to the watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Timer0Prescaler {
    Div1 = PSA,
    Div2 = 0,
    Div4 = 1,
    Div8 = 2,
    Div16 = 3,
    Div32 = 4,
    Div64 = 5,
    Div128 = 6,
    Div256 = 7,
}

/// 8-bit timer, always running
pub struct Timer0<R> {
    regs: R,
}

impl<R: Registers> Timer0<R> {
    /// Wrap Timer0, its configuration is left as found
    pub fn new(regs: R) -> Self {
        Timer0 { regs }
    }

    /// Count instruction cycles or edges on T0CKI
    pub fn set_clock_source(&mut self, source: Timer0Source) {
        self.regs
            .modify(Sfr::OptionReg, |v| (v & !(T0CS | T0SE)) | source as u8);
    }

    /// Clears the counter first, which also clears the prescaler count
    pub fn set_prescaler(&mut self, prescaler: Timer0Prescaler) {
        self.regs.write(Sfr::Tmr0, 0);
        self.regs
            .modify(Sfr::OptionReg, |v| (v & !(PSA | PS_MASK)) | prescaler as u8);
    }

    /// Current TMR0 value
    pub fn counter(&mut self) -> u8 {
        self.regs.read(Sfr::Tmr0)
    }

    /// Load TMR0, also clears the prescaler count
    pub fn set_counter(&mut self, value: u8) {
        self.regs.write(Sfr::Tmr0, value);
    }

    /// Reset TMR0 to zero
    pub fn clear_counter(&mut self) {
        self.set_counter(0);
    }

    /// Return true if the counter wrapped since the flag was last cleared
    pub fn has_overflowed(&mut self) -> bool {
        self.regs.read(Sfr::Intcon) & T0IF != 0
    }

    /// Acknowledge the overflow flag
    pub fn clear_overflow(&mut self) {
        self.regs.clear_bits(Sfr::Intcon, T0IF);
    }

    /// Destroy the driver and return the registers
    pub fn release(self) -> R {
        self.regs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Timer1Source {
    /// Instruction clock, Fosc/4
    Internal = 0x00,
    /// T1CKI synchronized to the instruction clock
    ExternalSync = TMR1CS,
    /// T1CKI, keeps counting in sleep
    ExternalAsync = TMR1CS | T1SYNC,
    /// 32.768 kHz crystal on T1OSI/T1OSO
    LowPowerOscillator = TMR1CS | T1SYNC | T1OSCEN,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Timer1Prescaler {
    Div1 = 0x00,
    Div2 = 0x10,
    Div4 = 0x20,
    Div8 = 0x30,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Timer1Gate {
    Off = 0x00,
    /// Count while the gate is high
    ActiveHigh = TMR1GE | T1GINV,
    /// Count while the gate is low
    ActiveLow = TMR1GE,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timer1GateSource {
    Pin,
    Comparator2,
}

/// 16-bit timer with gate control
pub struct Timer1<R> {
    regs: R,
}

impl<R: Registers> Timer1<R> {
    /// Wrap Timer1, call `initialize` before starting it
    pub fn new(regs: R) -> Self {
        Timer1 { regs }
    }

    /// Configure clock, prescaler and gate, leaves the timer stopped
    pub fn initialize(
        &mut self,
        source: Timer1Source,
        prescaler: Timer1Prescaler,
        gate: Timer1Gate,
        gate_source: Timer1GateSource,
    ) {
        self.regs
            .write(Sfr::T1con, source as u8 | prescaler as u8 | gate as u8);
        match gate_source {
            Timer1GateSource::Pin => self.regs.set_bits(Sfr::Cm2con1, T1GSS),
            Timer1GateSource::Comparator2 => self.regs.clear_bits(Sfr::Cm2con1, T1GSS),
        }
    }

    /// Change the clock source, the run state is kept
    pub fn set_clock_source(&mut self, source: Timer1Source) {
        let mask = TMR1CS | T1SYNC | T1OSCEN;
        self.regs.modify(Sfr::T1con, |v| (v & !mask) | source as u8);
    }

    /// Change the prescaler
    pub fn set_prescaler(&mut self, prescaler: Timer1Prescaler) {
        self.regs
            .modify(Sfr::T1con, |v| (v & !T1CKPS_MASK) | prescaler as u8);
    }

    /// Start counting
    pub fn start(&mut self) {
        self.regs.set_bits(Sfr::T1con, TMR1ON);
    }

    /// Stop counting, the counter is kept
    pub fn stop(&mut self) {
        self.regs.clear_bits(Sfr::T1con, TMR1ON);
    }

    /// Read TMR1H:TMR1L, retrying once if the low byte rolled over in between
    pub fn counter(&mut self) -> u16 {
        let high = self.regs.read(Sfr::Tmr1h);
        let low = self.regs.read(Sfr::Tmr1l);
        let again = self.regs.read(Sfr::Tmr1h);
        if again == high {
            u16::from_be_bytes([high, low])
        } else {
            let low = self.regs.read(Sfr::Tmr1l);
            u16::from_be_bytes([again, low])
        }
    }

    /// Load TMR1H:TMR1L, TMR1L is zeroed first so no carry lands in the new high byte
    pub fn set_counter(&mut self, value: u16) {
        let [high, low] = value.to_be_bytes();
        self.regs.write(Sfr::Tmr1l, 0);
        self.regs.write(Sfr::Tmr1h, high);
        self.regs.write(Sfr::Tmr1l, low);
    }

    /// Reset the counter to zero
    pub fn clear_counter(&mut self) {
        self.set_counter(0);
    }

    /// Return true if the counter wrapped since the flag was last cleared
    pub fn has_overflowed(&mut self) -> bool {
        self.regs.read(Sfr::Pir1) & TMR1IF != 0
    }

    /// Acknowledge the overflow flag
    pub fn clear_overflow(&mut self) {
        self.regs.clear_bits(Sfr::Pir1, TMR1IF);
    }

    /// Destroy the driver and return the registers
    pub fn release(self) -> R {
        self.regs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Timer2Prescaler {
    Div1 = 0,
    Div4 = 1,
    Div16 = 2,
}

impl Timer2Prescaler {
    /// Instruction cycles per count
    pub fn divider(self) -> u32 {
        match self {
            Timer2Prescaler::Div1 => 1,
            Timer2Prescaler::Div4 => 4,
            Timer2Prescaler::Div16 => 16,
        }
    }
}

/// Timer2 settings for a match interrupt every `ticks()` instruction cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timer2Period {
    pub prescaler: Timer2Prescaler,
    /// 1..=16
    pub postscaler: u8,
    /// PR2
    pub period: u8,
}

impl Timer2Period {
    /// Instruction cycles between two TMR2IF flags
    pub fn ticks(&self) -> u32 {
        self.prescaler.divider() * self.postscaler as u32 * (self.period as u32 + 1)
    }
}

/// 8-bit timer with period register and postscaler
pub struct Timer2<R> {
    regs: R,
}

impl<R: Registers> Timer2<R> {
    /// Wrap Timer2, call `initialize` or `configure` before starting it
    pub fn new(regs: R) -> Self {
        Timer2 { regs }
    }

    /// Settings closest to an interrupt every `period_us` with a `fosc_hz` oscillator.
    ///
    /// Exact matches win, ties go to the smallest prescaler and postscaler. `None` if
    /// the period is shorter than one instruction cycle or longer than the timer reaches.
    pub fn period_for(fosc_hz: u32, period_us: u32) -> Option<Timer2Period> {
        let ticks = (fosc_hz as u64 / 4) * period_us as u64 / 1_000_000;
        if ticks == 0 || ticks > 16 * 16 * 256 {
            return None;
        }
        let mut best: Option<(u64, Timer2Period)> = None;
        for prescaler in [Timer2Prescaler::Div1, Timer2Prescaler::Div4, Timer2Prescaler::Div16] {
            for postscaler in 1..=16u8 {
                let step = prescaler.divider() as u64 * postscaler as u64;
                let count = ((ticks + step / 2) / step).clamp(1, 256);
                let error = (count * step).abs_diff(ticks);
                if best.map_or(true, |(e, _)| error < e) {
                    let period = (count - 1) as u8;
                    best = Some((error, Timer2Period { prescaler, postscaler, period }));
                }
            }
        }
        best.map(|(_, p)| p)
    }

    /// Configure prescaler and postscaler (1..=16), leaves the timer stopped
    pub fn initialize(&mut self, prescaler: Timer2Prescaler, postscaler: u8) -> Result<(), Error> {
        let toutps = Self::toutps(postscaler)?;
        self.regs.write(Sfr::T2con, toutps | prescaler as u8);
        Ok(())
    }

    /// Apply a computed period and start counting from zero
    pub fn configure(&mut self, period: Timer2Period) -> Result<(), Error> {
        self.initialize(period.prescaler, period.postscaler)?;
        self.set_period(period.period);
        self.clear_counter();
        self.start();
        Ok(())
    }

    /// Change the prescaler
    pub fn set_prescaler(&mut self, prescaler: Timer2Prescaler) {
        self.regs
            .modify(Sfr::T2con, |v| (v & !T2CKPS_MASK) | prescaler as u8);
    }

    /// Change the postscaler, 1 to 16
    pub fn set_postscaler(&mut self, postscaler: u8) -> Result<(), Error> {
        let toutps = Self::toutps(postscaler)?;
        self.regs.modify(Sfr::T2con, |v| (v & !TOUTPS_MASK) | toutps);
        Ok(())
    }

    /// Start counting
    pub fn start(&mut self) {
        self.regs.set_bits(Sfr::T2con, TMR2ON);
    }

    /// Stop counting, the counter is kept
    pub fn stop(&mut self) {
        self.regs.clear_bits(Sfr::T2con, TMR2ON);
    }

    /// Current TMR2 value
    pub fn counter(&mut self) -> u8 {
        self.regs.read(Sfr::Tmr2)
    }

    /// Load TMR2
    pub fn set_counter(&mut self, value: u8) {
        self.regs.write(Sfr::Tmr2, value);
    }

    /// Reset TMR2 to zero
    pub fn clear_counter(&mut self) {
        self.set_counter(0);
    }

    /// PR2, the value TMR2 counts up to
    pub fn period(&mut self) -> u8 {
        self.regs.read(Sfr::Pr2)
    }

    /// Load PR2
    pub fn set_period(&mut self, value: u8) {
        self.regs.write(Sfr::Pr2, value);
    }

    /// Return true if the postscaled match flag is set
    pub fn has_matched(&mut self) -> bool {
        self.regs.read(Sfr::Pir1) & TMR2IF != 0
    }

    /// Acknowledge the match flag
    pub fn clear_match(&mut self) {
        self.regs.clear_bits(Sfr::Pir1, TMR2IF);
    }

    /// Destroy the driver and return the registers
    pub fn release(self) -> R {
        self.regs
    }

    fn toutps(postscaler: u8) -> Result<u8, Error> {
        match postscaler {
            1..=16 => Ok((postscaler - 1) << TOUTPS_SHIFT),
            _ => Err(Error::InvalidArgument),
        }
    }
}
