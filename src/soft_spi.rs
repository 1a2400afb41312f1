//! SPI master on plain GPIO lines.
//!
//! Only the two modes the attached displays use are provided, both with data
//! valid on the first clock edge of a bit:
//!
//! | Mode | Clock idle | Data shifted out | Sampled on |
//! |-----:|:-----------|:-----------------|:-----------|
//! | `Mode00` | low  | before the rising edge  | rising edge  |
//! | `Mode10` | high | before the falling edge | falling edge |

use crate::bitbang::{BitClock, BitOrder};
use core::marker::PhantomData;
use hal::blocking::delay::DelayUs;
use hal::blocking::spi::{Transfer, Write};
use hal::digital::v2::{InputPin, OutputPin};
use hal::spi::{Mode, MODE_0, MODE_2};

/// Clock polarity and phase, named after the PIC (CKP, CKE) convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SoftSpiMode {
    /// Clock idles low (CPOL = 0, CPHA = 0)
    #[default]
    Mode00,
    /// Clock idles high (CPOL = 1, CPHA = 0)
    Mode10,
}

impl SoftSpiMode {
    /// Return true if the clock rests at the high level
    pub fn idle_high(self) -> bool {
        matches!(self, SoftSpiMode::Mode10)
    }

    /// The equivalent embedded-hal mode
    pub fn to_hal(self) -> Mode {
        match self {
            SoftSpiMode::Mode00 => MODE_0,
            SoftSpiMode::Mode10 => MODE_2,
        }
    }
}

/// Bus settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SoftSpiConfig {
    /// Clock polarity and phase
    pub mode: SoftSpiMode,
    /// Half of the clock period in microseconds, zero to run as fast as the pins allow
    pub half_period_us: u16,
}

impl Default for SoftSpiConfig {
    fn default() -> Self {
        SoftSpiConfig {
            mode: SoftSpiMode::Mode00,
            half_period_us: 0,
        }
    }
}

/// Stand-in for a missing MISO line, always reads low
#[derive(Debug, Clone, Copy)]
pub struct NoMiso<E> {
    _error: PhantomData<E>,
}

impl<E> NoMiso<E> {
    /// Placeholder for a bus without a data input line
    pub fn new() -> Self {
        NoMiso {
            _error: PhantomData,
        }
    }
}

impl<E> Default for NoMiso<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InputPin for NoMiso<E> {
    type Error = E;

    fn is_high(&self) -> Result<bool, E> {
        Ok(false)
    }

    fn is_low(&self) -> Result<bool, E> {
        Ok(true)
    }
}

/// Bit-banged SPI master, most significant bit first
pub struct SoftSpi<SCK, MOSI, MISO, D> {
    /// MOSI as data line, SCK as clock line
    clock: BitClock<MOSI, SCK, D>,
    /// Input line, `NoMiso` when write-only
    miso: MISO,
    /// Current mode
    mode: SoftSpiMode,
}

impl<SCK, MOSI, MISO, D, P> SoftSpi<SCK, MOSI, MISO, D>
where
    SCK: OutputPin<Error = P>,
    MOSI: OutputPin<Error = P>,
    MISO: InputPin<Error = P>,
    D: DelayUs<u16>,
{
    /// Take the lines, park the clock at its idle level and MOSI low
    pub fn new(sck: SCK, mosi: MOSI, miso: MISO, delay: D, config: SoftSpiConfig) -> Result<Self, P> {
        let mut spi = SoftSpi {
            clock: BitClock::new(
                mosi,
                sck,
                delay,
                config.mode.idle_high(),
                config.half_period_us,
            ),
            miso,
            mode: config.mode,
        };
        spi.clock.idle()?;
        spi.clock.set_data(false)?;
        Ok(spi)
    }

    /// Return the current mode
    pub fn mode(&self) -> SoftSpiMode {
        self.mode
    }

    /// Switch mode and move the clock to the new idle level
    pub fn set_mode(&mut self, mode: SoftSpiMode) -> Result<(), P> {
        self.mode = mode;
        self.clock.set_idle_high(mode.idle_high());
        self.clock.idle()
    }

    /// Shift one byte out, MSB first
    pub fn send_byte(&mut self, byte: u8) -> Result<(), P> {
        self.clock.idle()?;
        self.clock.write_byte(byte, BitOrder::MsbFirst)
    }

    /// Shift one byte out while shifting the reply in from MISO
    pub fn transfer_byte(&mut self, byte: u8) -> Result<u8, P> {
        self.clock.idle()?;
        let mut reply = 0u8;
        for i in (0..8).rev() {
            let miso = &self.miso;
            let bit = self.clock.clock_bit(byte & (1 << i) != 0, || miso.is_high())?;
            reply = (reply << 1) | bit as u8;
        }
        Ok(reply)
    }

    /// Destroy the driver and return the lines and the delay provider
    pub fn release(self) -> (SCK, MOSI, MISO, D) {
        let (mosi, sck, delay) = self.clock.release();
        (sck, mosi, self.miso, delay)
    }
}

impl<SCK, MOSI, MISO, D, P> Write<u8> for SoftSpi<SCK, MOSI, MISO, D>
where
    SCK: OutputPin<Error = P>,
    MOSI: OutputPin<Error = P>,
    MISO: InputPin<Error = P>,
    D: DelayUs<u16>,
{
    type Error = P;

    fn write(&mut self, words: &[u8]) -> Result<(), P> {
        for word in words {
            self.send_byte(*word)?;
        }
        Ok(())
    }
}

impl<SCK, MOSI, MISO, D, P> Transfer<u8> for SoftSpi<SCK, MOSI, MISO, D>
where
    SCK: OutputPin<Error = P>,
    MOSI: OutputPin<Error = P>,
    MISO: InputPin<Error = P>,
    D: DelayUs<u16>,
{
    type Error = P;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], P> {
        for word in words.iter_mut() {
            *word = self.transfer_byte(*word)?;
        }
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{frames, Bench};
    use core::convert::Infallible;

    const MOSI: u8 = 0;
    const SCK: u8 = 1;
    const MISO: u8 = 2;

    fn rising_edge_bits(bench: &Bench, idle_high: bool) -> std::vec::Vec<bool> {
        let mut bits = std::vec::Vec::new();
        let mut data = false;
        for e in bench.edges() {
            if e.line == MOSI {
                data = e.high;
            } else if e.line == SCK && e.high != idle_high {
                bits.push(data);
            }
        }
        bits
    }

    #[test]
    fn mode00_idles_low_and_sends_msb_first() {
        let bench = Bench::new();
        let config = SoftSpiConfig::default();
        let mut spi = SoftSpi::new(
            bench.pin(SCK),
            bench.pin(MOSI),
            NoMiso::<Infallible>::new(),
            bench.delay(),
            config,
        )
        .unwrap();
        spi.write(&[0x81]).unwrap();

        let edges = bench.edges();
        assert_eq!(edges.first().map(|e| (e.line, e.high)), Some((SCK, false)));
        assert_eq!(edges.last().map(|e| (e.line, e.high)), Some((SCK, false)));
        let bits = rising_edge_bits(&bench, false);
        assert_eq!(bits, vec![true, false, false, false, false, false, false, true]);
    }

    #[test]
    fn mode10_idles_high_and_data_leads_the_falling_edge() {
        let bench = Bench::new();
        let config = SoftSpiConfig {
            mode: SoftSpiMode::Mode10,
            half_period_us: 2,
        };
        let mut spi = SoftSpi::new(
            bench.pin(SCK),
            bench.pin(MOSI),
            NoMiso::<Infallible>::new(),
            bench.delay(),
            config,
        )
        .unwrap();
        bench.clear();
        spi.send_byte(0x40).unwrap();

        let edges = bench.edges();
        assert_eq!(edges.last().map(|e| (e.line, e.high)), Some((SCK, true)));
        let bits = rising_edge_bits(&bench, true);
        assert_eq!(bits, vec![false, true, false, false, false, false, false, false]);
        // every data change happens a half period before the active edge
        for (i, e) in edges.iter().enumerate() {
            if e.line == MOSI && i + 1 < edges.len() {
                let next = edges[i + 1];
                assert_eq!((next.line, next.high), (SCK, false));
                assert_eq!(next.at_us - e.at_us, 2);
            }
        }
    }

    #[test]
    fn transfer_samples_miso_on_the_active_edge() {
        let bench = Bench::new();
        let miso = bench.input(
            MISO,
            &[true, false, true, false, false, false, true, true],
            false,
        );
        let mut spi = SoftSpi::new(
            bench.pin(SCK),
            bench.pin(MOSI),
            miso,
            bench.delay(),
            SoftSpiConfig::default(),
        )
        .unwrap();
        let mut buf = [0xFF];
        spi.transfer(&mut buf).unwrap();
        assert_eq!(buf, [0b1010_0011]);
        assert_eq!(bench.samples().len(), 8);
    }

    #[test]
    fn frames_drive_a_select_line_around_the_bytes() {
        let bench = Bench::new();
        let mut cs = bench.pin(3);
        let mut spi = SoftSpi::new(
            bench.pin(SCK),
            bench.pin(MOSI),
            NoMiso::<Infallible>::new(),
            bench.delay(),
            SoftSpiConfig::default(),
        )
        .unwrap();
        cs.set_high().unwrap();
        cs.set_low().unwrap();
        spi.write(&[0x0C, 0x01]).unwrap();
        cs.set_high().unwrap();

        let got = frames(&bench.edges(), MOSI, SCK, 4, 3);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].bytes(), vec![0x0C, 0x01]);
    }
}
