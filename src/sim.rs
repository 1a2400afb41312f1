//! Logic-level bench for the bit-banged drivers.
//!
//! `SimPin`s share one `Bench` that timestamps every pin write against a virtual
//! clock advanced by `SimDelay`. The device models below replay the recorded
//! trace the way the real parts would see it.

use core::cell::RefCell;
use core::convert::Infallible;
use hal::blocking::delay::{DelayMs, DelayUs};
use hal::digital::v2::{InputPin, OutputPin};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub line: u8,
    pub high: bool,
    pub at_us: u64,
}

#[derive(Default)]
struct State {
    now_us: u64,
    edges: Vec<Edge>,
    scripts: Vec<(u8, VecDeque<bool>, bool)>,
    samples: Vec<(u8, u64)>,
}

#[derive(Clone, Default)]
pub struct Bench {
    state: Rc<RefCell<State>>,
}

impl Bench {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin(&self, line: u8) -> SimPin {
        SimPin {
            bench: self.clone(),
            line,
        }
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay {
            bench: self.clone(),
        }
    }

    /// Input line that answers successive reads from `levels`, then repeats `rest`
    pub fn input(&self, line: u8, levels: &[bool], rest: bool) -> SimInput {
        self.state
            .borrow_mut()
            .scripts
            .push((line, levels.iter().copied().collect(), rest));
        SimInput {
            bench: self.clone(),
            line,
        }
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.state.borrow().edges.clone()
    }

    pub fn samples(&self) -> Vec<(u8, u64)> {
        self.state.borrow().samples.clone()
    }

    pub fn now_us(&self) -> u64 {
        self.state.borrow().now_us
    }

    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.edges.clear();
        state.samples.clear();
    }

    fn drive(&self, line: u8, high: bool) {
        let mut state = self.state.borrow_mut();
        let at_us = state.now_us;
        state.edges.push(Edge { line, high, at_us });
    }

    fn advance(&self, us: u64) {
        self.state.borrow_mut().now_us += us;
    }

    fn sample(&self, line: u8) -> bool {
        let mut state = self.state.borrow_mut();
        let now = state.now_us;
        state.samples.push((line, now));
        let script = state
            .scripts
            .iter_mut()
            .find(|(l, _, _)| *l == line)
            .expect("no script for input line");
        script.1.pop_front().unwrap_or(script.2)
    }
}

#[derive(Clone)]
pub struct SimPin {
    bench: Bench,
    line: u8,
}

impl OutputPin for SimPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.bench.drive(self.line, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.bench.drive(self.line, true);
        Ok(())
    }
}

pub struct SimInput {
    bench: Bench,
    line: u8,
}

impl InputPin for SimInput {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(self.bench.sample(self.line))
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        self.is_high().map(|h| !h)
    }
}

pub struct SimDelay {
    bench: Bench,
}

impl DelayUs<u16> for SimDelay {
    fn delay_us(&mut self, us: u16) {
        self.bench.advance(us as u64);
    }
}

impl DelayUs<u32> for SimDelay {
    fn delay_us(&mut self, us: u32) {
        self.bench.advance(us as u64);
    }
}

impl DelayMs<u8> for SimDelay {
    fn delay_ms(&mut self, ms: u8) {
        self.bench.advance(ms as u64 * 1000);
    }
}

impl DelayMs<u16> for SimDelay {
    fn delay_ms(&mut self, ms: u16) {
        self.bench.advance(ms as u64 * 1000);
    }
}

/// Level of `line` at `at_us`, or `idle` before its first write
pub fn level_at(edges: &[Edge], line: u8, at_us: u64, idle: bool) -> bool {
    edges
        .iter()
        .filter(|e| e.line == line && e.at_us <= at_us)
        .last()
        .map_or(idle, |e| e.high)
}

/// Replays pin writes, calling `on_rise` for every low-to-high transition
fn replay<F: FnMut(u8, &[bool; 16], usize)>(edges: &[Edge], mut on_rise: F) {
    let mut levels = [false; 16];
    for (i, e) in edges.iter().enumerate() {
        let line = e.line as usize;
        let rose = !levels[line] && e.high;
        levels[line] = e.high;
        if rose {
            on_rise(e.line, &levels, i);
        }
    }
}

/// 74HC595: shift on SH_CP rising, copy to the outputs on ST_CP rising.
/// Returns the output byte after every latch together with the edge index.
pub fn hc595(edges: &[Edge], data: u8, clock: u8, latch: u8) -> Vec<(usize, u8)> {
    let mut shift = 0u8;
    let mut latched = Vec::new();
    replay(edges, |line, levels, i| {
        if line == clock {
            shift = (shift << 1) | levels[data as usize] as u8;
        } else if line == latch {
            latched.push((i, shift));
        }
    });
    latched
}

/// Daisy chain of MAX7219s, chip 0 wired to the controller.
pub struct Max7219Chain {
    pub registers: Vec<[u8; 16]>,
    /// Non-NOP words taken by each chip at every CS rising edge: (chip, register, value)
    pub loads: Vec<Vec<(usize, u8, u8)>>,
}

pub fn max7219_chain(edges: &[Edge], chips: usize, data: u8, clock: u8, cs: u8) -> Max7219Chain {
    let mut shift = vec![0u16; chips];
    let mut chain = Max7219Chain {
        registers: vec![[0; 16]; chips],
        loads: Vec::new(),
    };
    replay(edges, |line, levels, _| {
        if line == clock && !levels[cs as usize] {
            let mut carry = levels[data as usize] as u16;
            for word in shift.iter_mut() {
                let out = *word >> 15;
                *word = (*word << 1) | carry;
                carry = out;
            }
        } else if line == cs {
            let mut load = Vec::new();
            for (chip, word) in shift.iter().enumerate() {
                let reg = ((word >> 8) & 0x0F) as u8;
                if reg != 0 {
                    chain.registers[chip][reg as usize] = *word as u8;
                    load.push((chip, reg, *word as u8));
                }
            }
            chain.loads.push(load);
        }
    });
    chain
}

/// One CE-low window of a select/register-select serial device.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub rs: bool,
    pub bits: Vec<bool>,
}

impl Frame {
    pub fn bytes(&self) -> Vec<u8> {
        self.bits
            .chunks(8)
            .map(|c| c.iter().fold(0u8, |acc, b| (acc << 1) | *b as u8))
            .collect()
    }
}

/// Splits the trace into frames delimited by an active-low enable, data sampled on
/// clock rising edges
pub fn frames(edges: &[Edge], data: u8, clock: u8, rs: u8, ce: u8) -> Vec<Frame> {
    let mut levels = [true; 16];
    levels[clock as usize] = false;
    let mut out = Vec::new();
    let mut current: Option<Frame> = None;
    for e in edges {
        let line = e.line as usize;
        let before = levels[line];
        levels[line] = e.high;
        if e.line == ce && before && !e.high {
            current = Some(Frame {
                rs: levels[rs as usize],
                bits: Vec::new(),
            });
        } else if e.line == ce && !before && e.high {
            if let Some(frame) = current.take() {
                out.push(frame);
            }
        } else if e.line == clock && !before && e.high {
            if let Some(frame) = current.as_mut() {
                frame.bits.push(levels[data as usize]);
            }
        }
    }
    out
}

/// Values present on `lines` (bit 0 first) with the RS level, sampled on every enable
/// falling edge
pub fn strobes(edges: &[Edge], lines: &[u8], rs: u8, en: u8) -> Vec<(bool, u8)> {
    let mut levels = [false; 16];
    let mut out = Vec::new();
    for e in edges {
        let line = e.line as usize;
        let before = levels[line];
        levels[line] = e.high;
        if e.line == en && before && !e.high {
            let value = lines
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, l)| acc | (levels[*l as usize] as u8) << i);
            out.push((levels[rs as usize], value));
        }
    }
    out
}

/// Decodes 8N1 frames from a transmit line by sampling at mid-bit
pub fn uart_decode(edges: &[Edge], tx: u8, bit_us: u64) -> Vec<u8> {
    let mut out = Vec::new();
    let mut idle_high = true;
    let mut after = 0u64;
    for e in edges.iter().filter(|e| e.line == tx) {
        if idle_high && !e.high && e.at_us >= after {
            let start = e.at_us;
            let mut byte = 0u8;
            for bit in 0..8 {
                let t = start + bit_us * (bit + 1) + bit_us / 2;
                if level_at(edges, tx, t, true) {
                    byte |= 1 << bit;
                }
            }
            out.push(byte);
            after = start + bit_us * 9 + bit_us / 2;
        }
        idle_high = e.high;
    }
    out
}
