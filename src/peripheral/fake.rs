//! Register file double with optional behaviour hooks.

use super::{Registers, Sfr};
use std::boxed::Box;
use std::vec::Vec;

/// Plain memory behind the fake, plus an access log
pub struct RegisterFile {
    memory: [u8; 0x200],
    pub writes: Vec<(Sfr, u8)>,
    pub reads: Vec<Sfr>,
}

impl RegisterFile {
    pub fn get(&self, register: Sfr) -> u8 {
        self.memory[register.address() as usize]
    }

    pub fn set(&mut self, register: Sfr, value: u8) {
        self.memory[register.address() as usize] = value;
    }
}

type WriteHook = Box<dyn FnMut(&mut RegisterFile, Sfr, u8)>;
type ReadHook = Box<dyn FnMut(&mut RegisterFile, Sfr)>;

pub struct FakeRegisters {
    file: RegisterFile,
    on_write: WriteHook,
    on_read: ReadHook,
}

impl FakeRegisters {
    pub fn new() -> Self {
        FakeRegisters {
            file: RegisterFile {
                memory: [0; 0x200],
                writes: Vec::new(),
                reads: Vec::new(),
            },
            on_write: Box::new(|_, _, _| {}),
            on_read: Box::new(|_, _| {}),
        }
    }

    /// Run `hook` after every write, with the value written
    pub fn on_write<F: FnMut(&mut RegisterFile, Sfr, u8) + 'static>(mut self, hook: F) -> Self {
        self.on_write = Box::new(hook);
        self
    }

    /// Run `hook` before every read
    pub fn on_read<F: FnMut(&mut RegisterFile, Sfr) + 'static>(mut self, hook: F) -> Self {
        self.on_read = Box::new(hook);
        self
    }

    /// Value without logging or hooks
    pub fn get(&self, register: Sfr) -> u8 {
        self.file.get(register)
    }

    pub fn set(&mut self, register: Sfr, value: u8) {
        self.file.set(register, value);
    }

    pub fn writes(&self) -> &[(Sfr, u8)] {
        &self.file.writes
    }

    pub fn writes_to(&self, register: Sfr) -> Vec<u8> {
        self.file
            .writes
            .iter()
            .filter(|(r, _)| *r == register)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn reads(&self, register: Sfr) -> usize {
        self.file.reads.iter().filter(|r| **r == register).count()
    }
}

impl Registers for FakeRegisters {
    fn read(&mut self, register: Sfr) -> u8 {
        (self.on_read)(&mut self.file, register);
        self.file.reads.push(register);
        self.file.get(register)
    }

    fn write(&mut self, register: Sfr, value: u8) {
        self.file.set(register, value);
        self.file.writes.push((register, value));
        (self.on_write)(&mut self.file, register, value);
    }
}
