//! Run state of the washer controller: registers, named memory, the bounded
//! stack, the sensor panel, and the counters the interpreter advances.

use ::std::collections::BTreeMap;
use super::config::Limits;
use super::devices::Sensors;
use super::errors::Fault;
use super::instructions::{Register, Word};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    values: [Word; 2],
}

impl Registers {
    pub fn get(&self, reg: Register) -> Word {
        self.values[reg.index()]
    }

    pub fn set(&mut self, reg: Register, value: Word) {
        self.values[reg.index()] = value;
    }

    pub fn r0(&self) -> Word {
        self.get(Register::R0)
    }

    pub fn r1(&self) -> Word {
        self.get(Register::R1)
    }
}

#[derive(Debug, Clone)]
pub struct Stack {
    values: Vec<Word>,
    capacity: usize,
}

impl Stack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::new(),
            capacity,
        }
    }

    pub fn push(&mut self, value: Word) -> Result<(), Fault> {
        if self.values.len() >= self.capacity {
            return Err(Fault::StackOverflow {
                capacity: self.capacity,
            });
        }
        self.values.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Word, Fault> {
        self.values.pop().ok_or(Fault::StackUnderflow)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values from bottom to top.
    pub fn as_slice(&self) -> &[Word] {
        &self.values
    }
}

/// Named variables. Cells are created on first write or `ALLOC` and never removed.
#[derive(Debug, Clone)]
pub struct Memory {
    cells: BTreeMap<String, Word>,
    capacity: usize,
}

impl Memory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: BTreeMap::new(),
            capacity,
        }
    }

    pub fn get(&self, name: &str) -> Option<Word> {
        self.cells.get(name).copied()
    }

    /// Returns the cell for `name`, creating it with value 0 if absent.
    pub fn alloc(&mut self, name: &str) -> Result<&mut Word, Fault> {
        if !self.cells.contains_key(name) && self.cells.len() >= self.capacity {
            return Err(Fault::MemoryExhausted {
                capacity: self.capacity,
            });
        }
        Ok(self.cells.entry(name.to_owned()).or_insert(0))
    }

    pub fn store(&mut self, name: &str, value: Word) -> Result<(), Fault> {
        *self.alloc(name)? = value;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Word)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

pub struct Machine {
    pub registers: Registers,
    pub memory: Memory,
    pub stack: Stack,
    pub sensors: Sensors,
    pub program_counter: usize,
    pub halted: bool,
    pub ticks: Word,
}

impl Machine {
    pub fn new(limits: &Limits) -> Self {
        Self {
            registers: Registers::default(),
            memory: Memory::with_capacity(limits.max_memory),
            stack: Stack::with_capacity(limits.max_stack),
            sensors: Sensors::washer(),
            program_counter: 0,
            halted: false,
            ticks: 0,
        }
    }
}
