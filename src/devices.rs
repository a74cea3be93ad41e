//! Simulated washer hardware: the read-only sensor set and the console panel
//! that reports actuator commands.

use ::std::io::{self, Write};
use super::instructions::Word;
use super::machine::Machine;

/// Sensor readings present at power-on. Nothing adds, removes or writes them later.
pub const WASHER_SENSORS: [(&str, Word); 4] = [
    ("water_level", 50),
    ("temperature", 20),
    ("door_closed", 1),
    ("weight", 5),
];

#[derive(Debug, Clone)]
pub struct Sensors {
    readings: Vec<(&'static str, Word)>,
}

impl Sensors {
    pub fn washer() -> Self {
        Self {
            readings: WASHER_SENSORS.to_vec(),
        }
    }

    pub fn read(&self, name: &str) -> Option<Word> {
        self.readings
            .iter()
            .find(|(sensor, _)| *sensor == name)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Word)> + '_ {
        self.readings.iter().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuator<'a> {
    Motor,
    WaterValve,
    WaterPump,
    Heater,
    Other(&'a str),
}

impl<'a> Actuator<'a> {
    pub fn from_name(name: &'a str) -> Self {
        match name {
            "motor" => Actuator::Motor,
            "valvula_agua" => Actuator::WaterValve,
            "bomba_agua" => Actuator::WaterPump,
            "resistor" => Actuator::Heater,
            other => Actuator::Other(other),
        }
    }

    /// Human readable state for a commanded value. Any nonzero value is "on".
    pub fn describe(&self, value: Word) -> String {
        let on = value != 0;
        match self {
            Actuator::Motor => format!("Motor: {}", if on { "ON" } else { "OFF" }),
            Actuator::WaterValve => format!("Water valve: {}", if on { "OPEN" } else { "CLOSED" }),
            Actuator::WaterPump => format!("Water pump: {}", if on { "ON" } else { "OFF" }),
            Actuator::Heater => format!("Heater (resistor): {}", if on { "ON" } else { "OFF" }),
            Actuator::Other(name) => format!("Actuator '{}': {}", name, value),
        }
    }
}

/// Console the controller program talks to. Everything written here is
/// program output; diagnostics go through the `log` macros instead.
pub struct Panel<W: Write> {
    out: W,
}

impl<W: Write> Panel<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn banner(&mut self) -> io::Result<()> {
        writeln!(self.out, "=== Running washer VM ===")?;
        writeln!(self.out)
    }

    pub fn emit(&mut self, name: &str, value: Word) -> io::Result<()> {
        writeln!(self.out, "[EMIT] {} = {}", name, value)?;
        writeln!(self.out, "  -> {}", Actuator::from_name(name).describe(value))
    }

    pub fn wait(&mut self, ticks: Word, total: Word) -> io::Result<()> {
        writeln!(self.out, "[WAIT] waiting {} ticks (total: {})", ticks, total)
    }

    pub fn halt(&mut self) -> io::Result<()> {
        writeln!(self.out, "[HALT] program finished")
    }

    pub fn summary(&mut self, machine: &Machine) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "=== Final state ===")?;
        writeln!(self.out, "R0 = {}", machine.registers.r0())?;
        writeln!(self.out, "R1 = {}", machine.registers.r1())?;
        writeln!(self.out, "Total ticks: {}", machine.ticks)?;
        writeln!(self.out, "Memory allocated: {} variables", machine.memory.len())?;
        self.out.flush()
    }

    pub fn dump_state(&mut self, machine: &Machine) -> io::Result<()> {
        writeln!(self.out, "Memory:")?;
        for (name, value) in machine.memory.iter() {
            writeln!(self.out, "  {} = {}", name, value)?;
        }
        writeln!(self.out, "Stack:")?;
        let stack = machine.stack.as_slice();
        for (idx, value) in stack.iter().enumerate().rev() {
            writeln!(self.out, "  [{:0>4}] {}", stack.len() - idx - 1, value)?;
        }
        writeln!(self.out, "Sensors:")?;
        for (name, value) in machine.sensors.iter() {
            writeln!(self.out, "  {} = {}", name, value)?;
        }
        self.out.flush()
    }
}
