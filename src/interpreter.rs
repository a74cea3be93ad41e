use ::std::cmp::Ordering;
use ::std::io::{self, Write};
use num::traits::{WrappingAdd, WrappingMul, WrappingSub, Zero};
use super::assembly::{Assembly, LabelTable};
use super::devices::Panel;
use super::errors::Fault;
use super::instructions::{BinOp, Condition, Inst, Operand, Register, Word};
use super::machine::{Machine, Registers};

/// What a single step did, for the run loop to report.
#[derive(Debug, PartialEq, Eq)]
pub enum ExecutionStatus<'a> {
    Normal,
    Jump(usize),
    Emit(&'a str, Word),
    Wait(Word),
    Halt,
    /// The program counter ran past the last instruction.
    End,
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    Normal,
    Error(Fault),
}

/// Runs the program to completion: banner, fetch/execute loop, final summary.
///
/// Runtime faults end the run but are not errors here; they come back as
/// [`Halt::Error`]. Only failing to write to `panel` is.
pub fn execute_assembly<W: Write>(
    asm: &Assembly,
    machine: &mut Machine,
    panel: &mut Panel<W>,
    max_steps: Option<u64>,
) -> io::Result<Halt> {
    panel.banner()?;
    let halt = run(asm, machine, panel, max_steps)?;
    panel.summary(machine)?;
    Ok(halt)
}

pub fn run<W: Write>(
    asm: &Assembly,
    machine: &mut Machine,
    panel: &mut Panel<W>,
    max_steps: Option<u64>,
) -> io::Result<Halt> {
    let mut executed: u64 = 0;
    loop {
        if let Some(limit) = max_steps {
            if executed >= limit && machine.program_counter < asm.len() {
                return Ok(fault(asm, machine, Fault::StepLimit { limit }));
            }
        }
        match step(asm, machine) {
            Ok(ExecutionStatus::Normal) | Ok(ExecutionStatus::Jump(_)) => (),
            Ok(ExecutionStatus::Emit(actuator, value)) => panel.emit(actuator, value)?,
            Ok(ExecutionStatus::Wait(ticks)) => panel.wait(ticks, machine.ticks)?,
            Ok(ExecutionStatus::Halt) => {
                panel.halt()?;
                return Ok(Halt::Normal);
            }
            Ok(ExecutionStatus::End) => return Ok(Halt::Normal),
            Err(err) => return Ok(fault(asm, machine, err)),
        }
        executed += 1;
    }
}

fn fault(asm: &Assembly, machine: &mut Machine, fault: Fault) -> Halt {
    match asm.fetch(machine.program_counter) {
        Some(instruction) => error!("line {}: {}", instruction.line, fault),
        None => error!("{}", fault),
    }
    machine.halted = true;
    Halt::Error(fault)
}

/// Executes the instruction under the program counter and moves the counter.
///
/// On a fault the machine is left exactly where the instruction found it,
/// counter included.
pub fn step<'a>(asm: &'a Assembly, machine: &mut Machine) -> Result<ExecutionStatus<'a>, Fault> {
    let instruction = match asm.fetch(machine.program_counter) {
        Some(instruction) => instruction,
        None => return Ok(ExecutionStatus::End),
    };
    trace!(
        "[PC={:0>4}] line {:>3}: {}",
        machine.program_counter,
        instruction.line,
        instruction.inst
    );
    let status = execute(&instruction.inst, &asm.labels, machine)?;
    match status {
        ExecutionStatus::Jump(target) => machine.program_counter = target,
        ExecutionStatus::Halt => machine.halted = true,
        _ => machine.program_counter += 1,
    }
    Ok(status)
}

fn resolve(registers: &Registers, operand: &Operand) -> Word {
    match *operand {
        Operand::Register(reg) => registers.get(reg),
        Operand::Immediate(value) => value,
    }
}

#[inline(always)]
fn binary(registers: &mut Registers, operator: fn(&Word, &Word) -> Word) {
    let result = operator(&registers.r0(), &registers.r1());
    registers.set(Register::R0, result);
}

fn flag(value: bool) -> Word {
    if value {
        1
    } else {
        0
    }
}

fn execute<'a>(
    inst: &'a Inst,
    labels: &LabelTable,
    machine: &mut Machine,
) -> Result<ExecutionStatus<'a>, Fault> {
    let regs = &mut machine.registers;
    match inst {
        Inst::PushImmediate(value) => machine.stack.push(*value)?,
        Inst::PushVariable(name) => {
            let value = machine
                .memory
                .get(name)
                .ok_or_else(|| Fault::UndefinedVariable(name.clone()))?;
            machine.stack.push(value)?;
        }
        Inst::Push(reg) => {
            if let Some(reg) = reg {
                machine.stack.push(regs.get(*reg))?;
            }
        }
        Inst::Pop(reg) => {
            if let Some(reg) = reg {
                let value = machine.stack.pop()?;
                regs.set(*reg, value);
            }
        }
        Inst::Load(reg, name) => {
            let value = machine
                .memory
                .get(name)
                .ok_or_else(|| Fault::UndefinedVariable(name.clone()))?;
            if let Some(reg) = reg {
                regs.set(*reg, value);
            }
        }
        Inst::Store(name, operand) => {
            let value = resolve(regs, operand);
            machine.memory.store(name, value)?;
        }
        Inst::Alloc(name) => {
            machine.memory.alloc(name)?;
        }
        Inst::Binary(op, Some(Register::R0), Some(Register::R1)) => match op {
            BinOp::Add => binary(regs, <Word as WrappingAdd>::wrapping_add),
            BinOp::Sub => binary(regs, <Word as WrappingSub>::wrapping_sub),
            BinOp::Mul => binary(regs, <Word as WrappingMul>::wrapping_mul),
            BinOp::Div => {
                if regs.r1().is_zero() {
                    return Err(Fault::DivisionByZero);
                }
                binary(regs, |a, b| a.wrapping_div(*b));
            }
        },
        Inst::Binary(..) => (),
        Inst::SubImmediate(Some(Register::R0), value) => {
            let result = regs.r0().wrapping_sub(*value);
            regs.set(Register::R0, result);
        }
        Inst::SubImmediate(..) => (),
        Inst::Compare(a, b) => {
            let result = match resolve(regs, a).cmp(&resolve(regs, b)) {
                Ordering::Greater => 1,
                Ordering::Less => -1,
                Ordering::Equal => 0,
            };
            regs.set(Register::R0, result);
        }
        Inst::Set(relation) => {
            let result = flag(relation.holds(regs.r0()));
            regs.set(Register::R0, result);
        }
        Inst::And => {
            let result = flag(!regs.r0().is_zero() && !regs.r1().is_zero());
            regs.set(Register::R0, result);
        }
        Inst::Or => {
            let result = flag(!regs.r0().is_zero() || !regs.r1().is_zero());
            regs.set(Register::R0, result);
        }
        Inst::Not => {
            let result = flag(regs.r0().is_zero());
            regs.set(Register::R0, result);
        }
        Inst::Jump(condition, label) => {
            let taken = match condition {
                Condition::Always => true,
                Condition::Zero => regs.r0().is_zero(),
                Condition::LessOrEqual => !regs.r0().is_positive(),
            };
            if taken {
                let target = labels
                    .get(label)
                    .ok_or_else(|| Fault::UndefinedLabel(label.clone()))?;
                return Ok(ExecutionStatus::Jump(target));
            }
        }
        Inst::Read(reg, sensor) => {
            let value = machine
                .sensors
                .read(sensor)
                .ok_or_else(|| Fault::UndefinedSensor(sensor.clone()))?;
            if let Some(reg) = reg {
                regs.set(*reg, value);
            }
        }
        Inst::Emit(actuator) => return Ok(ExecutionStatus::Emit(actuator.as_str(), regs.r0())),
        Inst::Wait => {
            let ticks = regs.r0();
            machine.ticks = machine.ticks.wrapping_add(ticks);
            return Ok(ExecutionStatus::Wait(ticks));
        }
        Inst::Halt => return Ok(ExecutionStatus::Halt),
        Inst::Unknown(opcode) => return Err(Fault::UnknownOpcode(opcode.clone())),
    }
    Ok(ExecutionStatus::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::loader::Loader;

    struct Outcome {
        machine: Machine,
        halt: Halt,
        output: String,
    }

    fn run_with(source: &str, limits: Limits, setup: impl FnOnce(&mut Machine)) -> Outcome {
        let asm = Loader::new(limits).load_source("test", source).unwrap();
        let mut machine = Machine::new(&limits);
        setup(&mut machine);
        let mut panel = Panel::new(Vec::new());
        let halt = run(&asm, &mut machine, &mut panel, limits.max_steps).unwrap();
        let output = String::from_utf8(panel.into_inner()).unwrap();
        Outcome {
            machine,
            halt,
            output,
        }
    }

    fn run_source(source: &str) -> Outcome {
        run_with(source, Limits::default(), |_| ())
    }

    #[test]
    fn push_then_pop() {
        let out = run_source("PUSHI 5\nPOP R0\n");
        assert_eq!(out.machine.registers.r0(), 5);
        assert!(out.machine.stack.is_empty());
        assert_eq!(out.halt, Halt::Normal);
    }

    #[test]
    fn push_register_and_variable() {
        let out = run_source("PUSHI 4\nPOP R1\nPUSH R1\nSTORE x 9\nPUSHV x\nPOP R0\n");
        assert_eq!(out.machine.registers.r0(), 9);
        assert_eq!(out.machine.stack.as_slice(), &[4]);
    }

    #[test]
    fn store_load_round_trip() {
        let out = run_source("PUSHI 42\nPOP R0\nSTORE x R0\nLOAD R1 x\n");
        assert_eq!(out.machine.registers.r1(), 42);
        assert_eq!(out.machine.memory.get("x"), Some(42));
    }

    #[test]
    fn store_with_non_numeric_value_stores_zero() {
        let out = run_source("STORE x banana\n");
        assert_eq!(out.machine.memory.get("x"), Some(0));
        assert_eq!(out.halt, Halt::Normal);
    }

    #[test]
    fn alloc_creates_zero_once() {
        let out = run_source("STORE x 3\nALLOC x\nALLOC y\n");
        assert_eq!(out.machine.memory.get("x"), Some(3));
        assert_eq!(out.machine.memory.get("y"), Some(0));
        assert_eq!(out.machine.memory.len(), 2);
    }

    #[test]
    fn arithmetic_on_r0_r1() {
        let out = run_source("PUSHI 7\nPOP R0\nPUSHI 3\nPOP R1\nADD R0 R1\nMUL R0 R1\nSUB R0 R1\nDIV R0 R1\n");
        // ((7 + 3) * 3 - 3) / 3
        assert_eq!(out.machine.registers.r0(), 9);
    }

    #[test]
    fn arithmetic_with_other_registers_is_ignored() {
        let out = run_source("PUSHI 7\nPOP R0\nADD R1 R0\nADD R0\nSUBI R1 2\n");
        assert_eq!(out.machine.registers.r0(), 7);
        assert_eq!(out.machine.registers.r1(), 0);
        assert_eq!(out.halt, Halt::Normal);
    }

    #[test]
    fn arithmetic_wraps() {
        let out = run_with("ADD R0 R1\n", Limits::default(), |machine| {
            machine.registers.set(Register::R0, Word::MAX);
            machine.registers.set(Register::R1, 1);
        });
        assert_eq!(out.machine.registers.r0(), Word::MIN);
    }

    #[test]
    fn subtract_immediate() {
        let out = run_source("PUSHI 10\nPOP R0\nSUBI R0 4\n");
        assert_eq!(out.machine.registers.r0(), 6);
    }

    #[test]
    fn division_by_zero_leaves_r0() {
        let out = run_source("PUSHI 8\nPOP R0\nDIV R0 R1\nPUSHI 1\n");
        assert_eq!(out.halt, Halt::Error(Fault::DivisionByZero));
        assert_eq!(out.machine.registers.r0(), 8);
        assert_eq!(out.machine.program_counter, 2);
        assert!(out.machine.halted);
        assert!(out.machine.stack.is_empty());
    }

    #[test]
    fn compare_yields_sign() {
        assert_eq!(run_source("CMP 5 3\n").machine.registers.r0(), 1);
        assert_eq!(run_source("CMP 3 5\n").machine.registers.r0(), -1);
        assert_eq!(run_source("CMP 4 4\n").machine.registers.r0(), 0);
        let out = run_with("CMP R1 R0\n", Limits::default(), |machine| {
            machine.registers.set(Register::R0, 2);
            machine.registers.set(Register::R1, 9);
        });
        assert_eq!(out.machine.registers.r0(), 1);
    }

    #[test]
    fn set_instructions_test_r0_against_zero() {
        let cases = [
            ("SETGT", 3, 1),
            ("SETGT", 0, 0),
            ("SETLT", -1, 1),
            ("SETEQ", 0, 1),
            ("SETNE", 0, 0),
            ("SETGE", 0, 1),
            ("SETLE", 1, 0),
        ];
        for (opcode, r0, expected) in cases {
            let out = run_with(opcode, Limits::default(), |machine| {
                machine.registers.set(Register::R0, r0)
            });
            assert_eq!(out.machine.registers.r0(), expected, "{} with R0={}", opcode, r0);
        }
    }

    #[test]
    fn logic_treats_nonzero_as_true() {
        let setup = |machine: &mut Machine| {
            machine.registers.set(Register::R0, 5);
            machine.registers.set(Register::R1, 0);
        };
        assert_eq!(run_with("AND R0 R1", Limits::default(), setup).machine.registers.r0(), 0);
        assert_eq!(run_with("OR R0 R1", Limits::default(), setup).machine.registers.r0(), 1);
        assert_eq!(run_with("NOT", Limits::default(), setup).machine.registers.r0(), 0);
        assert_eq!(run_source("NOT\n").machine.registers.r0(), 1);
    }

    #[test]
    fn wait_accumulates_ticks() {
        let out = run_source("PUSHI 3\nPOP R0\nWAIT\nWAIT\n");
        assert_eq!(out.machine.ticks, 6);
        assert!(out.output.contains("[WAIT] waiting 3 ticks (total: 3)\n"));
        assert!(out.output.contains("[WAIT] waiting 3 ticks (total: 6)\n"));
    }

    #[test]
    fn read_sensor() {
        let out = run_source("READ R0 water_level\nREAD R1 weight\n");
        assert_eq!(out.machine.registers.r0(), 50);
        assert_eq!(out.machine.registers.r1(), 5);
    }

    #[test]
    fn read_unknown_sensor_faults() {
        let out = run_source("READ R0 humidity\n");
        assert_eq!(out.halt, Halt::Error(Fault::UndefinedSensor("humidity".into())));
        assert_eq!(out.machine.registers.r0(), 0);
    }

    #[test]
    fn undefined_variable_faults() {
        let out = run_source("PUSHV ghost\n");
        assert_eq!(out.halt, Halt::Error(Fault::UndefinedVariable("ghost".into())));
        let out = run_source("LOAD R9 ghost\n");
        assert_eq!(out.halt, Halt::Error(Fault::UndefinedVariable("ghost".into())));
    }

    #[test]
    fn jump_to_undefined_label_stays_put() {
        let out = run_source("PUSHI 1\nJMP nowhere\nPUSHI 2\n");
        assert_eq!(out.halt, Halt::Error(Fault::UndefinedLabel("nowhere".into())));
        assert_eq!(out.machine.program_counter, 1);
        assert_eq!(out.machine.stack.as_slice(), &[1]);
    }

    #[test]
    fn untaken_jump_ignores_missing_label() {
        let out = run_with("JZ nowhere\nHALT\n", Limits::default(), |machine| {
            machine.registers.set(Register::R0, 1)
        });
        assert_eq!(out.halt, Halt::Normal);
        assert_eq!(out.machine.program_counter, 1);
    }

    #[test]
    fn jump_lands_on_label_address() {
        let out = run_source("JMP skip\nPUSHI 1\nskip:\nPUSHI 2\n");
        assert_eq!(out.machine.stack.as_slice(), &[2]);
    }

    #[test]
    fn conditional_jumps() {
        let out = run_source("JZ zero\nPUSHI 1\nzero:\nSUBI R0 1\nJLE done\nPUSHI 2\ndone:\nHALT\n");
        assert!(out.machine.stack.is_empty());
        assert_eq!(out.machine.registers.r0(), -1);
    }

    #[test]
    fn pop_from_empty_stack() {
        let out = run_with("POP R1\n", Limits::default(), |machine| {
            machine.registers.set(Register::R1, 11)
        });
        assert_eq!(out.halt, Halt::Error(Fault::StackUnderflow));
        assert_eq!(out.machine.registers.r1(), 11);
        assert_eq!(out.machine.program_counter, 0);
    }

    #[test]
    fn pop_into_non_register_does_nothing() {
        let out = run_source("PUSHI 3\nPOP R5\n");
        assert_eq!(out.machine.stack.as_slice(), &[3]);
        assert_eq!(out.halt, Halt::Normal);
    }

    #[test]
    fn stack_overflow_faults() {
        let limits = Limits {
            max_stack: 2,
            ..Limits::default()
        };
        let out = run_with("PUSHI 1\nPUSHI 2\nPUSHI 3\n", limits, |_| ());
        assert_eq!(out.halt, Halt::Error(Fault::StackOverflow { capacity: 2 }));
        assert_eq!(out.machine.stack.len(), 2);
        assert_eq!(out.machine.program_counter, 2);
    }

    #[test]
    fn memory_exhaustion_faults() {
        let limits = Limits {
            max_memory: 1,
            ..Limits::default()
        };
        let out = run_with("STORE a 1\nSTORE a 2\nALLOC b\n", limits, |_| ());
        assert_eq!(out.halt, Halt::Error(Fault::MemoryExhausted { capacity: 1 }));
        assert_eq!(out.machine.memory.get("a"), Some(2));
    }

    #[test]
    fn unknown_opcode_faults_when_reached() {
        let out = run_source("HALT\nSPIN\n");
        assert_eq!(out.halt, Halt::Normal);
        let out = run_source("PUSHI 1\nSPIN\n");
        assert_eq!(out.halt, Halt::Error(Fault::UnknownOpcode("SPIN".into())));
        assert_eq!(out.machine.program_counter, 1);
    }

    #[test]
    fn emit_reports_r0() {
        let out = run_source("PUSHI 1\nPOP R0\nEMIT motor\nPUSHI 0\nPOP R0\nEMIT valvula_agua\n");
        assert_eq!(
            out.output,
            "[EMIT] motor = 1\n  -> Motor: ON\n[EMIT] valvula_agua = 0\n  -> Water valve: CLOSED\n"
        );
    }

    #[test]
    fn halt_stops_without_advancing() {
        let out = run_source("HALT\nPUSHI 1\n");
        assert_eq!(out.halt, Halt::Normal);
        assert!(out.machine.halted);
        assert_eq!(out.machine.program_counter, 0);
        assert!(out.machine.stack.is_empty());
        assert_eq!(out.output, "[HALT] program finished\n");
    }

    #[test]
    fn running_off_the_end_is_a_normal_halt() {
        let out = run_source("PUSHI 1\n");
        assert_eq!(out.halt, Halt::Normal);
        assert!(out.output.is_empty());
        assert_eq!(out.machine.program_counter, 1);
    }

    #[test]
    fn step_limit_stops_endless_loops() {
        let limits = Limits {
            max_steps: Some(10),
            ..Limits::default()
        };
        let out = run_with("spin:\nJMP spin\n", limits, |_| ());
        assert_eq!(out.halt, Halt::Error(Fault::StepLimit { limit: 10 }));
    }

    #[test]
    fn step_reports_status() {
        let asm = Loader::new(Limits::default())
            .load_source("test", "EMIT buzzer\nWAIT\n")
            .unwrap();
        let mut machine = Machine::new(&Limits::default());
        assert_eq!(step(&asm, &mut machine), Ok(ExecutionStatus::Emit("buzzer", 0)));
        assert_eq!(step(&asm, &mut machine), Ok(ExecutionStatus::Wait(0)));
        assert_eq!(step(&asm, &mut machine), Ok(ExecutionStatus::End));
    }
}
