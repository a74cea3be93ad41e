use ::std::fmt;

/// Machine word. Registers, memory cells, stack slots and ticks all hold one.
pub type Word = i32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Register {
    R0,
    R1,
}

impl Register {
    pub fn parse(token: &str) -> Option<Register> {
        match token {
            "R0" => Some(Register::R0),
            "R1" => Some(Register::R1),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Register::R0 => 0,
            Register::R1 => 1,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Register::R0 => write!(f, "R0"),
            Register::R1 => write!(f, "R1"),
        }
    }
}

/// A value operand: either read from a register or a literal fixed at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Register(Register),
    Immediate(Word),
}

impl Operand {
    pub fn parse(token: &str) -> Operand {
        match Register::parse(token) {
            Some(reg) => Operand::Register(reg),
            None => Operand::Immediate(parse_literal(token)),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Register(reg) => write!(f, "{}", reg),
            Operand::Immediate(value) => write!(f, "{}", value),
        }
    }
}

/// Parses a decimal literal the way C's `atoi` does: optional sign, then
/// leading digits. Anything else stops the scan, so `abc` is 0 and `12ab` is 12.
pub fn parse_literal(token: &str) -> Word {
    let token = token.trim_start();
    let (negative, digits) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0 as Word, |acc, digit| {
            acc.wrapping_mul(10).wrapping_add(Word::from(digit - b'0'))
        });
    if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Gt,
    Lt,
    Eq,
    Ne,
    Ge,
    Le,
}

impl Relation {
    /// Tests `value <relation> 0`.
    pub fn holds(self, value: Word) -> bool {
        match self {
            Relation::Gt => value > 0,
            Relation::Lt => value < 0,
            Relation::Eq => value == 0,
            Relation::Ne => value != 0,
            Relation::Ge => value >= 0,
            Relation::Le => value <= 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Always,
    Zero,
    LessOrEqual,
}

/// Decoded instruction. Register slots holding something other than `R0`/`R1`
/// decode to `None` and make the instruction a no-op for that slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inst {
    PushImmediate(Word),
    PushVariable(String),
    Push(Option<Register>),
    Pop(Option<Register>),
    Load(Option<Register>, String),
    Store(String, Operand),
    Alloc(String),
    Binary(BinOp, Option<Register>, Option<Register>),
    SubImmediate(Option<Register>, Word),
    Compare(Operand, Operand),
    Set(Relation),
    And,
    Or,
    Not,
    Jump(Condition, String),
    Read(Option<Register>, String),
    Emit(String),
    Wait,
    Halt,
    Unknown(String),
}

impl Inst {
    /// Decodes one tokenized line. Missing operands arrive as empty strings.
    pub fn decode(opcode: &str, arg1: &str, arg2: &str) -> Inst {
        match opcode {
            "PUSHI" => Inst::PushImmediate(parse_literal(arg1)),
            "PUSHV" => Inst::PushVariable(arg1.to_owned()),
            "PUSH" => Inst::Push(Register::parse(arg1)),
            "POP" => Inst::Pop(Register::parse(arg1)),
            "LOAD" => Inst::Load(Register::parse(arg1), arg2.to_owned()),
            "STORE" => Inst::Store(arg1.to_owned(), Operand::parse(arg2)),
            "ALLOC" => Inst::Alloc(arg1.to_owned()),
            "ADD" => Inst::Binary(BinOp::Add, Register::parse(arg1), Register::parse(arg2)),
            "SUB" => Inst::Binary(BinOp::Sub, Register::parse(arg1), Register::parse(arg2)),
            "MUL" => Inst::Binary(BinOp::Mul, Register::parse(arg1), Register::parse(arg2)),
            "DIV" => Inst::Binary(BinOp::Div, Register::parse(arg1), Register::parse(arg2)),
            "SUBI" => Inst::SubImmediate(Register::parse(arg1), parse_literal(arg2)),
            "CMP" => Inst::Compare(Operand::parse(arg1), Operand::parse(arg2)),
            "SETGT" => Inst::Set(Relation::Gt),
            "SETLT" => Inst::Set(Relation::Lt),
            "SETEQ" => Inst::Set(Relation::Eq),
            "SETNE" => Inst::Set(Relation::Ne),
            "SETGE" => Inst::Set(Relation::Ge),
            "SETLE" => Inst::Set(Relation::Le),
            "AND" => Inst::And,
            "OR" => Inst::Or,
            "NOT" => Inst::Not,
            "JZ" => Inst::Jump(Condition::Zero, arg1.to_owned()),
            "JLE" => Inst::Jump(Condition::LessOrEqual, arg1.to_owned()),
            "JMP" => Inst::Jump(Condition::Always, arg1.to_owned()),
            "READ" => Inst::Read(Register::parse(arg1), arg2.to_owned()),
            "EMIT" => Inst::Emit(arg1.to_owned()),
            "WAIT" => Inst::Wait,
            "HALT" => Inst::Halt,
            other => Inst::Unknown(other.to_owned()),
        }
    }
}

/// An instruction together with the source line it was assembled from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub inst: Inst,
    pub line: usize,
}

struct Slot(Option<Register>);

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Some(reg) => write!(f, "{}", reg),
            None => write!(f, "?"),
        }
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Inst::PushImmediate(value) => write!(f, "PUSHI {}", value)?,
            Inst::PushVariable(name) => write!(f, "PUSHV {}", name)?,
            Inst::Push(reg) => write!(f, "PUSH {}", Slot(*reg))?,
            Inst::Pop(reg) => write!(f, "POP {}", Slot(*reg))?,
            Inst::Load(reg, name) => write!(f, "LOAD {} {}", Slot(*reg), name)?,
            Inst::Store(name, value) => write!(f, "STORE {} {}", name, value)?,
            Inst::Alloc(name) => write!(f, "ALLOC {}", name)?,
            Inst::Binary(op, dst, src) => {
                let mnemonic = match op {
                    BinOp::Add => "ADD",
                    BinOp::Sub => "SUB",
                    BinOp::Mul => "MUL",
                    BinOp::Div => "DIV",
                };
                write!(f, "{} {} {}", mnemonic, Slot(*dst), Slot(*src))?
            }
            Inst::SubImmediate(reg, value) => write!(f, "SUBI {} {}", Slot(*reg), value)?,
            Inst::Compare(a, b) => write!(f, "CMP {} {}", a, b)?,
            Inst::Set(relation) => {
                let mnemonic = match relation {
                    Relation::Gt => "SETGT",
                    Relation::Lt => "SETLT",
                    Relation::Eq => "SETEQ",
                    Relation::Ne => "SETNE",
                    Relation::Ge => "SETGE",
                    Relation::Le => "SETLE",
                };
                write!(f, "{}", mnemonic)?
            }
            Inst::And => write!(f, "AND")?,
            Inst::Or => write!(f, "OR")?,
            Inst::Not => write!(f, "NOT")?,
            Inst::Jump(condition, label) => {
                let mnemonic = match condition {
                    Condition::Always => "JMP",
                    Condition::Zero => "JZ",
                    Condition::LessOrEqual => "JLE",
                };
                write!(f, "{} {}", mnemonic, label)?
            }
            Inst::Read(reg, sensor) => write!(f, "READ {} {}", Slot(*reg), sensor)?,
            Inst::Emit(actuator) => write!(f, "EMIT {}", actuator)?,
            Inst::Wait => write!(f, "WAIT")?,
            Inst::Halt => write!(f, "HALT")?,
            Inst::Unknown(opcode) => write!(f, "{} (unknown)", opcode)?,
        };
        Ok(())
    }
}
