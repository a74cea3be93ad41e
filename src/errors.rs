use ::std::io;
use ::std::path::PathBuf;
use thiserror::Error;

/// Errors raised before a machine exists: reading and assembling the source.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("program has more than {limit} instructions")]
    TooManyInstructions { limit: usize },
    #[error("line {line}: label '{name}' exceeds the limit of {limit} labels")]
    TooManyLabels {
        name: String,
        line: usize,
        limit: usize,
    },
}

/// Runtime faults. Each one halts the machine at the failing instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("unknown instruction '{0}'")]
    UnknownOpcode(String),
    #[error("variable '{0}' not found")]
    UndefinedVariable(String),
    #[error("label '{0}' not found")]
    UndefinedLabel(String),
    #[error("sensor '{0}' not found")]
    UndefinedSensor(String),
    #[error("stack is empty")]
    StackUnderflow,
    #[error("stack overflow (capacity {capacity})")]
    StackOverflow { capacity: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("memory exhausted (capacity {capacity})")]
    MemoryExhausted { capacity: usize },
    #[error("step limit of {limit} reached")]
    StepLimit { limit: u64 },
}
