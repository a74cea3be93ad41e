//! Run configuration, resolved once at startup.

pub const DEFAULT_MAX_STACK: usize = 256;
pub const DEFAULT_MAX_MEMORY: usize = 1024;
pub const DEFAULT_MAX_LABELS: usize = 128;
pub const DEFAULT_MAX_INSTRUCTIONS: usize = 1024;

/// Fixed capacity ceilings. Exceeding one is an error, never a reallocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_stack: usize,
    pub max_memory: usize,
    pub max_labels: usize,
    pub max_instructions: usize,
    /// Stop after this many executed instructions. `None` runs until halted.
    pub max_steps: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_stack: DEFAULT_MAX_STACK,
            max_memory: DEFAULT_MAX_MEMORY,
            max_labels: DEFAULT_MAX_LABELS,
            max_instructions: DEFAULT_MAX_INSTRUCTIONS,
            max_steps: None,
        }
    }
}

/// Everything the runner needs besides the program itself.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub limits: Limits,
    /// Log every executed instruction.
    pub trace: bool,
    /// Print the assembled program before running it.
    pub listing: bool,
    /// Print memory cells and stack after the summary.
    pub dump_state: bool,
    /// Colored diagnostics on stderr.
    pub color: bool,
}

impl Config {
    /// Color is on only when stderr is a terminal, and not disabled by flag
    /// or by a non-empty `NO_COLOR`.
    pub fn color_from_env(no_color_flag: bool, stderr_is_terminal: bool) -> bool {
        if no_color_flag || !stderr_is_terminal {
            return false;
        }
        !matches!(std::env::var_os("NO_COLOR"), Some(value) if !value.is_empty())
    }
}
