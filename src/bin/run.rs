use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use vm::assembly::print_assembly;
use vm::config::{Config, Limits, DEFAULT_MAX_INSTRUCTIONS, DEFAULT_MAX_LABELS, DEFAULT_MAX_MEMORY, DEFAULT_MAX_STACK};
use vm::devices::Panel;
use vm::errors::LoadError;
use vm::interpreter::{execute_assembly, Halt};
use vm::loader::Loader;
use vm::log::{self, Level};
use vm::machine::Machine;
use vm::{error, info};

#[derive(Parser, Debug)]
#[command(name = "run")]
#[command(about = "Runs a washing-machine controller assembly program", long_about = None)]
struct Args {
    /// Assembly source file.
    path: Option<PathBuf>,

    /// Log every executed instruction to stderr.
    #[arg(long)]
    trace: bool,

    /// Print the assembled program and its labels before running.
    #[arg(long)]
    listing: bool,

    /// Print memory, stack and sensors after the final summary.
    #[arg(long)]
    dump_state: bool,

    /// Report load statistics on stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored diagnostics.
    #[arg(long)]
    no_color: bool,

    #[arg(long, default_value_t = DEFAULT_MAX_STACK)]
    max_stack: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_MEMORY)]
    max_memory: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_LABELS)]
    max_labels: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_INSTRUCTIONS)]
    max_instructions: usize,

    /// Stop after this many executed instructions.
    #[arg(long)]
    max_steps: Option<u64>,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            limits: Limits {
                max_stack: self.max_stack,
                max_memory: self.max_memory,
                max_labels: self.max_labels,
                max_instructions: self.max_instructions,
                max_steps: self.max_steps,
            },
            trace: self.trace,
            listing: self.listing,
            dump_state: self.dump_state,
            color: Config::color_from_env(self.no_color, io::stderr().is_terminal()),
        }
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    let path = match args.path.clone() {
        Some(path) => path,
        None => {
            eprintln!("usage: run <program.asm>");
            return ExitCode::from(1);
        }
    };

    let config = args.config();
    log::set_color(config.color);
    if config.trace {
        log::set_min_level(Level::Trace);
    } else if args.verbose {
        log::set_min_level(Level::Info);
    }

    match run(&path, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::from(1)
        }
    }
}

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("writing output: {0}")]
    Output(#[from] io::Error),
}

fn run(path: &Path, config: &Config) -> Result<(), RunError> {
    let asm = Loader::new(config.limits).load(path)?;
    info!(
        "{}: {} instructions, {} labels",
        asm.name,
        asm.len(),
        asm.labels.len()
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if config.listing {
        print_assembly(&mut out, &asm)?;
        writeln!(out)?;
    }

    let mut machine = Machine::new(&config.limits);
    let mut panel = Panel::new(out);
    let halt = execute_assembly(&asm, &mut machine, &mut panel, config.limits.max_steps)?;
    if config.dump_state {
        panel.dump_state(&machine)?;
    }
    if let Halt::Error(fault) = halt {
        info!("run stopped by fault: {}", fault);
    }
    Ok(())
}
