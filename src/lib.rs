//! Washing-machine controller VM.
//!
//! A textual assembly program is assembled in two passes by [`loader::Loader`]
//! into an [`assembly::Assembly`] (instructions plus a sealed label table) and
//! then driven by [`interpreter::execute_assembly`] against a
//! [`machine::Machine`]: two registers, named memory, a bounded stack and the
//! washer's read-only sensors. `EMIT` and `WAIT` report to a
//! [`devices::Panel`].

#[macro_use]
pub mod log;

pub mod assembly;
pub mod config;
pub mod devices;
pub mod errors;
pub mod instructions;
pub mod interpreter;
pub mod loader;
pub mod machine;
