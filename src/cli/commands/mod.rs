//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results. Commands write
//! their report to the given writer; diagnostics go through `tracing`.

pub mod completions;
pub mod dispatcher;
pub mod run;
pub mod validate;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
