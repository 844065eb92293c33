//! Command-line interface for arteval.
//!
//! This module provides the CLI argument parsing using clap's derive macros
//! and command implementations.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations
//! - [`display`] - Terminal styling for command output

pub mod args;
pub mod commands;
pub mod display;

pub use args::{Cli, Commands, CompletionsArgs, RunArgs, ValidateArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
pub use display::Theme;
