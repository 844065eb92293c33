//! Subprocess execution with timeouts and bounded output capture.

pub mod bounded;
pub mod capture;
pub mod command;
pub mod path;

pub use bounded::{run_bounded, RunError, RunOutput};
pub use capture::{Captured, StreamCapture, TRUNCATION_SUFFIX};
pub use command::{shell_quote, CommandLine, RunRequest, RunnerSettings};
pub use path::{is_executable, parse_system_path, resolve_program, resolve_tool_path};
