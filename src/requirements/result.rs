//! Uniform outcome of evaluating one requirement.

use crate::shell::RunOutput;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest excerpt of captured output placed in messages and verbose logs.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Result of running a single check.
///
/// Built once per evaluation and never mutated afterwards; the `with_*`
/// methods consume and return the value so they only apply at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// Whether the check passed.
    pub ok: bool,

    /// Short human-readable summary (empty on success).
    pub message: String,

    /// Captured stdout, if a process ran.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,

    /// Captured stderr, if a process ran.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,

    /// Process exit code, if a process exited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returncode: Option<i32>,

    /// Whether a process hit its timeout.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,

    /// Working directory used, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl CheckResult {
    /// A passing result.
    pub fn success() -> Self {
        Self {
            ok: true,
            message: String::new(),
            stdout: String::new(),
            stderr: String::new(),
            returncode: None,
            timed_out: false,
            cwd: None,
        }
    }

    /// A failing result with a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            ..Self::success()
        }
    }

    pub fn with_output(mut self, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self.stderr = stderr.into();
        self
    }

    /// Attach stdout, stderr and exit code from a finished run.
    pub fn with_run(mut self, output: &RunOutput) -> Self {
        self.stdout = output.stdout.clone();
        self.stderr = output.stderr.clone();
        self.returncode = output.exit_code;
        self.timed_out = output.timed_out;
        self
    }

    pub fn with_returncode(mut self, returncode: Option<i32>) -> Self {
        self.returncode = returncode;
        self
    }

    pub fn with_cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    pub fn timed_out(mut self) -> Self {
        self.timed_out = true;
        self
    }
}

/// Keep at most `max_chars` characters, appending `...` when cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Seconds for messages: `5s`, `0.25s`.
pub(crate) fn format_secs(d: Duration) -> String {
    format!("{}s", d.as_secs_f64())
}

/// Exit code for messages; `signal` when the process was killed by one.
pub(crate) fn format_returncode(code: Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}
