//! Command lines, run requests and runner settings.

use crate::error::{ArtevalError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Default per-stream capture budget.
pub const DEFAULT_OUTPUT_CAP_BYTES: usize = 32 * 1024;

/// Default readiness wait between deadline checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Default post-kill drain window.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default wait for the process to be reaped.
pub const DEFAULT_REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// A command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Argv tokens, executed directly without a shell.
    Argv(Vec<String>),

    /// A command string interpreted by the platform shell.
    ///
    /// Only for legacy commands that need glob or pipe syntax.
    Shell(String),
}

impl CommandLine {
    /// Build an argv command, rejecting empty argv and empty tokens.
    pub fn argv<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Err(ArtevalError::invalid("command must be non-empty"));
        }
        let bad: Vec<usize> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_empty())
            .map(|(i, _)| i)
            .collect();
        if !bad.is_empty() {
            return Err(ArtevalError::invalid(format!(
                "all command argv entries must be non-empty; bad entries at {:?}",
                bad
            )));
        }
        Ok(CommandLine::Argv(args))
    }

    /// Build a shell command string.
    pub fn shell(command: impl Into<String>) -> Result<Self> {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(ArtevalError::invalid("shell command must be non-empty"));
        }
        Ok(CommandLine::Shell(command))
    }

    /// The program that will be spawned (argv[0] or the shell).
    pub fn program(&self) -> String {
        match self {
            CommandLine::Argv(args) => args.first().cloned().unwrap_or_default(),
            CommandLine::Shell(_) => shell_program(),
        }
    }

    /// Whether this command has nothing to run.
    pub fn is_empty(&self) -> bool {
        match self {
            CommandLine::Argv(args) => args.is_empty() || args.iter().any(|a| a.is_empty()),
            CommandLine::Shell(cmd) => cmd.trim().is_empty(),
        }
    }

    /// Build a `std::process::Command` for this command line.
    pub(crate) fn to_command(&self) -> Command {
        match self {
            CommandLine::Argv(args) => {
                let mut cmd = Command::new(&args[0]);
                cmd.args(&args[1..]);
                cmd
            }
            CommandLine::Shell(script) => {
                let mut cmd = Command::new(shell_program());
                cmd.arg(shell_flag());
                cmd.arg(script);
                cmd
            }
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Argv(args) => {
                let quoted: Vec<String> = args.iter().map(|a| shell_quote(a)).collect();
                write!(f, "{}", quoted.join(" "))
            }
            CommandLine::Shell(script) => write!(f, "{}", script),
        }
    }
}

/// Quote a token for display the way a POSIX shell would need it.
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r#"'"'"'"#))
    }
}

/// The shell used for [`CommandLine::Shell`].
///
/// A plain `sh -c`, not a login shell: checks must not depend on the
/// evaluator's dotfiles.
fn shell_program() -> String {
    if cfg!(target_os = "windows") {
        std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
    } else {
        "sh".to_string()
    }
}

fn shell_flag() -> &'static str {
    if cfg!(target_os = "windows") {
        "/C"
    } else {
        "-c"
    }
}

/// Tuning knobs for the bounded runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Per-stream cap on captured output, in bytes of decoded text.
    pub output_cap_bytes: usize,

    /// Longest single readiness wait; bounds how late a deadline is noticed.
    pub poll_interval: Duration,

    /// How long to keep draining pipes after a timeout kill.
    pub drain_timeout: Duration,

    /// How long to wait for the process to be reaped.
    pub reap_timeout: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            output_cap_bytes: DEFAULT_OUTPUT_CAP_BYTES,
            poll_interval: DEFAULT_POLL_INTERVAL,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            reap_timeout: DEFAULT_REAP_TIMEOUT,
        }
    }
}

/// A single invocation of the bounded runner.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    /// What to run.
    pub command: &'a CommandLine,

    /// Working directory (must be an existing directory when set).
    pub cwd: Option<&'a Path>,

    /// Overrides layered onto the inherited environment.
    pub env: Option<&'a BTreeMap<String, String>>,

    /// Wall-clock budget for the whole invocation.
    pub timeout: Duration,

    /// Substring to look for in the raw, uncapped output.
    pub signature: Option<&'a str>,
}

impl<'a> RunRequest<'a> {
    /// Create a request with no cwd, env overrides or signature.
    pub fn new(command: &'a CommandLine, timeout: Duration) -> Self {
        Self {
            command,
            cwd: None,
            env: None,
            timeout,
            signature: None,
        }
    }

    /// Run in this working directory.
    pub fn cwd(mut self, cwd: &'a Path) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Layer these variables onto the inherited environment.
    pub fn env(mut self, env: &'a BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Track whether `signature` appears in stdout or stderr.
    ///
    /// Blank signatures are ignored.
    pub fn signature(mut self, signature: Option<&'a str>) -> Self {
        self.signature = signature.filter(|s| !s.trim().is_empty());
        self
    }
}
