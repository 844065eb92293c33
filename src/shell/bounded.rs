//! Timeout-bounded subprocess execution with capped output capture.
//!
//! stdout and stderr are drained from a single loop that waits for readiness
//! on both pipes, so a child blocked writing one stream can never deadlock
//! against a parent blocked reading the other. On timeout the child is
//! killed, the pipes get a short second drain for trailing output, and the
//! process is reaped before returning.

use super::capture::{Captured, StreamCapture};
use super::command::{RunRequest, RunnerSettings};
use std::io;
use std::path::PathBuf;
use std::process::{Child, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound on a single readiness wait while draining after a kill.
const DRAIN_POLL: Duration = Duration::from_millis(100);

/// Sleep between `try_wait` probes while waiting for exit.
const REAP_POLL: Duration = Duration::from_millis(10);

/// Failures that prevent a run from producing an outcome.
#[derive(Debug, Error)]
pub enum RunError {
    /// Nothing to execute.
    #[error("command must be non-empty")]
    EmptyCommand,

    /// Timeout was zero.
    #[error("timeout must be > 0")]
    InvalidTimeout,

    /// The working directory does not exist.
    #[error("working directory missing: {}", .0.display())]
    MissingCwd(PathBuf),

    /// The working directory exists but is not a directory.
    #[error("working directory is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The process could not be started.
    #[error("could not start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Reading output or waiting for the process failed.
    #[error("failed while running {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Outcome of a bounded run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Exit code (None on timeout or when killed by a signal).
    pub exit_code: Option<i32>,

    /// Captured stdout, capped.
    pub stdout: String,

    /// Captured stderr, capped.
    pub stderr: String,

    /// Whether the deadline expired and the process was killed.
    pub timed_out: bool,

    /// Whether either stream was capped.
    pub truncated: bool,

    /// Whether the signature appeared in raw stdout or stderr
    /// (`None` if no signature was requested).
    pub signature_found: Option<bool>,

    /// OS process id of the child.
    pub pid: u32,

    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl RunOutput {
    /// Exited on its own with status 0.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    fn assemble(
        exit_code: Option<i32>,
        timed_out: bool,
        (stdout, stderr): (Captured, Captured),
        pid: u32,
        duration: Duration,
    ) -> Self {
        let signature_found = match (stdout.signature_found, stderr.signature_found) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(false) || b.unwrap_or(false)),
        };
        Self {
            exit_code,
            truncated: stdout.truncated || stderr.truncated,
            stdout: stdout.text,
            stderr: stderr.text,
            timed_out,
            signature_found,
            pid,
            duration,
        }
    }
}

/// Run a command with a wall-clock timeout and bounded output capture.
///
/// Returns `Err` only when no outcome exists: invalid input (checked before
/// anything is spawned), a spawn failure, or an IO failure while capturing.
/// A non-zero exit or a timeout is an `Ok` outcome.
pub fn run_bounded(
    request: &RunRequest<'_>,
    settings: &RunnerSettings,
) -> Result<RunOutput, RunError> {
    if request.command.is_empty() {
        return Err(RunError::EmptyCommand);
    }
    if request.timeout.is_zero() {
        return Err(RunError::InvalidTimeout);
    }
    if let Some(cwd) = request.cwd {
        if !cwd.exists() {
            return Err(RunError::MissingCwd(cwd.to_path_buf()));
        }
        if !cwd.is_dir() {
            return Err(RunError::NotADirectory(cwd.to_path_buf()));
        }
    }

    let shown = request.command.to_string();
    let mut cmd = request.command.to_command();
    if let Some(cwd) = request.cwd {
        cmd.current_dir(cwd);
    }
    if let Some(env) = request.env {
        cmd.envs(env);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(command = %shown, cwd = ?request.cwd, timeout = ?request.timeout, "spawning");
    let start = Instant::now();
    let deadline = start + request.timeout;

    let mut child = cmd.spawn().map_err(|source| RunError::Spawn {
        command: shown.clone(),
        source,
    })?;
    let pid = child.id();

    let io_err = |source| RunError::Io {
        command: shown.clone(),
        source,
    };

    let mut pipes = match Pipes::new(
        &mut child,
        StreamCapture::new(settings.output_cap_bytes, request.signature),
        StreamCapture::new(settings.output_cap_bytes, request.signature),
    ) {
        Ok(pipes) => pipes,
        Err(source) => {
            kill_and_reap(&mut child, settings.reap_timeout);
            return Err(io_err(source));
        }
    };

    let closed = match pipes.pump_until(deadline, settings.poll_interval) {
        Ok(closed) => closed,
        Err(source) => {
            kill_and_reap(&mut child, settings.reap_timeout);
            return Err(io_err(source));
        }
    };

    let status = if closed {
        wait_until(&mut child, deadline).map_err(io_err)?
    } else {
        None
    };

    if let Some(status) = status {
        let captured = pipes.finish();
        debug!(command = %shown, code = ?status.code(), "exited");
        return Ok(RunOutput::assemble(
            status.code(),
            false,
            captured,
            pid,
            start.elapsed(),
        ));
    }

    warn!(command = %shown, timeout = ?request.timeout, "deadline expired; killing process");
    if let Err(e) = child.kill() {
        // InvalidInput means it already exited; still reaped below.
        debug!(command = %shown, error = %e, "kill failed");
    }

    let drain_deadline = Instant::now() + settings.drain_timeout;
    if let Err(e) = pipes.pump_until(drain_deadline, settings.poll_interval.min(DRAIN_POLL)) {
        debug!(command = %shown, error = %e, "post-kill drain failed");
    }

    match wait_until(&mut child, Instant::now() + settings.reap_timeout) {
        Ok(Some(_)) => {}
        Ok(None) => warn!(command = %shown, pid, "process not reaped after kill"),
        Err(e) => warn!(command = %shown, pid, error = %e, "waiting for killed process failed"),
    }

    Ok(RunOutput::assemble(
        None,
        true,
        pipes.finish(),
        pid,
        start.elapsed(),
    ))
}

/// Poll for exit until `deadline`.
fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(REAP_POLL.min(deadline - now));
    }
}

fn kill_and_reap(child: &mut Child, reap_timeout: Duration) {
    let _ = child.kill();
    let _ = wait_until(child, Instant::now() + reap_timeout);
}

#[cfg(unix)]
use unix::Pipes;

#[cfg(not(unix))]
use fallback::Pipes;

#[cfg(unix)]
mod unix {
    use super::super::capture::{Captured, StreamCapture};
    use std::io::{self, Read};
    use std::os::unix::io::{AsRawFd, RawFd};
    use std::process::{Child, ChildStderr, ChildStdout};
    use std::time::{Duration, Instant};

    const CHUNK: usize = 8192;

    /// Reads per wake-up before going back to check the deadline, so a
    /// child that writes faster than we read cannot pin the loop.
    const MAX_READS_PER_WAKE: usize = 16;

    #[derive(Clone, Copy)]
    enum Which {
        Stdout,
        Stderr,
    }

    pub(super) struct Pipes {
        stdout: Option<ChildStdout>,
        stderr: Option<ChildStderr>,
        out: StreamCapture,
        err: StreamCapture,
        buf: Vec<u8>,
    }

    impl Pipes {
        pub(super) fn new(
            child: &mut Child,
            out: StreamCapture,
            err: StreamCapture,
        ) -> io::Result<Self> {
            let stdout = child.stdout.take();
            let stderr = child.stderr.take();
            if let Some(s) = &stdout {
                set_nonblocking(s.as_raw_fd())?;
            }
            if let Some(s) = &stderr {
                set_nonblocking(s.as_raw_fd())?;
            }
            Ok(Self {
                stdout,
                stderr,
                out,
                err,
                buf: vec![0; CHUNK],
            })
        }

        /// Drain both pipes until they close (`Ok(true)`) or `deadline`
        /// passes (`Ok(false)`).
        pub(super) fn pump_until(
            &mut self,
            deadline: Instant,
            poll_interval: Duration,
        ) -> io::Result<bool> {
            loop {
                if self.stdout.is_none() && self.stderr.is_none() {
                    return Ok(true);
                }
                let now = Instant::now();
                if now >= deadline {
                    return Ok(false);
                }
                let wait = (deadline - now).min(poll_interval);

                let mut fds: Vec<libc::pollfd> = Vec::with_capacity(2);
                let mut which: Vec<Which> = Vec::with_capacity(2);
                if let Some(s) = &self.stdout {
                    fds.push(pollfd(s.as_raw_fd()));
                    which.push(Which::Stdout);
                }
                if let Some(s) = &self.stderr {
                    fds.push(pollfd(s.as_raw_fd()));
                    which.push(Which::Stderr);
                }

                let timeout_ms = wait.as_millis().clamp(1, libc::c_int::MAX as u128) as libc::c_int;
                // SAFETY: `fds` is an initialized array of pollfd that outlives the call,
                // and its length is passed alongside the pointer.
                let rc =
                    unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
                if rc < 0 {
                    let err = io::Error::last_os_error();
                    if err.kind() == io::ErrorKind::Interrupted {
                        continue;
                    }
                    return Err(err);
                }
                if rc == 0 {
                    continue;
                }

                let ready = libc::POLLIN | libc::POLLHUP | libc::POLLERR | libc::POLLNVAL;
                for (pfd, stream) in fds.iter().zip(which) {
                    if pfd.revents & ready != 0 {
                        self.read_ready(stream)?;
                    }
                }
            }
        }

        fn read_ready(&mut self, which: Which) -> io::Result<()> {
            match which {
                Which::Stdout => {
                    if let Some(reader) = self.stdout.as_mut() {
                        if read_available(reader, &mut self.out, &mut self.buf)? {
                            self.stdout = None;
                        }
                    }
                }
                Which::Stderr => {
                    if let Some(reader) = self.stderr.as_mut() {
                        if read_available(reader, &mut self.err, &mut self.buf)? {
                            self.stderr = None;
                        }
                    }
                }
            }
            Ok(())
        }

        pub(super) fn finish(self) -> (Captured, Captured) {
            (self.out.finish(), self.err.finish())
        }
    }

    fn pollfd(fd: RawFd) -> libc::pollfd {
        libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        }
    }

    /// Read what is available. Returns `true` at end of stream.
    fn read_available<R: Read>(
        reader: &mut R,
        capture: &mut StreamCapture,
        buf: &mut [u8],
    ) -> io::Result<bool> {
        for _ in 0..MAX_READS_PER_WAKE {
            match reader.read(buf) {
                Ok(0) => return Ok(true),
                Ok(n) => capture.push(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }

    fn set_nonblocking(fd: RawFd) -> io::Result<()> {
        // SAFETY: fcntl on a pipe fd owned by this process; no memory is touched.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: as above.
        if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Platforms without `poll(2)` on pipes: one blocking reader thread per
/// stream feeding a channel, consumed with the same deadline semantics.
#[cfg(not(unix))]
mod fallback {
    use super::super::capture::{Captured, StreamCapture};
    use std::io::{self, Read};
    use std::process::Child;
    use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
    use std::thread;
    use std::time::{Duration, Instant};

    enum Chunk {
        Stdout(Vec<u8>),
        Stderr(Vec<u8>),
        Closed,
        Failed(io::Error),
    }

    pub(super) struct Pipes {
        rx: Receiver<Chunk>,
        open: usize,
        out: StreamCapture,
        err: StreamCapture,
    }

    impl Pipes {
        pub(super) fn new(
            child: &mut Child,
            out: StreamCapture,
            err: StreamCapture,
        ) -> io::Result<Self> {
            let (tx, rx) = mpsc::channel();
            let mut open = 0;
            if let Some(stdout) = child.stdout.take() {
                open += 1;
                spawn_reader(stdout, tx.clone(), Chunk::Stdout);
            }
            if let Some(stderr) = child.stderr.take() {
                open += 1;
                spawn_reader(stderr, tx, Chunk::Stderr);
            }
            Ok(Self { rx, open, out, err })
        }

        pub(super) fn pump_until(
            &mut self,
            deadline: Instant,
            poll_interval: Duration,
        ) -> io::Result<bool> {
            while self.open > 0 {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(false);
                }
                match self.rx.recv_timeout((deadline - now).min(poll_interval)) {
                    Ok(Chunk::Stdout(bytes)) => self.out.push(&bytes),
                    Ok(Chunk::Stderr(bytes)) => self.err.push(&bytes),
                    Ok(Chunk::Closed) => self.open -= 1,
                    Ok(Chunk::Failed(e)) => return Err(e),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => self.open = 0,
                }
            }
            Ok(true)
        }

        pub(super) fn finish(self) -> (Captured, Captured) {
            (self.out.finish(), self.err.finish())
        }
    }

    fn spawn_reader<R, F>(mut reader: R, tx: mpsc::Sender<Chunk>, wrap: F)
    where
        R: Read + Send + 'static,
        F: Fn(Vec<u8>) -> Chunk + Send + 'static,
    {
        thread::spawn(move || {
            let mut buf = vec![0u8; 8192];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        let _ = tx.send(Chunk::Closed);
                        return;
                    }
                    Ok(n) => {
                        if tx.send(wrap(buf[..n].to_vec())).is_err() {
                            return;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = tx.send(Chunk::Failed(e));
                        return;
                    }
                }
            }
        });
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::shell::command::CommandLine;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn settings() -> RunnerSettings {
        RunnerSettings {
            poll_interval: Duration::from_millis(50),
            ..RunnerSettings::default()
        }
    }

    fn sh(script: &str) -> CommandLine {
        CommandLine::argv(["sh", "-c", script]).unwrap()
    }

    #[test]
    fn captures_stdout_and_exit_code() {
        let cmd = CommandLine::argv(["echo", "hello"]).unwrap();
        let out = run_bounded(&RunRequest::new(&cmd, Duration::from_secs(10)), &settings()).unwrap();
        assert!(out.success());
        assert_eq!(out.exit_code, Some(0));
        assert_eq!(out.stdout, "hello\n");
        assert!(!out.timed_out);
        assert_eq!(out.signature_found, None);
    }

    #[test]
    fn reports_nonzero_exit() {
        let cmd = sh("echo oops >&2; exit 3");
        let out = run_bounded(&RunRequest::new(&cmd, Duration::from_secs(10)), &settings()).unwrap();
        assert!(!out.success());
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stderr, "oops\n");
    }

    #[test]
    fn caps_large_stdout_without_blocking_the_child() {
        let cmd = sh("head -c 200000 /dev/zero | tr '\\0' 'a'");
        let s = RunnerSettings {
            output_cap_bytes: 1000,
            ..settings()
        };
        let out = run_bounded(&RunRequest::new(&cmd, Duration::from_secs(20)), &s).unwrap();
        assert!(out.success());
        assert!(out.truncated);
        assert_eq!(out.stdout.len(), 1000 + "...".len());
        assert!(out.stdout.ends_with("a..."));
    }

    #[test]
    fn drains_both_streams_concurrently() {
        // Fill stderr well past a pipe buffer before touching stdout.
        let cmd = sh("head -c 300000 /dev/zero >&2; echo done");
        let out = run_bounded(&RunRequest::new(&cmd, Duration::from_secs(20)), &settings()).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "done\n");
        assert!(out.truncated);
    }

    #[test]
    fn times_out_kills_and_reaps() {
        let cmd = CommandLine::argv(["sleep", "5"]).unwrap();
        let started = Instant::now();
        let out = run_bounded(&RunRequest::new(&cmd, Duration::from_millis(200)), &settings())
            .unwrap();
        assert!(out.timed_out);
        assert_eq!(out.exit_code, None);
        assert!(started.elapsed() < Duration::from_secs(4));
        #[cfg(target_os = "linux")]
        assert!(!std::path::Path::new(&format!("/proc/{}", out.pid)).exists());
    }

    #[test]
    fn keeps_output_written_before_timeout() {
        let cmd = sh("echo early; exec sleep 5");
        let out = run_bounded(&RunRequest::new(&cmd, Duration::from_millis(300)), &settings())
            .unwrap();
        assert!(out.timed_out);
        assert_eq!(out.stdout, "early\n");
    }

    #[test]
    fn finds_signature_in_truncated_output() {
        let cmd = sh("head -c 5000 /dev/zero | tr '\\0' 'x'; echo; echo BUILD SUCCESS");
        let s = RunnerSettings {
            output_cap_bytes: 100,
            ..settings()
        };
        let req = RunRequest::new(&cmd, Duration::from_secs(10)).signature(Some("BUILD SUCCESS"));
        let out = run_bounded(&req, &s).unwrap();
        assert!(!out.stdout.contains("BUILD SUCCESS"));
        assert_eq!(out.signature_found, Some(true));
    }

    #[test]
    fn signature_may_appear_on_stderr() {
        let cmd = sh("echo ready >&2");
        let req = RunRequest::new(&cmd, Duration::from_secs(10)).signature(Some("ready"));
        let out = run_bounded(&req, &settings()).unwrap();
        assert_eq!(out.signature_found, Some(true));
    }

    #[test]
    fn missing_signature_is_reported() {
        let cmd = CommandLine::argv(["echo", "hello"]).unwrap();
        let req = RunRequest::new(&cmd, Duration::from_secs(10)).signature(Some("bye"));
        let out = run_bounded(&req, &settings()).unwrap();
        assert_eq!(out.signature_found, Some(false));
    }

    #[test]
    fn runs_in_cwd_with_env_overrides() {
        let temp = TempDir::new().unwrap();
        let mut env = BTreeMap::new();
        env.insert("ARTEVAL_RUNNER_TEST".to_string(), "xyz".to_string());
        let cmd = sh("pwd; echo $ARTEVAL_RUNNER_TEST");
        let req = RunRequest::new(&cmd, Duration::from_secs(10))
            .cwd(temp.path())
            .env(&env);
        let out = run_bounded(&req, &settings()).unwrap();
        let canonical = temp.path().canonicalize().unwrap();
        assert!(out.stdout.contains(canonical.file_name().unwrap().to_str().unwrap()));
        assert!(out.stdout.ends_with("xyz\n"));
    }

    #[test]
    fn rejects_missing_cwd_before_spawning() {
        let cmd = CommandLine::argv(["true"]).unwrap();
        let missing = std::path::Path::new("/nonexistent/arteval/cwd");
        let err = run_bounded(
            &RunRequest::new(&cmd, Duration::from_secs(1)).cwd(missing),
            &settings(),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::MissingCwd(_)));
    }

    #[test]
    fn rejects_file_as_cwd() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f.txt");
        std::fs::write(&file, "x").unwrap();
        let cmd = CommandLine::argv(["true"]).unwrap();
        let err = run_bounded(
            &RunRequest::new(&cmd, Duration::from_secs(1)).cwd(&file),
            &settings(),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::NotADirectory(_)));
    }

    #[test]
    fn rejects_zero_timeout() {
        let cmd = CommandLine::argv(["true"]).unwrap();
        let err = run_bounded(&RunRequest::new(&cmd, Duration::ZERO), &settings()).unwrap_err();
        assert!(matches!(err, RunError::InvalidTimeout));
    }

    #[test]
    fn spawn_failure_carries_os_error() {
        let cmd = CommandLine::argv(["/nonexistent/arteval-no-such-binary"]).unwrap();
        let err = run_bounded(&RunRequest::new(&cmd, Duration::from_secs(1)), &settings())
            .unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }));
        assert!(err.to_string().contains("could not start"));
    }

    #[test]
    fn shell_commands_support_pipes() {
        let cmd = CommandLine::shell("printf 'a\\nb\\nc\\n' | wc -l").unwrap();
        let out = run_bounded(&RunRequest::new(&cmd, Duration::from_secs(10)), &settings()).unwrap();
        assert_eq!(out.stdout.trim(), "3");
    }
}
