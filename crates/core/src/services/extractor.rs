use std::ffi::OsString;
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;

use crate::config::VerifierConfig;

/// Flags asking castxml for its XML output format, written to stdout.
pub const CASTXML_OUTPUT_FLAGS: [&str; 3] = ["--castxml-output=1", "-o", "-"];

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long pipe readers get to reach EOF once the process group is killed.
const KILL_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed waiting on {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed reading {stream} of {program}: {source}")]
    Read {
        program: String,
        stream: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{program} failed with {status}, stderr:\n{stderr}")]
    Failed { program: String, status: ExitStatus, stderr: String },
    #[error("{program} timed out after {after:?}, stderr:\n{stderr}")]
    TimedOut { program: String, after: Duration, stderr: String },
    #[error("{program} was cancelled, stderr:\n{stderr}")]
    Cancelled { program: String, stderr: String },
}

impl ExtractError {
    /// Captured standard error, when the process got far enough to produce any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ExtractError::Failed { stderr, .. }
            | ExtractError::TimedOut { stderr, .. }
            | ExtractError::Cancelled { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `castxml [extra_args..] --castxml-output=1 -o - <source>`.
    pub fn castxml(config: &VerifierConfig, source: &Path) -> Self {
        let mut inv = Invocation::new(&config.extractor_bin);
        inv.args.extend(config.extra_args.iter().map(OsString::from));
        inv.args.extend(CASTXML_OUTPUT_FLAGS.iter().map(OsString::from));
        inv.arg(source.as_os_str())
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Runs an invocation to completion and returns its standard output.
pub trait CommandRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ExtractError>;
}

/// Shared flag a caller can raise to abort a running extraction.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs commands as real subprocesses, blocking until they exit.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
    cancel: Option<CancelFlag>,
}

enum Outcome {
    Exited(ExitStatus),
    TimedOut(Duration),
    Cancelled,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn wait(
        &self,
        child: &mut Child,
        program: &str,
        start: Instant,
    ) -> Result<Outcome, ExtractError> {
        let wait_err =
            |source: io::Error| ExtractError::Wait { program: program.to_string(), source };
        if self.timeout.is_none() && self.cancel.is_none() {
            return child.wait().map(Outcome::Exited).map_err(wait_err);
        }

        loop {
            if let Some(status) = child.try_wait().map_err(wait_err)? {
                return Ok(Outcome::Exited(status));
            }
            let outcome = match (&self.timeout, &self.cancel) {
                (Some(limit), _) if start.elapsed() >= *limit => Some(Outcome::TimedOut(*limit)),
                (_, Some(flag)) if flag.is_cancelled() => Some(Outcome::Cancelled),
                _ => None,
            };
            if let Some(outcome) = outcome {
                kill_process_group(child);
                child.wait().map_err(wait_err)?;
                return Ok(outcome);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Latest instant to wait for the pipes to close. Unbounded without a
    /// timeout; the rest of the budget after a normal exit; a short grace
    /// after a kill.
    fn reader_deadline(&self, outcome: &Outcome, start: Instant) -> Option<Instant> {
        let grace = Instant::now() + KILL_GRACE;
        match outcome {
            Outcome::Exited(_) => self.timeout.map(|limit| (start + limit).max(grace)),
            Outcome::TimedOut(_) | Outcome::Cancelled => Some(grace),
        }
    }
}

/// Drains one child pipe on a background thread.
///
/// Bytes land in a shared buffer as they arrive, so whatever was read before
/// a deadline is still available when the reader is abandoned.
struct PipeReader {
    buf: Arc<Mutex<Vec<u8>>>,
    done: Receiver<io::Result<()>>,
}

impl PipeReader {
    fn spawn<R: Read + Send + 'static>(mut pipe: R) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let (tx, done) = mpsc::channel();
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            let result = loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break Ok(()),
                    Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => break Err(e),
                }
            };
            let _ = tx.send(result);
        });
        Self { buf, done }
    }

    /// Wait for EOF until `deadline`. `Ok(false)` means the pipe is still held
    /// open (by a descendant that outlived the child) and the thread is left behind.
    fn finish(
        &self,
        deadline: Option<Instant>,
        program: &str,
        stream: &'static str,
    ) -> Result<bool, ExtractError> {
        let read_err =
            |source: io::Error| ExtractError::Read { program: program.to_string(), stream, source };
        let received = match deadline {
            None => self.done.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(deadline) => {
                self.done.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
        };
        match received {
            Ok(result) => result.map(|()| true).map_err(read_err),
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => {
                Err(read_err(io::Error::other("reader thread panicked")))
            }
        }
    }

    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.buf.lock())
    }
}

/// Kill the child and everything it spawned.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    // The child leads its own process group, so its pid is the group id.
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: kill(2) only delivers a signal; no memory is shared with the callee.
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
    // The child may exit between try_wait and kill; reaping is what matters.
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
}

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ExtractError> {
        let program = invocation.program_name();
        tracing::debug!(command = %invocation, "will call");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let start = Instant::now();
        let mut child = command
            .spawn()
            .map_err(|source| ExtractError::Spawn { program: program.clone(), source })?;

        let stdout = child.stdout.take().map(PipeReader::spawn);
        let stderr = child.stderr.take().map(PipeReader::spawn);

        let mut outcome = self.wait(&mut child, &program, start)?;
        let deadline = self.reader_deadline(&outcome, start);
        let mut closed = true;
        for (reader, stream) in [(&stdout, "stdout"), (&stderr, "stderr")] {
            if let Some(reader) = reader {
                closed &= reader.finish(deadline, &program, stream)?;
            }
        }
        let exited = matches!(outcome, Outcome::Exited(_));
        if let (false, true, Some(limit)) = (closed, exited, self.timeout) {
            // Exited in time, but a descendant kept the pipes open past the budget.
            kill_process_group(&mut child);
            outcome = Outcome::TimedOut(limit);
        }

        let stdout = stdout.map(|r| r.take()).unwrap_or_default();
        let stderr = stderr
            .map(|r| String::from_utf8_lossy(&r.take()).into_owned())
            .unwrap_or_default();

        match outcome {
            Outcome::Exited(status) if status.success() => Ok(stdout),
            Outcome::Exited(status) => Err(ExtractError::Failed { program, status, stderr }),
            Outcome::TimedOut(after) => {
                tracing::warn!(command = %invocation, ?after, "extractor timed out; killed");
                Err(ExtractError::TimedOut { program, after, stderr })
            }
            Outcome::Cancelled => {
                tracing::warn!(command = %invocation, "extractor cancelled; killed");
                Err(ExtractError::Cancelled { program, stderr })
            }
        }
    }
}
