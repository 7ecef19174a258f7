use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info};

use crate::error::{BridgeError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// How long to wait for captured output once a timed-out child was killed.
/// Forked descendants may keep the pipes open past the kill.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Invocation / ToolOutput
// ---------------------------------------------------------------------------

/// A fully built command line for the external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Upper bound on runtime; the process is killed when it expires.
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Program followed by its arguments, for diagnostics.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Captured result of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Runs an [`Invocation`]. Swappable so the protocol can be exercised
/// without the real tool.
pub trait ToolRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput>;
}

// ---------------------------------------------------------------------------
// ProcessRunner – the real process boundary
// ---------------------------------------------------------------------------

/// Spawns the tool as a child process and waits for it.
///
/// A run fails when the exit code is non-zero or stderr contains one of the
/// error markers. Runs are never retried here.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    error_markers: Vec<String>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        ProcessRunner::new(vec!["Exception".to_string(), "Error:".to_string()])
    }
}

impl ProcessRunner {
    pub fn new(error_markers: Vec<String>) -> Self {
        ProcessRunner { error_markers }
    }

    fn failed(&self, status: ExitStatus, stderr: &str) -> bool {
        !status.success() || self.error_markers.iter().any(|m| stderr.contains(m.as_str()))
    }
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            // A read error just truncates the capture.
            let _ = source.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Captured text; after a kill the wait is bounded and a stuck pipe yields "".
fn collect(rx: &Receiver<String>, bounded: bool) -> String {
    if bounded {
        rx.recv_timeout(DRAIN_GRACE).unwrap_or_default()
    } else {
        rx.recv().unwrap_or_default()
    }
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Wait for `child`, killing it once `timeout` has elapsed. The child is
/// also killed when waiting itself fails.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
) -> std::io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return match child.wait() {
            Ok(status) => Ok(Some(status)),
            Err(e) => {
                kill_and_reap(child);
                Err(e)
            }
        };
    };
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {}
            Err(e) => {
                kill_and_reap(child);
                return Err(e);
            }
        }
        if Instant::now() >= deadline {
            kill_and_reap(child);
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        let argv = invocation.argv();
        info!("Running: {}", argv.join(" "));

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|e| BridgeError::Process {
            argv: argv.clone(),
            exit_code: None,
            stdout: String::new(),
            stderr: format!("failed to start: {e}"),
        })?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait_with_timeout(&mut child, invocation.timeout)?;
        let killed = status.is_none();
        let stdout = collect(&stdout, killed);
        let stderr = collect(&stderr, killed);

        let Some(status) = status else {
            error!("Tool timed out after {:?}: {}", invocation.timeout, argv.join(" "));
            return Err(BridgeError::Timeout {
                argv,
                after: invocation.timeout.unwrap_or_default(),
            });
        };

        if self.failed(status, &stderr) {
            error!("Tool failed ({status}):\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}");
            return Err(BridgeError::Process {
                argv,
                exit_code: status.code(),
                stdout,
                stderr,
            });
        }

        Ok(ToolOutput {
            stdout,
            stderr,
            exit_code: status.code(),
        })
    }
}
