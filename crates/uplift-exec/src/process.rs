//! Subprocess execution with bounded output, timeout and cancellation

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use crate::error::ExecError;
use crate::result::bound_output;

/// How long to keep reading output once the child is gone
const OUTPUT_GRACE: Duration = Duration::from_millis(250);

/// How the child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited with a status code
    Exited(i32),
    /// Killed by a signal we did not send
    Signalled,
    /// Killed after exceeding the timeout
    TimedOut(Duration),
    /// Killed because the run was cancelled
    Cancelled,
}

/// Raw outcome of a subprocess run
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// How the process ended
    pub termination: Termination,
    /// Interleaved stdout/stderr, bounded
    pub output: String,
    /// Whether output was cut to fit the bound
    pub truncated: bool,
    /// Time taken
    pub duration: Duration,
}

impl CommandOutput {
    /// Check if the process exited with status 0
    #[must_use]
    pub fn success(&self) -> bool {
        self.termination == Termination::Exited(0)
    }
}

/// Runs programs with a hard timeout and a bounded capture buffer
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    max_output_bytes: usize,
}

impl ProcessRunner {
    /// Create a runner
    #[must_use]
    pub fn new(timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            timeout,
            max_output_bytes,
        }
    }

    /// Timeout applied to every run
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `program` with `args` until it exits, times out or `cancel` fires
    ///
    /// The child is killed and reaped on timeout and cancellation.
    ///
    /// # Errors
    /// Returns `ExecError::Spawn` if the program cannot be started and
    /// `ExecError::Io` if waiting on it fails.
    #[instrument(skip(self, cancel), level = "debug")]
    pub async fn run(
        &self,
        program: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, ExecError> {
        let start = Instant::now();

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::Spawn {
                program: program.to_string(),
                reason: e.to_string(),
            })?;

        debug!(program = %program, pid = ?child.id(), "spawned remediation tool");

        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let mut captured = Vec::new();
        let finished = tokio::select! {
            res = tokio::time::timeout(self.timeout, wait_for_exit(&mut child, &mut rx, &mut captured, self.max_output_bytes)) => {
                match res {
                    Ok(status) => Some(status?),
                    Err(_) => None,
                }
            }
            () = cancel.cancelled() => None,
        };

        let termination = match finished {
            Some(status) => exit_termination(status),
            None => {
                let termination = if cancel.is_cancelled() {
                    warn!(program = %program, "run cancelled, killing tool");
                    Termination::Cancelled
                } else {
                    error!(program = %program, timeout = ?self.timeout, "tool timed out, killing");
                    Termination::TimedOut(self.timeout)
                };
                if let Err(e) = child.kill().await {
                    warn!(program = %program, error = %e, "failed to kill tool");
                }
                termination
            }
        };

        if !drain_remaining(&mut rx, &mut captured, self.max_output_bytes).await {
            debug!(program = %program, "output pipes held open after exit, dropping readers");
        }

        for reader in readers {
            reader.abort();
        }

        let text = String::from_utf8_lossy(&captured);
        let output = bound_output(&text, self.max_output_bytes);
        let truncated = output.len() < text.len();
        let duration = start.elapsed();

        debug!(
            program = %program,
            termination = ?termination,
            duration = ?duration,
            truncated,
            "remediation tool finished"
        );

        Ok(CommandOutput {
            termination,
            output,
            truncated,
            duration,
        })
    }
}

fn exit_termination(status: ExitStatus) -> Termination {
    status
        .code()
        .map_or(Termination::Signalled, Termination::Exited)
}

/// Pump captured lines into `captured` until the child exits
///
/// Exit is what ends the run. Pipes can outlive the child when it leaves a
/// background process behind (an ssh control master, for one).
async fn wait_for_exit(
    child: &mut Child,
    rx: &mut mpsc::Receiver<Vec<u8>>,
    captured: &mut Vec<u8>,
    max_output_bytes: usize,
) -> Result<ExitStatus, ExecError> {
    let mut pipes_open = true;
    loop {
        tokio::select! {
            chunk = rx.recv(), if pipes_open => match chunk {
                Some(chunk) => append_bounded(captured, &chunk, max_output_bytes),
                None => pipes_open = false,
            },
            status = child.wait() => {
                return status.map_err(|e| ExecError::Io(e.to_string()));
            }
        }
    }
}

/// Collect output still in flight after the child ended
///
/// Returns `false` if the pipes were still open when the grace period ran out.
async fn drain_remaining(
    rx: &mut mpsc::Receiver<Vec<u8>>,
    captured: &mut Vec<u8>,
    max_output_bytes: usize,
) -> bool {
    let grace = tokio::time::sleep(OUTPUT_GRACE);
    tokio::pin!(grace);
    loop {
        tokio::select! {
            chunk = rx.recv() => match chunk {
                Some(chunk) => append_bounded(captured, &chunk, max_output_bytes),
                None => return true,
            },
            () = &mut grace => return false,
        }
    }
}

/// Append and keep at most roughly twice the bound in memory
fn append_bounded(captured: &mut Vec<u8>, chunk: &[u8], max_output_bytes: usize) {
    captured.extend_from_slice(chunk);
    let ceiling = max_output_bytes.saturating_mul(2).max(1024);
    if captured.len() > ceiling {
        let excess = captured.len() - max_output_bytes;
        captured.drain(..excess);
    }
}

fn forward_lines<R>(reader: R, tx: mpsc::Sender<Vec<u8>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(line.clone()).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}
