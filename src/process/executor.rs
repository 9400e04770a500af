//! Shell command execution with cancellation

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use super::cancel::CancellationToken;
use super::group::{PlatformProcessGroup, ProcessGroup};

/// Pause between the graceful and the forceful group signal
pub const TERMINATION_GRACE: Duration = Duration::from_millis(100);

/// How often the wait loop checks the cancellation token
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Timeout for collecting output from child process pipes
const OUTPUT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum captured size per stream (10MB)
const MAX_OUTPUT_SIZE: usize = 10 * 1024 * 1024;

/// Failure of a single shell command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for command '{command}': {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed: {status}{}", stderr_suffix(.stderr))]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("command interrupted")]
    Interrupted { command: String },
}

impl CommandError {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\nstderr: {stderr}")
    }
}

/// Runs user-supplied shell commands, one at a time.
///
/// Each command is started through the platform shell in its own process
/// group. Stdout and stderr are drained on background threads while the
/// calling thread waits for exit and watches the cancellation token.
#[derive(Debug, Clone)]
pub struct CommandExecutor<G = PlatformProcessGroup> {
    group: G,
    grace: Duration,
    collection_timeout: Duration,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::with_group(PlatformProcessGroup::default())
    }
}

impl<G: ProcessGroup> CommandExecutor<G> {
    pub fn with_group(group: G) -> Self {
        Self {
            group,
            grace: TERMINATION_GRACE,
            collection_timeout: OUTPUT_COLLECTION_TIMEOUT,
        }
    }

    /// How long to keep reading after exit when a background process still
    /// holds the pipes open.
    pub fn with_collection_timeout(mut self, timeout: Duration) -> Self {
        self.collection_timeout = timeout;
        self
    }

    /// Run `command` and return its trimmed stdout.
    ///
    /// `working_dir` of `None` runs in the process's own working directory.
    /// If `cancel` fires while the command is running, the whole process
    /// group is terminated and [`CommandError::Interrupted`] is returned.
    pub fn execute(
        &self,
        command: &str,
        working_dir: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<String, CommandError> {
        let _active = cancel.enter();
        if cancel.is_cancelled() {
            return Err(CommandError::Interrupted {
                command: command.to_string(),
            });
        }

        let mut child = self.spawn_shell_command(command, working_dir)?;
        debug!(pid = child.id(), ?working_dir, "started command: {command}");

        // Drain the pipes concurrently with waiting, a child blocked on a
        // full pipe buffer (~64KB on Linux) would otherwise never exit.
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = loop {
            match child.wait_timeout(CANCEL_POLL_INTERVAL) {
                Ok(Some(status)) => break status,
                Ok(None) if cancel.is_cancelled() => {
                    debug!(pid = child.id(), "cancelling command: {command}");
                    self.group.terminate(&mut child, self.grace);
                    let _ = child.wait();
                    return Err(CommandError::Interrupted {
                        command: command.to_string(),
                    });
                }
                Ok(None) => continue,
                Err(source) => {
                    self.group.terminate(&mut child, self.grace);
                    let _ = child.wait();
                    return Err(CommandError::Wait {
                        command: command.to_string(),
                        source,
                    });
                }
            }
        };

        let stdout = stdout.collect(self.collection_timeout, command, "stdout");
        let stderr = stderr.collect(self.collection_timeout, command, "stderr");

        if status.success() {
            Ok(stdout.trim().to_string())
        } else {
            Err(CommandError::Failed {
                command: command.to_string(),
                status,
                stderr: stderr.trim().to_string(),
            })
        }
    }

    /// Spawn a shell command as a child process
    ///
    /// Uses `sh -c` on Unix and `cmd /C` on Windows. The command string is
    /// passed as a single argument so user shell syntax survives intact.
    fn spawn_shell_command(
        &self,
        command: &str,
        working_dir: Option<&Path>,
    ) -> Result<Child, CommandError> {
        let mut cmd = if cfg!(target_family = "unix") {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        } else {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        self.group.configure(&mut cmd);

        cmd.spawn().map_err(|source| CommandError::Spawn {
            command: command.to_string(),
            source,
        })
    }
}

/// Bytes read so far from one child pipe, filled by a reader thread.
struct StreamCapture {
    buf: Arc<Mutex<Vec<u8>>>,
    eof: mpsc::Receiver<()>,
}

impl StreamCapture {
    /// Wait up to `timeout` for end of stream, then take whatever was read.
    ///
    /// A grandchild that inherited the pipe can keep it open past the
    /// child's exit; its output so far is still the command's output.
    fn collect(self, timeout: Duration, command: &str, stream: &str) -> String {
        if self.eof.recv_timeout(timeout).is_err() {
            warn!("{stream} of '{command}' still open {timeout:?} after exit, using output read so far");
        }
        let bytes = std::mem::take(&mut *self.buf.lock().unwrap_or_else(PoisonError::into_inner));
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn spawn_reader<R: Read + Send + 'static>(stream: Option<R>) -> StreamCapture {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let (tx, eof) = mpsc::channel();
    match stream {
        Some(stream) => {
            let shared = Arc::clone(&buf);
            thread::spawn(move || {
                read_stream_into(stream, &shared);
                let _ = tx.send(());
            });
        }
        None => {
            let _ = tx.send(());
        }
    }
    StreamCapture { buf, eof }
}

/// Append a stream to `buf`, capped at MAX_OUTPUT_SIZE.
///
/// Past the cap the rest of the stream is drained and discarded so the
/// writer never sees a broken pipe.
fn read_stream_into<R: Read>(mut stream: R, buf: &Mutex<Vec<u8>>) {
    let mut chunk = [0u8; 8192];
    let mut truncated = false;

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if truncated {
                    continue;
                }
                let mut buf = buf.lock().unwrap_or_else(PoisonError::into_inner);
                let remaining = MAX_OUTPUT_SIZE.saturating_sub(buf.len());
                let to_copy = n.min(remaining);
                buf.extend_from_slice(&chunk[..to_copy]);
                if to_copy < n {
                    truncated = true;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }

    if truncated {
        buf.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(b"\n[output truncated at 10MB]");
    }
}
