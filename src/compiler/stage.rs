//! Child process spawning and output streaming for a single stage.
//!
//! A [`ProcessStage`] owns one spawned tool. Its stdout and stderr are read
//! by independent tasks; every chunk is classified and sent on the shared
//! pipeline channel. Once both streams have closed and the child has been
//! reaped, a single [`StageMessage::Exited`] is sent, so a stage's exit is
//! always observed after all of its output.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{LifecycleEvent, StageMarkers, StreamKind};

/// Size of a single read from a child's output pipe.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Default timeout for graceful process termination.
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for stage spawning operations.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    /// The executable was not found.
    #[error("Executable not found: {0}")]
    NotFound(PathBuf),
    /// Permission denied when spawning.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    /// The child was spawned without a captured output pipe.
    #[error("Process {0} not available")]
    MissingPipe(StreamKind),
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StageError {
    /// Create a `StageError` from an I/O error, classifying common cases.
    fn from_io(err: std::io::Error, program: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(program.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(program.to_path_buf()),
            _ => Self::Io(err),
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Role of a stage inside a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// The stylesheet compiler.
    Compile,
    /// The chained post-processor.
    PostProcess,
}

impl StageKind {
    /// Output markers used to classify this stage's output.
    #[must_use]
    pub fn markers(self) -> StageMarkers {
        match self {
            Self::Compile => StageMarkers::compiler(),
            Self::PostProcess => StageMarkers::post_processor(),
        }
    }
}

/// Identifies a stage process within a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageId {
    /// Index of the pipeline run that started the stage.
    pub run: usize,
    pub kind: StageKind,
    /// Spawn sequence number, unique within a pipeline.
    pub seq: usize,
}

/// Messages sent from running stages to the pipeline dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageMessage {
    /// A classified chunk of output.
    Output {
        stage: StageId,
        stream: StreamKind,
        event: LifecycleEvent,
    },
    /// The stage process exited. `status` is `None` if it could not be reaped.
    Exited {
        stage: StageId,
        status: Option<ExitStatus>,
    },
}

/// Fully resolved invocation of one external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub uses_shell: bool,
}

impl StageSpec {
    /// Create a spec that runs `program` directly.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            uses_shell: false,
        }
    }

    /// Run the command through the platform shell.
    #[must_use]
    pub fn through_shell(mut self, uses_shell: bool) -> Self {
        self.uses_shell = uses_shell;
        self
    }

    /// The command line as a single shell-escaped string.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy())
            .chain(self.args.iter().map(|arg| Cow::Borrowed(arg.as_str())))
            .map(shell_escape::escape)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_command(&self) -> Command {
        if !self.uses_shell {
            let mut cmd = Command::new(&self.program);
            cmd.args(&self.args);
            return cmd;
        }

        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(self.command_line());
            cmd
        }

        #[cfg(not(windows))]
        {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(self.command_line());
            cmd
        }
    }
}

/// A running stage process.
#[derive(Debug)]
pub struct ProcessStage {
    id: StageId,
    pid: Option<u32>,
    handle: JoinHandle<()>,
}

impl ProcessStage {
    /// Spawn the process described by `spec` and start streaming its output.
    ///
    /// Classified output and the final exit notification are sent on `tx`.
    /// Cancelling `cancel` terminates the child.
    ///
    /// # Errors
    ///
    /// Returns `StageError` if the process fails to spawn.
    pub fn start(
        spec: &StageSpec,
        id: StageId,
        tx: Sender<StageMessage>,
        cancel: CancellationToken,
    ) -> Result<Self, StageError> {
        let mut cmd = spec.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| StageError::from_io(e, &spec.program))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(StageError::MissingPipe(StreamKind::Stdout))?;
        let stderr = child
            .stderr
            .take()
            .ok_or(StageError::MissingPipe(StreamKind::Stderr))?;

        let pid = child.id();
        tracing::debug!(stage = ?id, pid, command = %spec.command_line(), "Stage started");

        let markers = id.kind.markers();
        let handle = tokio::spawn(async move {
            let out = tokio::spawn(pump(stdout, id, StreamKind::Stdout, markers.clone(), tx.clone()));
            let err = tokio::spawn(pump(stderr, id, StreamKind::Stderr, markers, tx.clone()));

            let status = tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    let status = terminate(&mut child, DEFAULT_TERMINATE_TIMEOUT).await;
                    out.abort();
                    err.abort();
                    status
                }
                status = child.wait() => {
                    let _ = out.await;
                    let _ = err.await;
                    status
                }
            };

            let status = match status {
                Ok(status) => Some(status),
                Err(e) => {
                    tracing::warn!(stage = ?id, error = %e, "Failed to reap stage process");
                    None
                }
            };
            let _ = tx.send(StageMessage::Exited { stage: id, status }).await;
        });

        Ok(Self { id, pid, handle })
    }

    /// Identifier of this stage.
    #[must_use]
    pub fn id(&self) -> StageId {
        self.id
    }

    /// Process ID at spawn time.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Returns true once the stage has sent its exit notification.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

async fn pump<R>(
    mut reader: R,
    stage: StageId,
    stream: StreamKind,
    markers: StageMarkers,
    tx: Sender<StageMessage>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let event = markers.classify(&buf[..n], stream);
                tracing::trace!(stage = ?stage, %stream, ?event, "Classified output chunk");
                if tx
                    .send(StageMessage::Output {
                        stage,
                        stream,
                        event,
                    })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(stage = ?stage, %stream, error = %e, "Failed to read stage output");
                break;
            }
        }
    }
}

/// Attempt graceful termination with a timeout.
///
/// On Unix, sends SIGTERM first, then SIGKILL after the timeout.
/// On other platforms, falls back to immediate kill.
async fn terminate(child: &mut Child, timeout: Duration) -> std::io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            let nix_pid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
            let _ = kill(nix_pid, Signal::SIGTERM);

            if let Ok(status) = tokio::time::timeout(timeout, child.wait()).await {
                return status;
            }
        }
    }

    #[cfg(not(unix))]
    let _ = timeout;

    child.kill().await?;
    child.wait().await
}
