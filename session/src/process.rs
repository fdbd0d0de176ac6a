//! Process manager: owns the checker subprocess and its pipes.
//!
//! The process is started lazily on first use and replaced transparently
//! once it has exited. A handle whose last exchange never read its full
//! response is out of step with the checker and is replaced the same way.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command as ProcessCommand};
use tokio::task::JoinHandle;

use crate::codec::{LineReader, LineWriter};
use crate::error::SessionError;
use crate::protocol::Command;

/// Script the interpreter runs to bridge the line protocol to the checker daemon.
pub const BOOTSTRAP_SCRIPT: &str = include_str!("../resources/checker_handler.py");

/// `tracing` target for forwarded checker stderr.
const CHECKER_LOG_TARGET: &str = "tycheck::checker";

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

enum Liveness {
    Child(Child),
    /// Pipe-only handle; the other end clears the flag when it stops.
    Flag(Arc<AtomicBool>),
}

/// A running checker: its request/response pipes plus a way to tell if it's alive.
pub struct SessionHandle {
    liveness: Liveness,
    writer: LineWriter<BoxedWriter>,
    reader: LineReader<BoxedReader>,
    stderr_task: Option<JoinHandle<()>>,
    /// Set from writing a request until its whole response has been read.
    /// Still set afterwards means the exchange was dropped or failed midway.
    in_flight: bool,
}

impl SessionHandle {
    /// Take ownership of a spawned child with piped stdin/stdout.
    ///
    /// If stderr is piped too, it is forwarded line by line to the log.
    pub fn from_child(mut child: Child) -> Result<Self, SessionError> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::ProcessUnavailable("no stdin from checker".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::ProcessUnavailable("no stdout from checker".into()))?;

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: CHECKER_LOG_TARGET, "{line}");
                }
            })
        });

        Ok(Self {
            liveness: Liveness::Child(child),
            writer: LineWriter::new(Box::new(stdin)),
            reader: LineReader::new(Box::new(stdout)),
            stderr_task,
            in_flight: false,
        })
    }

    /// Wrap arbitrary pipes, e.g. an in-process checker or a remote bridge.
    ///
    /// The handle counts as alive while `running` is true.
    pub fn from_pipes<W, R>(writer: W, reader: R, running: Arc<AtomicBool>) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            liveness: Liveness::Flag(running),
            writer: LineWriter::new(Box::new(writer)),
            reader: LineReader::new(Box::new(reader)),
            stderr_task: None,
            in_flight: false,
        }
    }

    /// Whether the process is running and in step with its pipes.
    pub fn is_alive(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        match &mut self.liveness {
            Liveness::Child(child) => matches!(child.try_wait(), Ok(None)),
            Liveness::Flag(running) => running.load(Ordering::SeqCst),
        }
    }

    /// Whether an exchange was started and never completed.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Send one request line and read a sentinel-terminated block.
    pub async fn exchange_block(&mut self, commands: &[Command]) -> Result<Vec<String>, SessionError> {
        self.in_flight = true;
        self.writer.write_commands(commands).await?;
        let lines = self.reader.read_block().await?;
        self.in_flight = false;
        Ok(lines)
    }

    /// Send one request line and read exactly one answer line.
    pub async fn exchange_answer(
        &mut self,
        commands: &[Command],
    ) -> Result<Option<String>, SessionError> {
        self.in_flight = true;
        self.writer.write_commands(commands).await?;
        let answer = self.reader.read_answer().await?;
        self.in_flight = false;
        Ok(answer)
    }

    async fn kill(&mut self) {
        self.stop_stderr_forwarding();
        match &mut self.liveness {
            Liveness::Child(child) => {
                if let Err(e) = child.kill().await {
                    tracing::debug!("Failed to kill checker process: {e}");
                }
            }
            Liveness::Flag(running) => running.store(false, Ordering::SeqCst),
        }
    }

    /// Signal the process to stop without waiting for it to exit.
    fn abandon(&mut self) {
        self.stop_stderr_forwarding();
        match &mut self.liveness {
            Liveness::Child(child) => {
                if let Err(e) = child.start_kill() {
                    tracing::debug!("Failed to signal checker process: {e}");
                }
            }
            Liveness::Flag(running) => running.store(false, Ordering::SeqCst),
        }
    }

    fn stop_stderr_forwarding(&mut self) {
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}

/// Starts checker processes. Swappable so hosts can provide their own transport.
pub trait Spawner: Send + Sync {
    fn spawn(&self, workspace_root: &Path, interpreter: &Path) -> Result<SessionHandle, SessionError>;
}

/// Runs `<interpreter> -u -c <bootstrap script>` in the workspace root.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSpawner;

impl ProcessSpawner {
    /// Bare names like `python3` are looked up on `PATH`; paths are used as given.
    fn resolve(interpreter: &Path) -> Result<PathBuf, SessionError> {
        if interpreter.components().count() > 1 {
            return Ok(interpreter.to_path_buf());
        }
        which::which(interpreter).map_err(|e| SessionError::Spawn {
            interpreter: interpreter.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, e),
        })
    }

    fn script() -> String {
        if cfg!(windows) {
            BOOTSTRAP_SCRIPT.replace('"', "\\\"")
        } else {
            BOOTSTRAP_SCRIPT.to_string()
        }
    }
}

impl Spawner for ProcessSpawner {
    fn spawn(&self, workspace_root: &Path, interpreter: &Path) -> Result<SessionHandle, SessionError> {
        let resolved = Self::resolve(interpreter)?;
        let child = ProcessCommand::new(&resolved)
            .arg("-u")
            .arg("-c")
            .arg(Self::script())
            .current_dir(workspace_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SessionError::Spawn {
                interpreter: resolved.clone(),
                source,
            })?;
        tracing::info!(
            interpreter = %resolved.display(),
            root = %workspace_root.display(),
            pid = child.id(),
            "Started checker process"
        );
        SessionHandle::from_child(child)
    }
}

/// Owns at most one checker process for a workspace.
pub struct ProcessManager {
    spawner: Arc<dyn Spawner>,
    workspace_root: PathBuf,
    interpreter: Option<PathBuf>,
    handle: Option<SessionHandle>,
    starts: u64,
}

impl ProcessManager {
    pub fn new(
        spawner: Arc<dyn Spawner>,
        workspace_root: impl Into<PathBuf>,
        interpreter: Option<PathBuf>,
    ) -> Self {
        Self {
            spawner,
            workspace_root: workspace_root.into(),
            interpreter,
            handle: None,
            starts: 0,
        }
    }

    /// The live handle, starting or restarting the process as needed.
    ///
    /// Idempotent while the process is alive.
    pub fn ensure_running(&mut self) -> Result<&mut SessionHandle, SessionError> {
        let interpreter = self
            .interpreter
            .as_deref()
            .ok_or(SessionError::NoInterpreter)?;

        let alive = self.handle.as_mut().is_some_and(SessionHandle::is_alive);
        if !alive {
            if let Some(mut stale) = self.handle.take() {
                if stale.is_in_flight() {
                    tracing::warn!(
                        root = %self.workspace_root.display(),
                        "Previous exchange never completed; restarting checker"
                    );
                } else {
                    tracing::warn!(
                        root = %self.workspace_root.display(),
                        "Checker process exited; restarting"
                    );
                }
                stale.abandon();
            }
            let handle = self.spawner.spawn(&self.workspace_root, interpreter)?;
            self.handle = Some(handle);
            self.starts += 1;
        }

        self.handle
            .as_mut()
            .ok_or_else(|| SessionError::ProcessUnavailable("checker not started".into()))
    }

    /// Number of processes started so far.
    #[must_use]
    pub fn starts(&self) -> u64 {
        self.starts
    }

    #[must_use]
    pub fn has_interpreter(&self) -> bool {
        self.interpreter.is_some()
    }

    /// Kill the current process, if any.
    pub async fn shutdown(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            tracing::info!(root = %self.workspace_root.display(), "Stopping checker process");
            handle.kill().await;
        }
    }
}
