// ─── Worker Process ───
// Runs a worker executable as a child process speaking newline-delimited
// JSON: one command per stdin line, one response per stdout line. Anything
// else the worker prints is forwarded to the log verbatim.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::protocol::{WorkerCommand, WorkerResponse};

use super::channel::{TransportEvent, WorkerChannel, WorkerKind, WorkerTransport};
use super::lines::LossyLines;

/// Environment variable pointing the worker at the launcher directory.
pub const CONFIG_DIRECT_PATH_ENV: &str = "CONFIG_DIRECT_PATH";

/// Starts worker processes. Swappable so coordinators can be driven by
/// scripted workers.
pub trait WorkerSpawner: Send + Sync {
    fn spawn(&self, kind: WorkerKind, args: Vec<String>) -> LauncherResult<WorkerChannel>;
}

/// Spawns `<executable> <kind> <args...>` with piped stdio.
#[derive(Debug, Clone)]
pub struct ProcessWorkerSpawner {
    executable: PathBuf,
    launcher_dir: PathBuf,
}

impl ProcessWorkerSpawner {
    pub fn new(executable: impl Into<PathBuf>, launcher_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            launcher_dir: launcher_dir.into(),
        }
    }
}

impl WorkerSpawner for ProcessWorkerSpawner {
    fn spawn(&self, kind: WorkerKind, args: Vec<String>) -> LauncherResult<WorkerChannel> {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(kind.as_str())
            .args(&args)
            .env(CONFIG_DIRECT_PATH_ENV, &self.launcher_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(target_os = "windows")]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = cmd.spawn().map_err(|e| LauncherError::WorkerSpawn {
            worker: kind.to_string(),
            reason: format!("{}: {}", self.executable.display(), e),
        })?;

        info!(
            "[{}] Worker started (pid {:?}) with args {:?}",
            kind,
            child.id(),
            args
        );

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .map(|out| LossyLines::new(Box::new(out) as BoxedReader));
        let stderr = child
            .stderr
            .take()
            .map(|err| LossyLines::new(Box::new(err) as BoxedReader));

        let transport = ProcessTransport {
            kind,
            child,
            stdin,
            stdout,
            stderr,
            finished: false,
        };
        Ok(WorkerChannel::new(kind, Box::new(transport)))
    }
}

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

struct ProcessTransport {
    kind: WorkerKind,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<LossyLines<BoxedReader>>,
    stderr: Option<LossyLines<BoxedReader>>,
    finished: bool,
}

#[async_trait]
impl WorkerTransport for ProcessTransport {
    async fn send(&mut self, command: &WorkerCommand) -> LauncherResult<()> {
        let stdin = self.stdin.as_mut().ok_or(LauncherError::WorkerClosed)?;
        let mut line = serde_json::to_string(command)?;
        line.push('\n');
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<LauncherResult<TransportEvent>> {
        loop {
            if self.finished {
                return None;
            }

            let streams_closed = self.stdout.is_none() && self.stderr.is_none();
            tokio::select! {
                line = next_line(&mut self.stdout) => match line {
                    Some(line) => {
                        if let Some(response) = decode_line(&line) {
                            return Some(Ok(TransportEvent::Response(response)));
                        }
                        info!("[{}] {}", self.kind, line);
                    }
                    None => self.stdout = None,
                },
                line = next_line(&mut self.stderr) => match line {
                    Some(line) => warn!("[{}] {}", self.kind, line),
                    None => self.stderr = None,
                },
                status = self.child.wait(), if streams_closed => {
                    self.finished = true;
                    self.stdin = None;
                    return match status {
                        Ok(status) => {
                            info!("[{}] Worker exited with {:?}", self.kind, status.code());
                            Some(Ok(TransportEvent::Exited(status.code())))
                        }
                        Err(e) => Some(Err(LauncherError::Io {
                            path: PathBuf::from(self.kind.as_str()),
                            source: e,
                        })),
                    };
                }
            }
        }
    }

    fn shutdown(&mut self) {
        self.stdin = None;
        self.stdout = None;
        self.stderr = None;
        if !self.finished {
            if let Err(e) = self.child.start_kill() {
                warn!("[{}] Failed to stop worker: {}", self.kind, e);
            }
        }
        self.finished = true;
    }
}

/// Next line from an optional stream. Pends forever once the stream is
/// gone; read errors end the stream.
async fn next_line(stream: &mut Option<LossyLines<BoxedReader>>) -> Option<String> {
    match stream.as_mut() {
        Some(lines) => match lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!("Worker output unreadable: {}", e);
                None
            }
        },
        None => std::future::pending().await,
    }
}

/// A stdout line is a protocol response only if it is a JSON object that
/// carries a `context`.
fn decode_line(line: &str) -> Option<WorkerResponse> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}
