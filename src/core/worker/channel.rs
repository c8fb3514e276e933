use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::protocol::{WorkerCommand, WorkerMessage, WorkerResponse};

/// Which subsystem a worker process is started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    JavaGuard,
    AssetGuard,
}

impl WorkerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerKind::JavaGuard => "JavaGuard",
            WorkerKind::AssetGuard => "AssetGuard",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw event produced by a transport, before decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Response(WorkerResponse),
    Exited(Option<i32>),
}

/// Byte-level link to one worker. The child-process transport is the real
/// one; tests script their own.
#[async_trait]
pub trait WorkerTransport: Send {
    async fn send(&mut self, command: &WorkerCommand) -> LauncherResult<()>;

    /// Next event, or `None` once the worker is gone and fully drained.
    async fn recv(&mut self) -> Option<LauncherResult<TransportEvent>>;

    /// Close the link and stop the worker. Called at most once.
    fn shutdown(&mut self);
}

/// Decoded event handed to coordinators.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Message(WorkerMessage),
    Exited(Option<i32>),
    Failed(String),
}

/// Context-addressed channel to a worker.
///
/// Allows at most one outstanding `execute` per response context and decodes
/// every response into a `WorkerMessage` before handing it out.
pub struct WorkerChannel {
    kind: WorkerKind,
    transport: Option<Box<dyn WorkerTransport>>,
    in_flight: HashSet<String>,
}

impl WorkerChannel {
    pub fn new(kind: WorkerKind, transport: Box<dyn WorkerTransport>) -> Self {
        Self {
            kind,
            transport: Some(transport),
            in_flight: HashSet::new(),
        }
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// No command is waiting for its completion or error.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub async fn send(&mut self, command: WorkerCommand) -> LauncherResult<()> {
        let transport = self.transport.as_mut().ok_or(LauncherError::WorkerClosed)?;

        if let Some(context) = command.response_context() {
            if self.in_flight.contains(context) {
                return Err(LauncherError::CommandInFlight(context.to_string()));
            }
        }

        debug!("[{}] -> {:?}", self.kind, command);
        transport.send(&command).await?;

        if let Some(context) = command.response_context() {
            self.in_flight.insert(context.to_string());
        }
        Ok(())
    }

    /// Wait for the next decoded event. `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<WorkerEvent> {
        loop {
            let transport = self.transport.as_mut()?;
            match transport.recv().await {
                None => {
                    self.in_flight.clear();
                    return None;
                }
                Some(Ok(TransportEvent::Response(raw))) => match WorkerMessage::try_from(raw) {
                    Ok(message) => {
                        if let Some(function) = message.settles() {
                            self.in_flight.remove(function);
                        }
                        return Some(WorkerEvent::Message(message));
                    }
                    Err(err) => {
                        warn!("[{}] Ignoring undecodable message: {}", self.kind, err);
                    }
                },
                Some(Ok(TransportEvent::Exited(code))) => {
                    self.in_flight.clear();
                    return Some(WorkerEvent::Exited(code));
                }
                Some(Err(err)) => return Some(WorkerEvent::Failed(err.to_string())),
            }
        }
    }

    /// Release the worker. Returns `false` if it was already released.
    pub fn teardown(&mut self) -> bool {
        match self.transport.take() {
            Some(mut transport) => {
                transport.shutdown();
                self.in_flight.clear();
                debug!("[{}] Worker channel torn down", self.kind);
                true
            }
            None => false,
        }
    }
}

impl Drop for WorkerChannel {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for WorkerChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerChannel")
            .field("kind", &self.kind)
            .field("open", &self.is_open())
            .field("in_flight", &self.in_flight)
            .finish()
    }
}
