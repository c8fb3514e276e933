// Test doubles shared by the coordinator tests: a scripted worker, a
// recording view, an in-memory config and a recording presence notifier.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::core::auth::AuthAccount;
use crate::core::distro::{DistroPresence, ServerPresence};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::presence::PresenceNotifier;
use crate::core::progress::OsProgress;
use crate::core::protocol::{WorkerCommand, WorkerResponse};
use crate::core::state::{JavaSettings, LauncherConfig};
use crate::core::view::{LaunchFailure, LaunchView, Prompt, PromptChoice};
use crate::core::worker::{TransportEvent, WorkerChannel, WorkerKind, WorkerSpawner, WorkerTransport};

pub fn response(raw: Value) -> WorkerResponse {
    serde_json::from_value(raw).expect("scripted response must be a valid envelope")
}

// ── Scripted worker ──

/// Shared view into a `ScriptedTransport` after it moved into a channel.
#[derive(Debug, Clone, Default)]
pub struct ScriptHandle {
    sent: Arc<Mutex<Vec<WorkerCommand>>>,
    shutdowns: Arc<AtomicUsize>,
}

impl ScriptHandle {
    pub fn sent(&self) -> Vec<WorkerCommand> {
        self.sent.lock().unwrap().clone()
    }

    /// Function names of every `execute` sent, in order.
    pub fn executed(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|command| match command {
                WorkerCommand::Execute { function, .. } => Some(function),
                WorkerCommand::ChangeContext { .. } => None,
            })
            .collect()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

/// In-memory worker: replies to each `execute` with a canned sequence and
/// exits once it has nothing left to say.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: HashMap<String, VecDeque<Vec<TransportEvent>>>,
    pending: VecDeque<TransportEvent>,
    exit_code: Option<i32>,
    exited: bool,
    handle: ScriptHandle,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            exit_code: Some(0),
            ..Self::default()
        }
    }

    /// Events available before any command is sent.
    pub fn with_initial(mut self, responses: Vec<WorkerResponse>) -> Self {
        self.pending
            .extend(responses.into_iter().map(TransportEvent::Response));
        self
    }

    /// Queue the replies to the next `execute` of `function`.
    pub fn on(mut self, function: &str, responses: Vec<WorkerResponse>) -> Self {
        self.replies
            .entry(function.to_string())
            .or_default()
            .push_back(responses.into_iter().map(TransportEvent::Response).collect());
        self
    }

    /// Exit code reported once the script runs dry.
    pub fn exit_with(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    pub fn into_parts(self) -> (Self, ScriptHandle) {
        let handle = self.handle.clone();
        (self, handle)
    }
}

#[async_trait]
impl WorkerTransport for ScriptedTransport {
    async fn send(&mut self, command: &WorkerCommand) -> LauncherResult<()> {
        self.handle.sent.lock().unwrap().push(command.clone());
        if let WorkerCommand::Execute { function, .. } = command {
            if let Some(batch) = self
                .replies
                .get_mut(function)
                .and_then(|queue| queue.pop_front())
            {
                self.pending.extend(batch);
            }
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<LauncherResult<TransportEvent>> {
        if let Some(event) = self.pending.pop_front() {
            return Some(Ok(event));
        }
        if self.exited {
            return None;
        }
        self.exited = true;
        Some(Ok(TransportEvent::Exited(self.exit_code)))
    }

    fn shutdown(&mut self) {
        self.handle.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out pre-scripted transports per worker kind.
#[derive(Default)]
pub struct ScriptedSpawner {
    scripts: Mutex<HashMap<WorkerKind, VecDeque<ScriptedTransport>>>,
    spawned: Mutex<Vec<(WorkerKind, Vec<String>)>>,
}

impl ScriptedSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, kind: WorkerKind, transport: ScriptedTransport) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(transport);
        self
    }

    pub fn spawned(&self) -> Vec<(WorkerKind, Vec<String>)> {
        self.spawned.lock().unwrap().clone()
    }

    pub fn spawned_kinds(&self) -> Vec<WorkerKind> {
        self.spawned().into_iter().map(|(kind, _)| kind).collect()
    }
}

impl WorkerSpawner for ScriptedSpawner {
    fn spawn(&self, kind: WorkerKind, args: Vec<String>) -> LauncherResult<WorkerChannel> {
        self.spawned.lock().unwrap().push((kind, args));
        let transport = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| LauncherError::WorkerSpawn {
                worker: kind.to_string(),
                reason: "no scripted worker left".into(),
            })?;
        Ok(WorkerChannel::new(kind, Box::new(transport)))
    }
}

// ── Recording view ──

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    LaunchArea(bool),
    Details(String),
    Percent(u8),
    Os(OsProgress),
    Failure(LaunchFailure),
    Prompt(String),
}

/// `LaunchView` that records every call and answers prompts from a queue.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub events: Vec<ViewEvent>,
    answers: VecDeque<PromptChoice>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(answers: &[PromptChoice]) -> Self {
        Self {
            events: Vec::new(),
            answers: answers.iter().copied().collect(),
        }
    }

    pub fn percentages(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Percent(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn details(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Details(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<LaunchFailure> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Failure(f) => Some(f.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Prompt(title) => Some(title.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn os_progress(&self) -> Vec<OsProgress> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Os(p) => Some(*p),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl LaunchView for RecordingView {
    fn toggle_launch_area(&mut self, loading: bool) {
        self.events.push(ViewEvent::LaunchArea(loading));
    }

    fn set_launch_details(&mut self, details: &str) {
        self.events.push(ViewEvent::Details(details.to_string()));
    }

    fn set_launch_percentage(&mut self, percent: u8) {
        self.events.push(ViewEvent::Percent(percent));
    }

    fn set_os_progress(&mut self, progress: OsProgress) {
        self.events.push(ViewEvent::Os(progress));
    }

    fn show_failure(&mut self, failure: &LaunchFailure) {
        self.events.push(ViewEvent::Failure(failure.clone()));
    }

    async fn prompt(&mut self, prompt: &Prompt) -> PromptChoice {
        self.events.push(ViewEvent::Prompt(prompt.title.clone()));
        self.answers
            .pop_front()
            .expect("test view asked an unscripted prompt")
    }
}

// ── In-memory config ──

#[derive(Debug, Clone, Default)]
pub struct MemoryConfig {
    pub account: Option<AuthAccount>,
    pub server: Option<String>,
    pub java: JavaSettings,
    pub root: PathBuf,
}

impl MemoryConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            account: Some(AuthAccount::offline("Steve")),
            server: Some("main".into()),
            root: root.into(),
            ..Self::default()
        }
    }
}

impl LauncherConfig for MemoryConfig {
    fn selected_account(&self) -> Option<AuthAccount> {
        self.account.clone()
    }

    fn selected_server(&self) -> Option<String> {
        self.server.clone()
    }

    fn set_selected_server(&mut self, server_id: Option<String>) {
        self.server = server_id;
    }

    fn java_executable(&self) -> Option<PathBuf> {
        self.java.executable.clone()
    }

    fn set_java_executable(&mut self, executable: Option<PathBuf>) {
        self.java.executable = executable;
    }

    fn java_settings(&self) -> JavaSettings {
        self.java.clone()
    }

    fn common_dir(&self) -> PathBuf {
        self.root.join("common")
    }

    fn data_dir(&self) -> PathBuf {
        self.root.clone()
    }

    fn launcher_dir(&self) -> PathBuf {
        self.root.clone()
    }

    fn save(&self) -> LauncherResult<()> {
        Ok(())
    }
}

// ── Recording presence ──

#[derive(Debug, Default)]
pub struct RecordingPresence {
    pub initialised: bool,
    pub details: Vec<String>,
    pub shutdowns: usize,
}

impl PresenceNotifier for RecordingPresence {
    fn init(&mut self, _distro: &DistroPresence, _server: &ServerPresence) {
        self.initialised = true;
    }

    fn update_details(&mut self, details: &str) {
        self.details.push(details.to_string());
    }

    fn shutdown(&mut self) {
        self.shutdowns += 1;
    }
}
