// ─── Launch Session ───
// Everything one launch attempt owns. Created by the orchestrator, handed
// to each coordinator in turn, torn down exactly once.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::auth::AuthAccount;
use crate::core::distro::Server;
use crate::core::presence::PresenceNotifier;
use crate::core::version::{ModLoaderMetadata, VersionMetadata};
use crate::core::view::LaunchView;
use crate::core::worker::{WorkerChannel, WorkerKind};

pub struct LaunchSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    pub server: Server,
    /// `None` for validate-only runs, which never start the game.
    pub account: Option<AuthAccount>,
    pub java_executable: Option<PathBuf>,
    pub version: Option<VersionMetadata>,
    pub mod_loader: Option<ModLoaderMetadata>,
    /// Overall percentage of the active pipeline.
    pub progress: u8,
    pub phase: String,
    pub java_worker: Option<WorkerChannel>,
    pub asset_worker: Option<WorkerChannel>,
    pub presence_active: bool,
    /// Start the game once the assets are ready.
    pub launch_after: bool,
    torn_down: bool,
}

impl LaunchSession {
    pub fn new(server: Server, account: Option<AuthAccount>, launch_after: bool) -> Self {
        let id = Uuid::new_v4();
        info!("Launch session {} started for server {}", id, server.id);
        Self {
            id,
            started_at: Utc::now(),
            server,
            account,
            java_executable: None,
            version: None,
            mod_loader: None,
            progress: 0,
            phase: String::new(),
            java_worker: None,
            asset_worker: None,
            presence_active: false,
            launch_after,
            torn_down: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Set the phase label and mirror it on the view.
    pub fn show_details(&mut self, view: &mut dyn LaunchView, details: &str) {
        self.phase = details.to_string();
        view.set_launch_details(details);
    }

    pub fn show_percent(&mut self, view: &mut dyn LaunchView, percent: u8) {
        self.progress = percent;
        view.set_launch_percentage(percent);
    }

    /// Store a freshly spawned worker, releasing any previous one of the
    /// same kind.
    pub fn attach_worker(&mut self, channel: WorkerChannel) -> &mut WorkerChannel {
        let slot = match channel.kind() {
            WorkerKind::JavaGuard => &mut self.java_worker,
            WorkerKind::AssetGuard => &mut self.asset_worker,
        };
        if let Some(mut previous) = slot.take() {
            previous.teardown();
        }
        slot.insert(channel)
    }

    /// Tear down and drop the worker of `kind`. `false` if none was live.
    pub fn release_worker(&mut self, kind: WorkerKind) -> bool {
        let slot = match kind {
            WorkerKind::JavaGuard => &mut self.java_worker,
            WorkerKind::AssetGuard => &mut self.asset_worker,
        };
        slot.take().is_some_and(|mut channel| channel.teardown())
    }

    /// Release workers and presence. Later calls are no-ops returning
    /// `false`.
    pub fn teardown(&mut self, presence: &mut dyn PresenceNotifier) -> bool {
        if self.torn_down {
            return false;
        }
        self.release_worker(WorkerKind::JavaGuard);
        self.release_worker(WorkerKind::AssetGuard);
        if self.presence_active {
            presence.shutdown();
            self.presence_active = false;
        }
        self.torn_down = true;
        debug!(
            "Launch session {} torn down after {}s",
            self.id,
            (Utc::now() - self.started_at).num_seconds()
        );
        true
    }
}
