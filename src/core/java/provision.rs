// ─── Java Provisioning ───
// Drives the JavaGuard worker: scan for a usable runtime, and when none is
// found offer to download one, then wait for download and extraction.

use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::progress::{JavaPhase, OsProgress, ProgressAggregator, StatusAnimator};
use crate::core::protocol::{ChannelTag, DownloadQueue, WorkerCommand, WorkerMessage};
use crate::core::session::LaunchSession;
use crate::core::state::LauncherConfig;
use crate::core::view::{LaunchFailure, LaunchView, Prompt, PromptChoice};
use crate::core::worker::{WorkerChannel, WorkerEvent, WorkerKind, WorkerSpawner};

pub const LABEL_CHECKING: &str = "Checking system info..";
pub const LABEL_PREPARING_DOWNLOAD: &str = "Preparing Java Download..";
pub const LABEL_DOWNLOADING: &str = "Downloading Java..";
pub const LABEL_EXTRACTING: &str = "Extracting";
pub const LABEL_INSTALLED: &str = "Java installed!";

/// How a provisioning attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JavaProvisioning {
    /// A usable runtime is known and persisted.
    Resolved(PathBuf),
    /// The user went back; scan again from the top.
    Rescan,
    /// Attempt over. Any overlay has already been shown.
    Abandoned,
}

pub struct JavaProvisioner<'a> {
    spawner: &'a dyn WorkerSpawner,
}

impl<'a> JavaProvisioner<'a> {
    pub fn new(spawner: &'a dyn WorkerSpawner) -> Self {
        Self { spawner }
    }

    /// Run one scan (and optional install). The JavaGuard worker is released
    /// on every exit path.
    pub async fn run(
        &self,
        session: &mut LaunchSession,
        config: &mut dyn LauncherConfig,
        view: &mut dyn LaunchView,
    ) -> JavaProvisioning {
        view.toggle_launch_area(true);
        session.show_percent(view, 0);

        let outcome = match self.drive(session, config, view).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Java provisioning failed: {}", e);
                view.set_os_progress(OsProgress::Hidden);
                view.fail(&LaunchFailure::launch_failed());
                JavaProvisioning::Abandoned
            }
        };

        session.release_worker(WorkerKind::JavaGuard);
        outcome
    }

    async fn drive(
        &self,
        session: &mut LaunchSession,
        config: &mut dyn LauncherConfig,
        view: &mut dyn LaunchView,
    ) -> LauncherResult<JavaProvisioning> {
        let channel = self.spawner.spawn(
            WorkerKind::JavaGuard,
            vec![session.server.minecraft_version.clone()],
        )?;
        session.attach_worker(channel);

        let mut animator = StatusAnimator::new();
        let mut progress = ProgressAggregator::new();

        session.show_details(view, LABEL_CHECKING);
        java_worker(session)?
            .send(WorkerCommand::validate_java(&config.data_dir()))
            .await?;

        loop {
            let event = {
                let channel = java_worker(session)?;
                tokio::select! {
                    event = channel.recv() => event,
                    label = animator.tick(), if animator.is_active() => {
                        view.set_launch_details(&label);
                        continue;
                    }
                }
            };

            let message = match event {
                Some(WorkerEvent::Message(message)) => message,
                Some(WorkerEvent::Exited(code)) => {
                    warn!("JavaGuard exited unexpectedly ({:?})", code);
                    view.set_os_progress(OsProgress::Hidden);
                    view.fail(&LaunchFailure::worker_exited(code));
                    return Ok(JavaProvisioning::Abandoned);
                }
                Some(WorkerEvent::Failed(reason)) => {
                    return Err(LauncherError::JavaExecution(reason));
                }
                None => return Err(LauncherError::WorkerClosed),
            };

            match message {
                WorkerMessage::ValidateJava {
                    executable: Some(path),
                } => {
                    info!("Found usable Java at {}", path.display());
                    persist_java(session, config, path.clone());
                    return Ok(JavaProvisioning::Resolved(path));
                }
                WorkerMessage::ValidateJava { executable: None } => {
                    match view.prompt(&Prompt::java_missing()).await {
                        PromptChoice::Primary => {
                            session.show_details(view, LABEL_PREPARING_DOWNLOAD);
                            let java = config
                                .java_executable()
                                .map(|p| Value::String(p.to_string_lossy().to_string()))
                                .unwrap_or(Value::Null);
                            let common = Value::String(config.common_dir().to_string_lossy().to_string());
                            let channel = java_worker(session)?;
                            channel
                                .send(WorkerCommand::change_context("AssetGuard", vec![common, java]))
                                .await?;
                            channel
                                .send(WorkerCommand::enqueue_open_jdk(&config.data_dir()))
                                .await?;
                        }
                        PromptChoice::Secondary => {
                            return Ok(match view.prompt(&Prompt::java_required()).await {
                                PromptChoice::Primary => {
                                    view.toggle_launch_area(false);
                                    JavaProvisioning::Abandoned
                                }
                                PromptChoice::Secondary => JavaProvisioning::Rescan,
                                PromptChoice::Dismissed => {
                                    info!("Java prompt dismissed, abandoning launch");
                                    view.toggle_launch_area(false);
                                    JavaProvisioning::Abandoned
                                }
                            });
                        }
                        PromptChoice::Dismissed => {
                            info!("Java prompt dismissed, abandoning launch");
                            view.toggle_launch_area(false);
                            return Ok(JavaProvisioning::Abandoned);
                        }
                    }
                }
                WorkerMessage::JavaEnqueued { enqueued: true } => {
                    session.show_details(view, LABEL_DOWNLOADING);
                    java_worker(session)?
                        .send(WorkerCommand::process_download_queues(&[DownloadQueue {
                            id: "java".into(),
                            limit: 1,
                        }]))
                        .await?;
                }
                WorkerMessage::JavaEnqueued { enqueued: false } => {
                    warn!("Java download could not be enqueued");
                    view.fail(&LaunchFailure::java_download_failed());
                    return Ok(JavaProvisioning::Abandoned);
                }
                WorkerMessage::Progress {
                    channel: ChannelTag::Download,
                    value,
                    total,
                    percent,
                } => {
                    let shown = match percent {
                        Some(percent) => {
                            progress.advance(JavaPhase::Downloading, f64::from(percent), 100.0)
                        }
                        None => progress.advance(JavaPhase::Downloading, value, total),
                    };
                    session.progress = shown;
                    view.show_download_progress(fraction(value, total), shown);
                }
                WorkerMessage::Complete {
                    channel: ChannelTag::Download,
                    ..
                } => {
                    view.set_os_progress(OsProgress::Indeterminate);
                    let label = animator.start(LABEL_EXTRACTING);
                    session.show_details(view, &label);
                }
                WorkerMessage::Complete {
                    channel: ChannelTag::Java,
                    args,
                } => {
                    view.set_os_progress(OsProgress::Hidden);
                    animator.stop();
                    let Some(path) = args.first().and_then(Value::as_str).map(PathBuf::from)
                    else {
                        error!("Java install completed without an executable path");
                        view.fail(&LaunchFailure::java_download_failed());
                        return Ok(JavaProvisioning::Abandoned);
                    };
                    persist_java(session, config, path.clone());
                    let percent = progress.complete(JavaPhase::Installed);
                    session.show_percent(view, percent);
                    session.show_details(view, LABEL_INSTALLED);
                    return Ok(JavaProvisioning::Resolved(path));
                }
                WorkerMessage::Failure {
                    channel: ChannelTag::Download | ChannelTag::Java,
                    error,
                } => {
                    error!("Java download failed: {}", error.message);
                    view.set_os_progress(OsProgress::Hidden);
                    view.fail(&LaunchFailure::java_download_failed());
                    return Ok(JavaProvisioning::Abandoned);
                }
                other => debug!("Ignoring JavaGuard message: {:?}", other),
            }
        }
    }
}

fn java_worker(session: &mut LaunchSession) -> LauncherResult<&mut WorkerChannel> {
    session.java_worker.as_mut().ok_or(LauncherError::WorkerClosed)
}

fn persist_java(session: &mut LaunchSession, config: &mut dyn LauncherConfig, path: PathBuf) {
    config.set_java_executable(Some(path.clone()));
    if let Err(e) = config.save() {
        warn!("Could not persist Java executable: {}", e);
    }
    session.java_executable = Some(path);
}

pub(crate) fn fraction(value: f64, total: f64) -> f64 {
    if total > 0.0 && value.is_finite() {
        (value / total).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
