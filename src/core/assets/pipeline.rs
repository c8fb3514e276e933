// ─── Asset Pipeline ───
// Drives the AssetGuard worker through validation, download and extraction
// and folds its progress reports into one percentage.

use tracing::{debug, error, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::provision::fraction;
use crate::core::progress::{AssetPhase, OsProgress, ProgressAggregator, StatusAnimator};
use crate::core::protocol::{ChannelTag, WorkerCommand, WorkerMessage};
use crate::core::session::LaunchSession;
use crate::core::state::LauncherConfig;
use crate::core::version::{ModLoaderMetadata, VersionMetadata};
use crate::core::view::{LaunchFailure, LaunchView};
use crate::core::worker::{WorkerChannel, WorkerEvent, WorkerKind, WorkerSpawner};

pub const LABEL_EXTRACTING_LIBRARIES: &str = "Extracting libraries";

#[derive(Debug, Clone, PartialEq)]
pub enum AssetOutcome {
    Ready {
        version: VersionMetadata,
        mod_loader: ModLoaderMetadata,
    },
    /// Attempt over. The failure overlay has already been shown.
    Failed,
}

pub struct AssetPipeline<'a> {
    spawner: &'a dyn WorkerSpawner,
}

impl<'a> AssetPipeline<'a> {
    pub fn new(spawner: &'a dyn WorkerSpawner) -> Self {
        Self { spawner }
    }

    /// Validate (and download) everything the selected server needs. The
    /// AssetGuard worker is released on every exit path.
    pub async fn run(
        &self,
        session: &mut LaunchSession,
        config: &dyn LauncherConfig,
        view: &mut dyn LaunchView,
        dev_mode: bool,
    ) -> AssetOutcome {
        view.toggle_launch_area(true);
        session.show_percent(view, 0);

        let outcome = match self.drive(session, config, view, dev_mode).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Error during launch: {}", e);
                view.set_os_progress(OsProgress::Hidden);
                view.fail(&LaunchFailure::launch_failed());
                AssetOutcome::Failed
            }
        };

        session.release_worker(WorkerKind::AssetGuard);
        outcome
    }

    async fn drive(
        &self,
        session: &mut LaunchSession,
        config: &dyn LauncherConfig,
        view: &mut dyn LaunchView,
        dev_mode: bool,
    ) -> LauncherResult<AssetOutcome> {
        let java = session
            .java_executable
            .clone()
            .or_else(|| config.java_executable())
            .map(|path| path.to_string_lossy().to_string())
            .unwrap_or_default();
        let channel = self.spawner.spawn(
            WorkerKind::AssetGuard,
            vec![config.common_dir().to_string_lossy().to_string(), java],
        )?;
        session.attach_worker(channel);

        let mut animator = StatusAnimator::new();
        let mut progress = ProgressAggregator::new();
        let mut downloading = false;

        let command = WorkerCommand::validate_everything(&session.server.id, dev_mode);
        asset_worker(session)?.send(command).await?;

        loop {
            let event = {
                let channel = asset_worker(session)?;
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
                    error!("AssetGuard exited with code {:?}, assuming error.", code);
                    view.set_os_progress(OsProgress::Hidden);
                    view.fail(&LaunchFailure::worker_exited(code));
                    return Ok(AssetOutcome::Failed);
                }
                Some(WorkerEvent::Failed(reason)) => return Err(LauncherError::Other(reason)),
                None => return Err(LauncherError::WorkerClosed),
            };

            match message {
                WorkerMessage::Validate { phase } => match AssetPhase::from_validation(&phase) {
                    Some(phase) => {
                        info!("Validation step complete: {:?}", phase);
                        let percent = progress.complete(phase);
                        session.show_percent(view, percent);
                        session.show_details(view, phase.next_label());
                    }
                    None => debug!("Unknown validation step {:?}", phase),
                },
                WorkerMessage::Progress {
                    channel: ChannelTag::Assets,
                    value,
                    total,
                    ..
                } => {
                    let percent = progress.advance(AssetPhase::Assets, value, total);
                    session.show_percent(view, percent);
                }
                WorkerMessage::Progress {
                    channel: ChannelTag::Download,
                    value,
                    total,
                    percent,
                } => {
                    if !downloading {
                        // Downloads are a new run on the same bar.
                        downloading = true;
                        progress.restart();
                    }
                    let shown = match percent {
                        Some(percent) => {
                            progress.advance(AssetPhase::Downloading, f64::from(percent), 100.0)
                        }
                        None => progress.advance(AssetPhase::Downloading, value, total),
                    };
                    session.progress = shown;
                    view.show_download_progress(fraction(value, total), shown);
                }
                WorkerMessage::Progress {
                    channel: ChannelTag::Extract,
                    ..
                } => {
                    if !animator.is_active() {
                        view.set_os_progress(OsProgress::Indeterminate);
                        let label = animator.start(LABEL_EXTRACTING_LIBRARIES);
                        session.show_details(view, &label);
                    }
                }
                WorkerMessage::Complete {
                    channel: ChannelTag::Download,
                    ..
                } => {
                    view.set_os_progress(OsProgress::Hidden);
                    animator.stop();
                    session.show_details(view, AssetPhase::Ready.next_label());
                }
                WorkerMessage::Failure {
                    channel: ChannelTag::Download,
                    error,
                } => {
                    error!("Error during file download: {:?}", error);
                    view.set_os_progress(OsProgress::Hidden);
                    view.fail(&LaunchFailure::download_failed(error.is_unreachable()));
                    return Ok(AssetOutcome::Failed);
                }
                WorkerMessage::ValidateEverything(result) => {
                    animator.stop();
                    return Ok(match (result.version, result.mod_loader) {
                        (Some(version), Some(mod_loader)) => {
                            info!(
                                "Validation finished for {} ({})",
                                version.id().unwrap_or("?"),
                                mod_loader.id().unwrap_or("?")
                            );
                            AssetOutcome::Ready {
                                version,
                                mod_loader,
                            }
                        }
                        (version, mod_loader) => {
                            error!(
                                "Error during validation: version data {}, mod loader data {}, error: {}",
                                present(version.is_some()),
                                present(mod_loader.is_some()),
                                result.error.as_deref().unwrap_or("none reported")
                            );
                            view.fail(&LaunchFailure::validation_failed());
                            AssetOutcome::Failed
                        }
                    });
                }
                WorkerMessage::Failure { channel, error } => {
                    warn!("AssetGuard reported {:?} error: {:?}", channel, error);
                }
                other => debug!("Ignoring AssetGuard message: {:?}", other),
            }
        }
    }
}

fn asset_worker(session: &mut LaunchSession) -> LauncherResult<&mut WorkerChannel> {
    session
        .asset_worker
        .as_mut()
        .ok_or(LauncherError::WorkerClosed)
}

fn present(flag: bool) -> &'static str {
    if flag {
        "present"
    } else {
        "missing"
    }
}
