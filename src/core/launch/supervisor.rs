// ─── Game Supervisor ───
// Starts the game, watches its console and keeps the loading UI and rich
// presence in step with what the game reports.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{error, info, warn};

use crate::core::distro::DistroPresence;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::presence::{
    PresenceNotifier, PRESENCE_LOADING, PRESENCE_NEW_WORLD, PRESENCE_WORLD_JOINED,
};
use crate::core::session::LaunchSession;
use crate::core::state::LauncherConfig;
use crate::core::view::{LaunchFailure, LaunchView};
use crate::core::worker::LossyLines;

use super::builder::{GameCommand, GameCommandBuilder, LaunchContext};
use super::classifier::{is_missing_main_class, LineClassifier, LineEvent};

/// The loading UI stays up at least this long after spawn.
pub const MIN_LINGER: Duration = Duration::from_millis(5000);

pub const LABEL_LAUNCHING: &str = "Launching game..";

const LINE_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameLine {
    Stdout(String),
    Stderr(String),
}

/// Console lines and exit status of a running game.
pub struct GameProcessHandle {
    lines: mpsc::Receiver<GameLine>,
    exit: oneshot::Receiver<Option<i32>>,
    spawned_at: Instant,
    pid: Option<u32>,
}

impl GameProcessHandle {
    pub fn spawn(command: &GameCommand) -> LauncherResult<Self> {
        let mut child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LauncherError::Io {
                path: command.program.clone(),
                source: e,
            })?;
        let spawned_at = Instant::now();
        let pid = child.id();

        let (tx, lines) = mpsc::channel(LINE_BUFFER);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone(), GameLine::Stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx, GameLine::Stderr));
        }

        let (exit_tx, exit) = oneshot::channel();
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    error!("Failed waiting for game process: {}", e);
                    None
                }
            };
            let _ = exit_tx.send(code);
        });

        Ok(Self {
            lines,
            exit,
            spawned_at,
            pid,
        })
    }

    /// Handle over externally fed channels. Spawn time is now.
    pub fn from_parts(
        lines: mpsc::Receiver<GameLine>,
        exit: oneshot::Receiver<Option<i32>>,
    ) -> Self {
        Self {
            lines,
            exit,
            spawned_at: Instant::now(),
            pid: None,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

async fn forward_lines<R>(reader: R, tx: mpsc::Sender<GameLine>, wrap: fn(String) -> GameLine)
where
    R: AsyncRead + Unpin,
{
    let mut lines = LossyLines::new(reader);
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(wrap(line)).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed reading game output: {}", e);
                break;
            }
        }
    }
}

/// How a supervised game run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameExit {
    pub code: Option<i32>,
    /// Time from spawn to dismissing the loading UI, if the game got there.
    pub loaded_after: Option<Duration>,
}

pub struct GameSupervisor<'a> {
    builder: &'a dyn GameCommandBuilder,
}

impl<'a> GameSupervisor<'a> {
    pub fn new(builder: &'a dyn GameCommandBuilder) -> Self {
        Self { builder }
    }

    /// Build, spawn and supervise the game until it exits. `None` when it
    /// never started; the failure overlay has then been shown.
    pub async fn launch(
        &self,
        session: &mut LaunchSession,
        config: &dyn LauncherConfig,
        view: &mut dyn LaunchView,
        presence: &mut dyn PresenceNotifier,
        distro_presence: Option<&DistroPresence>,
    ) -> Option<GameExit> {
        let handle = match self.start(session, config, view) {
            Ok(handle) => handle,
            Err(e) => {
                error!("Error during launch: {}", e);
                view.fail(&LaunchFailure::launch_failed());
                return None;
            }
        };
        info!(
            "Launch session {}: game started (pid {:?})",
            session.id(),
            handle.pid()
        );

        if let (Some(distro), Some(server)) = (distro_presence, session.server.discord.clone()) {
            presence.init(distro, &server);
            session.presence_active = true;
        }

        Some(self.supervise(session, handle, view, presence).await)
    }

    fn start(
        &self,
        session: &mut LaunchSession,
        config: &dyn LauncherConfig,
        view: &mut dyn LaunchView,
    ) -> LauncherResult<GameProcessHandle> {
        let command = {
            let account = session.account.as_ref().ok_or(LauncherError::NoAccountSelected)?;
            let (Some(version), Some(mod_loader)) =
                (session.version.as_ref(), session.mod_loader.as_ref())
            else {
                return Err(LauncherError::LaunchArguments(
                    "version metadata is incomplete".into(),
                ));
            };
            let java = session
                .java_executable
                .clone()
                .or_else(|| config.java_executable())
                .ok_or_else(|| LauncherError::JavaExecution("no Java executable".into()))?;

            let ctx = LaunchContext {
                java_executable: &java,
                account,
                server: &session.server,
                version,
                mod_loader,
                common_dir: config.common_dir(),
                game_dir: config.instance_dir(&session.server.id),
                java: config.java_settings(),
            };
            self.builder.build(&ctx)?
        };

        std::fs::create_dir_all(&command.current_dir).map_err(|e| LauncherError::Io {
            path: command.current_dir.clone(),
            source: e,
        })?;
        session.show_details(view, LABEL_LAUNCHING);
        GameProcessHandle::spawn(&command)
    }

    /// Watch a running game until it exits.
    pub async fn supervise(
        &self,
        session: &mut LaunchSession,
        mut handle: GameProcessHandle,
        view: &mut dyn LaunchView,
        presence: &mut dyn PresenceNotifier,
    ) -> GameExit {
        let display_name = session
            .account
            .as_ref()
            .map(|account| account.display_name.clone())
            .unwrap_or_default();
        let mut classifier = match LineClassifier::new(&display_name) {
            Ok(classifier) => Some(classifier),
            Err(e) => {
                error!("Output patterns unavailable, not watching the game: {}", e);
                None
            }
        };

        let id = session.id();
        let mut linger: Option<Instant> = None;
        let mut loaded_after: Option<Duration> = None;
        let mut stderr_watched = true;
        let mut diagnosed = false;
        let mut lines_open = true;

        let code = loop {
            tokio::select! {
                line = handle.lines.recv(), if lines_open => match line {
                    Some(GameLine::Stdout(line)) => {
                        info!(target: "launchsuite::game", "[{}] {}", id, line);
                        let event = classifier.as_mut().and_then(|c| c.classify(&line));
                        match event {
                            Some(LineEvent::LaunchDetected) => {
                                let deadline = handle.spawned_at + MIN_LINGER;
                                if Instant::now() >= deadline {
                                    finish_loading(session, classifier.as_mut(), view, presence);
                                    stderr_watched = false;
                                    loaded_after = Some(handle.spawned_at.elapsed());
                                } else {
                                    linger = Some(deadline);
                                }
                            }
                            Some(LineEvent::WorldJoined) => {
                                if session.presence_active {
                                    presence.update_details(PRESENCE_WORLD_JOINED);
                                }
                            }
                            Some(LineEvent::SoundEngineStarted) => {
                                if session.presence_active {
                                    presence.update_details(PRESENCE_NEW_WORLD);
                                }
                            }
                            None => {}
                        }
                    }
                    Some(GameLine::Stderr(line)) => {
                        warn!(target: "launchsuite::game", "[{}] {}", id, line);
                        if stderr_watched && !diagnosed && is_missing_main_class(&line) {
                            diagnosed = true;
                            error!("Game launch failed, LaunchWrapper was not downloaded properly.");
                            view.fail(&LaunchFailure::corrupted_core_library());
                        }
                    }
                    None => lines_open = false,
                },
                _ = sleep_until(linger.unwrap_or_else(Instant::now)), if linger.is_some() => {
                    linger = None;
                    finish_loading(session, classifier.as_mut(), view, presence);
                    stderr_watched = false;
                    loaded_after = Some(handle.spawned_at.elapsed());
                }
                code = &mut handle.exit, if !lines_open => break code.ok().flatten(),
            }
        };

        info!("Launch session {}: game exited with code {:?}", id, code);
        if loaded_after.is_none() {
            view.toggle_launch_area(false);
        }
        if session.presence_active {
            presence.shutdown();
            session.presence_active = false;
        }

        GameExit { code, loaded_after }
    }
}

fn finish_loading(
    session: &LaunchSession,
    classifier: Option<&mut LineClassifier>,
    view: &mut dyn LaunchView,
    presence: &mut dyn PresenceNotifier,
) {
    view.toggle_launch_area(false);
    if session.presence_active {
        presence.update_details(PRESENCE_LOADING);
    }
    if let Some(classifier) = classifier {
        classifier.begin_watching();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::AuthAccount;
    use crate::core::distro::Server;
    use crate::core::testing::{MemoryConfig, RecordingPresence, RecordingView, ViewEvent};
    use crate::core::version::{ModLoaderMetadata, VersionMetadata};
    use crate::core::view::FailureKind;
    use serde_json::json;
    use tokio::time::sleep;

    const FORGE_INIT: &str =
        "[12:00:01] [main/INFO] [FML]: MinecraftForge v14.23.5.2860 Initialized";
    const JOINED: &str = "[12:05:10] [Client thread/INFO]: [CHAT] Steve joined the game";
    const MISSING_WRAPPER: &str =
        "Error: Could not find or load main class net.minecraft.launchwrapper.Launch";

    struct FailingBuilder;

    impl GameCommandBuilder for FailingBuilder {
        fn build(&self, _ctx: &LaunchContext<'_>) -> LauncherResult<GameCommand> {
            Err(LauncherError::LaunchArguments("broken".into()))
        }
    }

    struct FixedBuilder(GameCommand);

    impl GameCommandBuilder for FixedBuilder {
        fn build(&self, _ctx: &LaunchContext<'_>) -> LauncherResult<GameCommand> {
            Ok(self.0.clone())
        }
    }

    fn session() -> LaunchSession {
        let server: Server = serde_json::from_value(json!({
            "id": "main",
            "name": "Main",
            "address": "localhost",
            "minecraftVersion": "1.12.2",
            "discord": { "shortId": "Main" }
        }))
        .unwrap();
        let mut session = LaunchSession::new(server, Some(AuthAccount::offline("Steve")), true);
        session.java_executable = Some("/usr/bin/java".into());
        session.version = Some(VersionMetadata::new(json!({ "id": "1.12.2" })));
        session.mod_loader = Some(ModLoaderMetadata::new(json!({ "id": "forge" })));
        session
    }

    fn channels() -> (
        mpsc::Sender<GameLine>,
        oneshot::Sender<Option<i32>>,
        GameProcessHandle,
    ) {
        let (tx, rx) = mpsc::channel(16);
        let (exit_tx, exit_rx) = oneshot::channel();
        (tx, exit_tx, GameProcessHandle::from_parts(rx, exit_rx))
    }

    #[tokio::test(start_paused = true)]
    async fn early_launch_line_lingers_until_five_seconds() {
        let mut session = session();
        session.presence_active = true;
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();
        let (tx, exit_tx, handle) = channels();

        let driver = async move {
            sleep(Duration::from_secs(1)).await;
            tx.send(GameLine::Stdout(FORGE_INIT.into())).await.unwrap();
            // Still lingering: not a world join yet.
            tx.send(GameLine::Stdout(JOINED.into())).await.unwrap();
            sleep(Duration::from_secs(10)).await;
            tx.send(GameLine::Stdout(JOINED.into())).await.unwrap();
            drop(tx);
            exit_tx.send(Some(0)).unwrap();
        };

        let builder = FailingBuilder;
        let supervisor = GameSupervisor::new(&builder);
        let (exit, ()) = tokio::join!(
            supervisor.supervise(&mut session, handle, &mut view, &mut presence),
            driver
        );

        let loaded = exit.loaded_after.unwrap();
        assert!(loaded >= MIN_LINGER && loaded < MIN_LINGER + Duration::from_millis(50));
        assert_eq!(exit.code, Some(0));
        assert_eq!(presence.details, vec![PRESENCE_LOADING, PRESENCE_WORLD_JOINED]);
        assert_eq!(presence.shutdowns, 1);
        assert!(!session.presence_active);
        assert_eq!(view.events, vec![ViewEvent::LaunchArea(false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn late_launch_line_transitions_immediately() {
        let mut session = session();
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();
        let (tx, exit_tx, handle) = channels();

        let driver = async move {
            sleep(Duration::from_secs(7)).await;
            tx.send(GameLine::Stdout(FORGE_INIT.into())).await.unwrap();
            sleep(Duration::from_secs(1)).await;
            drop(tx);
            exit_tx.send(Some(1)).unwrap();
        };

        let builder = FailingBuilder;
        let supervisor = GameSupervisor::new(&builder);
        let (exit, ()) = tokio::join!(
            supervisor.supervise(&mut session, handle, &mut view, &mut presence),
            driver
        );

        let loaded = exit.loaded_after.unwrap();
        assert!(loaded >= Duration::from_secs(7) && loaded < Duration::from_millis(7050));
        assert_eq!(exit.code, Some(1));
        // No presence session: nothing pushed, nothing shut down.
        assert!(presence.details.is_empty());
        assert_eq!(presence.shutdowns, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_launchwrapper_is_reported_once() {
        let mut session = session();
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();
        let (tx, exit_tx, handle) = channels();

        tx.send(GameLine::Stderr(MISSING_WRAPPER.into())).await.unwrap();
        tx.send(GameLine::Stderr(MISSING_WRAPPER.into())).await.unwrap();
        drop(tx);
        exit_tx.send(Some(1)).unwrap();

        let builder = FailingBuilder;
        let exit = GameSupervisor::new(&builder)
            .supervise(&mut session, handle, &mut view, &mut presence)
            .await;

        assert_eq!(exit.loaded_after, None);
        let failures = view.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::CorruptedCoreLibrary);
    }

    #[tokio::test(start_paused = true)]
    async fn stderr_diagnostic_is_detached_after_loading() {
        let mut session = session();
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();
        let (tx, exit_tx, handle) = channels();

        let driver = async move {
            sleep(Duration::from_secs(6)).await;
            tx.send(GameLine::Stdout(FORGE_INIT.into())).await.unwrap();
            tx.send(GameLine::Stderr(MISSING_WRAPPER.into())).await.unwrap();
            drop(tx);
            exit_tx.send(Some(0)).unwrap();
        };

        let builder = FailingBuilder;
        let supervisor = GameSupervisor::new(&builder);
        tokio::join!(
            supervisor.supervise(&mut session, handle, &mut view, &mut presence),
            driver
        );
        assert!(view.failures().is_empty());
    }

    #[tokio::test]
    async fn latin1_output_is_forwarded_with_following_lines() {
        let output: &[u8] = b"Chargement termin\xe9\n[12:00:01] [main/INFO] [FML]: MinecraftForge v14.23.5.2860 Initialized\n";
        let (tx, mut rx) = mpsc::channel(4);
        forward_lines(output, tx, GameLine::Stdout).await;

        assert_eq!(
            rx.recv().await,
            Some(GameLine::Stdout("Chargement termin\u{fffd}".into()))
        );
        assert_eq!(rx.recv().await, Some(GameLine::Stdout(FORGE_INIT.into())));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn build_failure_shows_launch_failure_without_presence() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig::new(dir.path());
        let mut session = session();
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();
        let distro = DistroPresence {
            client_id: "1".into(),
            small_image_text: None,
            small_image_key: None,
        };

        let builder = FailingBuilder;
        let exit = GameSupervisor::new(&builder)
            .launch(&mut session, &config, &mut view, &mut presence, Some(&distro))
            .await;

        assert!(exit.is_none());
        assert!(!presence.initialised);
        assert_eq!(view.failures()[0].kind, FailureKind::Launch);
        assert_eq!(view.events.last(), Some(&ViewEvent::LaunchArea(false)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn real_process_output_is_supervised() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig::new(dir.path());
        let mut session = session();
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();
        let distro = DistroPresence {
            client_id: "1".into(),
            small_image_text: None,
            small_image_key: None,
        };

        let command = GameCommand {
            program: "/bin/sh".into(),
            args: vec!["-c".into(), format!("echo '{}'; exit 3", FORGE_INIT)],
            current_dir: dir.path().join("instances").join("main"),
            env: vec![],
        };
        let builder = FixedBuilder(command);
        let exit = GameSupervisor::new(&builder)
            .launch(&mut session, &config, &mut view, &mut presence, Some(&distro))
            .await
            .unwrap();

        assert_eq!(exit.code, Some(3));
        // Exited well inside the linger window.
        assert_eq!(exit.loaded_after, None);
        assert!(presence.initialised);
        assert_eq!(presence.shutdowns, 1);
        assert_eq!(view.details(), vec![LABEL_LAUNCHING]);
        assert_eq!(view.events.last(), Some(&ViewEvent::LaunchArea(false)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn launch_banner_after_latin1_line_is_still_detected() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig::new(dir.path());
        let mut session = session();
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();

        let command = GameCommand {
            program: "/bin/sh".into(),
            args: vec![
                "-c".into(),
                format!("printf 'Chargement termin\\351\\n'; echo '{}'; sleep 6", FORGE_INIT),
            ],
            current_dir: dir.path().join("instances").join("main"),
            env: vec![],
        };
        let builder = FixedBuilder(command);
        let exit = GameSupervisor::new(&builder)
            .launch(&mut session, &config, &mut view, &mut presence, None)
            .await
            .unwrap();

        let loaded = exit.loaded_after.unwrap();
        assert!(loaded >= MIN_LINGER && loaded < Duration::from_secs(6));
        assert_eq!(
            view.events,
            vec![
                ViewEvent::Details(LABEL_LAUNCHING.into()),
                ViewEvent::LaunchArea(false)
            ]
        );
    }
}
