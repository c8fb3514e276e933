// ─── Launch Orchestrator ───
// Entry points of the launch core. Owns the distribution index and runs
// Java provisioning, the asset pipeline and the game supervisor in order
// for one `LaunchSession`, tearing it down once at the end.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::core::assets::{AssetOutcome, AssetPipeline};
use crate::core::distro::{DistroManager, Server};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::{JavaProvisioner, JavaProvisioning, JavaValidator};
use crate::core::launch::{GameCommandBuilder, GameExit, GameSupervisor};
use crate::core::presence::PresenceNotifier;
use crate::core::session::LaunchSession;
use crate::core::state::LauncherConfig;
use crate::core::view::{LaunchFailure, LaunchView};
use crate::core::worker::WorkerSpawner;

pub const LABEL_LOADING_SERVER: &str = "Loading server information..";
pub const LABEL_PLEASE_WAIT: &str = "Please wait..";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The game ran and has exited.
    Exited(GameExit),
    /// Every file is in place; the game was not started.
    Validated,
    /// A usable Java runtime is configured; nothing else was run.
    JavaReady(PathBuf),
    /// Stopped early. Any failure overlay has already been shown.
    Aborted,
}

#[derive(Debug, Clone, Copy)]
struct Plan {
    launch_game: bool,
    force_scan: bool,
    validate_files: bool,
}

pub struct LaunchOrchestrator {
    spawner: Arc<dyn WorkerSpawner>,
    validator: Arc<dyn JavaValidator>,
    builder: Arc<dyn GameCommandBuilder>,
    distro: DistroManager,
}

impl LaunchOrchestrator {
    pub fn new(
        spawner: Arc<dyn WorkerSpawner>,
        validator: Arc<dyn JavaValidator>,
        builder: Arc<dyn GameCommandBuilder>,
        distro: DistroManager,
    ) -> Self {
        Self {
            spawner,
            validator,
            builder,
            distro,
        }
    }

    pub fn distro(&self) -> &DistroManager {
        &self.distro
    }

    pub fn set_dev_mode(&mut self, dev_mode: bool) {
        self.distro.set_dev_mode(dev_mode);
    }

    /// Validate everything for the selected server, then play.
    pub async fn launch(
        &mut self,
        config: &mut dyn LauncherConfig,
        view: &mut dyn LaunchView,
        presence: &mut dyn PresenceNotifier,
    ) -> LaunchOutcome {
        let plan = Plan {
            launch_game: true,
            force_scan: false,
            validate_files: true,
        };
        self.run(plan, config, view, presence).await
    }

    /// Validate (and repair) the selected server's files without playing.
    pub async fn validate_only(
        &mut self,
        config: &mut dyn LauncherConfig,
        view: &mut dyn LaunchView,
        presence: &mut dyn PresenceNotifier,
    ) -> LaunchOutcome {
        let plan = Plan {
            launch_game: false,
            force_scan: false,
            validate_files: true,
        };
        self.run(plan, config, view, presence).await
    }

    /// Full system scan for Java, ignoring any configured executable.
    pub async fn scan_java(
        &mut self,
        launch_after: bool,
        config: &mut dyn LauncherConfig,
        view: &mut dyn LaunchView,
        presence: &mut dyn PresenceNotifier,
    ) -> LaunchOutcome {
        let plan = Plan {
            launch_game: launch_after,
            force_scan: true,
            validate_files: launch_after,
        };
        self.run(plan, config, view, presence).await
    }

    /// Persist `server_id` as the selected server.
    pub async fn select_server(
        &mut self,
        server_id: &str,
        config: &mut dyn LauncherConfig,
    ) -> LauncherResult<Server> {
        if self.distro.current().is_none() {
            self.distro.acquire().await?;
        }
        let server = self
            .distro
            .current()
            .and_then(|index| index.server(server_id))
            .cloned()
            .ok_or_else(|| LauncherError::ServerNotFound(server_id.to_string()))?;

        config.set_selected_server(Some(server.id.clone()));
        config.save()?;
        info!("Selected server {} ({})", server.id, server.name);
        Ok(server)
    }

    async fn run(
        &mut self,
        plan: Plan,
        config: &mut dyn LauncherConfig,
        view: &mut dyn LaunchView,
        presence: &mut dyn PresenceNotifier,
    ) -> LaunchOutcome {
        let account = if plan.launch_game {
            match config.selected_account() {
                Some(account) => Some(account),
                None => {
                    error!("You must be logged into an account.");
                    return LaunchOutcome::Aborted;
                }
            }
        } else {
            None
        };

        view.toggle_launch_area(true);
        view.set_launch_details(LABEL_LOADING_SERVER);
        view.set_launch_percentage(0);

        if let Err(e) = self.distro.acquire().await {
            error!("Unable to refresh distribution index: {}", e);
            view.fail(&LaunchFailure::distro_unavailable());
            return LaunchOutcome::Aborted;
        }

        let server = match self.resolve_server(config) {
            Ok(server) => server,
            Err(e) => {
                error!("{}", e);
                view.fail(&LaunchFailure::launch_failed());
                return LaunchOutcome::Aborted;
            }
        };

        let mut session = LaunchSession::new(server, account, plan.launch_game);
        let outcome = self.drive(plan, &mut session, config, view, presence).await;
        session.teardown(presence);
        outcome
    }

    async fn drive(
        &self,
        plan: Plan,
        session: &mut LaunchSession,
        config: &mut dyn LauncherConfig,
        view: &mut dyn LaunchView,
        presence: &mut dyn PresenceNotifier,
    ) -> LaunchOutcome {
        let configured = if plan.force_scan {
            None
        } else {
            self.revalidate_java(session, config, view).await
        };

        let java = match configured {
            Some(java) => java,
            None => match self.provision_java(session, config, view).await {
                Some(java) => java,
                None => return LaunchOutcome::Aborted,
            },
        };
        session.java_executable = Some(java.clone());

        if !plan.validate_files {
            view.toggle_launch_area(false);
            return LaunchOutcome::JavaReady(java);
        }

        let pipeline = AssetPipeline::new(self.spawner.as_ref());
        match pipeline
            .run(session, config, view, self.distro.is_dev_mode())
            .await
        {
            AssetOutcome::Ready {
                version,
                mod_loader,
            } => {
                session.version = Some(version);
                session.mod_loader = Some(mod_loader);
            }
            AssetOutcome::Failed => return LaunchOutcome::Aborted,
        }

        if !session.launch_after {
            info!("Validation of {} complete", session.server.id);
            view.toggle_launch_area(false);
            return LaunchOutcome::Validated;
        }

        let distro_presence = self
            .distro
            .current()
            .and_then(|index| index.discord.clone());
        let supervisor = GameSupervisor::new(self.builder.as_ref());
        match supervisor
            .launch(session, config, view, presence, distro_presence.as_ref())
            .await
        {
            Some(exit) => LaunchOutcome::Exited(exit),
            None => LaunchOutcome::Aborted,
        }
    }

    /// Selected server, falling back to (and persisting) the main server.
    fn resolve_server(&self, config: &mut dyn LauncherConfig) -> LauncherResult<Server> {
        let index = self
            .distro
            .current()
            .ok_or_else(|| LauncherError::DistroUnavailable("no index loaded".into()))?;

        if let Some(id) = config.selected_server() {
            if let Some(server) = index.server(&id) {
                return Ok(server.clone());
            }
            warn!("Selected server {} is no longer in the distribution index", id);
        }

        let server = index.main_server().cloned().ok_or(LauncherError::NoServerSelected)?;
        config.set_selected_server(Some(server.id.clone()));
        if let Err(e) = config.save() {
            warn!("Could not persist selected server: {}", e);
        }
        Ok(server)
    }

    /// Reuse the configured executable if it still runs this server's
    /// Minecraft version.
    async fn revalidate_java(
        &self,
        session: &mut LaunchSession,
        config: &dyn LauncherConfig,
        view: &mut dyn LaunchView,
    ) -> Option<PathBuf> {
        let path = config.java_executable()?;
        session.show_details(view, LABEL_PLEASE_WAIT);

        let verdict = self
            .validator
            .validate(&path, &session.server.minecraft_version)
            .await;
        if verdict.valid {
            info!("Configured Java at {} is still valid", path.display());
            Some(path)
        } else {
            warn!("Configured Java at {} is not usable, scanning", path.display());
            None
        }
    }

    async fn provision_java(
        &self,
        session: &mut LaunchSession,
        config: &mut dyn LauncherConfig,
        view: &mut dyn LaunchView,
    ) -> Option<PathBuf> {
        let provisioner = JavaProvisioner::new(self.spawner.as_ref());
        loop {
            match provisioner.run(session, config, view).await {
                JavaProvisioning::Resolved(path) => return Some(path),
                JavaProvisioning::Rescan => info!("Rescanning for Java"),
                JavaProvisioning::Abandoned => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use crate::core::distro::{AcquisitionStrategy, DistroIndex};
    use crate::core::java::JavaValidation;
    use crate::core::launch::{GameCommand, LaunchContext};
    use crate::core::testing::{
        response, MemoryConfig, RecordingPresence, RecordingView, ScriptedSpawner,
        ScriptedTransport,
    };
    use crate::core::view::{FailureKind, PromptChoice};
    use crate::core::worker::WorkerKind;

    struct StaticIndex(Option<DistroIndex>);

    #[async_trait]
    impl AcquisitionStrategy for StaticIndex {
        fn name(&self) -> &str {
            "static"
        }

        async fn acquire(&self) -> LauncherResult<DistroIndex> {
            self.0
                .clone()
                .ok_or_else(|| LauncherError::DistroUnavailable("offline".into()))
        }
    }

    struct FixedValidator(bool);

    #[async_trait]
    impl JavaValidator for FixedValidator {
        async fn validate(&self, _executable: &Path, _minecraft_version: &str) -> JavaValidation {
            JavaValidation {
                valid: self.0,
                installation: None,
            }
        }
    }

    #[derive(Default)]
    struct CountingBuilder(AtomicUsize);

    impl GameCommandBuilder for CountingBuilder {
        fn build(&self, _ctx: &LaunchContext<'_>) -> LauncherResult<GameCommand> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(LauncherError::LaunchArguments("not in tests".into()))
        }
    }

    fn index() -> DistroIndex {
        serde_json::from_value(json!({
            "version": "1.0.0",
            "servers": [
                { "id": "dev", "name": "Dev", "address": "localhost", "minecraftVersion": "1.12.2" },
                { "id": "main", "name": "Main", "address": "localhost", "minecraftVersion": "1.12.2", "mainServer": true }
            ]
        }))
        .unwrap()
    }

    fn assets_ok() -> ScriptedTransport {
        ScriptedTransport::new().on(
            "validateEverything",
            vec![response(json!({
                "context": "validateEverything",
                "result": { "versionData": { "id": "1.12.2" }, "forgeData": { "id": "forge" } }
            }))],
        )
    }

    fn assets_without_loader() -> ScriptedTransport {
        ScriptedTransport::new().on(
            "validateEverything",
            vec![response(json!({
                "context": "validateEverything",
                "result": { "versionData": { "id": "1.12.2" } }
            }))],
        )
    }

    fn java_found() -> ScriptedTransport {
        ScriptedTransport::new().on(
            "validateJava",
            vec![response(json!({ "context": "validateJava", "result": "/opt/jdk8/bin/java" }))],
        )
    }

    fn java_not_found() -> ScriptedTransport {
        ScriptedTransport::new().on(
            "validateJava",
            vec![response(json!({ "context": "validateJava", "result": null }))],
        )
    }

    struct Harness {
        spawner: Arc<ScriptedSpawner>,
        builder: Arc<CountingBuilder>,
        orchestrator: LaunchOrchestrator,
    }

    fn harness(index: Option<DistroIndex>, java_valid: bool, spawner: ScriptedSpawner) -> Harness {
        let spawner = Arc::new(spawner);
        let builder = Arc::new(CountingBuilder::default());
        let orchestrator = LaunchOrchestrator::new(
            spawner.clone(),
            Arc::new(FixedValidator(java_valid)),
            builder.clone(),
            DistroManager::new(vec![Box::new(StaticIndex(index))]),
        );
        Harness {
            spawner,
            builder,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn missing_index_is_fatal_before_any_worker() {
        let mut h = harness(None, true, ScriptedSpawner::new());
        let mut config = MemoryConfig::new("/data");
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();

        let outcome = h
            .orchestrator
            .launch(&mut config, &mut view, &mut presence)
            .await;

        assert_eq!(outcome, LaunchOutcome::Aborted);
        assert!(h.spawner.spawned().is_empty());
        assert_eq!(view.failures()[0].kind, FailureKind::DistroUnavailable);
    }

    #[tokio::test]
    async fn valid_configured_java_skips_provisioning() {
        let spawner = ScriptedSpawner::new().with(WorkerKind::AssetGuard, assets_ok());
        let mut h = harness(Some(index()), true, spawner);
        let mut config = MemoryConfig::new("/data");
        config.java.executable = Some("/opt/jdk8/bin/java".into());
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();

        let outcome = h
            .orchestrator
            .validate_only(&mut config, &mut view, &mut presence)
            .await;

        assert_eq!(outcome, LaunchOutcome::Validated);
        assert_eq!(h.spawner.spawned_kinds(), vec![WorkerKind::AssetGuard]);
        assert_eq!(view.details()[..2], [LABEL_LOADING_SERVER, LABEL_PLEASE_WAIT]);
        assert_eq!(h.builder.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_configured_java_falls_back_to_scan() {
        let spawner = ScriptedSpawner::new()
            .with(WorkerKind::JavaGuard, java_found())
            .with(WorkerKind::AssetGuard, assets_ok());
        let mut h = harness(Some(index()), false, spawner);
        let mut config = MemoryConfig::new("/data");
        config.java.executable = Some("/usr/lib/jvm/java-17/bin/java".into());
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();

        let outcome = h
            .orchestrator
            .validate_only(&mut config, &mut view, &mut presence)
            .await;

        assert_eq!(outcome, LaunchOutcome::Validated);
        assert_eq!(
            h.spawner.spawned_kinds(),
            vec![WorkerKind::JavaGuard, WorkerKind::AssetGuard]
        );
        assert_eq!(config.java.executable, Some(PathBuf::from("/opt/jdk8/bin/java")));
    }

    #[tokio::test]
    async fn no_java_and_manual_install_never_reaches_the_assets() {
        let spawner = ScriptedSpawner::new()
            .with(WorkerKind::JavaGuard, java_not_found())
            .with(WorkerKind::AssetGuard, assets_ok());
        let mut h = harness(Some(index()), true, spawner);
        let mut config = MemoryConfig::new("/data");
        let mut view = RecordingView::answering(&[PromptChoice::Secondary, PromptChoice::Primary]);
        let mut presence = RecordingPresence::default();

        let outcome = h
            .orchestrator
            .launch(&mut config, &mut view, &mut presence)
            .await;

        assert_eq!(outcome, LaunchOutcome::Aborted);
        assert_eq!(h.spawner.spawned_kinds(), vec![WorkerKind::JavaGuard]);
        assert_eq!(h.builder.0.load(Ordering::SeqCst), 0);
        assert!(config.java.executable.is_none());
    }

    #[tokio::test]
    async fn failed_java_enqueue_never_reaches_the_assets() {
        let java = java_not_found().on(
            "_enqueueOpenJDK",
            vec![response(json!({ "context": "_enqueueOpenJDK", "result": false }))],
        );
        let spawner = ScriptedSpawner::new()
            .with(WorkerKind::JavaGuard, java)
            .with(WorkerKind::AssetGuard, assets_ok());
        let mut h = harness(Some(index()), true, spawner);
        let mut config = MemoryConfig::new("/data");
        let mut view = RecordingView::answering(&[PromptChoice::Primary]);
        let mut presence = RecordingPresence::default();

        let outcome = h
            .orchestrator
            .launch(&mut config, &mut view, &mut presence)
            .await;

        assert_eq!(outcome, LaunchOutcome::Aborted);
        assert_eq!(h.spawner.spawned_kinds(), vec![WorkerKind::JavaGuard]);
        assert_eq!(view.failures()[0].kind, FailureKind::JavaInstall);
    }

    #[tokio::test]
    async fn dismissed_java_prompt_aborts_without_installing() {
        let spawner = ScriptedSpawner::new()
            .with(WorkerKind::JavaGuard, java_not_found())
            .with(WorkerKind::AssetGuard, assets_ok());
        let mut h = harness(Some(index()), true, spawner);
        let mut config = MemoryConfig::new("/data");
        let mut view = RecordingView::answering(&[PromptChoice::Dismissed]);
        let mut presence = RecordingPresence::default();

        let outcome = h
            .orchestrator
            .launch(&mut config, &mut view, &mut presence)
            .await;

        assert_eq!(outcome, LaunchOutcome::Aborted);
        assert_eq!(h.spawner.spawned_kinds(), vec![WorkerKind::JavaGuard]);
        assert!(view.failures().is_empty());
    }

    #[tokio::test]
    async fn incomplete_metadata_never_reaches_the_game() {
        let spawner = ScriptedSpawner::new().with(WorkerKind::AssetGuard, assets_without_loader());
        let mut h = harness(Some(index()), true, spawner);
        let mut config = MemoryConfig::new("/data");
        config.java.executable = Some("/opt/jdk8/bin/java".into());
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();

        let outcome = h
            .orchestrator
            .launch(&mut config, &mut view, &mut presence)
            .await;

        assert_eq!(outcome, LaunchOutcome::Aborted);
        assert_eq!(h.builder.0.load(Ordering::SeqCst), 0);
        assert_eq!(view.failures()[0].kind, FailureKind::Validation);
    }

    #[tokio::test]
    async fn launch_builds_the_game_command_after_validation() {
        let spawner = ScriptedSpawner::new().with(WorkerKind::AssetGuard, assets_ok());
        let mut h = harness(Some(index()), true, spawner);
        let mut config = MemoryConfig::new("/data");
        config.java.executable = Some("/opt/jdk8/bin/java".into());
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();

        let outcome = h
            .orchestrator
            .launch(&mut config, &mut view, &mut presence)
            .await;

        // The counting builder refuses, which surfaces as a launch failure.
        assert_eq!(outcome, LaunchOutcome::Aborted);
        assert_eq!(h.builder.0.load(Ordering::SeqCst), 1);
        assert_eq!(view.failures()[0].kind, FailureKind::Launch);
    }

    #[tokio::test]
    async fn launch_without_account_does_nothing() {
        let mut h = harness(Some(index()), true, ScriptedSpawner::new());
        let mut config = MemoryConfig::new("/data");
        config.account = None;
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();

        let outcome = h
            .orchestrator
            .launch(&mut config, &mut view, &mut presence)
            .await;

        assert_eq!(outcome, LaunchOutcome::Aborted);
        assert!(view.events.is_empty());
        assert!(h.orchestrator.distro().current().is_none());
    }

    #[tokio::test]
    async fn scan_without_launch_stops_at_java() {
        let spawner = ScriptedSpawner::new().with(WorkerKind::JavaGuard, java_found());
        let mut h = harness(Some(index()), true, spawner);
        let mut config = MemoryConfig::new("/data");
        config.java.executable = Some("/opt/old/bin/java".into());
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();

        let outcome = h
            .orchestrator
            .scan_java(false, &mut config, &mut view, &mut presence)
            .await;

        assert_eq!(
            outcome,
            LaunchOutcome::JavaReady(PathBuf::from("/opt/jdk8/bin/java"))
        );
        assert_eq!(h.spawner.spawned_kinds(), vec![WorkerKind::JavaGuard]);
    }

    #[tokio::test]
    async fn unknown_selection_falls_back_to_main_server() {
        let spawner = ScriptedSpawner::new().with(WorkerKind::AssetGuard, assets_ok());
        let mut h = harness(Some(index()), true, spawner);
        let mut config = MemoryConfig::new("/data");
        config.server = Some("retired".into());
        config.java.executable = Some("/opt/jdk8/bin/java".into());
        let mut view = RecordingView::new();
        let mut presence = RecordingPresence::default();

        h.orchestrator
            .validate_only(&mut config, &mut view, &mut presence)
            .await;
        assert_eq!(config.server.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn select_server_checks_the_index() {
        let mut h = harness(Some(index()), true, ScriptedSpawner::new());
        let mut config = MemoryConfig::new("/data");

        let server = h.orchestrator.select_server("dev", &mut config).await.unwrap();
        assert_eq!(server.id, "dev");
        assert_eq!(config.server.as_deref(), Some("dev"));

        let err = h
            .orchestrator
            .select_server("nope", &mut config)
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::ServerNotFound(id) if id == "nope"));
        assert_eq!(config.server.as_deref(), Some("dev"));
    }
}
