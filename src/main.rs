mod console;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use launchsuite_lib::core::auth::AuthAccount;
use launchsuite_lib::core::distro::DistroManager;
use launchsuite_lib::core::error::{LauncherError, LauncherResult};
use launchsuite_lib::core::http::build_http_client;
use launchsuite_lib::core::java::ProbeJavaValidator;
use launchsuite_lib::core::launch::MinecraftCommandBuilder;
use launchsuite_lib::core::orchestrator::{LaunchOrchestrator, LaunchOutcome};
use launchsuite_lib::core::presence::TracingPresence;
use launchsuite_lib::core::state::{FileLauncherConfig, LauncherConfig};
use launchsuite_lib::core::worker::ProcessWorkerSpawner;

use crate::console::ConsoleView;

/// LaunchSuite - validate, repair and launch a server distribution
#[derive(Parser, Debug)]
#[command(name = "launchsuite")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Launcher directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    launcher_dir: Option<PathBuf>,

    /// URL of the distribution index; remembered for later runs
    #[arg(long, global = true)]
    distro_url: Option<String>,

    /// Worker executable (receives the worker kind as its first argument)
    #[arg(long, global = true, default_value = "launchsuite-worker")]
    worker: PathBuf,

    /// Add and select an offline account with this name
    #[arg(long, global = true)]
    username: Option<String>,

    /// Ask workers for the development distribution
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate files and start the game
    Launch,
    /// Validate and repair files without starting the game
    Validate,
    /// Scan the system for a usable Java runtime
    ScanJava {
        /// Continue into validation and launch once Java is resolved
        #[arg(long)]
        launch: bool,
    },
    /// Select the server to play on
    SelectServer { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    launchsuite_lib::init_tracing();
    info!("LaunchSuite {} starting...", env!("CARGO_PKG_VERSION"));

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> LauncherResult<ExitCode> {
    let mut config = match &cli.launcher_dir {
        Some(dir) => FileLauncherConfig::open(dir)?,
        None => FileLauncherConfig::open_default()?,
    };
    if let Some(name) = &cli.username {
        config.add_account(AuthAccount::offline(name), true);
        config.save()?;
    }

    if let Some(url) = &cli.distro_url {
        config.set_distro_url(url.as_str());
        config.save()?;
    }
    let distro_url = config.distro_url().map(str::to_string).ok_or_else(|| {
        LauncherError::DistroUnavailable(
            "no distribution index URL configured, pass --distro-url".into(),
        )
    })?;

    let launcher_dir = config.launcher_dir();
    let distro = DistroManager::with_defaults(build_http_client()?, &distro_url, &launcher_dir);
    let mut orchestrator = LaunchOrchestrator::new(
        Arc::new(ProcessWorkerSpawner::new(&cli.worker, &launcher_dir)),
        Arc::new(ProbeJavaValidator),
        Arc::new(MinecraftCommandBuilder),
        distro,
    );
    orchestrator.set_dev_mode(cli.dev);

    let mut view = ConsoleView::new();
    let mut presence = TracingPresence::default();

    let outcome = match cli.command {
        Commands::Launch => {
            orchestrator
                .launch(&mut config, &mut view, &mut presence)
                .await
        }
        Commands::Validate => {
            orchestrator
                .validate_only(&mut config, &mut view, &mut presence)
                .await
        }
        Commands::ScanJava { launch } => {
            orchestrator
                .scan_java(launch, &mut config, &mut view, &mut presence)
                .await
        }
        Commands::SelectServer { id } => {
            let server = orchestrator.select_server(&id, &mut config).await?;
            println!("Selected {} ({})", server.name, server.id);
            return Ok(ExitCode::SUCCESS);
        }
    };

    Ok(match outcome {
        LaunchOutcome::Exited(exit) => match exit.code {
            Some(0) => ExitCode::SUCCESS,
            _ => ExitCode::FAILURE,
        },
        LaunchOutcome::Validated => ExitCode::SUCCESS,
        LaunchOutcome::JavaReady(path) => {
            println!("Using Java at {}", path.display());
            ExitCode::SUCCESS
        }
        LaunchOutcome::Aborted => ExitCode::FAILURE,
    })
}
