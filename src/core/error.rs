use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the launch core.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Patterns ────────────────────────────────────────
    #[error("Invalid output pattern: {0}")]
    Pattern(#[from] regex::Error),

    // ── Worker protocol ─────────────────────────────────
    #[error("Worker {worker} could not be started: {reason}")]
    WorkerSpawn { worker: String, reason: String },

    #[error("Worker channel is closed")]
    WorkerClosed,

    #[error("A command for context '{0}' is already in flight")]
    CommandInFlight(String),

    #[error("Unknown worker message context: {0}")]
    UnknownContext(String),

    // ── Distribution index ──────────────────────────────
    #[error("Distribution index unavailable: {0}")]
    DistroUnavailable(String),

    #[error("Server not found in distribution index: {0}")]
    ServerNotFound(String),

    // ── Session ─────────────────────────────────────────
    #[error("No account selected")]
    NoAccountSelected,

    #[error("No server selected")]
    NoServerSelected,

    // ── Java ────────────────────────────────────────────
    #[error("Java execution failed: {0}")]
    JavaExecution(String),

    // ── Game process ────────────────────────────────────
    #[error("Launch arguments could not be built: {0}")]
    LaunchArguments(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
