pub mod config;

pub use config::{FileLauncherConfig, JavaSettings, LauncherConfig, LauncherSettings};
