use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::auth::AuthAccount;
use crate::core::error::{LauncherError, LauncherResult};

const APP_DIR_NAME: &str = "launchsuite";
const BOOTSTRAP_FILE: &str = "launchsuite_bootstrap.json";
const CONFIG_FILE: &str = "launcher_config.json";

/// Persisted user configuration as the launch core sees it.
///
/// Read at session start; written when Java resolution or server selection
/// changes.
pub trait LauncherConfig: Send {
    fn selected_account(&self) -> Option<AuthAccount>;

    fn selected_server(&self) -> Option<String>;

    fn set_selected_server(&mut self, server_id: Option<String>);

    fn java_executable(&self) -> Option<PathBuf>;

    fn set_java_executable(&mut self, executable: Option<PathBuf>);

    fn java_settings(&self) -> JavaSettings;

    /// Shared libraries, assets and runtimes.
    fn common_dir(&self) -> PathBuf;

    /// Root for downloaded runtimes and per-server instances.
    fn data_dir(&self) -> PathBuf;

    /// Where the launcher keeps its own files (handed to workers).
    fn launcher_dir(&self) -> PathBuf;

    /// Per-server game directory.
    fn instance_dir(&self, server_id: &str) -> PathBuf {
        self.data_dir().join("instances").join(server_id)
    }

    fn save(&self) -> LauncherResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaSettings {
    #[serde(default)]
    pub executable: Option<PathBuf>,
    #[serde(default = "default_min_ram")]
    pub min_ram: String,
    #[serde(default = "default_max_ram")]
    pub max_ram: String,
    #[serde(default)]
    pub jvm_options: Vec<String>,
}

impl Default for JavaSettings {
    fn default() -> Self {
        Self {
            executable: None,
            min_ram: default_min_ram(),
            max_ram: default_max_ram(),
            jvm_options: Vec::new(),
        }
    }
}

fn default_min_ram() -> String {
    "2G".into()
}

fn default_max_ram() -> String {
    "4G".into()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherSettings {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub selected_server: Option<String>,
    #[serde(default)]
    pub selected_account: Option<String>,
    /// Accounts keyed by uuid.
    #[serde(default)]
    pub accounts: BTreeMap<String, AuthAccount>,
    #[serde(default)]
    pub java: JavaSettings,
    /// Where the distribution index is fetched from.
    #[serde(default)]
    pub distro_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BootstrapConfig {
    launcher_dir: PathBuf,
}

/// `LauncherConfig` backed by `launcher_config.json` in the launcher dir.
#[derive(Debug, Clone)]
pub struct FileLauncherConfig {
    launcher_dir: PathBuf,
    settings: LauncherSettings,
}

impl FileLauncherConfig {
    /// Open the config in the default launcher dir (honouring the bootstrap
    /// file).
    pub fn open_default() -> LauncherResult<Self> {
        Self::open(default_launcher_dir())
    }

    /// Open (or start fresh) the config stored under `launcher_dir`.
    pub fn open(launcher_dir: impl Into<PathBuf>) -> LauncherResult<Self> {
        let launcher_dir = launcher_dir.into();
        std::fs::create_dir_all(&launcher_dir).map_err(|e| LauncherError::Io {
            path: launcher_dir.clone(),
            source: e,
        })?;

        let settings = load_settings_from_disk(&launcher_dir).unwrap_or_default();
        debug!("Loaded launcher config from {}", launcher_dir.display());

        Ok(Self {
            launcher_dir,
            settings,
        })
    }

    pub fn settings(&self) -> &LauncherSettings {
        &self.settings
    }

    /// Store an account and optionally make it the selected one.
    pub fn add_account(&mut self, account: AuthAccount, select: bool) {
        let uuid = account.uuid.clone();
        self.settings.accounts.insert(uuid.clone(), account);
        if select {
            self.settings.selected_account = Some(uuid);
        }
    }

    pub fn distro_url(&self) -> Option<&str> {
        self.settings.distro_url.as_deref()
    }

    pub fn set_distro_url(&mut self, url: impl Into<String>) {
        self.settings.distro_url = Some(url.into());
    }

    pub fn config_path(&self) -> PathBuf {
        self.launcher_dir.join(CONFIG_FILE)
    }
}

impl LauncherConfig for FileLauncherConfig {
    fn selected_account(&self) -> Option<AuthAccount> {
        let uuid = self.settings.selected_account.as_ref()?;
        self.settings
            .accounts
            .get(uuid)
            .cloned()
            .map(AuthAccount::sanitized)
    }

    fn selected_server(&self) -> Option<String> {
        self.settings.selected_server.clone()
    }

    fn set_selected_server(&mut self, server_id: Option<String>) {
        self.settings.selected_server = server_id;
    }

    fn java_executable(&self) -> Option<PathBuf> {
        self.settings.java.executable.clone()
    }

    fn set_java_executable(&mut self, executable: Option<PathBuf>) {
        self.settings.java.executable = executable;
    }

    fn java_settings(&self) -> JavaSettings {
        self.settings.java.clone()
    }

    fn common_dir(&self) -> PathBuf {
        self.data_dir().join("common")
    }

    fn data_dir(&self) -> PathBuf {
        self.settings
            .data_dir
            .clone()
            .unwrap_or_else(|| self.launcher_dir.clone())
    }

    fn launcher_dir(&self) -> PathBuf {
        self.launcher_dir.clone()
    }

    fn save(&self) -> LauncherResult<()> {
        let path = self.config_path();
        let json = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(&path, json).map_err(|e| LauncherError::Io { path, source: e })
    }
}

fn load_settings_from_disk(launcher_dir: &Path) -> Option<LauncherSettings> {
    let path = launcher_dir.join(CONFIG_FILE);
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!(
                "Ignoring unreadable launcher config {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

fn default_base_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_launcher_dir() -> PathBuf {
    let base = default_base_dir();
    let bootstrap_path = base.join(BOOTSTRAP_FILE);

    if let Ok(raw) = std::fs::read_to_string(&bootstrap_path) {
        if let Ok(cfg) = serde_json::from_str::<BootstrapConfig>(&raw) {
            return cfg.launcher_dir;
        }
    }

    base.join(APP_DIR_NAME)
}
