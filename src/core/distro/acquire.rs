use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};

use super::model::DistroIndex;

pub const DISTRO_CACHE_FILE: &str = "distribution.json";

/// One way of obtaining the distribution index.
#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn acquire(&self) -> LauncherResult<DistroIndex>;
}

/// Fetches the index over HTTP and refreshes the on-disk cache.
pub struct RemoteDistro {
    client: Client,
    url: String,
    cache_path: PathBuf,
}

impl RemoteDistro {
    pub fn new(client: Client, url: impl Into<String>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            client,
            url: url.into(),
            cache_path: cache_path.into(),
        }
    }
}

#[async_trait]
impl AcquisitionStrategy for RemoteDistro {
    fn name(&self) -> &str {
        "remote"
    }

    async fn acquire(&self) -> LauncherResult<DistroIndex> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let raw = response.text().await?;
        let index: DistroIndex = serde_json::from_str(&raw)?;

        if let Some(parent) = self.cache_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        // A failed cache write does not invalidate a good remote copy.
        if let Err(e) = tokio::fs::write(&self.cache_path, raw.as_bytes()).await {
            warn!(
                "Could not cache distribution index at {}: {}",
                self.cache_path.display(),
                e
            );
        }

        Ok(index)
    }
}

/// Reads the last index written by `RemoteDistro`.
pub struct CachedDistro {
    cache_path: PathBuf,
}

impl CachedDistro {
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
        }
    }
}

#[async_trait]
impl AcquisitionStrategy for CachedDistro {
    fn name(&self) -> &str {
        "cache"
    }

    async fn acquire(&self) -> LauncherResult<DistroIndex> {
        let raw = tokio::fs::read_to_string(&self.cache_path)
            .await
            .map_err(|e| LauncherError::Io {
                path: self.cache_path.clone(),
                source: e,
            })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Outcome of a successful `DistroManager::acquire`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquired {
    /// Loaded by the named strategy.
    Fresh(String),
    /// Every strategy failed; the copy already in memory is reused.
    Stale,
}

/// Owns the current index and the ordered strategies that refresh it.
pub struct DistroManager {
    strategies: Vec<Box<dyn AcquisitionStrategy>>,
    current: Option<DistroIndex>,
    dev_mode: bool,
}

impl DistroManager {
    pub fn new(strategies: Vec<Box<dyn AcquisitionStrategy>>) -> Self {
        Self {
            strategies,
            current: None,
            dev_mode: false,
        }
    }

    /// Remote first, then the cache file in `launcher_dir`.
    pub fn with_defaults(client: Client, url: &str, launcher_dir: &Path) -> Self {
        let cache_path = launcher_dir.join(DISTRO_CACHE_FILE);
        Self::new(vec![
            Box::new(RemoteDistro::new(client, url, cache_path.clone())),
            Box::new(CachedDistro::new(cache_path)),
        ])
    }

    pub fn set_dev_mode(&mut self, dev_mode: bool) {
        self.dev_mode = dev_mode;
    }

    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    pub fn current(&self) -> Option<&DistroIndex> {
        self.current.as_ref()
    }

    /// Try each strategy in order; the first success replaces the current
    /// index.
    pub async fn acquire(&mut self) -> LauncherResult<Acquired> {
        let mut failures = Vec::new();

        for strategy in &self.strategies {
            match strategy.acquire().await {
                Ok(index) => {
                    info!(
                        "Loaded distribution index {} ({} servers) from {}",
                        index.version,
                        index.servers.len(),
                        strategy.name()
                    );
                    self.current = Some(index);
                    return Ok(Acquired::Fresh(strategy.name().to_string()));
                }
                Err(e) => {
                    warn!("Distribution index source '{}' failed: {}", strategy.name(), e);
                    failures.push(format!("{}: {}", strategy.name(), e));
                }
            }
        }

        if self.current.is_some() {
            info!("Reusing distribution index already in memory");
            return Ok(Acquired::Stale);
        }

        Err(LauncherError::DistroUnavailable(failures.join("; ")))
    }
}
