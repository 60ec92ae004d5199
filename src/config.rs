use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

/// Group identifier shared by the main app and the widget extension. Both
/// builds must agree on it or they end up with separate stores.
pub const DEFAULT_GROUP_ID: &str = "group.com.photo-widget";
pub const DEFAULT_DATABASE_FILE: &str = "db.sqlite3";
pub const DEFAULT_MAX_PHOTOS: usize = 60;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub const CONTAINER_ROOT_ENV: &str = "PHOTO_WIDGET_CONTAINER_ROOT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    pub group_id: String,
    /// Directory holding the group containers. Falls back to the platform
    /// data directory.
    pub container_root: Option<PathBuf>,
    pub database_file: String,
    /// `None` disables the photo limit.
    pub max_photos: Option<usize>,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            group_id: DEFAULT_GROUP_ID.into(),
            container_root: None,
            database_file: DEFAULT_DATABASE_FILE.into(),
            max_photos: Some(DEFAULT_MAX_PHOTOS),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    /// Reads the config file at `path`. A missing file yields the defaults;
    /// a malformed one is logged and also yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read store config from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed store config {}: {err}", path.display());
                StoreConfig::default()
            })
        } else {
            StoreConfig::default()
        };

        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(CONTAINER_ROOT_ENV).filter(|value| !value.is_empty()) {
            self.container_root = Some(PathBuf::from(root));
        }
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn container(&self) -> Result<SharedContainer> {
        let root = match &self.container_root {
            Some(root) => root.clone(),
            None => dirs::data_dir()
                .map(|dir| dir.join("AppGroups"))
                .ok_or_else(|| anyhow!("could not determine a data directory for the shared container"))?,
        };

        if self.group_id.trim().is_empty() {
            return Err(anyhow!("groupId must not be empty"));
        }

        Ok(SharedContainer {
            group_id: self.group_id.clone(),
            root,
            database_file: self.database_file.clone(),
        })
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write store config to {}", path.display()))
    }
}

/// The application-group container both processes open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedContainer {
    pub group_id: String,
    pub root: PathBuf,
    pub database_file: String,
}

impl SharedContainer {
    pub fn new(group_id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            group_id: group_id.into(),
            root: root.into(),
            database_file: DEFAULT_DATABASE_FILE.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(&self.group_id)
    }

    pub fn database_path(&self) -> PathBuf {
        self.path().join(&self.database_file)
    }
}
