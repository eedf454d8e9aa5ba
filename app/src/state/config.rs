//! Config file I/O and the cached in-memory copy.
//!
//! The file lives at `~/.config/fairway/config.toml` unless `--config`
//! says otherwise. Sections are type-prefixed and indexed:
//! `[course.<id>]`, `[mock_location.<id>]`, `[advisor.<id>]`,
//! `[webserver.<id>]`.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub use fairway::FairwayConfig;

/// `"advisor.0"`, `"course.links"`, ...
pub fn global_id(prefix: &str, index: &str) -> String {
    format!("{prefix}.{index}")
}

/// Short random id for request correlation and WebSocket sources.
pub fn generate_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Returns `~/.config/fairway/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fairway")
        .join("config.toml")
}

/// Load the config. A missing file is created with defaults; an unreadable
/// or unparsable one is logged and replaced by defaults in memory only.
pub fn load(path: &Path) -> FairwayConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<FairwayConfig>(&contents) {
            Ok(config) => {
                tracing::info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("failed to parse {}: {e}", path.display());
                FairwayConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let defaults = FairwayConfig::default();
            tracing::info!("no config file found, creating {}", path.display());
            save_to(path, &defaults);
            defaults
        }
        Err(e) => {
            tracing::warn!("failed to read {}: {e}", path.display());
            FairwayConfig::default()
        }
    }
}

/// Write config to `path`, creating parent dirs. Failures are logged.
pub fn save_to(path: &Path, config: &FairwayConfig) {
    if let Some(dir) = path.parent()
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        tracing::warn!("failed to create config dir {}: {e}", dir.display());
        return;
    }
    match toml::to_string_pretty(config) {
        Ok(contents) => {
            if let Err(e) = std::fs::write(path, contents) {
                tracing::warn!("failed to write {}: {e}", path.display());
            }
        }
        Err(e) => tracing::warn!("failed to serialize config: {e}"),
    }
}

/// Config cached behind a `RwLock`, written through to disk on every
/// mutation.
///
/// Mutations arrive as bus commands and are applied one at a time by the
/// system actor, so writers never race each other.
pub struct SystemConfig {
    path: PathBuf,
    inner: RwLock<FairwayConfig>,
}

impl SystemConfig {
    pub fn new(path: PathBuf) -> Self {
        let config = load(&path);
        Self {
            path,
            inner: RwLock::new(config),
        }
    }

    pub fn snapshot(&self) -> FairwayConfig {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut FairwayConfig)) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard);
        save_to(&self.path, &guard);
    }

    pub fn replace(&self, new: FairwayConfig) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = new;
        save_to(&self.path, &guard);
    }
}
