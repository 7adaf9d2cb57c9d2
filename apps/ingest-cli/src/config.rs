//! CLI configuration.
//!
//! Read from `~/.config/procura/config.json`; every section is optional.
//! Command-line flags override the server URL and token.

use std::path::{Path, PathBuf};

use procura_bulk_sync::SyncConfig;
use procura_ingest::{IngestConfig, ServerConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub sync: SyncConfig,
}

impl AppConfig {
    /// Loads `path`, or the default location when `None`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load_from(&config_path()?),
        }
    }

    /// Loads a config file. A missing file yields defaults, as does an
    /// unparsable one (with a warning).
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    /// Applies command-line overrides. Empty values are ignored.
    pub fn apply_overrides(&mut self, server: Option<String>, token: Option<String>) {
        if let Some(server) = server.filter(|s| !s.trim().is_empty()) {
            self.server.base_url = server;
        }
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.server.api_token = token;
        }
    }
}

fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("procura").join("config.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(unix)]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home).join(".config"))
    }

    #[cfg(windows)]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(any(unix, windows)))]
    {
        anyhow::bail!("no configuration directory on this platform")
    }
}
