//! On-disk configuration (`~/.gatorconfig.json`).
//!
//! The file holds the database URL and the name of the logged-in user:
//!
//! ```json
//! {"db_url": "postgres://localhost:5432/gator?sslmode=disable", "current_user_name": "alice"}
//! ```
//!
//! `login` and `register` rewrite it in place.

use crate::error::ConfigError;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

pub const CONFIG_FILE_NAME: &str = ".gatorconfig.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GatorConfig {
    #[serde(default)]
    pub db_url: String,
    #[serde(default)]
    pub current_user_name: String,
}

impl GatorConfig {
    pub fn current_user(&self) -> Option<&str> {
        let name = self.current_user_name.trim();
        (!name.is_empty()).then_some(name)
    }
}

/// A loaded config together with the file it came from.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    pub config: GatorConfig,
}

impl ConfigFile {
    /// `~/.gatorconfig.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Read the config at `path`, or at [`ConfigFile::default_path`] when `None`.
    #[instrument(level = "debug")]
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let raw = fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
        let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Malformed {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "Loaded config");
        Ok(Self { path, config })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `name` as the current user and persist the file.
    pub async fn set_user(&mut self, name: &str) -> Result<(), ConfigError> {
        self.config.current_user_name = name.to_string();
        self.save().await
    }

    async fn save(&self) -> Result<(), ConfigError> {
        let json = serde_json::to_string(&self.config).map_err(|source| {
            ConfigError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, json)
            .await
            .map_err(|source| ConfigError::Write {
                path: self.path.clone(),
                source,
            })
    }
}
