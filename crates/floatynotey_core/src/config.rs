//! Core configuration.
//!
//! # Responsibility
//! - Load optional JSON configuration with defaults for every field.
//! - Resolve database and log locations under the platform data directory.
//!
//! # Invariants
//! - A missing field never fails loading; it takes its default.
//! - Path resolution never panics; an unknown home directory is an error.

use crate::deep_link::DEFAULT_APP_ORIGIN;
use crate::logging::default_log_level;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 500;
pub const DB_FILE_NAME: &str = "floatynotey.sqlite3";
const LOG_DIR_NAME: &str = "logs";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// No home directory could be determined for default paths.
    NoDataDir,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot access `{}`: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "invalid config file `{}`: {source}", path.display())
            }
            Self::NoDataDir => write!(f, "cannot determine a data directory for FloatyNotey"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::NoDataDir => None,
        }
    }
}

/// Settings shared by the CLI and embedding hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file; defaults to `<data dir>/floatynotey.sqlite3`.
    pub database_path: Option<PathBuf>,
    /// `trace|debug|info|warn|error`; defaults by build mode.
    pub log_level: Option<String>,
    /// Absolute log directory; defaults to `<data dir>/logs`.
    pub log_dir: Option<PathBuf>,
    /// Origin used when building and resolving note links.
    pub app_origin: String,
    pub save_debounce_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: None,
            log_dir: None,
            app_origin: DEFAULT_APP_ORIGIN.to_string(),
            save_debounce_ms: DEFAULT_SAVE_DEBOUNCE_MS,
        }
    }
}

impl CoreConfig {
    /// Reads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Effective log level.
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    /// Database path, creating the default data directory when needed.
    pub fn resolve_database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        let dir = default_data_dir().ok_or(ConfigError::NoDataDir)?;
        std::fs::create_dir_all(&dir).map_err(|source| ConfigError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(dir.join(DB_FILE_NAME))
    }

    pub fn resolve_log_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir()
                .map(|dir| dir.join(LOG_DIR_NAME))
                .ok_or(ConfigError::NoDataDir),
        }
    }
}

/// Platform data directory, e.g. `~/.local/share/floatynotey` on Linux.
pub fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "FloatyNotey").map(|dirs| dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, DEFAULT_SAVE_DEBOUNCE_MS};
    use crate::logging::default_log_level;
    use std::path::PathBuf;

    #[test]
    fn empty_object_yields_defaults() {
        let config = CoreConfig::from_json("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.save_debounce_ms, DEFAULT_SAVE_DEBOUNCE_MS);
        assert_eq!(config.app_origin, "http://localhost:3000");
        assert_eq!(config.log_level(), default_log_level());
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let config = CoreConfig::from_json(
            r#"{"database_path": "/tmp/n.sqlite3", "log_level": "warn", "save_debounce_ms": 50}"#,
        )
        .unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/n.sqlite3")));
        assert_eq!(config.log_level(), "warn");
        assert_eq!(config.save_debounce_ms, 50);
        assert_eq!(
            config.resolve_database_path().unwrap(),
            PathBuf::from("/tmp/n.sqlite3")
        );
    }

    #[test]
    fn load_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            CoreConfig::load(&missing),
            Err(ConfigError::Io { path, .. }) if path == missing
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            CoreConfig::load(&broken),
            Err(ConfigError::Parse { .. })
        ));
    }
}
