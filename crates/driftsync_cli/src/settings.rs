//! Settings file loading.

use driftsync_engine::{ServiceOptions, SyncConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file could not be read.
    #[error("cannot read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid settings JSON.
    #[error("invalid settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Contents of a settings file.
///
/// ```json
/// {
///   "service": { "namespace": "app", "remote_timeout": 30 },
///   "sync": { "push_active_interval": 30, "max_retained_count": 500 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub service: ServiceOptions,
    pub sync: SyncConfig,
}

impl Settings {
    /// Reads `path`, or returns the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn missing_path_gives_defaults() {
        assert_eq!(Settings::load(None).unwrap(), Settings::default());
    }

    #[test]
    fn parses_sections() {
        let settings = Settings::parse(
            r#"{
                "service": { "namespace": "app", "remote_timeout": 10 },
                "sync": { "pull_active_interval": 15, "retention_max_age": 86400 }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.service.namespace, "app");
        assert_eq!(settings.service.remote_timeout, Duration::from_secs(10));
        assert_eq!(settings.sync.pull_active_interval, Some(Duration::from_secs(15)));
        assert_eq!(settings.sync.retention_max_age, Some(Duration::from_secs(86400)));
    }

    #[test]
    fn unknown_sections_are_rejected() {
        assert!(Settings::parse(r#"{ "server": {} }"#).is_err());
    }

    #[test]
    fn unreadable_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }
}
