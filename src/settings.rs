//! Durable connection settings stored as TOML under the `.runboard` folder.
//!
//! The file is read once at startup and written on every change. An
//! unreadable or unparseable file is treated as absent (logged, never
//! fatal): losing a saved API key beats refusing to start.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;

/// Filename used to store the app configuration.
pub const SETTINGS_FILE_NAME: &str = "config.toml";

/// The (apiKey, entity, project) tuple that drives both synchronizers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub entity: String,
    #[serde(default)]
    pub project: String,
}

impl ConnectionSettings {
    /// All three fields non-empty after trimming; anything less keeps the
    /// synchronizers idle.
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
            && !self.entity.trim().is_empty()
            && !self.project.trim().is_empty()
    }
}

/// Everything persisted to the settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub connection: ConnectionSettings,
}

/// Errors raised while persisting settings. Loading never fails.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// No config directory could be resolved or created.
    #[error(transparent)]
    AppDir(#[from] app_dirs::AppDirError),
    /// Settings could not be serialized to TOML.
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// The settings file could not be written.
    #[error("Failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Resolve the settings file path, creating the app directory if needed.
pub fn settings_path() -> Result<PathBuf, app_dirs::AppDirError> {
    Ok(app_dirs::app_root_dir()?.join(SETTINGS_FILE_NAME))
}

/// Load settings from disk, falling back to defaults for a missing or
/// corrupt file.
pub fn load_or_default() -> AppSettings {
    let path = match settings_path() {
        Ok(path) => path,
        Err(err) => {
            tracing::warn!("No settings directory available: {err}");
            return AppSettings::default();
        }
    };
    load_from(&path)
}

fn load_from(path: &Path) -> AppSettings {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return AppSettings::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read settings at {}: {err}", path.display());
            return AppSettings::default();
        }
    };
    match toml::from_str(&text) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(
                "Ignoring unparseable settings at {}: {err}",
                path.display()
            );
            AppSettings::default()
        }
    }
}

/// Persist settings to disk, overwriting any previous contents.
pub fn save(settings: &AppSettings) -> Result<(), SettingsError> {
    let path = settings_path()?;
    save_to(settings, &path)
}

fn save_to(settings: &AppSettings, path: &Path) -> Result<(), SettingsError> {
    let data = toml::to_string_pretty(settings)?;
    std::fs::write(path, data).map_err(|source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn connection_is_configured_only_when_all_fields_set() {
        let mut connection = ConnectionSettings::default();
        assert!(!connection.is_configured());
        connection.api_key = "key".into();
        connection.entity = "acme".into();
        assert!(!connection.is_configured());
        connection.project = "demo".into();
        assert!(connection.is_configured());
        connection.entity = "   ".into();
        assert!(!connection.is_configured());
    }

    #[test]
    fn settings_round_trip_through_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        let settings = AppSettings {
            connection: ConnectionSettings {
                api_key: "secret".into(),
                entity: "acme".into(),
                project: "demo".into(),
            },
        };
        save_to(&settings, &path).unwrap();
        let loaded = load_from(&path);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let loaded = load_from(&dir.path().join("absent.toml"));
        assert_eq!(loaded, AppSettings::default());
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "not = [valid toml").unwrap();
        let loaded = load_from(&path);
        assert_eq!(loaded, AppSettings::default());
    }

    #[test]
    fn save_and_load_through_app_dir() {
        let dir = tempdir().unwrap();
        let _guard = crate::app_dirs::ConfigBaseGuard::set(dir.path().to_path_buf());
        let settings = AppSettings {
            connection: ConnectionSettings {
                api_key: "k".into(),
                entity: "e".into(),
                project: "p".into(),
            },
        };
        save(&settings).unwrap();
        assert_eq!(load_or_default(), settings);
    }
}
