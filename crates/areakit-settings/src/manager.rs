//! Location of the settings file on disk.

use std::path::{Path, PathBuf};

use crate::config::BusSettings;
use crate::error::{ConfigError, SettingsError, SettingsResult};

const APP_DIR: &str = "areakit";
const SETTINGS_FILE: &str = "bus.toml";

/// Resolves, creates and reads the per-user settings file
pub struct SettingsManager;

impl SettingsManager {
    /// Platform config directory for the editor
    pub fn config_dir() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| {
                ConfigError::NoConfigDir(std::env::consts::OS.to_string()).into()
            })
    }

    /// Path of the bus settings file
    pub fn config_file_path() -> SettingsResult<PathBuf> {
        Ok(Self::config_dir()?.join(SETTINGS_FILE))
    }

    /// Create the config directory if missing
    pub fn ensure_config_dir() -> SettingsResult<PathBuf> {
        let dir = Self::config_dir()?;
        std::fs::create_dir_all(&dir).map_err(|source| SettingsError::Directory {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// Load settings from the per-user file, falling back to defaults
    pub fn load_or_default() -> BusSettings {
        match Self::config_file_path() {
            Ok(path) => Self::load_or_default_from(&path),
            Err(e) => {
                tracing::warn!("No settings location: {}", e);
                BusSettings::default()
            }
        }
    }

    /// Load settings from `path`; a missing or invalid file yields defaults
    pub fn load_or_default_from(path: &Path) -> BusSettings {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return BusSettings::default();
        }
        match BusSettings::load_from_file(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring settings at {}: {}", path.display(), e);
                BusSettings::default()
            }
        }
    }

    /// Save settings to the per-user file, creating its directory
    pub fn save(settings: &BusSettings) -> SettingsResult<PathBuf> {
        Self::ensure_config_dir()?;
        let path = Self::config_file_path()?;
        settings.save_to_file(&path)?;
        Ok(path)
    }
}
