//! Errors raised while locating, reading and writing bus settings.

use areakit_core::BusError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a settings operation
#[derive(Error, Debug)]
pub enum SettingsError {
    /// A value outside what the bus accepts
    #[error("Setting '{key}' rejected: {reason}")]
    Rejected { key: String, reason: String },

    /// The settings directory could not be created
    #[error("Cannot create settings directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Settings I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed TOML settings: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Cannot write TOML settings: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error(transparent)]
    Location(#[from] ConfigError),

    /// The settings describe a bus that cannot start
    #[error("Bus settings invalid: {0}")]
    Bus(#[from] BusError),
}

/// Problems with where, or in which format, settings live
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Settings files must be .json or .toml, got '{0}'")]
    UnsupportedFormat(String),

    #[error("No per-user config directory on {0}")]
    NoConfigDir(String),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = SettingsError::Rejected {
            key: "log_filter".to_string(),
            reason: "must not be empty".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Setting 'log_filter' rejected: must not be empty"
        );

        let err: SettingsError = ConfigError::UnsupportedFormat("yaml".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Settings files must be .json or .toml, got 'yaml'"
        );

        let err = ConfigError::NoConfigDir("wasm".to_string());
        assert_eq!(err.to_string(), "No per-user config directory on wasm");
    }

    #[test]
    fn test_bus_errors_convert() {
        let err: SettingsError = BusError::invalid_config("thread_name", "must not be empty").into();
        assert!(matches!(err, SettingsError::Bus(_)));
        assert!(err.to_string().starts_with("Bus settings invalid:"));

        let err: SettingsError = io::Error::new(io::ErrorKind::NotFound, "bus.toml").into();
        assert!(matches!(err, SettingsError::Io(_)));
    }
}
