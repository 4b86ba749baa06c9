//! Persisted event bus settings.
//!
//! Windows are stored in milliseconds so the files stay readable by hand.

use areakit_core::event_bus::{BusConfig, CoalesceScope, Signal};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, SettingsError, SettingsResult};

/// Supported on-disk formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )
            .into()),
        }
    }
}

/// Event bus and logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusSettings {
    /// Coalesce window of plain receivers
    pub default_coalesce_ms: u64,
    /// Coalesce window of identified receivers
    pub identified_coalesce_ms: u64,
    /// Coalesce window of multi-condition receivers
    pub multi_condition_coalesce_ms: u64,
    /// Margin added to the smallest window for the idle sweep
    pub idle_wait_margin_ms: u64,
    /// Skip delivery of unnecessary signals
    pub suppress_unnecessary: bool,
    /// Survivor table sharing
    pub coalesce_scope: CoalesceScope,
    /// Signals disabled at startup
    pub disabled_signals: Vec<Signal>,
    /// Capacity of the dispatch trace channel
    pub trace_capacity: usize,
    /// Name of the dispatch thread
    pub dispatch_thread_name: String,
    /// Name of the UI thread
    pub ui_thread_name: String,
    /// Default log filter directive, overridden by `RUST_LOG`
    pub log_filter: String,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self::from_bus_config(&BusConfig::default())
    }
}

impl BusSettings {
    /// Create settings with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture an existing bus configuration
    pub fn from_bus_config(config: &BusConfig) -> Self {
        Self {
            default_coalesce_ms: millis(config.default_coalesce),
            identified_coalesce_ms: millis(config.identified_coalesce),
            multi_condition_coalesce_ms: millis(config.multi_condition_coalesce),
            idle_wait_margin_ms: millis(config.idle_wait_margin),
            suppress_unnecessary: config.suppress_unnecessary,
            coalesce_scope: config.coalesce_scope,
            disabled_signals: config.disabled_signals.clone(),
            trace_capacity: config.trace_capacity,
            dispatch_thread_name: config.thread_name.clone(),
            ui_thread_name: "areakit-ui".to_string(),
            log_filter: "info".to_string(),
        }
    }

    /// Bus configuration described by these settings
    pub fn to_bus_config(&self) -> BusConfig {
        BusConfig {
            default_coalesce: Duration::from_millis(self.default_coalesce_ms),
            identified_coalesce: Duration::from_millis(self.identified_coalesce_ms),
            multi_condition_coalesce: Duration::from_millis(self.multi_condition_coalesce_ms),
            idle_wait_margin: Duration::from_millis(self.idle_wait_margin_ms),
            suppress_unnecessary: self.suppress_unnecessary,
            coalesce_scope: self.coalesce_scope,
            disabled_signals: self.disabled_signals.clone(),
            trace_capacity: self.trace_capacity,
            thread_name: self.dispatch_thread_name.clone(),
        }
    }

    /// Load settings from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::of(path)?;
        let content = std::fs::read_to_string(path)?;

        let settings: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        settings.validate()?;
        tracing::debug!("Loaded bus settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content)?;
        tracing::debug!("Saved bus settings to {}", path.display());
        Ok(())
    }

    /// Validate settings
    pub fn validate(&self) -> SettingsResult<()> {
        if self.ui_thread_name.trim().is_empty() {
            return Err(SettingsError::Rejected {
                key: "ui_thread_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if self.log_filter.trim().is_empty() {
            return Err(SettingsError::Rejected {
                key: "log_filter".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        self.to_bus_config().validate()?;
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_mirror_bus_config() {
        let settings = BusSettings::default();
        assert_eq!(settings.default_coalesce_ms, 100);
        assert_eq!(settings.identified_coalesce_ms, 25);
        assert_eq!(settings.multi_condition_coalesce_ms, 500);
        assert_eq!(settings.coalesce_scope, CoalesceScope::Shared);
        assert!(settings.validate().is_ok());

        let config = settings.to_bus_config();
        assert_eq!(config.idle_wait(), Duration::from_millis(35));
    }

    #[test]
    fn test_zero_window_rejected() {
        let settings = BusSettings {
            default_coalesce_ms: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(SettingsError::Bus(_))));
    }

    #[test]
    fn test_oversized_window_rejected() {
        let settings: BusSettings =
            serde_json::from_str(r#"{"default_coalesce_ms": 18446744073709551615}"#).unwrap();
        assert!(matches!(settings.validate(), Err(SettingsError::Bus(_))));
    }

    #[test]
    fn test_empty_ui_thread_name_rejected() {
        let settings = BusSettings {
            ui_thread_name: " ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Rejected { .. })
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: BusSettings = toml::from_str(
            "coalesce_scope = \"per_handle\"\ndisabled_signals = [\"caret_moved\"]\n",
        )
        .unwrap();
        assert_eq!(settings.coalesce_scope, CoalesceScope::PerHandle);
        assert_eq!(settings.disabled_signals, vec![Signal::CaretMoved]);
        assert_eq!(settings.default_coalesce_ms, 100);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = BusSettings::default()
            .save_to_file(Path::new("bus.yaml"))
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Location(ConfigError::UnsupportedFormat(ref ext)) if ext == "yaml"
        ));
    }
}
