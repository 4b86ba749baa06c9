//! AreaKit Settings Crate
//!
//! Loads, validates and saves the event bus settings of the editor.

pub mod config;
pub mod error;
pub mod manager;

pub use config::BusSettings;
pub use error::{ConfigError, SettingsError, SettingsResult};
pub use manager::SettingsManager;
