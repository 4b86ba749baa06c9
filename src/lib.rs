//! # AreaKit
//!
//! Conditional event dispatch for the AreaKit content editor.
//!
//! ## Architecture
//!
//! AreaKit is organized as a workspace with multiple crates:
//!
//! 1. **areakit-core** - Event bus: signals, messages, registry, dispatch thread
//! 2. **areakit-settings** - Persisted bus settings (JSON/TOML)
//! 3. **areakit** - Logging setup, session wiring and the demo binary

pub use areakit_core::{
    BusError, ComponentHandle, DispatchOutcome, DispatchRecord, EventBus, EventCondition,
    EventConditionPriority, Message, ReceiverOptions, Signal, SignalCategory, SubscriberKey,
    Target, UiScheduler, UiThread, Value,
};
pub use areakit_settings::{BusSettings, SettingsManager};

use anyhow::Context;
use std::sync::Arc;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    init_logging_with("info")
}

/// Initialize logging, using `directive` when `RUST_LOG` is unset
pub fn init_logging_with(directive: &str) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter '{}'", directive))?,
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("logging already initialized")?;

    Ok(())
}

/// A running bus together with the UI thread its receivers run on
pub struct Session {
    ui: Arc<UiThread>,
    bus: EventBus,
}

impl Session {
    /// Start the UI thread and the bus described by `settings`
    pub fn start(settings: &BusSettings) -> anyhow::Result<Self> {
        settings.validate().context("invalid bus settings")?;
        let ui = UiThread::spawn(&settings.ui_thread_name)?;
        let scheduler: Arc<dyn UiScheduler> = ui.clone();
        let bus = EventBus::with_config(settings.to_bus_config(), scheduler)?;
        tracing::info!(
            "Session started: dispatch on {}, receivers on {}",
            settings.dispatch_thread_name,
            settings.ui_thread_name
        );
        Ok(Self { ui, bus })
    }

    /// The session's bus
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Stop dispatching, then let the UI thread finish queued work
    pub fn shutdown(self) {
        self.bus.stop_dispatching();
        self.ui.shutdown();
        tracing::info!("Session stopped");
    }
}
