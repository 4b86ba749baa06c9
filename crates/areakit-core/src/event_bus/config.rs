//! Runtime configuration of an event bus instance.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::signal::Signal;
use crate::error::{BusError, Result};

/// Default coalesce window of a receiver.
pub const DEFAULT_COALESCE: Duration = Duration::from_millis(100);

/// Default coalesce window of a receiver registered with an identifier.
pub const IDENTIFIED_COALESCE: Duration = Duration::from_millis(25);

/// Default coalesce window of a receiver registered for several conditions.
pub const MULTI_CONDITION_COALESCE: Duration = Duration::from_millis(500);

/// Upper bound of any coalesce window or margin (one day).
pub const MAX_COALESCE: Duration = Duration::from_secs(24 * 60 * 60);

/// Which deliveries share a survivor table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoalesceScope {
    /// One table for all handles: a long-window handle's entry also
    /// suppresses a short-window handle.
    #[default]
    Shared,
    /// Each handle only sees its own deliveries.
    PerHandle,
}

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Window for receivers registered without options.
    pub default_coalesce: Duration,
    /// Window for receivers registered with an identifier.
    pub identified_coalesce: Duration,
    /// Window for receivers registered for several conditions at once.
    pub multi_condition_coalesce: Duration,
    /// Added to the smallest window to get the dispatch thread's idle wait.
    pub idle_wait_margin: Duration,
    /// Debug switch: skip delivery of unnecessary signals.
    pub suppress_unnecessary: bool,
    /// Survivor table sharing.
    pub coalesce_scope: CoalesceScope,
    /// Signals disabled when the bus starts.
    pub disabled_signals: Vec<Signal>,
    /// Capacity of the dispatch trace channel.
    pub trace_capacity: usize,
    /// Name of the dispatch thread.
    pub thread_name: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            default_coalesce: DEFAULT_COALESCE,
            identified_coalesce: IDENTIFIED_COALESCE,
            multi_condition_coalesce: MULTI_CONDITION_COALESCE,
            idle_wait_margin: Duration::from_millis(10),
            suppress_unnecessary: false,
            coalesce_scope: CoalesceScope::Shared,
            disabled_signals: Vec::new(),
            trace_capacity: 256,
            thread_name: "areakit-dispatch".to_string(),
        }
    }
}

impl BusConfig {
    /// How long the dispatch thread waits for traffic before sweeping
    ///
    /// Slightly longer than the smallest coalesce window, so expired
    /// survivors are swept even while nothing is published.
    pub fn idle_wait(&self) -> Duration {
        self.default_coalesce
            .min(self.identified_coalesce)
            .min(self.multi_condition_coalesce)
            .saturating_add(self.idle_wait_margin)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let windows = [
            ("default_coalesce", self.default_coalesce),
            ("identified_coalesce", self.identified_coalesce),
            ("multi_condition_coalesce", self.multi_condition_coalesce),
        ];
        for (field, window) in windows {
            if window.is_zero() {
                return Err(BusError::invalid_config(field, "must be > 0"));
            }
            if window > MAX_COALESCE {
                return Err(BusError::invalid_config(
                    field,
                    format!("must be at most {}s", MAX_COALESCE.as_secs()),
                ));
            }
        }

        if self.idle_wait_margin > MAX_COALESCE {
            return Err(BusError::invalid_config(
                "idle_wait_margin",
                format!("must be at most {}s", MAX_COALESCE.as_secs()),
            ));
        }

        if self.trace_capacity == 0 {
            return Err(BusError::invalid_config("trace_capacity", "must be > 0"));
        }

        if self.thread_name.trim().is_empty() {
            return Err(BusError::invalid_config("thread_name", "must not be empty"));
        }

        if let Some(special) = self.disabled_signals.iter().find(|s| s.is_special()) {
            return Err(BusError::invalid_config(
                "disabled_signals",
                format!("control signal {} cannot be disabled", special),
            ));
        }

        Ok(())
    }
}
