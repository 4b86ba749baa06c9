//! Dispatch trace records.
//!
//! Every delivery decision made by the dispatch thread is published as a
//! [`DispatchRecord`] on a broadcast channel. Nobody has to listen; the
//! records exist for diagnostics panels and logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::signal::Signal;

/// What the dispatch thread did with one (handle, message) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The action was scheduled on the UI thread.
    Delivered,
    /// An equal message was delivered inside the coalesce window.
    Coalesced,
    /// The debug switch silenced an unnecessary signal.
    Suppressed,
    /// A control message was handled by the bus itself.
    Special,
}

/// One traced dispatch decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRecord {
    /// Signal of the dispatched message.
    pub signal: Signal,
    /// Receiver key, absent for control messages.
    pub key: Option<String>,
    /// Handle identifier or registration site.
    pub handle: Option<String>,
    /// Call site that published the message.
    pub origin: Option<String>,
    /// When the dispatch thread dequeued the message.
    pub received_at: DateTime<Utc>,
    /// Decision taken.
    pub outcome: DispatchOutcome,
}

impl DispatchRecord {
    /// Serialize for structured logs
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for DispatchRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:?} -> {}",
            self.received_at.format("%H:%M:%S%.3f"),
            self.outcome,
            self.signal
        )?;
        if let Some(key) = &self.key {
            write!(f, " [{}]", key)?;
        }
        if let Some(handle) = &self.handle {
            write!(f, " {}", handle)?;
        }
        Ok(())
    }
}
