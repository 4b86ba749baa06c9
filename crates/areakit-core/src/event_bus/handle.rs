//! Registered subscriber actions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::config::{BusConfig, MAX_COALESCE};
use super::message::{Message, Origin};
use super::signal::{EventCondition, EventConditionPriority};
use crate::types::ReceiverAction;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// A subscriber action with its coalesce window
pub struct EventHandle {
    id: u64,
    action: ReceiverAction,
    coalesce: Duration,
    identifier: Option<Arc<str>>,
    origin: Origin,
}

impl EventHandle {
    /// Create a handle; every handle gets a process-unique id
    pub fn new(
        action: ReceiverAction,
        coalesce: Duration,
        identifier: Option<Arc<str>>,
        origin: Origin,
    ) -> Self {
        Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            action,
            coalesce,
            identifier,
            origin,
        }
    }

    /// Process-unique id of this handle
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Window inside which equal messages are delivered once
    pub fn coalesce(&self) -> Duration {
        self.coalesce
    }

    /// Human-readable name given at registration
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Call site that registered this handle
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Name used in logs: the identifier, or the registration site
    pub fn describe(&self) -> String {
        match &self.identifier {
            Some(name) => name.to_string(),
            None => self.origin.to_string(),
        }
    }

    /// Run the action on the current thread
    pub fn invoke(&self, message: &Message) {
        (self.action)(message)
    }
}

impl std::fmt::Debug for EventHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandle")
            .field("id", &self.id)
            .field("coalesce", &self.coalesce)
            .field("identifier", &self.identifier)
            .field("origin", &self.origin.to_string())
            .finish()
    }
}

/// Optional settings of a receiver registration
///
/// ```rust,ignore
/// bus.receiver_with(
///     "props",
///     Signal::AreaChanged,
///     ReceiverOptions::new()
///         .priority(EventConditionPriority::High)
///         .identifier("props-refresh"),
///     |message| refresh(message),
/// )?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReceiverOptions {
    priority: Option<EventConditionPriority>,
    coalesce: Option<Duration>,
    identifier: Option<Arc<str>>,
}

impl ReceiverOptions {
    /// Defaults for every option
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivery tier
    pub fn priority(mut self, priority: EventConditionPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Explicit coalesce window, clamped to [`MAX_COALESCE`]
    pub fn coalesce(mut self, window: Duration) -> Self {
        self.coalesce = Some(window);
        self
    }

    /// Explicit coalesce window in milliseconds
    pub fn coalesce_ms(self, millis: u64) -> Self {
        self.coalesce(Duration::from_millis(millis))
    }

    /// Name for logs; shortens the default coalesce window
    pub fn identifier(mut self, identifier: impl Into<Arc<str>>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub(crate) fn resolve_priority(&self, condition: &EventCondition) -> EventConditionPriority {
        self.priority
            .unwrap_or_else(|| condition.default_priority())
    }

    pub(crate) fn resolve_window(&self, config: &BusConfig) -> Duration {
        match (self.coalesce, &self.identifier) {
            (Some(window), _) => window.min(MAX_COALESCE),
            (None, Some(_)) => config.identified_coalesce,
            (None, None) => config.default_coalesce,
        }
    }

    pub(crate) fn resolve_window_or(&self, fallback: Duration) -> Duration {
        self.coalesce.map_or(fallback, |window| window.min(MAX_COALESCE))
    }

    pub(crate) fn identifier_ref(&self) -> Option<Arc<str>> {
        self.identifier.clone()
    }
}
