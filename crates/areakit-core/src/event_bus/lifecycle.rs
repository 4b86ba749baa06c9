//! Attach/detach lifecycle of receiver-owning components.
//!
//! Panels and dialogs come and go. A receiver registered for a
//! [`ComponentHost`] is active only while the host is attached to a visible
//! container: it is registered on attach and removed on detach, so short-lived
//! views do not leak subscriptions.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::value::SubscriberKey;
use crate::types::{shared_list, SharedList};

/// Observer of a component's attach/detach transitions
pub trait LifecycleListener: Send + Sync {
    /// The component became part of a visible container
    fn attached(&self);

    /// The component was removed from its container
    fn detached(&self);

    /// Whether the listener still has work to do; hosts drop dead listeners
    fn is_live(&self) -> bool {
        true
    }
}

/// Anything that can own receivers and report attach/detach transitions
pub trait ComponentHost: Send + Sync {
    /// Key the component's receivers are registered under
    fn subscriber_key(&self) -> SubscriberKey;

    /// Check if the component is currently attached
    fn is_attached(&self) -> bool;

    /// Observe future transitions
    fn add_lifecycle_listener(&self, listener: Arc<dyn LifecycleListener>);
}

/// Minimal component host driven explicitly by its container
pub struct ComponentHandle {
    name: String,
    key: SubscriberKey,
    attached: AtomicBool,
    // Serializes transitions so listeners see them in flag order.
    transition: Mutex<()>,
    listeners: SharedList<Arc<dyn LifecycleListener>>,
}

impl ComponentHandle {
    /// Create a detached component with a fresh key
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            key: SubscriberKey::new(),
            attached: AtomicBool::new(false),
            transition: Mutex::new(()),
            listeners: shared_list(),
        })
    }

    /// Display name of the component
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mark the component attached and notify listeners
    ///
    /// Returns `false` if it already was attached. Listeners must not attach
    /// or detach the same component from their callbacks.
    pub fn attach(&self) -> bool {
        let _transition = self.transition.lock();
        if self.attached.swap(true, Ordering::AcqRel) {
            return false;
        }
        tracing::debug!("Component {} attached", self.name);
        for listener in self.listeners_snapshot() {
            listener.attached();
        }
        self.prune();
        true
    }

    /// Mark the component detached and notify listeners
    ///
    /// Returns `false` if it already was detached.
    pub fn detach(&self) -> bool {
        let _transition = self.transition.lock();
        if !self.attached.swap(false, Ordering::AcqRel) {
            return false;
        }
        tracing::debug!("Component {} detached", self.name);
        for listener in self.listeners_snapshot() {
            listener.detached();
        }
        self.prune();
        true
    }

    /// Number of registered lifecycle listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    // Listeners run without the lock held so they may register more.
    fn listeners_snapshot(&self) -> Vec<Arc<dyn LifecycleListener>> {
        self.listeners.lock().clone()
    }

    fn prune(&self) {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|listener| listener.is_live());
        if listeners.len() < before {
            tracing::debug!(
                "Component {} dropped {} dead listener(s)",
                self.name,
                before - listeners.len()
            );
        }
    }
}

impl ComponentHost for ComponentHandle {
    fn subscriber_key(&self) -> SubscriberKey {
        self.key.clone()
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    fn add_lifecycle_listener(&self, listener: Arc<dyn LifecycleListener>) {
        self.prune();
        self.listeners.lock().push(listener);
    }
}

impl std::fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("attached", &self.is_attached())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
