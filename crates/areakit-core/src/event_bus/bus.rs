//! Event Bus implementation.
//!
//! The [`EventBus`] is a single long-lived service created at application
//! start and handed to every panel that publishes or listens. Publishing only
//! appends to a queue; one dispatch thread drains the queue in FIFO order,
//! resolves receivers through the registry, applies coalescing and schedules
//! each surviving action on the UI thread.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::broadcast;

use super::coalesce::Coalescer;
use super::config::BusConfig;
use super::handle::{EventHandle, ReceiverOptions};
use super::lifecycle::{ComponentHost, LifecycleListener};
use super::message::{Message, Origin};
use super::queue::MessageQueue;
use super::registry::SharedRegistry;
use super::scheduler::UiScheduler;
use super::signal::{EventCondition, EventConditionPriority, Signal, SignalStates};
use super::trace::{DispatchOutcome, DispatchRecord};
use super::value::{DeferredCall, SubscriberKey, Target, Value};
use crate::error::{BusError, Result};
use crate::types::ReceiverAction;

struct BusInner {
    config: BusConfig,
    queue: MessageQueue,
    registry: SharedRegistry,
    coalescer: Mutex<Coalescer>,
    signals: SignalStates,
    scheduler: Arc<dyn UiScheduler>,
    stopped: AtomicBool,
    suppress_unnecessary: AtomicBool,
    trace: broadcast::Sender<DispatchRecord>,
    dispatch_thread: Mutex<Option<JoinHandle<()>>>,
}

impl BusInner {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn enqueue(&self, message: Message) -> Result<bool> {
        if self.is_stopped() {
            return Err(BusError::Stopped);
        }
        let signal = message.signal();
        if !signal.is_special() && !self.signals.is_enabled(signal) {
            tracing::trace!("Signal {} disabled, dropping {}", signal, message);
            return Ok(false);
        }
        self.queue.push(message);
        Ok(true)
    }

    fn register(
        &self,
        condition: EventCondition,
        priority: EventConditionPriority,
        key: &SubscriberKey,
        handle: Arc<EventHandle>,
    ) {
        tracing::debug!(
            "Receiver {} registered for {} ({}) under {}",
            handle.describe(),
            condition,
            priority,
            key
        );
        self.registry
            .update(|current| current.with_handle(condition, priority, key, handle));
    }

    fn remove_key(&self, key: &SubscriberKey) -> usize {
        let mut removed = 0;
        self.registry.update(|current| {
            removed = current.count_for(key);
            current.without_key(key)
        });
        if removed > 0 {
            tracing::debug!("Removed {} receiver(s) under {}", removed, key);
        }
        removed
    }

    fn run(self: Arc<Self>) {
        let idle_wait = self.config.idle_wait();
        let mut occurrence: u64 = 0;

        while !self.is_stopped() {
            let next = match self.queue.try_pop() {
                Some(message) => Some(message),
                None => self.queue.pop_timeout(idle_wait),
            };
            let Some(message) = next else {
                self.coalescer.lock().sweep(Instant::now());
                continue;
            };
            if self.is_stopped() {
                break;
            }
            occurrence = occurrence.wrapping_add(1);
            self.dispatch(message, occurrence);
        }
        tracing::debug!("Dispatch thread finished");
    }

    fn dispatch(self: &Arc<Self>, mut message: Message, occurrence: u64) {
        message.stamp_received(Utc::now());
        let signal = message.signal();

        if signal.is_special() {
            self.dispatch_special(message);
            return;
        }

        let candidates = self.registry.snapshot().candidates(signal);
        if candidates.is_empty() {
            tracing::trace!("No receivers for {}", message);
            return;
        }

        if signal.is_unnecessary() && self.suppress_unnecessary.load(Ordering::Relaxed) {
            for (key, handle) in &candidates {
                self.record(&message, Some(key), Some(handle), DispatchOutcome::Suppressed);
            }
            return;
        }

        let now = Instant::now();
        for (key, handle) in candidates {
            let admitted = self.coalescer.lock().admit(
                &message,
                occurrence,
                handle.id(),
                handle.coalesce(),
                now,
            );
            if !admitted {
                tracing::trace!(
                    signal = %signal,
                    key = %key,
                    handle = %handle.describe(),
                    "Coalesced"
                );
                self.record(&message, Some(&key), Some(&handle), DispatchOutcome::Coalesced);
                continue;
            }

            let delivery = message.for_key(&key);
            tracing::trace!(
                signal = %signal,
                key = %key,
                handle = %handle.describe(),
                origin = ?message.origin().map(|o| o.to_string()),
                received_at = ?message.receive_time(),
                "Invoking receiver"
            );
            self.record(&message, Some(&key), Some(&handle), DispatchOutcome::Delivered);
            self.scheduler
                .schedule(Box::new(move || handle.invoke(&delivery)));
        }
    }

    fn dispatch_special(self: &Arc<Self>, message: Message) {
        match message.target().clone() {
            Target::Deferred(call) if message.signal() == Signal::InvokeLater => {
                self.record(&message, None, None, DispatchOutcome::Special);
                self.scheduler.schedule(Box::new(move || {
                    if let Err(err) = call.invoke(&message) {
                        let origin = message
                            .origin()
                            .map(|o| o.to_string())
                            .unwrap_or_else(|| "unknown".to_string());
                        tracing::error!("Deferred call from {} failed: {:?}", origin, err);
                    }
                }));
            }
            Target::Signal(target) if message.signal() == Signal::EnableTargetSignal => {
                self.record(&message, None, None, DispatchOutcome::Special);
                let bus = Arc::downgrade(self);
                self.scheduler.schedule(Box::new(move || {
                    if let Some(bus) = bus.upgrade() {
                        bus.signals.enable(target);
                        tracing::debug!("Signal {} enabled", target);
                    }
                }));
            }
            _ => tracing::warn!("Malformed control message dropped: {}", message),
        }
    }

    fn record(
        &self,
        message: &Message,
        key: Option<&SubscriberKey>,
        handle: Option<&Arc<EventHandle>>,
        outcome: DispatchOutcome,
    ) {
        if self.trace.receiver_count() == 0 {
            return;
        }
        let record = DispatchRecord {
            signal: message.signal(),
            key: key.map(|k| k.to_string()),
            handle: handle.map(|h| h.describe()),
            origin: message.origin().map(|o| o.to_string()),
            received_at: message.receive_time().unwrap_or_else(Utc::now),
            outcome,
        };
        // Lagging or absent receivers are not the bus's concern.
        let _ = self.trace.send(record);
    }
}

/// Registration that follows a component's attach/detach transitions
struct AutoRegistration {
    bus: Weak<BusInner>,
    key: SubscriberKey,
    condition: EventCondition,
    priority: EventConditionPriority,
    handle: Arc<EventHandle>,
    // Held across register/remove so attach and detach cannot interleave.
    active: Mutex<bool>,
}

impl LifecycleListener for AutoRegistration {
    fn attached(&self) {
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        let mut active = self.active.lock();
        if *active || bus.is_stopped() {
            return;
        }
        bus.register(
            self.condition,
            self.priority,
            &self.key,
            Arc::clone(&self.handle),
        );
        *active = true;
    }

    fn detached(&self) {
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        let mut active = self.active.lock();
        if std::mem::take(&mut *active) {
            bus.remove_key(&self.key);
        }
    }

    fn is_live(&self) -> bool {
        self.bus.upgrade().is_some_and(|bus| !bus.is_stopped())
    }
}

/// Central conditional event bus
///
/// Cloning is cheap; every clone talks to the same queue, registry and
/// dispatch thread. The dispatch thread keeps the bus alive until
/// [`EventBus::stop_dispatching`] is called.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Start a bus with default configuration
    pub fn new(scheduler: Arc<dyn UiScheduler>) -> Result<Self> {
        Self::with_config(BusConfig::default(), scheduler)
    }

    /// Start a bus and its dispatch thread
    pub fn with_config(config: BusConfig, scheduler: Arc<dyn UiScheduler>) -> Result<Self> {
        config.validate()?;

        let (trace, _) = broadcast::channel(config.trace_capacity);
        let thread_name = config.thread_name.clone();
        let inner = Arc::new(BusInner {
            queue: MessageQueue::new(),
            registry: SharedRegistry::new(),
            coalescer: Mutex::new(Coalescer::new(config.coalesce_scope)),
            signals: SignalStates::new(&config.disabled_signals),
            scheduler,
            stopped: AtomicBool::new(false),
            suppress_unnecessary: AtomicBool::new(config.suppress_unnecessary),
            trace,
            dispatch_thread: Mutex::new(None),
            config,
        });

        let worker = Arc::clone(&inner);
        let handle = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || worker.run())
            .map_err(|source| BusError::SpawnFailed {
                thread: thread_name.clone(),
                source,
            })?;
        *inner.dispatch_thread.lock() = Some(handle);

        tracing::debug!("Event bus started on thread {}", thread_name);
        Ok(Self { inner })
    }

    // ---------------------------------------------------------------------
    // Publishing
    // ---------------------------------------------------------------------

    /// Publish a signal without payload to everybody
    ///
    /// Returns `Ok(false)` when the signal is disabled and the message was
    /// dropped.
    #[track_caller]
    pub fn transmit(&self, source: impl Into<Value>, signal: Signal) -> Result<bool> {
        let origin = Origin::caller();
        self.inner
            .enqueue(Message::new(source, Target::All, signal, Vec::new()).with_origin(origin))
    }

    /// Publish a signal with payload to everybody
    ///
    /// The first `info` item becomes the related info.
    #[track_caller]
    pub fn transmit_with(
        &self,
        source: impl Into<Value>,
        signal: Signal,
        info: Vec<Value>,
    ) -> Result<bool> {
        let origin = Origin::caller();
        self.inner
            .enqueue(Message::new(source, Target::All, signal, info).with_origin(origin))
    }

    /// Publish a signal with payload to a specific audience
    #[track_caller]
    pub fn transmit_to(
        &self,
        source: impl Into<Value>,
        target: Target,
        signal: Signal,
        info: Vec<Value>,
    ) -> Result<bool> {
        let origin = Origin::caller();
        self.inner
            .enqueue(Message::new(source, target, signal, info).with_origin(origin))
    }

    /// Run `f` once on the UI thread, after everything published before
    ///
    /// An error returned by `f` is logged and goes nowhere else.
    #[track_caller]
    pub fn invoke_later<F>(&self, f: F) -> Result<()>
    where
        F: Fn(&Message) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let origin = Origin::caller();
        let message = Message::new(
            Value::Unit,
            Target::Deferred(DeferredCall::new(f)),
            Signal::InvokeLater,
            Vec::new(),
        )
        .with_origin(origin);
        self.inner.enqueue(message).map(|_| ())
    }

    /// Enable a signal once the queue reaches this request
    ///
    /// The flag is flipped on the UI thread, ordered with other traffic.
    #[track_caller]
    pub fn enable_signal(&self, signal: Signal) -> Result<()> {
        let origin = Origin::caller();
        let message = Message::new(
            Value::Unit,
            Target::Signal(signal),
            Signal::EnableTargetSignal,
            Vec::new(),
        )
        .with_origin(origin);
        self.inner.enqueue(message).map(|_| ())
    }

    /// Disable a signal immediately; later publications are dropped
    pub fn disable_signal(&self, signal: Signal) {
        if signal.is_special() {
            tracing::warn!("Control signal {} cannot be disabled", signal);
            return;
        }
        self.inner.signals.disable(signal);
        tracing::debug!("Signal {} disabled", signal);
    }

    /// Check whether a signal is currently published
    pub fn is_signal_enabled(&self, signal: Signal) -> bool {
        self.inner.signals.is_enabled(signal)
    }

    /// Debug switch: stop delivering unnecessary signals
    pub fn set_suppress_unnecessary(&self, suppress: bool) {
        self.inner
            .suppress_unnecessary
            .store(suppress, Ordering::Relaxed);
    }

    // ---------------------------------------------------------------------
    // Subscribing
    // ---------------------------------------------------------------------

    /// Register an action for a condition with default options
    #[track_caller]
    pub fn receiver<K, C, F>(&self, key: K, condition: C, action: F) -> Result<SubscriberKey>
    where
        K: Into<SubscriberKey>,
        C: Into<EventCondition>,
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.receiver_with(key, condition, ReceiverOptions::new(), action)
    }

    /// Register an action for a condition
    ///
    /// Returns the key to pass to [`EventBus::remove_receivers`].
    #[track_caller]
    pub fn receiver_with<K, C, F>(
        &self,
        key: K,
        condition: C,
        options: ReceiverOptions,
        action: F,
    ) -> Result<SubscriberKey>
    where
        K: Into<SubscriberKey>,
        C: Into<EventCondition>,
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let origin = Origin::caller();
        if self.inner.is_stopped() {
            return Err(BusError::Stopped);
        }
        let key = key.into();
        let condition = condition.into();
        let handle = Arc::new(EventHandle::new(
            Arc::new(action),
            options.resolve_window(&self.inner.config),
            options.identifier_ref(),
            origin,
        ));
        self.inner
            .register(condition, options.resolve_priority(&condition), &key, handle);
        Ok(key)
    }

    /// Register one action for several conditions with default options
    #[track_caller]
    pub fn receivers<K, I, F>(&self, key: K, conditions: I, action: F) -> Result<Vec<SubscriberKey>>
    where
        K: Into<SubscriberKey>,
        I: IntoIterator,
        I::Item: Into<EventCondition>,
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.receivers_with(key, conditions, ReceiverOptions::new(), action)
    }

    /// Register one action for several conditions
    ///
    /// Without an explicit window the longer multi-condition default applies.
    /// Returns one key per condition.
    #[track_caller]
    pub fn receivers_with<K, I, F>(
        &self,
        key: K,
        conditions: I,
        options: ReceiverOptions,
        action: F,
    ) -> Result<Vec<SubscriberKey>>
    where
        K: Into<SubscriberKey>,
        I: IntoIterator,
        I::Item: Into<EventCondition>,
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let origin = Origin::caller();
        if self.inner.is_stopped() {
            return Err(BusError::Stopped);
        }
        let key = key.into();
        let action: ReceiverAction = Arc::new(action);
        let window = options.resolve_window_or(self.inner.config.multi_condition_coalesce);

        let mut keys = Vec::new();
        for condition in conditions {
            let condition = condition.into();
            let handle = Arc::new(EventHandle::new(
                Arc::clone(&action),
                window,
                options.identifier_ref(),
                origin,
            ));
            self.inner
                .register(condition, options.resolve_priority(&condition), &key, handle);
            keys.push(key.clone());
        }
        Ok(keys)
    }

    /// Register an action owned by a component
    ///
    /// The receiver is active while the component is attached: registered now
    /// if it already is, on every later attach, and removed, together with
    /// everything else under the component's key, on every detach.
    #[track_caller]
    pub fn component_receiver<H, C, F>(
        &self,
        component: &H,
        condition: C,
        options: ReceiverOptions,
        action: F,
    ) -> Result<SubscriberKey>
    where
        H: ComponentHost + ?Sized,
        C: Into<EventCondition>,
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let origin = Origin::caller();
        if self.inner.is_stopped() {
            return Err(BusError::Stopped);
        }
        let key = component.subscriber_key();
        let condition = condition.into();
        let registration = Arc::new(AutoRegistration {
            bus: Arc::downgrade(&self.inner),
            key: key.clone(),
            condition,
            priority: options.resolve_priority(&condition),
            handle: Arc::new(EventHandle::new(
                Arc::new(action),
                options.resolve_window(&self.inner.config),
                options.identifier_ref(),
                origin,
            )),
            active: Mutex::new(false),
        });

        component.add_lifecycle_listener(registration.clone());
        if component.is_attached() {
            registration.attached();
        } else {
            tracing::debug!("Receiver under {} deferred until attach", key);
        }
        Ok(key)
    }

    /// Remove every receiver registered under `key`
    ///
    /// Returns the number of handles removed.
    pub fn remove_receivers(&self, key: &SubscriberKey) -> usize {
        self.inner.remove_key(key)
    }

    // ---------------------------------------------------------------------
    // Lifecycle and introspection
    // ---------------------------------------------------------------------

    /// Stop the dispatch thread and drop all queued traffic and receivers
    ///
    /// Actions already handed to the UI scheduler still run.
    pub fn stop_dispatching(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let dropped = self.inner.queue.clear();
        self.inner.registry.clear();
        self.inner.coalescer.lock().clear();
        self.inner.queue.wake();

        let handle = self.inner.dispatch_thread.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == std::thread::current().id() {
                // Stopped from inside the loop; it exits on its own.
            } else if handle.join().is_err() {
                tracing::error!("Dispatch thread terminated abnormally");
            }
        }
        tracing::debug!("Event bus stopped, {} queued message(s) dropped", dropped);
    }

    /// Check if the bus still accepts traffic
    pub fn is_running(&self) -> bool {
        !self.inner.is_stopped()
    }

    /// Subscribe to the dispatch trace
    pub fn trace_receiver(&self) -> broadcast::Receiver<DispatchRecord> {
        self.inner.trace.subscribe()
    }

    /// Total number of registered handles
    pub fn receiver_count(&self) -> usize {
        self.inner.registry.snapshot().len()
    }

    /// Number of handles registered under `key`
    pub fn receiver_count_for(&self, key: &SubscriberKey) -> usize {
        self.inner.registry.snapshot().count_for(key)
    }

    /// Number of messages waiting for the dispatch thread
    pub fn queue_len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Number of live coalescing entries
    pub fn survivor_count(&self) -> usize {
        self.inner.coalescer.lock().len()
    }

    /// Get the current configuration
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("running", &self.is_running())
            .field("receivers", &self.receiver_count())
            .field("queued", &self.queue_len())
            .field("disabled", &self.inner.signals.disabled())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Publish a signal with payload items converted into [`Value`]s
///
/// ```rust,ignore
/// transmit!(bus, "tree", Signal::AreaChanged, area_id, "title")?;
/// ```
#[macro_export]
macro_rules! transmit {
    ($bus:expr, $source:expr, $signal:expr $(, $info:expr)* $(,)?) => {
        $bus.transmit_with(
            $source,
            $signal,
            vec![$($crate::event_bus::Value::from($info)),*],
        )
    };
}
