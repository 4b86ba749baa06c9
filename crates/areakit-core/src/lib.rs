//! # AreaKit Core
//!
//! Core services of the AreaKit content editor.
//! Provides the conditional event dispatch bus that lets independently
//! created panels and dialogs talk to each other without knowing each other.

pub mod error;
pub mod event_bus;
pub mod types;

pub use error::{BusError, Result};

// Re-export event bus for convenience
pub use event_bus::{
    BusConfig, CoalesceScope, ComponentHandle, ComponentHost, DispatchOutcome, DispatchRecord,
    EventBus, EventCondition, EventConditionPriority, LifecycleListener, ManualScheduler, Message,
    ObjectRef, ReceiverOptions, Signal, SignalCategory, SubscriberKey, Target, UiScheduler,
    UiThread, Value,
};

// Re-export type aliases for convenience
pub use types::{
    shared, shared_list, shared_queue, DeferredFn, ReceiverAction, Shared, SharedList,
    SharedQueue, UiJob,
};
