//! # Event Bus Module
//!
//! Conditional publish/subscribe bus decoupling the editor's panels and
//! dialogs from each other.
//!
//! ## Overview
//!
//! - Any thread publishes with [`EventBus::transmit`] and friends; publishing
//!   never blocks.
//! - One dispatch thread drains the queue in arrival order and resolves the
//!   receivers registered for the message's signal, highest priority first.
//! - Equal messages arriving within a receiver's coalesce window are
//!   delivered to it once.
//! - Receiver actions always run on the UI scheduler, never on the dispatch
//!   thread.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use areakit_core::event_bus::{EventBus, ManualScheduler, Signal};
//! use std::sync::Arc;
//!
//! let ui = ManualScheduler::new();
//! let bus = EventBus::new(Arc::new(ui.clone()))?;
//!
//! let key = bus.receiver("area-tree", Signal::UpdateAll, |message| {
//!     println!("refresh requested by {}", message.source());
//! })?;
//!
//! bus.transmit("toolbar", Signal::UpdateAll)?;
//! ui.run_pending();
//!
//! bus.remove_receivers(&key);
//! bus.stop_dispatching();
//! ```

mod bus;
mod coalesce;
mod config;
mod handle;
mod lifecycle;
mod message;
mod queue;
mod registry;
mod scheduler;
mod signal;
mod trace;
mod value;

pub use bus::*;
pub use coalesce::*;
pub use config::*;
pub use handle::*;
pub use lifecycle::*;
pub use message::*;
pub use queue::*;
pub use registry::*;
pub use scheduler::*;
pub use signal::*;
pub use trace::*;
pub use value::*;
