//! Type system utilities and aliases.
//!
//! This module provides type aliases for the shared-state and callback types
//! used by the event bus and its collaborators.
//!
//! ## Modules
//!
//! - [`aliases`]: Type aliases for `Arc<Mutex<T>>`, UI jobs, receiver actions, etc.

pub mod aliases;

pub use aliases::*;
