//! Opaque identities carried by messages.
//!
//! Publishers, audiences and payload items are compared only for equality,
//! never inspected by the bus. [`Value`] covers the plain data a panel usually
//! sends along; [`ObjectRef`] wraps any shared object and compares by
//! identity.

use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

use super::message::Message;
use super::signal::Signal;
use crate::types::DeferredFn;

/// Shared object compared by identity
#[derive(Clone)]
pub struct ObjectRef {
    label: Arc<str>,
    object: Arc<dyn Any + Send + Sync>,
}

impl ObjectRef {
    /// Wrap a shared object; `label` only shows up in logs
    pub fn new<T: Any + Send + Sync>(label: impl Into<Arc<str>>, object: Arc<T>) -> Self {
        Self {
            label: label.into(),
            object,
        }
    }

    /// Label given at construction
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Borrow the wrapped object if it has type `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object.downcast_ref::<T>()
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.object) as *const () as usize
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl std::fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectRef({}@{:#x})", self.label, self.addr())
    }
}

/// Key a group of receivers is registered and removed under
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubscriberKey {
    /// Caller-chosen name.
    Named(Arc<str>),
    /// Generated unique key.
    Id(Uuid),
}

impl SubscriberKey {
    /// Create a new unique key
    pub fn new() -> Self {
        Self::Id(Uuid::new_v4())
    }

    /// Create a key from a caller-chosen name
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self::Named(name.into())
    }
}

impl Default for SubscriberKey {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SubscriberKey {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for SubscriberKey {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

impl std::fmt::Display for SubscriberKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriberKey::Named(name) => f.write_str(name),
            SubscriberKey::Id(id) => write!(f, "Key({})", &id.to_string()[..8]),
        }
    }
}

/// Opaque value carried as source, audience or payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Value {
    /// No value.
    #[default]
    Unit,
    /// A flag.
    Bool(bool),
    /// An integer, typically a row or an index.
    Int(i64),
    /// A text, typically a name or a path.
    Text(Arc<str>),
    /// A persistent identifier, typically an area or resource id.
    Id(Uuid),
    /// A subscriber key.
    Key(SubscriberKey),
    /// A signal.
    Signal(Signal),
    /// A shared object compared by identity.
    Object(ObjectRef),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Text(t) => write!(f, "{:?}", t),
            Value::Id(id) => write!(f, "{}", id),
            Value::Key(key) => write!(f, "{}", key),
            Value::Signal(signal) => write!(f, "{}", signal),
            Value::Object(object) => write!(f, "{}", object.label()),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<&str> for Value {
    fn from(t: &str) -> Self {
        Value::Text(t.into())
    }
}

impl From<String> for Value {
    fn from(t: String) -> Self {
        Value::Text(t.into())
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Value::Id(id)
    }
}

impl From<SubscriberKey> for Value {
    fn from(key: SubscriberKey) -> Self {
        Value::Key(key)
    }
}

impl From<Signal> for Value {
    fn from(signal: Signal) -> Self {
        Value::Signal(signal)
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Value::Object(object)
    }
}

/// Closure carried by a deferred-invocation message, compared by identity
#[derive(Clone)]
pub struct DeferredCall(DeferredFn);

impl DeferredCall {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Message) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Run the closure with the message that carried it
    pub fn invoke(&self, message: &Message) -> anyhow::Result<()> {
        (self.0)(message)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for DeferredCall {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for DeferredCall {}

impl Hash for DeferredCall {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl std::fmt::Debug for DeferredCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeferredCall({:#x})", self.addr())
    }
}

/// Audience a message is addressed to
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Target {
    /// Everybody listening to the signal.
    #[default]
    All,
    /// A broad audience named by the publisher, such as `"tree"`.
    Group(Arc<str>),
    /// One specific object.
    Object(Value),
    /// Deferred closure, used by [`Signal::InvokeLater`].
    Deferred(DeferredCall),
    /// Signal to enable, used by [`Signal::EnableTargetSignal`].
    Signal(Signal),
}

impl Target {
    /// Address a named group of views
    pub fn group(name: impl Into<Arc<str>>) -> Self {
        Target::Group(name.into())
    }

    /// Address one specific object
    pub fn object(value: impl Into<Value>) -> Self {
        Target::Object(value.into())
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::All => write!(f, "all"),
            Target::Group(name) => write!(f, "group:{}", name),
            Target::Object(value) => write!(f, "object:{}", value),
            Target::Deferred(call) => write!(f, "{:?}", call),
            Target::Signal(signal) => write!(f, "signal:{}", signal),
        }
    }
}
