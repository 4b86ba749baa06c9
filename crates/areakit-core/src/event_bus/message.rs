//! Message record describing one event occurrence.

use chrono::{DateTime, Utc};
use std::hash::{Hash, Hasher};
use std::panic::Location;

use super::signal::Signal;
use super::value::{SubscriberKey, Target, Value};

/// Call site a message or receiver was created from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin(&'static Location<'static>);

impl Origin {
    /// Capture the caller's location
    #[track_caller]
    pub fn caller() -> Self {
        Self(Location::caller())
    }

    /// Source file of the call site
    pub fn file(&self) -> &'static str {
        self.0.file()
    }

    /// Line of the call site
    pub fn line(&self) -> u32 {
        self.0.line()
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.0.file(), self.0.line())
    }
}

/// One event occurrence travelling through the bus
///
/// Two messages are equal when their signal, source, target and payload
/// are equal. Receive time, origin and dispatch key are diagnostics and take
/// no part in equality, which is what coalescing relies on.
#[derive(Debug, Clone)]
pub struct Message {
    signal: Signal,
    source: Value,
    target: Target,
    related_info: Option<Value>,
    additional_info: Vec<Value>,
    receive_time: Option<DateTime<Utc>>,
    origin: Option<Origin>,
    dispatch_key: Option<SubscriberKey>,
}

impl Message {
    /// Build a message; the first `info` item becomes the related info
    pub fn new(
        source: impl Into<Value>,
        target: Target,
        signal: Signal,
        info: impl IntoIterator<Item = Value>,
    ) -> Self {
        let mut info = info.into_iter();
        let related_info = info.next();
        Self {
            signal,
            source: source.into(),
            target,
            related_info,
            additional_info: info.collect(),
            receive_time: None,
            origin: None,
            dispatch_key: None,
        }
    }

    /// Attach the call site that produced this message
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Signal of this occurrence
    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// Publisher identity
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Audience selector
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// First payload item
    pub fn related_info(&self) -> Option<&Value> {
        self.related_info.as_ref()
    }

    /// Remaining payload items, in publication order
    pub fn additional_info(&self) -> &[Value] {
        &self.additional_info
    }

    /// When the dispatch thread dequeued this message
    pub fn receive_time(&self) -> Option<DateTime<Utc>> {
        self.receive_time
    }

    /// Call site that published this message
    pub fn origin(&self) -> Option<Origin> {
        self.origin
    }

    /// Receiver key this copy is being delivered under
    pub fn dispatch_key(&self) -> Option<&SubscriberKey> {
        self.dispatch_key.as_ref()
    }

    /// Check whether the message is addressed to `target` or to everybody
    pub fn is_for(&self, target: &Target) -> bool {
        self.target == Target::All || &self.target == target
    }

    /// Stamp the receive time; later stamps are ignored
    pub(crate) fn stamp_received(&mut self, at: DateTime<Utc>) {
        if self.receive_time.is_none() {
            self.receive_time = Some(at);
        }
    }

    pub(crate) fn for_key(&self, key: &SubscriberKey) -> Self {
        let mut copy = self.clone();
        copy.dispatch_key = Some(key.clone());
        copy
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.signal == other.signal
            && self.source == other.source
            && self.target == other.target
            && self.related_info == other.related_info
            && self.additional_info == other.additional_info
    }
}

impl Eq for Message {}

impl Hash for Message {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.signal.hash(state);
        self.source.hash(state);
        self.target.hash(state);
        self.related_info.hash(state);
        self.additional_info.hash(state);
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} from {} to {}", self.signal, self.source, self.target)?;
        if let Some(related) = &self.related_info {
            write!(f, " [{}", related)?;
            for extra in &self.additional_info {
                write!(f, ", {}", extra)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(message: &Message) -> u64 {
        let mut hasher = DefaultHasher::new();
        message.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_info_split() {
        let message = Message::new(
            "tree",
            Target::All,
            Signal::AreaChanged,
            vec![Value::from(1), Value::from("title"), Value::from(true)],
        );
        assert_eq!(message.related_info(), Some(&Value::Int(1)));
        assert_eq!(
            message.additional_info(),
            &[Value::from("title"), Value::Bool(true)]
        );

        let bare = Message::new("tree", Target::All, Signal::UpdateAll, Vec::new());
        assert!(bare.related_info().is_none());
        assert!(bare.additional_info().is_empty());
    }

    #[test]
    fn test_equality_ignores_diagnostics() {
        let a = Message::new("tree", Target::All, Signal::UpdateAll, vec![Value::from(7)])
            .with_origin(Origin::caller());
        let mut b = Message::new("tree", Target::All, Signal::UpdateAll, vec![Value::from(7)])
            .for_key(&SubscriberKey::from("props"));
        b.stamp_received(Utc::now());

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_equality_covers_payload_order() {
        let a = Message::new(
            "tree",
            Target::All,
            Signal::SlotChanged,
            vec![Value::from(1), Value::from(2), Value::from(3)],
        );
        let b = Message::new(
            "tree",
            Target::All,
            Signal::SlotChanged,
            vec![Value::from(1), Value::from(3), Value::from(2)],
        );
        assert_ne!(a, b);

        let other_target = Message::new(
            "tree",
            Target::group("props"),
            Signal::SlotChanged,
            vec![Value::from(1), Value::from(2), Value::from(3)],
        );
        assert_ne!(a, other_target);
    }

    #[test]
    fn test_receive_time_stamped_once() {
        let mut message = Message::new("x", Target::All, Signal::UpdateAll, Vec::new());
        let first = Utc::now();
        message.stamp_received(first);
        message.stamp_received(first + chrono::Duration::seconds(5));
        assert_eq!(message.receive_time(), Some(first));
    }

    #[test]
    fn test_is_for() {
        let broadcast = Message::new("x", Target::All, Signal::UpdateAll, Vec::new());
        assert!(broadcast.is_for(&Target::group("tree")));

        let addressed = Message::new("x", Target::group("tree"), Signal::UpdateAll, Vec::new());
        assert!(addressed.is_for(&Target::group("tree")));
        assert!(!addressed.is_for(&Target::group("props")));
    }

    #[test]
    fn test_origin_display() {
        let origin = Origin::caller();
        assert!(origin.to_string().starts_with(origin.file()));
        assert!(origin.line() > 0);
    }
}
