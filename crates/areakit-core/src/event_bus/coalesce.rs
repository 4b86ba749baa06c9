//! Sliding-window duplicate suppression.
//!
//! The survivor table maps an expiration time to the message that was
//! delivered. Before each delivery the table is swept of expired entries; a
//! message equal to a remaining survivor is coalesced (not delivered to that
//! handle). Otherwise it is delivered and recorded with its own expiration.
//!
//! Entries recorded while delivering one dequeued message never suppress
//! other handles receiving that same occurrence.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::config::{CoalesceScope, MAX_COALESCE};
use super::message::Message;

#[derive(Debug)]
struct Survivor {
    message: Message,
    occurrence: u64,
    handle: u64,
}

/// Survivor table consulted once per (handle, message) delivery
#[derive(Debug)]
pub struct Coalescer {
    scope: CoalesceScope,
    // (expiration, insertion seq) keeps entries with equal expirations apart
    survivors: BTreeMap<(Instant, u64), Survivor>,
    next_seq: u64,
}

impl Coalescer {
    /// Create an empty table
    pub fn new(scope: CoalesceScope) -> Self {
        Self {
            scope,
            survivors: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Decide whether `handle` gets `message`, recording it if so
    ///
    /// `occurrence` identifies the dequeued message being dispatched.
    /// Returns `false` when the message is coalesced.
    pub fn admit(
        &mut self,
        message: &Message,
        occurrence: u64,
        handle: u64,
        window: Duration,
        now: Instant,
    ) -> bool {
        let expiration = now
            .checked_add(window)
            .or_else(|| now.checked_add(MAX_COALESCE))
            .unwrap_or(now);
        self.sweep(now);

        let scope = self.scope;
        let duplicate = self.survivors.values().any(|survivor| {
            survivor.occurrence != occurrence
                && (scope == CoalesceScope::Shared || survivor.handle == handle)
                && survivor.message == *message
        });
        if duplicate {
            return false;
        }

        self.survivors.insert(
            (expiration, self.next_seq),
            Survivor {
                message: message.clone(),
                occurrence,
                handle,
            },
        );
        self.next_seq = self.next_seq.wrapping_add(1);
        true
    }

    /// Drop every entry that expired before `now`
    pub fn sweep(&mut self, now: Instant) -> usize {
        let live = self.survivors.split_off(&(now, 0));
        let expired = self.survivors.len();
        self.survivors = live;
        expired
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.survivors.len()
    }

    /// Check if no entry is recorded
    pub fn is_empty(&self) -> bool {
        self.survivors.is_empty()
    }

    /// Forget every entry
    pub fn clear(&mut self) {
        self.survivors.clear();
    }

    /// Sharing mode of this table
    pub fn scope(&self) -> CoalesceScope {
        self.scope
    }
}

impl Default for Coalescer {
    fn default() -> Self {
        Self::new(CoalesceScope::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::signal::Signal;
    use crate::event_bus::value::{Target, Value};

    const WINDOW: Duration = Duration::from_millis(100);

    fn update_all() -> Message {
        Message::new("tree", Target::All, Signal::UpdateAll, Vec::new())
    }

    #[test]
    fn test_duplicates_within_window_coalesce() {
        let mut table = Coalescer::default();
        let t0 = Instant::now();

        assert!(table.admit(&update_all(), 1, 10, WINDOW, t0));
        assert!(!table.admit(&update_all(), 2, 10, WINDOW, t0 + Duration::from_millis(5)));
        assert!(!table.admit(&update_all(), 3, 10, WINDOW, t0 + Duration::from_millis(9)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_delivered_again_after_expiry() {
        let mut table = Coalescer::default();
        let t0 = Instant::now();

        assert!(table.admit(&update_all(), 1, 10, WINDOW, t0));
        assert!(table.admit(&update_all(), 2, 10, WINDOW, t0 + Duration::from_millis(150)));
    }

    #[test]
    fn test_entry_kept_until_strictly_past_expiration() {
        let mut table = Coalescer::default();
        let t0 = Instant::now();

        assert!(table.admit(&update_all(), 1, 10, WINDOW, t0));
        assert!(!table.admit(&update_all(), 2, 10, WINDOW, t0 + WINDOW));
    }

    #[test]
    fn test_distinct_payloads_do_not_coalesce() {
        let mut table = Coalescer::default();
        let t0 = Instant::now();
        let first = Message::new("tree", Target::All, Signal::AreaChanged, vec![Value::from(1)]);
        let second = Message::new("tree", Target::All, Signal::AreaChanged, vec![Value::from(2)]);

        assert!(table.admit(&first, 1, 10, WINDOW, t0));
        assert!(table.admit(&second, 2, 10, WINDOW, t0));
    }

    #[test]
    fn test_same_occurrence_reaches_every_handle() {
        let mut table = Coalescer::default();
        let t0 = Instant::now();

        assert!(table.admit(&update_all(), 1, 10, WINDOW, t0));
        assert!(table.admit(&update_all(), 1, 11, WINDOW, t0));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_shared_table_crosses_handles() {
        let mut table = Coalescer::new(CoalesceScope::Shared);
        let t0 = Instant::now();
        let long = Duration::from_millis(500);
        let short = Duration::from_millis(25);

        assert!(table.admit(&update_all(), 1, 10, long, t0));
        assert!(table.admit(&update_all(), 1, 11, short, t0));

        // The short handle's own entry is gone, the long one still blocks it.
        let later = t0 + Duration::from_millis(100);
        assert!(!table.admit(&update_all(), 2, 11, short, later));
    }

    #[test]
    fn test_per_handle_table_isolates_handles() {
        let mut table = Coalescer::new(CoalesceScope::PerHandle);
        let t0 = Instant::now();
        let long = Duration::from_millis(500);
        let short = Duration::from_millis(25);

        assert!(table.admit(&update_all(), 1, 10, long, t0));
        assert!(table.admit(&update_all(), 1, 11, short, t0));

        let later = t0 + Duration::from_millis(100);
        assert!(table.admit(&update_all(), 2, 11, short, later));
        assert!(!table.admit(&update_all(), 2, 10, long, later));
    }

    #[test]
    fn test_unbounded_window_does_not_overflow() {
        let mut table = Coalescer::default();
        let t0 = Instant::now();

        assert!(table.admit(&update_all(), 1, 10, Duration::MAX, t0));
        assert!(!table.admit(&update_all(), 2, 10, WINDOW, t0 + Duration::from_secs(60)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_sweep_counts_expired() {
        let mut table = Coalescer::default();
        let t0 = Instant::now();
        table.admit(&update_all(), 1, 10, Duration::from_millis(10), t0);
        table.admit(&update_all(), 1, 11, Duration::from_millis(300), t0);

        assert_eq!(table.sweep(t0 + Duration::from_millis(50)), 1);
        assert_eq!(table.len(), 1);

        table.clear();
        assert!(table.is_empty());
    }
}
