//! Copy-on-write receiver registry.
//!
//! Layout is `condition → priority → key → [handle]`. Conditions and
//! priorities are kept sorted, keys keep registration order. A registry value
//! is never mutated: every registration or removal builds a new one and swaps
//! it in under the [`SharedRegistry`] lock, so the dispatch thread always
//! reads a complete snapshot.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::handle::EventHandle;
use super::signal::{EventCondition, EventConditionPriority, Signal};
use super::value::SubscriberKey;

const PRIORITY_ORDER: [EventConditionPriority; 3] = [
    EventConditionPriority::High,
    EventConditionPriority::Middle,
    EventConditionPriority::Low,
];

type KeyedHandles = Vec<(SubscriberKey, Vec<Arc<EventHandle>>)>;

/// Immutable snapshot of every registration
#[derive(Debug, Clone, Default)]
pub struct Registry {
    conditions: BTreeMap<EventCondition, BTreeMap<EventConditionPriority, KeyedHandles>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// New registry with `handle` appended under `condition → priority → key`
    pub fn with_handle(
        &self,
        condition: EventCondition,
        priority: EventConditionPriority,
        key: &SubscriberKey,
        handle: Arc<EventHandle>,
    ) -> Registry {
        let mut next = self.clone();
        let keyed = next
            .conditions
            .entry(condition)
            .or_default()
            .entry(priority)
            .or_default();

        match keyed.iter_mut().find(|(k, _)| k == key) {
            Some((_, handles)) => handles.push(handle),
            None => keyed.push((key.clone(), vec![handle])),
        }
        next
    }

    /// New registry without any handle registered under `key`
    ///
    /// Branches left empty are pruned.
    pub fn without_key(&self, key: &SubscriberKey) -> Registry {
        let mut conditions = BTreeMap::new();
        for (condition, priorities) in &self.conditions {
            let mut kept = BTreeMap::new();
            for (priority, keyed) in priorities {
                let remaining: KeyedHandles =
                    keyed.iter().filter(|(k, _)| k != key).cloned().collect();
                if !remaining.is_empty() {
                    kept.insert(*priority, remaining);
                }
            }
            if !kept.is_empty() {
                conditions.insert(*condition, kept);
            }
        }
        Registry { conditions }
    }

    /// Handles a message with `signal` is delivered to, in delivery order
    ///
    /// Priorities come first; within a priority, exact-signal receivers precede
    /// category receivers, and keys keep registration order.
    pub fn candidates(&self, signal: Signal) -> Vec<(SubscriberKey, Arc<EventHandle>)> {
        let branches: Vec<_> = EventCondition::lookup_keys(signal)
            .iter()
            .filter_map(|condition| self.conditions.get(condition))
            .collect();

        let mut found = Vec::new();
        for priority in PRIORITY_ORDER {
            for branch in &branches {
                let Some(keyed) = branch.get(&priority) else {
                    continue;
                };
                for (key, handles) in keyed {
                    found.extend(handles.iter().map(|h| (key.clone(), Arc::clone(h))));
                }
            }
        }
        found
    }

    /// Total number of registered handles
    pub fn len(&self) -> usize {
        self.conditions
            .values()
            .flat_map(|p| p.values())
            .flat_map(|keyed| keyed.iter())
            .map(|(_, handles)| handles.len())
            .sum()
    }

    /// Check if no handle is registered
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of handles registered under `key`
    pub fn count_for(&self, key: &SubscriberKey) -> usize {
        self.conditions
            .values()
            .flat_map(|p| p.values())
            .flat_map(|keyed| keyed.iter())
            .filter(|(k, _)| k == key)
            .map(|(_, handles)| handles.len())
            .sum()
    }

    /// Conditions that have at least one handle
    pub fn conditions(&self) -> impl Iterator<Item = &EventCondition> {
        self.conditions.keys()
    }
}

/// Lock-protected reference to the current registry snapshot
#[derive(Debug, Default)]
pub struct SharedRegistry {
    current: Mutex<Arc<Registry>>,
}

impl SharedRegistry {
    /// Create an empty shared registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot; stays valid while newer ones are swapped in
    pub fn snapshot(&self) -> Arc<Registry> {
        Arc::clone(&self.current.lock())
    }

    /// Rebuild the registry with `f` and swap the result in
    ///
    /// The lock is held across the rebuild so concurrent updates are never lost.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&Registry) -> Registry,
    {
        let mut current = self.current.lock();
        let next = f(&current);
        *current = Arc::new(next);
    }

    /// Replace the registry with an empty one
    pub fn clear(&self) {
        *self.current.lock() = Arc::new(Registry::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::message::Origin;
    use crate::event_bus::signal::SignalCategory;
    use std::time::Duration;

    fn handle(name: &str) -> Arc<EventHandle> {
        Arc::new(EventHandle::new(
            Arc::new(|_| {}),
            Duration::from_millis(100),
            Some(name.into()),
            Origin::caller(),
        ))
    }

    fn names(found: &[(SubscriberKey, Arc<EventHandle>)]) -> Vec<String> {
        found.iter().map(|(_, h)| h.describe()).collect()
    }

    #[test]
    fn test_with_handle_leaves_original_untouched() {
        let empty = Registry::new();
        let one = empty.with_handle(
            Signal::UpdateAll.into(),
            EventConditionPriority::Middle,
            &"tree".into(),
            handle("a"),
        );
        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn test_candidates_follow_priority_then_registration() {
        let registry = Registry::new()
            .with_handle(
                Signal::AreaChanged.into(),
                EventConditionPriority::Low,
                &"status".into(),
                handle("low"),
            )
            .with_handle(
                Signal::AreaChanged.into(),
                EventConditionPriority::Middle,
                &"tree".into(),
                handle("tree-1"),
            )
            .with_handle(
                Signal::AreaChanged.into(),
                EventConditionPriority::Middle,
                &"props".into(),
                handle("props"),
            )
            .with_handle(
                Signal::AreaChanged.into(),
                EventConditionPriority::Middle,
                &"tree".into(),
                handle("tree-2"),
            )
            .with_handle(
                Signal::AreaChanged.into(),
                EventConditionPriority::High,
                &"model".into(),
                handle("high"),
            );

        assert_eq!(
            names(&registry.candidates(Signal::AreaChanged)),
            vec!["high", "tree-1", "tree-2", "props", "low"]
        );
    }

    #[test]
    fn test_category_receivers_after_exact_within_priority() {
        let registry = Registry::new()
            .with_handle(
                SignalCategory::Area.into(),
                EventConditionPriority::Middle,
                &"log".into(),
                handle("category"),
            )
            .with_handle(
                Signal::AreaAdded.into(),
                EventConditionPriority::Middle,
                &"tree".into(),
                handle("exact"),
            );

        assert_eq!(
            names(&registry.candidates(Signal::AreaAdded)),
            vec!["exact", "category"]
        );
        assert_eq!(names(&registry.candidates(Signal::AreaRemoved)), vec!["category"]);
        assert!(registry.candidates(Signal::SlotChanged).is_empty());
    }

    #[test]
    fn test_without_key_prunes_everywhere() {
        let registry = Registry::new()
            .with_handle(
                Signal::UpdateAll.into(),
                EventConditionPriority::High,
                &"tree".into(),
                handle("a"),
            )
            .with_handle(
                SignalCategory::Slot.into(),
                EventConditionPriority::Low,
                &"tree".into(),
                handle("b"),
            )
            .with_handle(
                Signal::UpdateAll.into(),
                EventConditionPriority::High,
                &"props".into(),
                handle("c"),
            );
        assert_eq!(registry.count_for(&"tree".into()), 2);

        let pruned = registry.without_key(&"tree".into());
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned.count_for(&"tree".into()), 0);
        assert_eq!(
            pruned.conditions().collect::<Vec<_>>(),
            vec![&EventCondition::Signal(Signal::UpdateAll)]
        );
    }

    #[test]
    fn test_shared_snapshot_survives_update() {
        let shared = SharedRegistry::new();
        let before = shared.snapshot();
        shared.update(|r| {
            r.with_handle(
                Signal::UpdateAll.into(),
                EventConditionPriority::Middle,
                &"tree".into(),
                handle("a"),
            )
        });

        assert!(before.is_empty());
        assert_eq!(shared.snapshot().len(), 1);

        shared.clear();
        assert!(shared.snapshot().is_empty());
    }
}
