//! Signal vocabulary and subscription conditions.
//!
//! A [`Signal`] names one kind of event occurrence. Signals are grouped into
//! [`SignalCategory`] values so that a subscriber can listen to a whole family
//! at once through an [`EventCondition`].

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Category a signal belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    /// Application-wide refreshes and status.
    Global,
    /// Area tree structure and content.
    Area,
    /// Slots placed inside areas.
    Slot,
    /// Resources referenced by areas.
    Resource,
    /// Selection and caret movement.
    Selection,
    /// Bus control traffic, never delivered to subscribers.
    Control,
}

impl std::fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalCategory::Global => write!(f, "Global"),
            SignalCategory::Area => write!(f, "Area"),
            SignalCategory::Slot => write!(f, "Slot"),
            SignalCategory::Resource => write!(f, "Resource"),
            SignalCategory::Selection => write!(f, "Selection"),
            SignalCategory::Control => write!(f, "Control"),
        }
    }
}

/// Kind of an event occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Refresh every view.
    UpdateAll,
    /// Show a transient status line text.
    ShowStatusText,
    /// Request a repaint of visible panels.
    RepaintRequested,
    /// Reload the area tree.
    UpdateAreas,
    /// An area's properties changed.
    AreaChanged,
    /// An area was added to the tree.
    AreaAdded,
    /// An area was removed from the tree.
    AreaRemoved,
    /// A slot value changed.
    SlotChanged,
    /// Reload the slot list of the current area.
    UpdateSlots,
    /// A resource was modified.
    ResourceChanged,
    /// A resource finished loading.
    ResourceLoaded,
    /// Select an area in every view showing it.
    SelectArea,
    /// Select a slot in every view showing it.
    SelectSlot,
    /// The text caret moved inside an editor.
    CaretMoved,
    /// Run a deferred closure on the UI thread.
    InvokeLater,
    /// Enable the signal carried as the message target.
    EnableTargetSignal,
}

impl Signal {
    /// Number of signals.
    pub const COUNT: usize = 16;

    /// Every signal, in declaration order.
    pub const ALL: [Signal; Signal::COUNT] = [
        Signal::UpdateAll,
        Signal::ShowStatusText,
        Signal::RepaintRequested,
        Signal::UpdateAreas,
        Signal::AreaChanged,
        Signal::AreaAdded,
        Signal::AreaRemoved,
        Signal::SlotChanged,
        Signal::UpdateSlots,
        Signal::ResourceChanged,
        Signal::ResourceLoaded,
        Signal::SelectArea,
        Signal::SelectSlot,
        Signal::CaretMoved,
        Signal::InvokeLater,
        Signal::EnableTargetSignal,
    ];

    /// Position of this signal in [`Signal::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Get the category of this signal
    pub fn category(self) -> SignalCategory {
        match self {
            Signal::UpdateAll | Signal::ShowStatusText | Signal::RepaintRequested => {
                SignalCategory::Global
            }
            Signal::UpdateAreas | Signal::AreaChanged | Signal::AreaAdded | Signal::AreaRemoved => {
                SignalCategory::Area
            }
            Signal::SlotChanged | Signal::UpdateSlots => SignalCategory::Slot,
            Signal::ResourceChanged | Signal::ResourceLoaded => SignalCategory::Resource,
            Signal::SelectArea | Signal::SelectSlot | Signal::CaretMoved => {
                SignalCategory::Selection
            }
            Signal::InvokeLater | Signal::EnableTargetSignal => SignalCategory::Control,
        }
    }

    /// Special signals bypass the registry and are handled by the bus itself
    pub fn is_special(self) -> bool {
        matches!(self, Signal::InvokeLater | Signal::EnableTargetSignal)
    }

    /// High-frequency signals that the debug suppression switch may silence
    pub fn is_unnecessary(self) -> bool {
        matches!(
            self,
            Signal::ShowStatusText | Signal::RepaintRequested | Signal::CaretMoved
        )
    }

    /// Stable snake_case name used in logs
    pub fn name(self) -> &'static str {
        match self {
            Signal::UpdateAll => "update_all",
            Signal::ShowStatusText => "show_status_text",
            Signal::RepaintRequested => "repaint_requested",
            Signal::UpdateAreas => "update_areas",
            Signal::AreaChanged => "area_changed",
            Signal::AreaAdded => "area_added",
            Signal::AreaRemoved => "area_removed",
            Signal::SlotChanged => "slot_changed",
            Signal::UpdateSlots => "update_slots",
            Signal::ResourceChanged => "resource_changed",
            Signal::ResourceLoaded => "resource_loaded",
            Signal::SelectArea => "select_area",
            Signal::SelectSlot => "select_slot",
            Signal::CaretMoved => "caret_moved",
            Signal::InvokeLater => "invoke_later",
            Signal::EnableTargetSignal => "enable_target_signal",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Delivery tier of a subscription; `High` handles run first
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EventConditionPriority {
    /// Invoked before every other tier.
    High,
    /// The usual tier for single-signal subscriptions.
    #[default]
    Middle,
    /// Invoked after every other tier.
    Low,
}

impl std::fmt::Display for EventConditionPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventConditionPriority::High => write!(f, "high"),
            EventConditionPriority::Middle => write!(f, "middle"),
            EventConditionPriority::Low => write!(f, "low"),
        }
    }
}

/// Subscription filter: one signal or a whole category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventCondition {
    /// Match exactly this signal.
    Signal(Signal),
    /// Match every signal of this category.
    Category(SignalCategory),
}

impl EventCondition {
    /// Check if a signal satisfies this condition
    pub fn matches(&self, signal: Signal) -> bool {
        match self {
            EventCondition::Signal(s) => *s == signal,
            EventCondition::Category(c) => *c == signal.category(),
        }
    }

    /// Tier used when the subscriber does not pick one
    ///
    /// Category listeners are broad observers and run after the subscribers
    /// that asked for the exact signal.
    pub fn default_priority(&self) -> EventConditionPriority {
        match self {
            EventCondition::Signal(_) => EventConditionPriority::Middle,
            EventCondition::Category(_) => EventConditionPriority::Low,
        }
    }

    /// Conditions that a message carrying `signal` is looked up under
    pub fn lookup_keys(signal: Signal) -> [EventCondition; 2] {
        [
            EventCondition::Signal(signal),
            EventCondition::Category(signal.category()),
        ]
    }
}

impl From<Signal> for EventCondition {
    fn from(signal: Signal) -> Self {
        EventCondition::Signal(signal)
    }
}

impl From<SignalCategory> for EventCondition {
    fn from(category: SignalCategory) -> Self {
        EventCondition::Category(category)
    }
}

impl std::fmt::Display for EventCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCondition::Signal(s) => write!(f, "{}", s),
            EventCondition::Category(c) => write!(f, "category:{}", c),
        }
    }
}

/// Enabled flags for every signal, owned by one bus instance
pub struct SignalStates {
    enabled: [AtomicBool; Signal::COUNT],
}

impl SignalStates {
    /// Create the table with every signal enabled except `disabled`
    pub fn new(disabled: &[Signal]) -> Self {
        let states = Self {
            enabled: std::array::from_fn(|_| AtomicBool::new(true)),
        };
        for signal in disabled {
            states.disable(*signal);
        }
        states
    }

    /// Check whether a signal may currently be published
    pub fn is_enabled(&self, signal: Signal) -> bool {
        self.enabled[signal.index()].load(Ordering::Acquire)
    }

    /// Allow a signal to be published again
    pub fn enable(&self, signal: Signal) {
        self.enabled[signal.index()].store(true, Ordering::Release);
    }

    /// Drop every future publication of a signal
    pub fn disable(&self, signal: Signal) {
        self.enabled[signal.index()].store(false, Ordering::Release);
    }

    /// Signals that are currently disabled
    pub fn disabled(&self) -> Vec<Signal> {
        Signal::ALL
            .iter()
            .copied()
            .filter(|s| !self.is_enabled(*s))
            .collect()
    }
}

impl Default for SignalStates {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl std::fmt::Debug for SignalStates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalStates")
            .field("disabled", &self.disabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_index_matches_all() {
        for (i, signal) in Signal::ALL.iter().enumerate() {
            assert_eq!(signal.index(), i, "{} out of place", signal);
        }
    }

    #[test]
    fn test_special_signals_are_control() {
        for signal in Signal::ALL {
            assert_eq!(
                signal.is_special(),
                signal.category() == SignalCategory::Control
            );
        }
    }

    #[test]
    fn test_condition_matches() {
        let exact = EventCondition::from(Signal::AreaChanged);
        assert!(exact.matches(Signal::AreaChanged));
        assert!(!exact.matches(Signal::AreaAdded));

        let family = EventCondition::from(SignalCategory::Area);
        assert!(family.matches(Signal::AreaChanged));
        assert!(family.matches(Signal::UpdateAreas));
        assert!(!family.matches(Signal::SlotChanged));
    }

    #[test]
    fn test_priority_order() {
        assert!(EventConditionPriority::High < EventConditionPriority::Middle);
        assert!(EventConditionPriority::Middle < EventConditionPriority::Low);
        assert_eq!(
            EventConditionPriority::default(),
            EventConditionPriority::Middle
        );
    }

    #[test]
    fn test_signal_states() {
        let states = SignalStates::new(&[Signal::CaretMoved]);
        assert!(!states.is_enabled(Signal::CaretMoved));
        assert!(states.is_enabled(Signal::UpdateAll));

        states.disable(Signal::UpdateAll);
        assert_eq!(states.disabled(), vec![Signal::UpdateAll, Signal::CaretMoved]);

        states.enable(Signal::CaretMoved);
        states.enable(Signal::UpdateAll);
        assert!(states.disabled().is_empty());
    }

    #[test]
    fn test_signal_serde_names() {
        let json = serde_json::to_string(&Signal::AreaChanged).unwrap();
        assert_eq!(json, "\"area_changed\"");
        let back: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Signal::AreaChanged);
    }
}
