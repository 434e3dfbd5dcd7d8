//! Patient state change events
//!
//! An event switches one (subject, variable) slot on or off at a time
//! measured in days before the final sample. Larger times lie further in the
//! past, so the normalized order visits the most distant past first.

mod normalize;

pub use normalize::{DateConfig, EventNormalizer, RawEvent, DEFAULT_DATE_FORMAT};

use std::cmp::Ordering;
use std::sync::Arc;

/// Direction of a state change.
///
/// Variant order is the tie-break order for simultaneous events:
/// deactivations apply before activations at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeKind {
    /// Subject leaves the state; the slot becomes absent.
    Deactivate,
    /// Subject enters the state with the event's value.
    Activate,
}

/// Normalized state change for a single subject and variable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Event {
    /// Patient identifier.
    pub subject: Arc<str>,
    /// State variable name (e.g. `Ward`).
    pub variable: Arc<str>,
    /// Value taken on activation; ignored for deactivations.
    pub value: Option<Arc<str>>,
    /// Days before the final sample.
    pub time: f64,
    /// Whether the slot is switched on or off.
    pub kind: ChangeKind,
}

impl Event {
    /// Construct an event from its parts.
    pub fn new(
        subject: impl Into<Arc<str>>,
        variable: impl Into<Arc<str>>,
        value: Option<Arc<str>>,
        time: f64,
        kind: ChangeKind,
    ) -> Self {
        Self {
            subject: subject.into(),
            variable: variable.into(),
            value,
            time,
            kind,
        }
    }

    /// Subject takes `value` for `variable` from `time` onward.
    pub fn activate(
        subject: impl Into<Arc<str>>,
        variable: impl Into<Arc<str>>,
        value: impl Into<Arc<str>>,
        time: f64,
    ) -> Self {
        Self::new(subject, variable, Some(value.into()), time, ChangeKind::Activate)
    }

    /// Subject no longer holds any value for `variable` from `time` onward.
    pub fn deactivate(
        subject: impl Into<Arc<str>>,
        variable: impl Into<Arc<str>>,
        time: f64,
    ) -> Self {
        Self::new(subject, variable, None, time, ChangeKind::Deactivate)
    }

    /// Value this event writes into its slot.
    pub fn applied_value(&self) -> Option<&Arc<str>> {
        match self.kind {
            ChangeKind::Activate => self.value.as_ref(),
            ChangeKind::Deactivate => None,
        }
    }
}

/// Comparator for the normalized event order: descending time, then
/// deactivations before activations.
///
/// Times must already be validated as finite; incomparable values are
/// treated as equal.
pub fn normalized_order(a: &Event, b: &Event) -> Ordering {
    b.time
        .partial_cmp(&a.time)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.kind.cmp(&b.kind))
}

/// Sort events into normalized order. The sort is stable, so events that
/// tie on time and kind keep their input order.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(normalized_order);
}
