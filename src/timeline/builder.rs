use std::sync::Arc;

use tracing::debug;

use super::table::{EpochTable, ValueId, ValuePool};
use super::StateUniverse;
use crate::events::{normalized_order, ChangeKind, Event};
use crate::DynamicsError;

/// Builds an [`EpochTable`] from state change events by carry-forward.
#[derive(Debug, Clone)]
pub struct EpochTableBuilder {
    universe: Arc<StateUniverse>,
}

impl EpochTableBuilder {
    /// Builder over a fixed subject/variable universe.
    pub fn new(universe: Arc<StateUniverse>) -> Self {
        Self { universe }
    }

    /// Universe the table will be indexed by.
    pub fn universe(&self) -> &Arc<StateUniverse> {
        &self.universe
    }

    /// Build the table.
    ///
    /// Events may arrive in any order; they are visited in normalized order
    /// (descending time, deactivations first at equal times). Every event is
    /// validated before any epoch is written.
    ///
    /// Each distinct time closes one epoch. The running snapshot is never
    /// reset, so slots untouched at a time carry their value from the more
    /// distant past. Since the epoch count is known up front, each epoch is
    /// written straight into its ascending slot, last slot first.
    pub fn build(&self, events: &[Event]) -> Result<EpochTable, DynamicsError> {
        let mut resolved = Vec::with_capacity(events.len());
        for event in events {
            if !event.time.is_finite() || event.time < 0.0 {
                return Err(DynamicsError::InvalidEventTime {
                    subject: event.subject.to_string(),
                    time: event.time,
                });
            }
            let (subject, variable) = self.universe.resolve(event)?;
            resolved.push((event, subject, variable));
        }
        resolved.sort_by(|a, b| normalized_order(a.0, b.0));

        let epoch_count = if resolved.is_empty() {
            0
        } else {
            1 + resolved
                .windows(2)
                .filter(|pair| pair[0].0.time != pair[1].0.time)
                .count()
        };

        let variable_count = self.universe.variable_count();
        let width = self.universe.subject_count() * variable_count;
        let mut times = vec![0.0; epoch_count];
        let mut slots: Vec<Option<ValueId>> = vec![None; epoch_count * width];
        let mut current: Vec<Option<ValueId>> = vec![None; width];
        let mut values = ValuePool::default();
        let mut next_slot = epoch_count;

        let mut pending = resolved.iter().peekable();
        while let Some(&(event, subject, variable)) = pending.next() {
            current[subject * variable_count + variable] = match event.kind {
                ChangeKind::Activate => event.value.as_ref().map(|value| values.intern(value)),
                ChangeKind::Deactivate => None,
            };

            let closes_epoch = pending
                .peek()
                .map_or(true, |next| next.0.time != event.time);
            if closes_epoch {
                next_slot -= 1;
                times[next_slot] = event.time;
                slots[next_slot * width..(next_slot + 1) * width].copy_from_slice(&current);
            }
        }

        debug!(
            epochs = epoch_count,
            events = resolved.len(),
            values = values.len(),
            "built epoch table"
        );

        Ok(EpochTable::from_parts(
            Arc::clone(&self.universe),
            times,
            slots,
            values,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(subjects: &[&str], variables: &[&str]) -> EpochTableBuilder {
        EpochTableBuilder::new(Arc::new(
            StateUniverse::declared(subjects.iter().copied(), variables.iter().copied()).unwrap(),
        ))
    }

    #[test]
    fn test_epoch_per_distinct_time() {
        let events = vec![
            Event::activate("A", "Ward", "W1", 5.0),
            Event::activate("B", "Ward", "W1", 5.0),
            Event::deactivate("A", "Ward", 2.0),
        ];
        let table = builder(&["A", "B"], &["Ward"]).build(&events).unwrap();

        assert_eq!(table.epoch_count(), 2);
        assert_eq!(table.epoch_times(), &[2.0, 5.0]);
    }

    #[test]
    fn test_carry_forward_of_untouched_slots() {
        let events = vec![
            Event::activate("A", "Ward", "W1", 9.0),
            Event::activate("A", "Hospital", "H1", 9.0),
            Event::activate("B", "Ward", "W2", 4.0),
            Event::deactivate("A", "Ward", 1.0),
        ];
        let table = builder(&["A", "B"], &["Ward", "Hospital"])
            .build(&events)
            .unwrap();

        // Ascending: t=1, t=4, t=9
        let most_recent = table.snapshot(0).unwrap();
        assert_eq!(most_recent.value(0, 0), None);
        assert_eq!(most_recent.value(0, 1), Some("H1"));
        assert_eq!(most_recent.value(1, 0), Some("W2"));

        let middle = table.snapshot(1).unwrap();
        assert_eq!(middle.value(0, 0), Some("W1"));
        assert_eq!(middle.value(0, 1), Some("H1"));
        assert_eq!(middle.value(1, 0), Some("W2"));

        let oldest = table.snapshot(2).unwrap();
        assert_eq!(oldest.value(0, 0), Some("W1"));
        assert_eq!(oldest.value(1, 0), None);
    }

    #[test]
    fn test_activation_wins_over_simultaneous_deactivation() {
        let events = vec![
            Event::activate("A", "Ward", "X", 3.0),
            Event::deactivate("A", "Ward", 3.0),
        ];
        let table = builder(&["A"], &["Ward"]).build(&events).unwrap();

        assert_eq!(table.epoch_count(), 1);
        assert_eq!(table.snapshot(0).unwrap().value(0, 0), Some("X"));
    }

    #[test]
    fn test_equal_values_share_an_id() {
        let events = vec![
            Event::activate("A", "Ward", "W1", 3.0),
            Event::activate("B", "Ward", "W1", 2.0),
        ];
        let table = builder(&["A", "B"], &["Ward"]).build(&events).unwrap();

        let snapshot = table.snapshot(0).unwrap();
        assert!(snapshot.shares(0, 1, 0));
        assert_eq!(table.distinct_values(), 1);
    }

    #[test]
    fn test_invalid_time_rejected() {
        let err = builder(&["A"], &["Ward"])
            .build(&[Event::activate("A", "Ward", "W1", -1.0)])
            .unwrap_err();
        assert!(matches!(err, DynamicsError::InvalidEventTime { .. }));

        let err = builder(&["A"], &["Ward"])
            .build(&[Event::activate("A", "Ward", "W1", f64::NAN)])
            .unwrap_err();
        assert!(matches!(err, DynamicsError::InvalidEventTime { .. }));
    }

    #[test]
    fn test_empty_stream_gives_empty_table() {
        let table = builder(&["A"], &["Ward"]).build(&[]).unwrap();
        assert!(table.is_empty());
        assert!(matches!(
            table.snapshot(0),
            Err(DynamicsError::OutOfRange { epoch: 0, epoch_count: 0 })
        ));
    }

    #[test]
    fn test_interval_widths_and_epoch_lookup() {
        let events = vec![
            Event::activate("A", "Ward", "W1", 5.0),
            Event::activate("A", "Ward", "W2", 2.0),
            Event::deactivate("A", "Ward", 0.5),
        ];
        let table = builder(&["A"], &["Ward"]).build(&events).unwrap();

        assert_eq!(table.interval_widths(), vec![0.5, 1.5, 3.0]);
        assert_eq!(table.epoch_at(0.0), Some(0));
        assert_eq!(table.epoch_at(0.5), Some(1));
        assert_eq!(table.epoch_at(4.9), Some(2));
        assert_eq!(table.epoch_at(5.0), None);
        assert_eq!(table.epoch_at(-1.0), None);
    }
}
