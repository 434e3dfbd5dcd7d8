use std::collections::HashMap;
use std::sync::Arc;

use super::StateUniverse;
use crate::DynamicsError;

/// Interned state value. Two slots share a value iff their ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(u32);

impl ValueId {
    /// Position of the value in the table's value pool.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// String interner for state values.
#[derive(Debug, Clone, Default)]
pub(crate) struct ValuePool {
    values: Vec<Arc<str>>,
    index: HashMap<Arc<str>, ValueId>,
}

impl ValuePool {
    pub(crate) fn intern(&mut self, value: &Arc<str>) -> ValueId {
        if let Some(&id) = self.index.get(value) {
            return id;
        }
        let id = ValueId(self.values.len() as u32);
        self.values.push(Arc::clone(value));
        self.index.insert(Arc::clone(value), id);
        id
    }

    pub(crate) fn resolve(&self, id: ValueId) -> &str {
        &self.values[id.index()]
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }
}

/// Dense `[epoch][subject][variable]` table of state values in ascending
/// epoch-time order.
///
/// Epoch `k` covers backward times `[t_{k-1}, t_k)` (with `t_{-1} = 0`) and
/// holds the state established by every event at or beyond `t_k`.
#[derive(Debug, Clone)]
pub struct EpochTable {
    universe: Arc<StateUniverse>,
    times: Vec<f64>,
    slots: Vec<Option<ValueId>>,
    values: ValuePool,
}

impl EpochTable {
    pub(crate) fn from_parts(
        universe: Arc<StateUniverse>,
        times: Vec<f64>,
        slots: Vec<Option<ValueId>>,
        values: ValuePool,
    ) -> Self {
        debug_assert_eq!(
            slots.len(),
            times.len() * universe.subject_count() * universe.variable_count()
        );
        Self {
            universe,
            times,
            slots,
            values,
        }
    }

    /// Subject and variable axes.
    pub fn universe(&self) -> &Arc<StateUniverse> {
        &self.universe
    }

    /// Number of epochs (distinct event times).
    pub fn epoch_count(&self) -> usize {
        self.times.len()
    }

    /// Whether the table holds no epochs.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Epoch boundary times, ascending.
    pub fn epoch_times(&self) -> &[f64] {
        &self.times
    }

    /// Number of distinct state values across all slots.
    pub fn distinct_values(&self) -> usize {
        self.values.len()
    }

    /// Duration of each epoch: `t_0` for the first, `t_k - t_{k-1}` after.
    pub fn interval_widths(&self) -> Vec<f64> {
        let mut previous = 0.0;
        self.times
            .iter()
            .map(|&time| {
                let width = time - previous;
                previous = time;
                width
            })
            .collect()
    }

    /// Epoch whose interval contains backward time `time`.
    ///
    /// Returns `None` for negative times and for times at or beyond the last
    /// boundary, where no event has yet taken effect.
    pub fn epoch_at(&self, time: f64) -> Option<usize> {
        if time.is_nan() || time < 0.0 {
            return None;
        }
        let epoch = self.times.partition_point(|&boundary| boundary <= time);
        (epoch < self.times.len()).then_some(epoch)
    }

    /// Read-only view of one epoch's snapshot.
    pub fn snapshot(&self, epoch: usize) -> Result<Snapshot<'_>, DynamicsError> {
        if epoch >= self.times.len() {
            return Err(DynamicsError::out_of_range(epoch, self.times.len()));
        }
        let width = self.snapshot_width();
        let start = epoch * width;
        Ok(Snapshot {
            table: self,
            epoch,
            slots: &self.slots[start..start + width],
        })
    }

    /// Iterator over all snapshots in ascending time order.
    pub fn snapshots(&self) -> impl Iterator<Item = Snapshot<'_>> + '_ {
        let width = self.snapshot_width();
        (0..self.times.len()).map(move |epoch| Snapshot {
            table: self,
            epoch,
            slots: &self.slots[epoch * width..(epoch + 1) * width],
        })
    }

    /// Content digest over axes, boundaries and every slot value.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        for name in self.universe.subjects().iter().chain(self.universe.variables()) {
            hasher.update(name.as_bytes());
            hasher.update(&[0u8]);
        }
        for time in &self.times {
            hasher.update(&time.to_le_bytes());
        }
        for slot in &self.slots {
            match slot {
                Some(id) => {
                    hasher.update(&[1u8]);
                    hasher.update(self.values.resolve(*id).as_bytes());
                    hasher.update(&[0u8]);
                }
                None => {
                    hasher.update(&[2u8]);
                }
            }
        }
        hasher.finalize()
    }

    fn snapshot_width(&self) -> usize {
        self.universe.subject_count() * self.universe.variable_count()
    }
}

/// State of every (subject, variable) slot during one epoch.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    table: &'a EpochTable,
    epoch: usize,
    slots: &'a [Option<ValueId>],
}

impl<'a> Snapshot<'a> {
    /// Epoch index.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Backward time at which the epoch starts (`t_{k-1}`, or 0).
    pub fn start(&self) -> f64 {
        match self.epoch {
            0 => 0.0,
            k => self.table.times[k - 1],
        }
    }

    /// Backward time at which the epoch ends (its boundary `t_k`).
    pub fn end(&self) -> f64 {
        self.table.times[self.epoch]
    }

    /// Interned value of a slot, or `None` when absent.
    ///
    /// # Panics
    ///
    /// Panics if `subject` or `variable` lies outside the table's universe.
    pub fn value_id(&self, subject: usize, variable: usize) -> Option<ValueId> {
        self.slots[subject * self.table.universe.variable_count() + variable]
    }

    /// Value of a slot, or `None` when absent. Panics like
    /// [`value_id`](Self::value_id).
    pub fn value(&self, subject: usize, variable: usize) -> Option<&'a str> {
        let table: &'a EpochTable = self.table;
        self.value_id(subject, variable)
            .map(|id| table.values.resolve(id))
    }

    /// Whether two subjects hold the same present value for `variable`.
    pub fn shares(&self, first: usize, second: usize, variable: usize) -> bool {
        match (self.value_id(first, variable), self.value_id(second, variable)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
