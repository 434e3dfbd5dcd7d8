//! Pairwise shared-state indicators
//!
//! For every epoch and variable, a symmetric bit matrix marks the subject
//! pairs holding the same present value. Diagonal bits are never set.

use std::collections::HashMap;

use bitvec::prelude::*;

use crate::timeline::{EpochTable, ValueId};
use crate::DynamicsError;

/// Symmetric `N × N` bit matrix over subject pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorMatrix {
    size: usize,
    bits: BitVec,
}

impl IndicatorMatrix {
    /// All-false matrix over `size` subjects.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            bits: bitvec![0; size * size],
        }
    }

    /// Number of subjects.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether subjects `i` and `j` share a value.
    ///
    /// # Panics
    ///
    /// Panics if `i` or `j` is not below [`size`](Self::size).
    pub fn get(&self, i: usize, j: usize) -> bool {
        self.bits[i * self.size + j]
    }

    /// Mark a pair as sharing, in both halves.
    fn set_pair(&mut self, i: usize, j: usize) {
        self.bits.set(i * self.size + j, true);
        self.bits.set(j * self.size + i, true);
    }

    /// Sharing pairs `(i, j)` with `i > j`, in row-major order.
    pub fn shared_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let size = self.size;
        self.bits
            .iter_ones()
            .map(move |idx| (idx / size, idx % size))
            .filter(|&(i, j)| i > j)
    }

    /// Number of unordered sharing pairs.
    pub fn shared_pair_count(&self) -> usize {
        self.bits.count_ones() / 2
    }
}

/// Indicator matrices for every (epoch, variable), in the epoch table's
/// ascending time order.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    epoch_count: usize,
    variable_count: usize,
    subject_count: usize,
    matrices: Vec<IndicatorMatrix>,
}

impl IndicatorSet {
    /// Build indicators from an epoch table.
    ///
    /// Subjects are grouped by interned value, so only subjects holding a
    /// value are visited and only sharing pairs are written.
    pub fn build(table: &EpochTable) -> Self {
        let universe = table.universe();
        let subject_count = universe.subject_count();
        let variable_count = universe.variable_count();
        let mut matrices = Vec::with_capacity(table.epoch_count() * variable_count);
        let mut groups: HashMap<ValueId, Vec<usize>> = HashMap::new();

        for snapshot in table.snapshots() {
            for variable in 0..variable_count {
                groups.clear();
                for subject in 0..subject_count {
                    if let Some(id) = snapshot.value_id(subject, variable) {
                        groups.entry(id).or_default().push(subject);
                    }
                }

                let mut matrix = IndicatorMatrix::new(subject_count);
                for members in groups.values().filter(|members| members.len() > 1) {
                    for (pos, &i) in members.iter().enumerate() {
                        for &j in &members[..pos] {
                            matrix.set_pair(i, j);
                        }
                    }
                }
                matrices.push(matrix);
            }
        }

        Self {
            epoch_count: table.epoch_count(),
            variable_count,
            subject_count,
            matrices,
        }
    }

    /// Number of epochs covered.
    pub fn epoch_count(&self) -> usize {
        self.epoch_count
    }

    /// Number of state variables.
    pub fn variable_count(&self) -> usize {
        self.variable_count
    }

    /// Number of subjects (matrix size).
    pub fn subject_count(&self) -> usize {
        self.subject_count
    }

    /// Matrix for one epoch and variable.
    pub fn matrix(&self, epoch: usize, variable: usize) -> Result<&IndicatorMatrix, DynamicsError> {
        if epoch >= self.epoch_count {
            return Err(DynamicsError::out_of_range(epoch, self.epoch_count));
        }
        if variable >= self.variable_count {
            return Err(DynamicsError::VariableOutOfRange {
                variable,
                variable_count: self.variable_count,
            });
        }
        Ok(&self.matrices[epoch * self.variable_count + variable])
    }

    /// All variable matrices of one epoch, in variable order.
    pub fn epoch_matrices(&self, epoch: usize) -> Result<&[IndicatorMatrix], DynamicsError> {
        if epoch >= self.epoch_count {
            return Err(DynamicsError::out_of_range(epoch, self.epoch_count));
        }
        let start = epoch * self.variable_count;
        Ok(&self.matrices[start..start + self.variable_count])
    }

    /// Variable matrices of every epoch, in epoch order.
    pub fn epochs(&self) -> impl ExactSizeIterator<Item = &[IndicatorMatrix]> + '_ {
        let variable_count = self.variable_count;
        (0..self.epoch_count).map(move |epoch| {
            let start = epoch * variable_count;
            &self.matrices[start..start + variable_count]
        })
    }
}
