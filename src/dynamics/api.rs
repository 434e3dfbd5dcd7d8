use std::sync::Arc;

use crate::rates::MigrationMatrix;
use crate::DynamicsError;

/// Piecewise-constant population structure as seen by a structured
/// coalescent likelihood.
///
/// Epochs are indexed in ascending backward time: epoch 0 starts at the final
/// sample. Every per-epoch query rejects indices outside
/// `[0, epoch_count)` with [`DynamicsError::OutOfRange`].
pub trait Dynamics: Send + Sync {
    /// Number of epochs.
    fn epoch_count(&self) -> usize;

    /// Duration of an epoch in days.
    fn interval_width(&self, epoch: usize) -> Result<f64, DynamicsError>;

    /// Per-subject coalescent rates of an epoch.
    fn coalescent_rate(&self, epoch: usize) -> Result<Arc<[f64]>, DynamicsError>;

    /// Backward migration rates between subjects during an epoch.
    fn backward_migration(&self, epoch: usize) -> Result<MigrationMatrix, DynamicsError>;

    /// Durations of all epochs in order.
    fn interval_widths(&self) -> Vec<f64> {
        (0..self.epoch_count())
            .filter_map(|epoch| self.interval_width(epoch).ok())
            .collect()
    }
}
