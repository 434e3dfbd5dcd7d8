use std::fmt::Debug;
use std::sync::Arc;

/// Maps the scalar base coalescent rate to per-subject rates for one epoch.
pub trait CoalescentRateModel: Debug + Send + Sync {
    /// Per-subject coalescent rates, length `subject_count`.
    fn rates(&self, base_rate: f64, epoch: usize, subject_count: usize) -> Arc<[f64]>;
}

/// Same base rate for every subject in every epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformCoalescentRate;

impl CoalescentRateModel for UniformCoalescentRate {
    fn rates(&self, base_rate: f64, _epoch: usize, subject_count: usize) -> Arc<[f64]> {
        vec![base_rate; subject_count].into()
    }
}
