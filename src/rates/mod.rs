//! Log-linear rate model
//!
//! Per epoch, backward migration between two subjects is
//! `scalar * exp(Σ_v effect_v * shared_v)` and every subject receives the
//! base coalescent rate. Rates depend on parameters only through this stage;
//! epoch tables and indicators are never rebuilt for a parameter change.

mod coalescent;
mod engine;
mod migration;

pub use coalescent::{CoalescentRateModel, UniformCoalescentRate};
pub use engine::RateEngine;
pub use migration::{log_linear_migration, MigrationMatrix};

use std::sync::Arc;

use crate::DynamicsError;

/// Parameters of the rate model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateParameters {
    /// Base coalescent rate shared by all subjects.
    pub coalescent_rate: f64,
    /// Migration rate between subjects sharing no state.
    pub migration_rate_scalar: f64,
    /// Log-rate contribution of each shared state variable, in variable order.
    pub effect_sizes: Vec<f64>,
}

impl RateParameters {
    /// Construct parameters.
    pub fn new(coalescent_rate: f64, migration_rate_scalar: f64, effect_sizes: Vec<f64>) -> Self {
        Self {
            coalescent_rate,
            migration_rate_scalar,
            effect_sizes,
        }
    }

    /// Unit rates with no state effects.
    pub fn neutral(variable_count: usize) -> Self {
        Self::new(1.0, 1.0, vec![0.0; variable_count])
    }

    /// Check shape and ranges against the number of state variables.
    pub fn validate(&self, variable_count: usize) -> Result<(), DynamicsError> {
        if self.effect_sizes.len() != variable_count {
            return Err(DynamicsError::EffectSizeMismatch {
                expected: variable_count,
                actual: self.effect_sizes.len(),
            });
        }
        check_rate("coalescent rate", self.coalescent_rate)?;
        check_rate("migration rate scalar", self.migration_rate_scalar)?;
        if let Some(effect) = self.effect_sizes.iter().find(|effect| !effect.is_finite()) {
            return Err(DynamicsError::InvalidParameter(format!(
                "effect size must be finite, got {effect}"
            )));
        }

        // Largest log rate any pair can reach: every positive effect shared.
        let max_log_factor: f64 = self.effect_sizes.iter().filter(|&&e| e > 0.0).sum();
        let max_log_rate = if self.migration_rate_scalar > 0.0 {
            self.migration_rate_scalar.ln() + max_log_factor
        } else {
            max_log_factor
        };
        if max_log_rate > f64::MAX.ln() {
            return Err(DynamicsError::InvalidParameter(format!(
                "migration rate overflows: scalar {} with shared effects summing to {max_log_factor}",
                self.migration_rate_scalar
            )));
        }
        Ok(())
    }
}

fn check_rate(name: &str, value: f64) -> Result<(), DynamicsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DynamicsError::InvalidParameter(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

/// Coalescent and migration rates of one epoch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RateSnapshot {
    coalescent: Arc<[f64]>,
    migration: MigrationMatrix,
}

impl RateSnapshot {
    /// Per-subject coalescent rates.
    pub fn coalescent(&self) -> &Arc<[f64]> {
        &self.coalescent
    }

    /// Backward migration matrix.
    pub fn migration(&self) -> &MigrationMatrix {
        &self.migration
    }
}

/// Rate snapshots for every epoch under one parameter generation.
#[derive(Debug)]
pub struct RateTable {
    generation: u64,
    parameters: Arc<RateParameters>,
    snapshots: Vec<RateSnapshot>,
}

impl RateTable {
    /// Parameter generation this table was computed for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Parameters this table was computed from.
    pub fn parameters(&self) -> &RateParameters {
        &self.parameters
    }

    /// Number of epochs.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the table has no epochs.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Snapshot of one epoch.
    pub fn snapshot(&self, epoch: usize) -> Result<&RateSnapshot, DynamicsError> {
        self.snapshots
            .get(epoch)
            .ok_or_else(|| DynamicsError::out_of_range(epoch, self.snapshots.len()))
    }

    /// All snapshots in epoch order.
    pub fn snapshots(&self) -> &[RateSnapshot] {
        &self.snapshots
    }
}
