use std::sync::Arc;

use super::RateParameters;
use crate::indicator::IndicatorMatrix;

/// Row-major `N × N` backward migration rates. Cloning shares the storage.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MigrationMatrix {
    size: usize,
    rates: Arc<[f64]>,
}

impl MigrationMatrix {
    /// Number of subjects.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Rate between subjects `i` and `j`; zero on the diagonal.
    ///
    /// # Panics
    ///
    /// Panics if `i` or `j` is not below [`size`](Self::size).
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rates[i * self.size + j]
    }

    /// Rates of row `i`. Panics if `i` is not below [`size`](Self::size).
    pub fn row(&self, i: usize) -> &[f64] {
        &self.rates[i * self.size..(i + 1) * self.size]
    }

    /// Flat row-major view.
    pub fn as_slice(&self) -> &[f64] {
        &self.rates
    }
}

/// Log-linear backward migration for one epoch:
/// `scalar * exp(Σ_v effect_v * indicator_v[i][j])`.
///
/// `matrices` holds the epoch's indicator matrix for each variable, in the
/// same order as `parameters.effect_sizes`.
pub fn log_linear_migration(
    matrices: &[IndicatorMatrix],
    size: usize,
    parameters: &RateParameters,
) -> MigrationMatrix {
    let mut rates = vec![0.0; size * size];

    for i in 1..size {
        for j in 0..i {
            let log_factor: f64 = matrices
                .iter()
                .zip(&parameters.effect_sizes)
                .filter(|(matrix, _)| matrix.get(i, j))
                .map(|(_, effect)| effect)
                .sum();
            let rate = match parameters.migration_rate_scalar {
                scalar if scalar == 0.0 => 0.0,
                scalar => scalar * log_factor.exp(),
            };
            rates[i * size + j] = rate;
            rates[j * size + i] = rate;
        }
    }

    MigrationMatrix {
        size,
        rates: rates.into(),
    }
}
