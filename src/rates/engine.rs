use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::coalescent::{CoalescentRateModel, UniformCoalescentRate};
use super::migration::log_linear_migration;
use super::{RateParameters, RateSnapshot, RateTable};
use crate::indicator::IndicatorSet;
use crate::DynamicsError;

#[derive(Debug)]
struct RateCache {
    parameters: Arc<RateParameters>,
    generation: u64,
    table: Option<Arc<RateTable>>,
}

/// Turns indicator matrices and rate parameters into per-epoch rate
/// snapshots.
///
/// Indicators and interval widths are fixed at construction. Parameter
/// changes bump a generation counter and drop the memoized table; the next
/// read rebuilds it for every epoch. Readers always receive a complete table
/// of a single generation.
#[derive(Debug)]
pub struct RateEngine {
    indicators: Arc<IndicatorSet>,
    widths: Arc<[f64]>,
    model: Arc<dyn CoalescentRateModel>,
    cache: RwLock<RateCache>,
}

impl RateEngine {
    /// Create an engine with the uniform coalescent model.
    ///
    /// `widths` must hold one interval width per epoch of `indicators`.
    pub fn new(
        indicators: Arc<IndicatorSet>,
        widths: impl Into<Arc<[f64]>>,
        parameters: RateParameters,
    ) -> Result<Self, DynamicsError> {
        let widths = widths.into();
        if widths.len() != indicators.epoch_count() {
            return Err(DynamicsError::InvalidParameter(format!(
                "{} interval widths for {} epochs",
                widths.len(),
                indicators.epoch_count()
            )));
        }
        parameters.validate(indicators.variable_count())?;

        Ok(Self {
            indicators,
            widths,
            model: Arc::new(UniformCoalescentRate),
            cache: RwLock::new(RateCache {
                parameters: Arc::new(parameters),
                generation: 0,
                table: None,
            }),
        })
    }

    /// Replace the coalescent rate model. Any memoized table is dropped.
    pub fn with_model(mut self, model: Arc<dyn CoalescentRateModel>) -> Self {
        self.model = model;
        self.cache.get_mut().table = None;
        self
    }

    /// Number of epochs.
    pub fn epoch_count(&self) -> usize {
        self.widths.len()
    }

    /// Duration of one epoch.
    pub fn interval_width(&self, epoch: usize) -> Result<f64, DynamicsError> {
        self.widths
            .get(epoch)
            .copied()
            .ok_or_else(|| DynamicsError::out_of_range(epoch, self.widths.len()))
    }

    /// Durations of all epochs, aligned with the rate snapshots.
    pub fn interval_widths(&self) -> &[f64] {
        &self.widths
    }

    /// Indicator matrices the rates are derived from.
    pub fn indicators(&self) -> &Arc<IndicatorSet> {
        &self.indicators
    }

    /// Parameters of the current generation.
    pub fn parameters(&self) -> Arc<RateParameters> {
        Arc::clone(&self.cache.read().parameters)
    }

    /// Current parameter generation; increases on every change.
    pub fn generation(&self) -> u64 {
        self.cache.read().generation
    }

    /// Install new parameters. The rate table is rebuilt on next access.
    pub fn set_parameters(&self, parameters: RateParameters) -> Result<(), DynamicsError> {
        parameters.validate(self.indicators.variable_count())?;
        let mut cache = self.cache.write();
        cache.parameters = Arc::new(parameters);
        cache.generation += 1;
        cache.table = None;
        Ok(())
    }

    /// Drop the memoized table without changing parameters.
    pub fn invalidate(&self) {
        self.cache.write().table = None;
    }

    /// Whether a table for the current generation is memoized.
    pub fn is_cached(&self) -> bool {
        self.cache.read().table.is_some()
    }

    /// Rate table for the current parameters, computing it if needed.
    ///
    /// Computation runs outside the lock. If parameters change meanwhile,
    /// the finished table is still returned to this caller but not stored.
    pub fn rates(&self) -> Arc<RateTable> {
        let (parameters, generation) = {
            let cache = self.cache.read();
            if let Some(table) = &cache.table {
                return Arc::clone(table);
            }
            (Arc::clone(&cache.parameters), cache.generation)
        };

        let table = Arc::new(self.compute(parameters, generation));

        let mut cache = self.cache.write();
        if cache.generation == generation {
            if let Some(existing) = &cache.table {
                return Arc::clone(existing);
            }
            cache.table = Some(Arc::clone(&table));
        }
        table
    }

    /// Snapshot of one epoch for the current parameters.
    pub fn snapshot(&self, epoch: usize) -> Result<RateSnapshot, DynamicsError> {
        self.rates().snapshot(epoch).cloned()
    }

    fn compute(&self, parameters: Arc<RateParameters>, generation: u64) -> RateTable {
        let size = self.indicators.subject_count();
        let snapshots = self
            .indicators
            .epochs()
            .enumerate()
            .map(|(epoch, matrices)| RateSnapshot {
                coalescent: self.model.rates(parameters.coalescent_rate, epoch, size),
                migration: log_linear_migration(matrices, size, &parameters),
            })
            .collect::<Vec<_>>();

        debug!(
            generation,
            epochs = snapshots.len(),
            subjects = size,
            "recomputed rate table"
        );

        RateTable {
            generation,
            parameters,
            snapshots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::timeline::{EpochTableBuilder, StateUniverse};

    fn engine(parameters: RateParameters) -> RateEngine {
        let universe = StateUniverse::declared(["A", "B"], ["Ward"]).unwrap();
        let events = vec![
            Event::activate("A", "Ward", "W1", 5.0),
            Event::activate("B", "Ward", "W1", 2.0),
            Event::deactivate("A", "Ward", 0.0),
        ];
        let table = EpochTableBuilder::new(Arc::new(universe))
            .build(&events)
            .unwrap();
        let widths = table.interval_widths();
        RateEngine::new(Arc::new(IndicatorSet::build(&table)), widths, parameters).unwrap()
    }

    #[test]
    fn test_rates_memoized_until_parameters_change() {
        let engine = engine(RateParameters::new(1.0, 2.0, vec![1.0]));
        assert!(!engine.is_cached());

        let first = engine.rates();
        let second = engine.rates();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(engine.is_cached());

        engine
            .set_parameters(RateParameters::new(1.0, 3.0, vec![0.0]))
            .unwrap();
        assert!(!engine.is_cached());

        let third = engine.rates();
        assert_eq!(third.generation(), 1);
        assert_eq!(third.snapshot(1).unwrap().migration().get(0, 1), 3.0);
        // Readers holding the old table keep a consistent view.
        assert_eq!(first.snapshot(0).unwrap().migration().get(0, 1), 2.0);
    }

    #[test]
    fn test_invalid_parameters_keep_previous_generation() {
        let engine = engine(RateParameters::new(1.0, 2.0, vec![1.0]));

        let err = engine
            .set_parameters(RateParameters::new(1.0, 2.0, vec![1.0, 2.0]))
            .unwrap_err();
        assert_eq!(
            err,
            DynamicsError::EffectSizeMismatch {
                expected: 1,
                actual: 2
            }
        );
        assert_eq!(engine.generation(), 0);
        assert_eq!(engine.parameters().migration_rate_scalar, 2.0);
    }

    #[derive(Debug)]
    struct Doubled;

    impl CoalescentRateModel for Doubled {
        fn rates(&self, base: f64, _epoch: usize, subject_count: usize) -> Arc<[f64]> {
            vec![2.0 * base; subject_count].into()
        }
    }

    #[test]
    fn test_model_swap_drops_cached_table() {
        let engine = engine(RateParameters::new(1.0, 2.0, vec![1.0]));
        assert_eq!(engine.rates().snapshot(0).unwrap().coalescent()[..], [1.0, 1.0]);
        assert!(engine.is_cached());

        let engine = engine.with_model(Arc::new(Doubled));
        assert!(!engine.is_cached());
        assert_eq!(engine.generation(), 0);
        assert_eq!(engine.rates().snapshot(0).unwrap().coalescent()[..], [2.0, 2.0]);
    }

    #[test]
    fn test_width_queries_out_of_range() {
        let engine = engine(RateParameters::new(1.0, 2.0, vec![1.0]));
        assert_eq!(engine.interval_width(2).unwrap(), 3.0);
        assert_eq!(
            engine.interval_width(3).unwrap_err(),
            DynamicsError::out_of_range(3, 3)
        );
        assert!(engine.snapshot(3).is_err());
    }

    #[test]
    fn test_width_count_must_match_epochs() {
        let universe = StateUniverse::declared(["A"], ["Ward"]).unwrap();
        let table = EpochTableBuilder::new(Arc::new(universe))
            .build(&[Event::activate("A", "Ward", "W1", 1.0)])
            .unwrap();
        let result = RateEngine::new(
            Arc::new(IndicatorSet::build(&table)),
            vec![1.0, 2.0],
            RateParameters::new(1.0, 1.0, vec![0.0]),
        );
        assert!(matches!(result, Err(DynamicsError::InvalidParameter(_))));
    }
}
