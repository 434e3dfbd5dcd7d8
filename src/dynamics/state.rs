use std::sync::Arc;

use super::api::Dynamics;
use crate::indicator::IndicatorSet;
use crate::rates::{MigrationMatrix, RateEngine, RateParameters, RateTable};
use crate::timeline::{EpochTable, StateUniverse};
use crate::DynamicsError;

/// Ready engine: an immutable epoch table and indicator set plus a rate
/// engine whose parameters can change between likelihood evaluations.
///
/// Safe to share across threads; readers see rates of one parameter
/// generation at a time.
#[derive(Debug)]
pub struct PatientStateDynamics {
    table: Arc<EpochTable>,
    engine: RateEngine,
}

impl PatientStateDynamics {
    pub(crate) fn new(table: Arc<EpochTable>, engine: RateEngine) -> Self {
        Self { table, engine }
    }

    /// Subject and variable axes.
    pub fn universe(&self) -> &Arc<StateUniverse> {
        self.table.universe()
    }

    /// Epoch table in ascending time order.
    pub fn epoch_table(&self) -> &Arc<EpochTable> {
        &self.table
    }

    /// Pairwise shared-state indicators.
    pub fn indicators(&self) -> &Arc<IndicatorSet> {
        self.engine.indicators()
    }

    /// Underlying rate engine.
    pub fn rate_engine(&self) -> &RateEngine {
        &self.engine
    }

    /// Current rate parameters.
    pub fn parameters(&self) -> Arc<RateParameters> {
        self.engine.parameters()
    }

    /// Install new rate parameters. Invalid parameters leave the current
    /// ones in place.
    pub fn set_parameters(&self, parameters: RateParameters) -> Result<(), DynamicsError> {
        self.engine.set_parameters(parameters)
    }

    /// Full rate table for the current parameters.
    pub fn rates(&self) -> Arc<RateTable> {
        self.engine.rates()
    }

    /// Epoch covering backward time `time`, if any.
    pub fn epoch_at(&self, time: f64) -> Option<usize> {
        self.table.epoch_at(time)
    }

    /// Value `subject` holds for `variable` at backward time `time`.
    ///
    /// Times outside the table's coverage yield `None`, as does an absent
    /// value. Unknown names are errors.
    pub fn value_at(
        &self,
        time: f64,
        subject: &str,
        variable: &str,
    ) -> Result<Option<&str>, DynamicsError> {
        let universe = self.table.universe();
        let variable_idx = universe
            .variable_index(variable)
            .ok_or_else(|| DynamicsError::UnknownVariable(variable.to_string()))?;
        let subject_idx = universe
            .subject_index(subject)
            .ok_or_else(|| DynamicsError::UnknownSubject(subject.to_string()))?;

        match self.table.epoch_at(time) {
            Some(epoch) => Ok(self.table.snapshot(epoch)?.value(subject_idx, variable_idx)),
            None => Ok(None),
        }
    }

    /// Digest of the epoch table.
    pub fn fingerprint(&self) -> blake3::Hash {
        self.table.fingerprint()
    }
}

impl Dynamics for PatientStateDynamics {
    fn epoch_count(&self) -> usize {
        self.engine.epoch_count()
    }

    fn interval_width(&self, epoch: usize) -> Result<f64, DynamicsError> {
        self.engine.interval_width(epoch)
    }

    fn coalescent_rate(&self, epoch: usize) -> Result<Arc<[f64]>, DynamicsError> {
        Ok(Arc::clone(self.engine.rates().snapshot(epoch)?.coalescent()))
    }

    fn backward_migration(&self, epoch: usize) -> Result<MigrationMatrix, DynamicsError> {
        Ok(self.engine.rates().snapshot(epoch)?.migration().clone())
    }

    fn interval_widths(&self) -> Vec<f64> {
        self.engine.interval_widths().to_vec()
    }
}
