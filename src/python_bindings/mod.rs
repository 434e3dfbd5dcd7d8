//! Python bindings that expose the patient state dynamics engine via PyO3.
use pyo3::{exceptions::PyValueError, prelude::*, types::PyModule};

use crate::dynamics::{Dynamics, DynamicsBuilder, DynamicsConfig, PatientStateDynamics};
use crate::events::{ChangeKind, Event};
use crate::rates::RateParameters;
use crate::DynamicsError;

fn to_py_err(err: DynamicsError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Python-facing handle on a built dynamics engine.
#[pyclass]
#[derive(Debug)]
pub struct PyPatientStateDynamics {
    inner: PatientStateDynamics,
}

#[pymethods]
impl PyPatientStateDynamics {
    #[new]
    #[pyo3(signature = (events, variables, coalescent_rate=1.0, migration_rate_scalar=1.0, effect_sizes=None))]
    /// Build the engine from normalized events.
    ///
    /// Args:
    ///     events: List of `(subject, variable, value, time, is_activation)`
    ///         tuples; `value` may be `None` and `time` is days before the
    ///         final sample.
    ///     variables: Ordered state variable names.
    ///     coalescent_rate: Base coalescent rate.
    ///     migration_rate_scalar: Migration rate between unrelated subjects.
    ///     effect_sizes: One log-rate effect per variable (default zeros).
    pub fn new(
        events: Vec<(String, String, Option<String>, f64, bool)>,
        variables: Vec<String>,
        coalescent_rate: f64,
        migration_rate_scalar: f64,
        effect_sizes: Option<Vec<f64>>,
    ) -> PyResult<Self> {
        let effect_sizes = effect_sizes.unwrap_or_else(|| vec![0.0; variables.len()]);
        let config = DynamicsConfig::new(variables).with_parameters(RateParameters::new(
            coalescent_rate,
            migration_rate_scalar,
            effect_sizes,
        ));

        let events = events
            .into_iter()
            .map(|(subject, variable, value, time, is_activation)| {
                let kind = if is_activation {
                    ChangeKind::Activate
                } else {
                    ChangeKind::Deactivate
                };
                Event::new(subject.as_str(), variable.as_str(), value.map(Into::into), time, kind)
            })
            .collect::<Vec<_>>();

        let inner = DynamicsBuilder::new(config)
            .build(&events)
            .map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Number of epochs.
    pub fn epoch_count(&self) -> usize {
        self.inner.epoch_count()
    }

    /// Duration of an epoch in days.
    pub fn interval_width(&self, epoch: usize) -> PyResult<f64> {
        self.inner.interval_width(epoch).map_err(to_py_err)
    }

    /// Per-subject coalescent rates of an epoch.
    pub fn coalescent_rate(&self, epoch: usize) -> PyResult<Vec<f64>> {
        self.inner
            .coalescent_rate(epoch)
            .map(|rates| rates.to_vec())
            .map_err(to_py_err)
    }

    /// Backward migration matrix of an epoch, flattened row-major.
    pub fn backward_migration(&self, epoch: usize) -> PyResult<Vec<f64>> {
        self.inner
            .backward_migration(epoch)
            .map(|matrix| matrix.as_slice().to_vec())
            .map_err(to_py_err)
    }

    /// Subject names in matrix order.
    pub fn subjects(&self) -> Vec<String> {
        self.inner
            .universe()
            .subjects()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Replace the rate parameters.
    pub fn set_parameters(
        &self,
        coalescent_rate: f64,
        migration_rate_scalar: f64,
        effect_sizes: Vec<f64>,
    ) -> PyResult<()> {
        self.inner
            .set_parameters(RateParameters::new(
                coalescent_rate,
                migration_rate_scalar,
                effect_sizes,
            ))
            .map_err(to_py_err)
    }
}

/// Create Python module.
#[pymodule]
pub fn patient_dynamics_py(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyPatientStateDynamics>()?;
    Ok(())
}
