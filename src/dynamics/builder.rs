use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use super::config::DynamicsConfig;
use super::state::PatientStateDynamics;
use crate::events::{Event, EventNormalizer, RawEvent};
use crate::indicator::IndicatorSet;
use crate::rates::{CoalescentRateModel, RateEngine, UniformCoalescentRate};
use crate::timeline::{EpochTableBuilder, StateUniverse};
use crate::DynamicsError;

/// Builds a ready [`PatientStateDynamics`] from events.
///
/// `build` either succeeds completely or leaves the builder untouched, so a
/// failed build can be retried with corrected input.
#[derive(Debug, Clone)]
pub struct DynamicsBuilder {
    config: DynamicsConfig,
    model: Arc<dyn CoalescentRateModel>,
}

impl DynamicsBuilder {
    /// Builder with the uniform coalescent model.
    pub fn new(config: DynamicsConfig) -> Self {
        Self {
            config,
            model: Arc::new(UniformCoalescentRate),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &DynamicsConfig {
        &self.config
    }

    /// Use a different coalescent rate model.
    pub fn with_coalescent_model(mut self, model: Arc<dyn CoalescentRateModel>) -> Self {
        self.model = model;
        self
    }

    /// Build from normalized events (times in days before the final sample).
    pub fn build(&self, events: &[Event]) -> Result<PatientStateDynamics, DynamicsError> {
        if events.is_empty() {
            return Err(DynamicsError::EmptyEventStream);
        }
        let universe = match &self.config.subjects {
            Some(subjects) => StateUniverse::declared(subjects, &self.config.variables)?,
            None => {
                let universe = StateUniverse::inferred(&self.config.variables, events)?;
                debug!(
                    subjects = universe.subject_count(),
                    "inferred subject universe from events"
                );
                universe
            }
        };
        self.assemble(universe, events)
    }

    /// Normalize calendar-dated events and build from them.
    ///
    /// Every record's subject and variable are resolved before any record is
    /// dropped for falling after the final sample. Inferred subjects follow
    /// the document order of `raw`, including subjects whose events all fall
    /// after the final sample.
    pub fn build_from_raw(
        &self,
        normalizer: &EventNormalizer,
        raw: &[RawEvent],
    ) -> Result<PatientStateDynamics, DynamicsError> {
        if raw.is_empty() {
            return Err(DynamicsError::EmptyEventStream);
        }
        let universe = match &self.config.subjects {
            Some(subjects) => StateUniverse::declared(subjects, &self.config.variables)?,
            None => {
                let mut seen = HashSet::new();
                let subjects = raw
                    .iter()
                    .map(|record| record.subject.as_str())
                    .filter(|subject| seen.insert(*subject))
                    .collect::<Vec<_>>();
                debug!(
                    subjects = subjects.len(),
                    "inferred subject universe from raw records"
                );
                StateUniverse::declared(subjects, &self.config.variables)?
            }
        };
        for record in raw {
            universe.resolve_names(&record.subject, &record.variable)?;
        }

        let events = normalizer.normalize(raw)?;
        if events.is_empty() {
            return Err(DynamicsError::EmptyEventStream);
        }
        self.assemble(universe, &events)
    }

    fn assemble(
        &self,
        universe: StateUniverse,
        events: &[Event],
    ) -> Result<PatientStateDynamics, DynamicsError> {
        let parameters = self.config.initial_parameters();
        parameters.validate(universe.variable_count())?;

        let universe = Arc::new(universe);
        let table = EpochTableBuilder::new(Arc::clone(&universe)).build(events)?;
        let indicators = Arc::new(IndicatorSet::build(&table));
        let engine = RateEngine::new(indicators, table.interval_widths(), parameters)?
            .with_model(Arc::clone(&self.model));

        info!(
            epochs = table.epoch_count(),
            subjects = universe.subject_count(),
            variables = universe.variable_count(),
            distinct_values = table.distinct_values(),
            "built patient state dynamics"
        );

        Ok(PatientStateDynamics::new(Arc::new(table), engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::Dynamics;
    use crate::events::{ChangeKind, DateConfig};
    use crate::rates::RateParameters;

    #[test]
    fn test_empty_input_rejected() {
        let builder = DynamicsBuilder::new(DynamicsConfig::new(["Ward"]));
        assert_eq!(builder.build(&[]).unwrap_err(), DynamicsError::EmptyEventStream);
    }

    #[test]
    fn test_failed_build_leaves_builder_reusable() {
        let builder = DynamicsBuilder::new(DynamicsConfig::new(["Ward"]));

        let bad = vec![Event::activate("A", "Hospital", "H1", 1.0)];
        assert_eq!(
            builder.build(&bad).unwrap_err(),
            DynamicsError::UnknownVariable("Hospital".to_string())
        );

        let good = vec![Event::activate("A", "Ward", "W1", 1.0)];
        assert_eq!(builder.build(&good).unwrap().epoch_count(), 1);
    }

    #[test]
    fn test_declared_subjects_reject_strangers() {
        let builder =
            DynamicsBuilder::new(DynamicsConfig::new(["Ward"]).with_subjects(["A", "B"]));
        let events = vec![Event::activate("C", "Ward", "W1", 1.0)];
        assert_eq!(
            builder.build(&events).unwrap_err(),
            DynamicsError::UnknownSubject("C".to_string())
        );
    }

    #[test]
    fn test_effect_sizes_checked_against_variables() {
        let config = DynamicsConfig::new(["Ward", "Hospital"])
            .with_parameters(RateParameters::new(1.0, 1.0, vec![1.0]));
        let events = vec![Event::activate("A", "Ward", "W1", 1.0)];
        assert_eq!(
            DynamicsBuilder::new(config).build(&events).unwrap_err(),
            DynamicsError::EffectSizeMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_raw_subjects_follow_document_order() {
        let normalizer =
            EventNormalizer::new(DateConfig::with_default_format("2017-06-10").unwrap());
        let raw = vec![
            RawEvent::new("B", "Ward", Some("W1".into()), "2017-06-01", ChangeKind::Activate),
            RawEvent::new("C", "Ward", Some("W1".into()), "2017-06-12", ChangeKind::Activate),
            RawEvent::new("A", "Ward", Some("W2".into()), "2017-06-03", ChangeKind::Activate),
        ];
        let dynamics = DynamicsBuilder::new(DynamicsConfig::new(["Ward"]))
            .build_from_raw(&normalizer, &raw)
            .unwrap();

        let names = dynamics
            .universe()
            .subjects()
            .iter()
            .map(|name| &**name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["B", "C", "A"]);
        assert_eq!(dynamics.epoch_table().epoch_times(), &[7.0, 9.0]);
    }

    #[test]
    fn test_all_events_after_final_sample_is_empty() {
        let normalizer =
            EventNormalizer::new(DateConfig::with_default_format("2017-06-10").unwrap());
        let raw = vec![RawEvent::new(
            "A",
            "Ward",
            Some("W1".into()),
            "2017-06-12",
            ChangeKind::Activate,
        )];
        let result =
            DynamicsBuilder::new(DynamicsConfig::new(["Ward"])).build_from_raw(&normalizer, &raw);
        assert_eq!(result.unwrap_err(), DynamicsError::EmptyEventStream);
    }

    #[test]
    fn test_names_checked_on_records_after_final_sample() {
        let normalizer =
            EventNormalizer::new(DateConfig::with_default_format("2017-06-10").unwrap());
        let raw = vec![
            RawEvent::new("A", "Ward", Some("W1".into()), "2017-06-01", ChangeKind::Activate),
            RawEvent::new("A", "Wrad", Some("W1".into()), "2017-06-12", ChangeKind::Activate),
        ];
        let builder = DynamicsBuilder::new(DynamicsConfig::new(["Ward"]));
        assert_eq!(
            builder.build_from_raw(&normalizer, &raw).unwrap_err(),
            DynamicsError::UnknownVariable("Wrad".to_string())
        );

        let raw = vec![
            RawEvent::new("A", "Ward", Some("W1".into()), "2017-06-01", ChangeKind::Activate),
            RawEvent::new("Z", "Ward", Some("W1".into()), "2017-06-12", ChangeKind::Activate),
        ];
        let builder = DynamicsBuilder::new(DynamicsConfig::new(["Ward"]).with_subjects(["A"]));
        assert_eq!(
            builder.build_from_raw(&normalizer, &raw).unwrap_err(),
            DynamicsError::UnknownSubject("Z".to_string())
        );
    }

    #[test]
    fn test_overflowing_parameters_rejected_at_build() {
        let config = DynamicsConfig::new(["Ward"])
            .with_parameters(RateParameters::new(1.0, 0.0, vec![800.0]));
        let events = vec![
            Event::activate("A", "Ward", "W1", 1.0),
            Event::activate("B", "Ward", "W1", 1.0),
        ];
        assert!(matches!(
            DynamicsBuilder::new(config).build(&events),
            Err(DynamicsError::InvalidParameter(_))
        ));
    }
}
