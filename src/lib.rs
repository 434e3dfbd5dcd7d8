//! # Patient State Dynamics
//!
//! Piecewise-constant population structure for structured-coalescent
//! phylodynamics, derived from patient "enters/leaves state" records
//! (ward admissions, hospital stays, network membership).
//!
//! ## Pipeline
//!
//! 1. **Normalization**: calendar dates become days before the final sample,
//!    ordered most-distant-past first
//! 2. **Epoch table**: one complete subject × variable snapshot per distinct
//!    event time, with unchanged state carried forward
//! 3. **Indicators**: per epoch and variable, which subject pairs share a value
//! 4. **Rates**: log-linear backward migration rates and coalescent rates per
//!    epoch, recomputed lazily when parameters change
//!
//! The assembled engine answers four queries per epoch (interval width,
//! coalescent rates, backward migration matrix, epoch count) through the
//! [`Dynamics`] trait.
//!
//! ## Usage Example
//!
//! ```ignore
//! use patient_dynamics::{DynamicsBuilder, DynamicsConfig, Dynamics, Event, RateParameters};
//!
//! let config = DynamicsConfig::new(["Ward"])
//!     .with_parameters(RateParameters::new(1.0, 2.0, vec![1.0]));
//! let events = vec![
//!     Event::activate("A", "Ward", "W1", 5.0),
//!     Event::activate("B", "Ward", "W1", 2.0),
//!     Event::deactivate("A", "Ward", 0.0),
//! ];
//! let dynamics = DynamicsBuilder::new(config).build(&events)?;
//! let migration = dynamics.backward_migration(1)?;
//! assert!(migration.get(0, 1) > 2.0);
//! ```

#![warn(missing_docs, missing_debug_implementations)]

// Core modules, leaf-first
pub mod events;     // Raw and normalized state change events
pub mod timeline;   // Epoch table with carry-forward
pub mod indicator;  // Pairwise shared-state matrices
pub mod rates;      // Log-linear rate model
pub mod dynamics;   // Assembled engine and downstream trait
pub mod io;         // CSV event source
/// Python bindings for exposing the dynamics engine to external runtimes.
#[cfg(feature = "python-bindings")]
pub mod python_bindings;

// Re-exports for convenience
pub use events::{ChangeKind, DateConfig, Event, EventNormalizer, RawEvent};
pub use timeline::{EpochTable, EpochTableBuilder, StateUniverse};
pub use indicator::{IndicatorMatrix, IndicatorSet};
pub use rates::{MigrationMatrix, RateEngine, RateParameters, RateSnapshot, RateTable};
pub use dynamics::{Dynamics, DynamicsBuilder, DynamicsConfig, PatientStateDynamics};

use thiserror::Error;

/// Errors raised while building or querying the dynamics engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DynamicsError {
    /// Date string could not be parsed with the configured format
    #[error("cannot parse date '{value}' with format '{format}'")]
    MalformedDate {
        /// Offending date string
        value: String,
        /// Format the string was parsed against
        format: String,
    },

    /// Event references a state variable that was not declared
    #[error("unknown state variable '{0}'")]
    UnknownVariable(String),

    /// Event references a subject outside the declared subject universe
    #[error("unknown subject '{0}'")]
    UnknownSubject(String),

    /// No events were supplied to the engine builder
    #[error("no patient state events supplied")]
    EmptyEventStream,

    /// Epoch index outside `[0, epoch_count)`
    #[error("epoch {epoch} out of range (epoch count {epoch_count})")]
    OutOfRange {
        /// Requested epoch index
        epoch: usize,
        /// Number of epochs in the table
        epoch_count: usize,
    },

    /// State variable index outside `[0, variable_count)`
    #[error("variable index {variable} out of range (variable count {variable_count})")]
    VariableOutOfRange {
        /// Requested variable index
        variable: usize,
        /// Number of declared state variables
        variable_count: usize,
    },

    /// Event time is negative or not finite
    #[error("event for subject '{subject}' has invalid time {time}")]
    InvalidEventTime {
        /// Subject named by the event
        subject: String,
        /// Offending time value
        time: f64,
    },

    /// Declared subject list repeats a name
    #[error("subject '{0}' declared more than once")]
    DuplicateSubject(String),

    /// Declared variable list repeats a name
    #[error("state variable '{0}' declared more than once")]
    DuplicateVariable(String),

    /// Effect size vector does not match the number of state variables
    #[error("expected {expected} effect sizes, got {actual}")]
    EffectSizeMismatch {
        /// Number of declared state variables
        expected: usize,
        /// Number of effect sizes supplied
        actual: usize,
    },

    /// Rate parameter is negative or not finite
    #[error("invalid rate parameter: {0}")]
    InvalidParameter(String),
}

impl DynamicsError {
    pub(crate) fn out_of_range(epoch: usize, epoch_count: usize) -> Self {
        DynamicsError::OutOfRange { epoch, epoch_count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_offender() {
        let err = DynamicsError::UnknownVariable("Ward".to_string());
        assert_eq!(err.to_string(), "unknown state variable 'Ward'");

        let err = DynamicsError::out_of_range(3, 2);
        assert_eq!(err.to_string(), "epoch 3 out of range (epoch count 2)");

        let err = DynamicsError::VariableOutOfRange {
            variable: 4,
            variable_count: 3,
        };
        assert_eq!(
            err.to_string(),
            "variable index 4 out of range (variable count 3)"
        );
    }
}
