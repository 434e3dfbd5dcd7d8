//! Assembled dynamics engine
//!
//! [`DynamicsBuilder`] runs the pipeline once (universe, epoch table,
//! indicators, rate engine) and yields a [`PatientStateDynamics`] that serves
//! the [`Dynamics`] queries. Only the rate stage is re-run afterwards.

mod api;
mod builder;
mod config;
mod state;

pub use api::Dynamics;
pub use builder::DynamicsBuilder;
pub use config::DynamicsConfig;
pub use state::PatientStateDynamics;
