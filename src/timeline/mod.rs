//! Epoch table construction
//!
//! Turns a stream of state changes into one complete snapshot per distinct
//! event time. Absent is a first-class slot value, so every snapshot covers
//! the full subject × variable grid.

mod builder;
mod table;
mod universe;

pub use builder::EpochTableBuilder;
pub use table::{EpochTable, Snapshot, ValueId};
pub use universe::StateUniverse;
