//! Event sources and text reports
//!
//! State change tables come in as CSV with `PatientID`, `StateName`,
//! `StateValue`, `Date` and `ChangeType` columns. Epoch and rate reports go
//! out as tab-separated text.

mod csv_source;
mod report;

pub use csv_source::{
    load_events, parse_state_changes, read_state_changes, EventSourceError, ACTIVATE_MARK,
    CHANGE_COLUMN, DATE_COLUMN, DEACTIVATE_MARK, SUBJECT_COLUMN, VALUE_COLUMN, VARIABLE_COLUMN,
};
pub use report::{
    render_epoch_report, render_rate_report, write_epoch_report, write_rate_report, ABSENT,
};
