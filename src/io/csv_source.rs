use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::debug;

use crate::events::{ChangeKind, Event, EventNormalizer, RawEvent};
use crate::DynamicsError;

/// Patient identifier column.
pub const SUBJECT_COLUMN: &str = "PatientID";
/// State variable column.
pub const VARIABLE_COLUMN: &str = "StateName";
/// State value column; may be empty for deactivations.
pub const VALUE_COLUMN: &str = "StateValue";
/// Calendar date column.
pub const DATE_COLUMN: &str = "Date";
/// Change type column holding [`ACTIVATE_MARK`] or [`DEACTIVATE_MARK`].
pub const CHANGE_COLUMN: &str = "ChangeType";
/// Change type marking an activation.
pub const ACTIVATE_MARK: &str = "+";
/// Change type marking a deactivation.
pub const DEACTIVATE_MARK: &str = "-";

/// Errors raised while reading a state change table.
#[derive(Error, Debug)]
pub enum EventSourceError {
    /// File could not be opened or read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Header lacks a required column
    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    /// Change type is neither `+` nor `-`
    #[error("record {record}: unknown change type '{value}'")]
    InvalidChangeType {
        /// 1-based data record number
        record: usize,
        /// Offending change type
        value: String,
    },

    /// Records parsed but could not be normalized
    #[error(transparent)]
    Dynamics(#[from] DynamicsError),
}

struct Columns {
    subject: usize,
    variable: usize,
    value: usize,
    date: usize,
    change: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, EventSourceError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or(EventSourceError::MissingColumn(name))
        };
        Ok(Self {
            subject: find(SUBJECT_COLUMN)?,
            variable: find(VARIABLE_COLUMN)?,
            value: find(VALUE_COLUMN)?,
            date: find(DATE_COLUMN)?,
            change: find(CHANGE_COLUMN)?,
        })
    }
}

/// Parse a state change table into raw events, in document order.
///
/// Fields are trimmed. An empty `StateValue` becomes `None`.
pub fn parse_state_changes<R: Read>(reader: R) -> Result<Vec<RawEvent>, EventSourceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let columns = Columns::locate(reader.headers()?)?;

    let mut events = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let field = |column: usize| record.get(column).unwrap_or("");

        let kind = match field(columns.change) {
            ACTIVATE_MARK => ChangeKind::Activate,
            DEACTIVATE_MARK => ChangeKind::Deactivate,
            other => {
                return Err(EventSourceError::InvalidChangeType {
                    record: idx + 1,
                    value: other.to_string(),
                })
            }
        };
        let value = Some(field(columns.value))
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        events.push(RawEvent::new(
            field(columns.subject),
            field(columns.variable),
            value,
            field(columns.date),
            kind,
        ));
    }

    debug!(records = events.len(), "parsed state change table");
    Ok(events)
}

/// Read a state change table from disk.
pub fn read_state_changes<P: AsRef<Path>>(path: P) -> Result<Vec<RawEvent>, EventSourceError> {
    let file = File::open(path)?;
    parse_state_changes(file)
}

/// Read a state change table and normalize it in one step.
pub fn load_events<P: AsRef<Path>>(
    path: P,
    normalizer: &EventNormalizer,
) -> Result<Vec<Event>, EventSourceError> {
    let raw = read_state_changes(path)?;
    Ok(normalizer.normalize(&raw)?)
}
