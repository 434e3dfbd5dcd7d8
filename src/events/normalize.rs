use chrono::NaiveDate;
use tracing::debug;

use super::{sort_events, ChangeKind, Event};
use crate::DynamicsError;

/// Date format used when none is configured.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Final-sample date and the `strftime`-style format shared by every date
/// string in an event table.
#[derive(Debug, Clone, PartialEq)]
pub struct DateConfig {
    final_sample_date: NaiveDate,
    format: String,
}

impl DateConfig {
    /// Parse `final_sample_date` with `format`.
    pub fn new(final_sample_date: &str, format: impl Into<String>) -> Result<Self, DynamicsError> {
        let format = format.into();
        let final_sample_date = parse_date(final_sample_date, &format)?;
        Ok(Self {
            final_sample_date,
            format,
        })
    }

    /// Parse `final_sample_date` with [`DEFAULT_DATE_FORMAT`].
    pub fn with_default_format(final_sample_date: &str) -> Result<Self, DynamicsError> {
        Self::new(final_sample_date, DEFAULT_DATE_FORMAT)
    }

    /// Date of the most recent sample; time zero of the backward process.
    pub fn final_sample_date(&self) -> NaiveDate {
        self.final_sample_date
    }

    /// Configured date format.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Parse a date string with the configured format.
    pub fn parse(&self, value: &str) -> Result<NaiveDate, DynamicsError> {
        parse_date(value, &self.format)
    }
}

fn parse_date(value: &str, format: &str) -> Result<NaiveDate, DynamicsError> {
    NaiveDate::parse_from_str(value.trim(), format).map_err(|_| DynamicsError::MalformedDate {
        value: value.to_string(),
        format: format.to_string(),
    })
}

/// State change as recorded in the source table, dated on the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawEvent {
    /// Patient identifier.
    pub subject: String,
    /// State variable name.
    pub variable: String,
    /// Recorded state value, if any.
    pub value: Option<String>,
    /// Calendar date string.
    pub date: String,
    /// Whether the slot is switched on or off.
    pub kind: ChangeKind,
}

impl RawEvent {
    /// Construct a raw event from its parts.
    pub fn new(
        subject: impl Into<String>,
        variable: impl Into<String>,
        value: Option<String>,
        date: impl Into<String>,
        kind: ChangeKind,
    ) -> Self {
        Self {
            subject: subject.into(),
            variable: variable.into(),
            value,
            date: date.into(),
            kind,
        }
    }
}

/// Converts calendar-dated events into days before the final sample.
#[derive(Debug, Clone)]
pub struct EventNormalizer {
    config: DateConfig,
}

impl EventNormalizer {
    /// Create a normalizer for the given date configuration.
    pub fn new(config: DateConfig) -> Self {
        Self { config }
    }

    /// Date configuration in use.
    pub fn config(&self) -> &DateConfig {
        &self.config
    }

    /// Days between `date` and the final sample.
    ///
    /// A deactivation dated day D takes effect at the start of D, one day
    /// earlier than an activation on the same date.
    pub fn time_for(&self, date: &str, kind: ChangeKind) -> Result<f64, DynamicsError> {
        let date = self.config.parse(date)?;
        let days = (self.config.final_sample_date - date).num_days() as f64;
        Ok(match kind {
            ChangeKind::Activate => days,
            ChangeKind::Deactivate => days - 1.0,
        })
    }

    /// Normalize one raw event without dropping or reordering.
    pub fn normalize_one(&self, raw: &RawEvent) -> Result<Event, DynamicsError> {
        let time = self.time_for(&raw.date, raw.kind)?;
        Ok(Event::new(
            raw.subject.as_str(),
            raw.variable.as_str(),
            raw.value.as_deref().map(Into::into),
            time,
            raw.kind,
        ))
    }

    /// Normalize a batch of raw events and return them in normalized order.
    ///
    /// Fails on the first unparseable date. Events falling after the final
    /// sample (negative time) cannot affect the backward process and are
    /// dropped.
    pub fn normalize(&self, raw: &[RawEvent]) -> Result<Vec<Event>, DynamicsError> {
        let mut events = Vec::with_capacity(raw.len());
        let mut dropped = 0usize;

        for record in raw {
            let event = self.normalize_one(record)?;
            if event.time < 0.0 {
                dropped += 1;
                continue;
            }
            events.push(event);
        }

        if dropped > 0 {
            debug!(dropped, "dropped events dated after the final sample");
        }

        sort_events(&mut events);
        Ok(events)
    }
}
