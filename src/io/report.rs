use std::io::Write;

use anyhow::{anyhow, Result};

use crate::dynamics::PatientStateDynamics;
use crate::timeline::EpochTable;

/// Placeholder for an absent state value.
pub const ABSENT: &str = "-";

/// Write every epoch snapshot as tab-separated rows, one per subject.
///
/// Columns: `epoch start end width subject <variables...>`.
pub fn write_epoch_report<W: Write>(writer: &mut W, table: &EpochTable) -> Result<()> {
    let universe = table.universe();

    write!(writer, "epoch\tstart\tend\twidth\tsubject")?;
    for variable in universe.variables() {
        write!(writer, "\t{variable}")?;
    }
    writeln!(writer)?;

    for snapshot in table.snapshots() {
        let (start, end) = (snapshot.start(), snapshot.end());
        for (subject_idx, subject) in universe.subjects().iter().enumerate() {
            write!(
                writer,
                "{epoch}\t{start}\t{end}\t{width}\t{subject}",
                epoch = snapshot.epoch(),
                width = end - start,
            )?;
            for variable_idx in 0..universe.variable_count() {
                let value = snapshot.value(subject_idx, variable_idx).unwrap_or(ABSENT);
                write!(writer, "\t{value}")?;
            }
            writeln!(writer)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Render the epoch report into a string (useful for tests and snapshots).
pub fn render_epoch_report(table: &EpochTable) -> Result<String> {
    let mut buffer = Vec::new();
    write_epoch_report(&mut buffer, table)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered epoch report is not valid UTF-8"))
}

/// Write per-epoch rates under the current parameters.
///
/// One row per epoch and source subject: its coalescent rate followed by its
/// row of the backward migration matrix.
pub fn write_rate_report<W: Write>(writer: &mut W, dynamics: &PatientStateDynamics) -> Result<()> {
    let subjects = dynamics.universe().subjects();
    let rates = dynamics.rates();
    let widths = dynamics.rate_engine().interval_widths();

    write!(writer, "epoch\twidth\tsubject\tcoalescent")?;
    for subject in subjects {
        write!(writer, "\t{subject}")?;
    }
    writeln!(writer)?;

    for (epoch, (snapshot, width)) in rates.snapshots().iter().zip(widths).enumerate() {
        for (idx, subject) in subjects.iter().enumerate() {
            write!(
                writer,
                "{epoch}\t{width}\t{subject}\t{coalescent:.6}",
                coalescent = snapshot.coalescent()[idx]
            )?;
            for rate in snapshot.migration().row(idx) {
                write!(writer, "\t{rate:.6}")?;
            }
            writeln!(writer)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Render the rate report into a string.
pub fn render_rate_report(dynamics: &PatientStateDynamics) -> Result<String> {
    let mut buffer = Vec::new();
    write_rate_report(&mut buffer, dynamics)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered rate report is not valid UTF-8"))
}
