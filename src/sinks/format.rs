use chrono::{DateTime, SecondsFormat, Utc};

use crate::args::OutputFormat;
use crate::error::SinkError;
use crate::source::{AggregateSnapshot, Reading};

fn format_time(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Human-readable single line, e.g.
/// `Load average: 1m: 0.52, 5m: 0.48, 15m: 0.40 - Begin: ..., End: ..., Duration: 5s`.
#[must_use]
pub fn render_text(snapshot: &AggregateSnapshot) -> String {
    let values = match &snapshot.reading {
        Reading::LoadAverage(load) => format!(
            "Load average: 1m: {:.2}, 5m: {:.2}, 15m: {:.2}",
            load.one, load.five, load.fifteen
        ),
        Reading::CpuUsage(cpu) => format!(
            "CPU usage: User: {:.2}, Nice: {:.2}, System: {:.2}, Idle: {:.2}",
            cpu.user, cpu.nice, cpu.system, cpu.idle
        ),
    };
    format!(
        "{} - Begin: {}, End: {}, Duration: {}s",
        values,
        format_time(&snapshot.window_start),
        format_time(&snapshot.window_end),
        snapshot.covered.as_secs()
    )
}

/// # Errors
///
/// Returns an error if the snapshot cannot be serialized.
pub fn render_json(snapshot: &AggregateSnapshot) -> Result<String, SinkError> {
    serde_json::to_string(snapshot).map_err(|err| SinkError::Serialize { source: err })
}

/// # Errors
///
/// Returns an error if the snapshot cannot be serialized.
pub fn render_line(snapshot: &AggregateSnapshot, format: OutputFormat) -> Result<String, SinkError> {
    match format {
        OutputFormat::Text => Ok(render_text(snapshot)),
        OutputFormat::Json => render_json(snapshot),
    }
}
