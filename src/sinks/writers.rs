use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::args::OutputFormat;
use crate::error::SinkError;
use crate::source::AggregateSnapshot;

use super::format::render_line;

/// Writes one line per snapshot until every sender of `snapshot_rx` is gone.
///
/// Returns the number of snapshots written.
///
/// # Errors
///
/// Returns an error if a snapshot cannot be rendered or written.
pub async fn run_sink<W>(
    mut snapshot_rx: mpsc::Receiver<AggregateSnapshot>,
    format: OutputFormat,
    mut writer: W,
) -> Result<u64, SinkError>
where
    W: AsyncWrite + Unpin,
{
    let mut written: u64 = 0;
    while let Some(snapshot) = snapshot_rx.recv().await {
        let mut line = render_line(&snapshot, format)?;
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|err| SinkError::Write { source: err })?;
        writer
            .flush()
            .await
            .map_err(|err| SinkError::Write { source: err })?;
        written = written.saturating_add(1);
    }
    debug!(written, "Output stream closed");
    Ok(written)
}
