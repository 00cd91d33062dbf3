//! Metric sources: the sampling capability each pipeline drives, plus the
//! built-in procfs readers.
mod cpu;
mod loadavg;
mod snapshot;

#[cfg(test)]
pub(crate) mod test_support;

use async_trait::async_trait;

use crate::error::SourceError;

pub use cpu::{CpuTimes, CpuUsage, CpuUsageSource};
pub use loadavg::{LoadAverage, LoadAverageSource, parse_loadavg};
pub use snapshot::{AggregateSnapshot, Mean, Reading, WindowDescriptor, reduce_mean};

/// Produces raw samples on demand and reduces a window of them into a
/// printable snapshot.
///
/// `sample` is called once per tick from the owning pipeline task. `reduce`
/// runs on a separate task while the pipeline keeps ticking, so it must not
/// depend on sampling state.
#[async_trait]
pub trait MetricSource: Send + Sync + 'static {
    type Sample: Clone + Send + Sync + 'static;

    /// Short identifier used in logs and errors (e.g. `loadavg`).
    fn name(&self) -> &'static str;

    /// Takes one instantaneous measurement.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying data cannot be read or parsed.
    /// The owning pipeline treats this as fatal.
    async fn sample(&self) -> Result<Self::Sample, SourceError>;

    /// Reduces `samples` collected over `window` into one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InsufficientSamples`] when `samples` is empty.
    fn reduce(
        &self,
        samples: &[Self::Sample],
        window: WindowDescriptor,
    ) -> Result<AggregateSnapshot, SourceError>;
}
