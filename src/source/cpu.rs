use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::SourceError;

use super::{AggregateSnapshot, Mean, MetricSource, Reading, WindowDescriptor, reduce_mean};

const NAME: &str = "usage_cpu";
const STAT_PATH: &str = "/proc/stat";

/// Share of CPU time, in percent, spent in each mode since the previous sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CpuUsage {
    pub user: f64,
    pub nice: f64,
    pub system: f64,
    pub idle: f64,
}

impl Mean for CpuUsage {
    fn add(&self, other: &Self) -> Self {
        Self {
            user: self.user + other.user,
            nice: self.nice + other.nice,
            system: self.system + other.system,
            idle: self.idle + other.idle,
        }
    }

    fn scale(&self, factor: f64) -> Self {
        Self {
            user: self.user * factor,
            nice: self.nice * factor,
            system: self.system * factor,
            idle: self.idle * factor,
        }
    }
}

/// Cumulative jiffy counters from the aggregate `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    /// Parses the `cpu ` line out of a full `/proc/stat` dump.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidData`] when the line is missing or any of
    /// the first four counters is absent or not a number.
    pub fn parse(content: &str) -> Result<Self, SourceError> {
        let invalid = |detail: String| SourceError::InvalidData {
            source_name: NAME,
            detail,
        };
        let line = content
            .lines()
            .find_map(|line| line.strip_prefix("cpu "))
            .ok_or_else(|| invalid("missing aggregate cpu line".to_owned()))?;

        let mut counters = line.split_whitespace().map(str::parse::<u64>);
        let mut required = |field: &str| match counters.next() {
            Some(Ok(value)) => Ok(value),
            Some(Err(err)) => Err(invalid(format!("{}: {}", field, err))),
            None => Err(invalid(format!("missing {} counter", field))),
        };
        let user = required("user")?;
        let nice = required("nice")?;
        let system = required("system")?;
        let idle = required("idle")?;
        // Older kernels stop after idle.
        let mut optional = || counters.next().and_then(Result::ok).unwrap_or(0);

        Ok(Self {
            user,
            nice,
            system,
            idle,
            iowait: optional(),
            irq: optional(),
            softirq: optional(),
            steal: optional(),
        })
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .iter()
        .fold(0_u64, |acc, value| acc.saturating_add(*value))
    }

    /// Percentages of the time elapsed between `previous` and `self`.
    #[must_use]
    pub fn usage_since(&self, previous: &Self) -> CpuUsage {
        let total = self.total().saturating_sub(previous.total());
        if total == 0 {
            return CpuUsage::default();
        }
        let percent =
            |now: u64, before: u64| now.saturating_sub(before) as f64 * 100.0 / total as f64;
        CpuUsage {
            user: percent(self.user, previous.user),
            nice: percent(self.nice, previous.nice),
            system: percent(self.system, previous.system),
            idle: percent(self.idle, previous.idle),
        }
    }
}

/// CPU time split computed from consecutive `/proc/stat` readings.
///
/// The first sample is relative to boot.
#[derive(Debug)]
pub struct CpuUsageSource {
    path: PathBuf,
    previous: Mutex<Option<CpuTimes>>,
}

impl CpuUsageSource {
    #[must_use]
    pub fn new() -> Self {
        Self::with_path(STAT_PATH)
    }

    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            previous: Mutex::new(None),
        }
    }
}

impl Default for CpuUsageSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricSource for CpuUsageSource {
    type Sample = CpuUsage;

    fn name(&self) -> &'static str {
        NAME
    }

    async fn sample(&self) -> Result<CpuUsage, SourceError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| SourceError::Unavailable {
                source_name: NAME,
                path: self.path.clone(),
                source: err,
            })?;
        let current = CpuTimes::parse(&content)?;

        let mut previous = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
        let baseline = previous.unwrap_or_default();
        *previous = Some(current);
        Ok(current.usage_since(&baseline))
    }

    fn reduce(
        &self,
        samples: &[CpuUsage],
        window: WindowDescriptor,
    ) -> Result<AggregateSnapshot, SourceError> {
        reduce_mean(NAME, samples, window, Reading::CpuUsage)
    }
}
