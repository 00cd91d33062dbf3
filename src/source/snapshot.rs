use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Serialize, Serializer};

use crate::error::SourceError;

use super::{CpuUsage, LoadAverage};

/// Span handed to a reduction: `length` one-second slots starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDescriptor {
    pub start: DateTime<Utc>,
    pub length: usize,
}

impl WindowDescriptor {
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        let secs = i64::try_from(self.length).unwrap_or(i64::MAX);
        self.start
            .checked_add_signed(TimeDelta::seconds(secs))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source")]
pub enum Reading {
    #[serde(rename = "loadavg")]
    LoadAverage(LoadAverage),
    #[serde(rename = "usage_cpu")]
    CpuUsage(CpuUsage),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSnapshot {
    #[serde(flatten)]
    pub reading: Reading,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    #[serde(rename = "covered_secs", serialize_with = "serialize_secs")]
    pub covered: Duration,
}

fn serialize_secs<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(value.as_secs())
}

/// Sample payloads that can be averaged field by field.
pub trait Mean: Clone {
    #[must_use]
    fn add(&self, other: &Self) -> Self;
    #[must_use]
    fn scale(&self, factor: f64) -> Self;
}

/// Arithmetic mean of `samples`, wrapped into a snapshot for `window`.
///
/// One sample is passed through unchanged and covers one second; `n`
/// samples cover `n` seconds.
///
/// # Errors
///
/// Returns [`SourceError::InsufficientSamples`] when `samples` is empty.
pub fn reduce_mean<T, F>(
    source_name: &'static str,
    samples: &[T],
    window: WindowDescriptor,
    into_reading: F,
) -> Result<AggregateSnapshot, SourceError>
where
    T: Mean,
    F: FnOnce(T) -> Reading,
{
    let (first, rest) = samples
        .split_first()
        .ok_or(SourceError::InsufficientSamples { source_name })?;

    let count = samples.len();
    let mean = if rest.is_empty() {
        first.clone()
    } else {
        rest.iter()
            .fold(first.clone(), |acc, sample| acc.add(sample))
            .scale(1.0 / count as f64)
    };

    Ok(AggregateSnapshot {
        reading: into_reading(mean),
        window_start: window.start,
        window_end: window.end(),
        covered: Duration::from_secs(u64::try_from(count).unwrap_or(u64::MAX)),
    })
}
