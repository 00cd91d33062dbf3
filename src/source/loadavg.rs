use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::SourceError;

use super::{AggregateSnapshot, Mean, MetricSource, Reading, WindowDescriptor, reduce_mean};

const NAME: &str = "loadavg";
const LOADAVG_PATH: &str = "/proc/loadavg";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

impl Mean for LoadAverage {
    fn add(&self, other: &Self) -> Self {
        Self {
            one: self.one + other.one,
            five: self.five + other.five,
            fifteen: self.fifteen + other.fifteen,
        }
    }

    fn scale(&self, factor: f64) -> Self {
        Self {
            one: self.one * factor,
            five: self.five * factor,
            fifteen: self.fifteen * factor,
        }
    }
}

/// Parses the first three fields of `/proc/loadavg`
/// (`"0.52 0.48 0.40 1/523 12345"`).
///
/// # Errors
///
/// Returns [`SourceError::InvalidData`] when fewer than three numeric fields
/// are present.
pub fn parse_loadavg(content: &str) -> Result<LoadAverage, SourceError> {
    let mut fields = content.split_whitespace().map(|field| {
        field
            .parse::<f64>()
            .map_err(|err| SourceError::InvalidData {
                source_name: NAME,
                detail: format!("'{}': {}", field, err),
            })
    });
    let mut next = || {
        fields.next().unwrap_or_else(|| {
            Err(SourceError::InvalidData {
                source_name: NAME,
                detail: format!("expected 3 fields in '{}'", content.trim()),
            })
        })
    };
    Ok(LoadAverage {
        one: next()?,
        five: next()?,
        fifteen: next()?,
    })
}

/// System load averages read from procfs.
#[derive(Debug, Clone)]
pub struct LoadAverageSource {
    path: PathBuf,
}

impl LoadAverageSource {
    #[must_use]
    pub fn new() -> Self {
        Self::with_path(LOADAVG_PATH)
    }

    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for LoadAverageSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricSource for LoadAverageSource {
    type Sample = LoadAverage;

    fn name(&self) -> &'static str {
        NAME
    }

    async fn sample(&self) -> Result<LoadAverage, SourceError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| SourceError::Unavailable {
                source_name: NAME,
                path: self.path.clone(),
                source: err,
            })?;
        parse_loadavg(&content)
    }

    fn reduce(
        &self,
        samples: &[LoadAverage],
        window: WindowDescriptor,
    ) -> Result<AggregateSnapshot, SourceError> {
        reduce_mean(NAME, samples, window, Reading::LoadAverage)
    }
}
