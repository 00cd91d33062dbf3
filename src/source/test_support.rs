//! Deterministic sources for pipeline and orchestrator tests.
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::error::SourceError;

use super::{AggregateSnapshot, LoadAverage, MetricSource, Reading, WindowDescriptor, reduce_mean};

/// Emits `offset + 1, offset + 2, ...` as every load field, optionally failing.
#[derive(Debug)]
pub(crate) struct CountingSource {
    name: &'static str,
    calls: AtomicU64,
    offset: f64,
    fail_sample_at: Option<u64>,
    fail_reduce: bool,
}

impl CountingSource {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self {
            name,
            calls: AtomicU64::new(0),
            offset: 0.0,
            fail_sample_at: None,
            fail_reduce: false,
        }
    }

    /// Shifts every emitted value so sources can be told apart downstream.
    pub(crate) const fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// The `call`-th sample (1-based) fails.
    pub(crate) const fn failing_sample_at(mut self, call: u64) -> Self {
        self.fail_sample_at = Some(call);
        self
    }

    pub(crate) const fn failing_reduce(mut self) -> Self {
        self.fail_reduce = true;
        self
    }
}

pub(crate) fn counting_reading(value: f64) -> LoadAverage {
    LoadAverage {
        one: value,
        five: value,
        fifteen: value,
    }
}

#[async_trait]
impl MetricSource for CountingSource {
    type Sample = LoadAverage;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn sample(&self) -> Result<LoadAverage, SourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        if self.fail_sample_at == Some(call) {
            return Err(SourceError::InvalidData {
                source_name: self.name,
                detail: format!("scripted failure on sample {}", call),
            });
        }
        Ok(counting_reading(self.offset + call as f64))
    }

    fn reduce(
        &self,
        samples: &[LoadAverage],
        window: WindowDescriptor,
    ) -> Result<AggregateSnapshot, SourceError> {
        if self.fail_reduce {
            return Err(SourceError::InvalidData {
                source_name: self.name,
                detail: "scripted reduction failure".to_owned(),
            });
        }
        reduce_mean(self.name, samples, window, Reading::LoadAverage)
    }
}
