//! Per-source sampling loop: tick, sample, store, and trigger windowed
//! aggregation.
mod state;

#[cfg(test)]
mod tests;

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::buffer::{SlidingWindowBuffer, truncate_to_second};
use crate::error::{PipelineError, ValidationError};
use crate::shutdown::{ShutdownReceiver, wait_for_shutdown};
use crate::source::{AggregateSnapshot, MetricSource, WindowDescriptor};

pub use state::PipelineState;

/// Sampling period of every pipeline.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub depth: NonZeroUsize,
    pub rate: NonZeroUsize,
    pub capacity: NonZeroUsize,
}

impl PipelineSettings {
    /// Builds settings with the buffer sized to exactly one window.
    #[must_use]
    pub const fn new(depth: NonZeroUsize, rate: NonZeroUsize) -> Self {
        Self {
            depth,
            rate,
            capacity: depth,
        }
    }

    #[must_use]
    pub const fn with_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Checks that a full window always fits in the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::CapacityBelowDepth`] when `capacity < depth`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.capacity < self.depth {
            return Err(ValidationError::CapacityBelowDepth {
                capacity: self.capacity.get(),
                depth: self.depth.get(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// A sampling loop the orchestrator can drive without knowing the sample type.
#[async_trait]
pub trait Pipeline: Send {
    fn name(&self) -> &'static str;

    /// Runs until `shutdown_rx` is signalled or a fatal error occurs.
    ///
    /// # Errors
    ///
    /// Returns the first sampling, buffer or aggregation failure.
    async fn run(
        &mut self,
        shutdown_rx: ShutdownReceiver,
        out: mpsc::Sender<AggregateSnapshot>,
    ) -> Result<(), PipelineError>;
}

/// Maps tick instants to wall-clock seconds.
///
/// Anchoring at a truncated wall time and adding monotonic elapsed time keeps
/// one distinct buffer key per tick even if the system clock moves.
#[derive(Debug, Clone, Copy)]
struct TickClock {
    origin: Instant,
    wall: DateTime<Utc>,
}

impl TickClock {
    fn start() -> Self {
        Self {
            origin: Instant::now(),
            wall: truncate_to_second(Utc::now()),
        }
    }

    fn at(&self, tick: Instant) -> DateTime<Utc> {
        TimeDelta::from_std(tick.saturating_duration_since(self.origin))
            .ok()
            .and_then(|elapsed| self.wall.checked_add_signed(elapsed))
            .unwrap_or(self.wall)
    }
}

/// A due window must hold between one and `expected` samples. Gaps from
/// skipped ticks are allowed.
fn check_window(found: usize, expected: usize) -> Result<(), PipelineError> {
    if found == 0 || found > expected {
        return Err(PipelineError::BufferInconsistency { expected, found });
    }
    Ok(())
}

pub struct SamplingPipeline<S: MetricSource> {
    source: Arc<S>,
    buffer: SlidingWindowBuffer<S::Sample>,
    state: PipelineState,
    phase: PipelinePhase,
}

impl<S: MetricSource> SamplingPipeline<S> {
    /// # Errors
    ///
    /// Returns an error when `settings` fail validation.
    pub fn new(source: S, settings: PipelineSettings) -> Result<Self, PipelineError> {
        settings.validate()?;
        if settings.rate > settings.depth {
            warn!(
                source = source.name(),
                depth = settings.depth.get(),
                rate = settings.rate.get(),
                "rate exceeds depth; samples between windows will be skipped"
            );
        }
        Ok(Self {
            source: Arc::new(source),
            buffer: SlidingWindowBuffer::new(settings.capacity),
            state: PipelineState::new(settings.depth, settings.rate),
            phase: PipelinePhase::Idle,
        })
    }

    #[must_use]
    pub const fn phase(&self) -> PipelinePhase {
        self.phase
    }

    #[must_use]
    pub const fn state(&self) -> &PipelineState {
        &self.state
    }

    #[must_use]
    pub const fn buffer(&self) -> &SlidingWindowBuffer<S::Sample> {
        &self.buffer
    }

    fn window_ending_at(&self, now: DateTime<Utc>) -> WindowDescriptor {
        let depth = self.state.depth().get();
        let back = i64::try_from(depth.saturating_sub(1)).unwrap_or(i64::MAX);
        let start = now
            .checked_sub_signed(TimeDelta::seconds(back))
            .unwrap_or(now);
        WindowDescriptor {
            start,
            length: depth,
        }
    }

    async fn on_tick(
        &mut self,
        now: DateTime<Utc>,
        aggregations: &mut JoinSet<Result<(), PipelineError>>,
        out: &mpsc::Sender<AggregateSnapshot>,
    ) -> Result<(), PipelineError> {
        let sample = self.source.sample().await?;
        let now = truncate_to_second(now);
        if self.buffer.set(now, sample) {
            debug!(source = self.source.name(), %now, "Overwrote sample for an existing second");
        }
        if !self.state.record_tick() {
            return Ok(());
        }

        let window = self.window_ending_at(now);
        let samples = self.buffer.range(window.start, window.length);
        check_window(samples.len(), window.length)?;
        debug!(
            source = self.source.name(),
            window_start = %window.start,
            samples = samples.len(),
            expected = window.length,
            "Window due"
        );

        let source = Arc::clone(&self.source);
        let out = out.clone();
        aggregations.spawn(async move {
            let snapshot = match source.reduce(&samples, window) {
                Ok(snapshot) => snapshot,
                Err(err) => return Err(PipelineError::from(err)),
            };
            if out.send(snapshot).await.is_err() {
                debug!(
                    source = source.name(),
                    "Output closed before snapshot was delivered"
                );
            }
            Ok::<(), PipelineError>(())
        });
        Ok(())
    }

    async fn drain(aggregations: &mut JoinSet<Result<(), PipelineError>>, name: &'static str) {
        while let Some(joined) = aggregations.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(source = name, "Aggregation failed during shutdown: {}", err),
                Err(err) => warn!(source = name, "Aggregation task failed during shutdown: {}", err),
            }
        }
    }
}

#[async_trait]
impl<S: MetricSource> Pipeline for SamplingPipeline<S> {
    fn name(&self) -> &'static str {
        self.source.name()
    }

    async fn run(
        &mut self,
        mut shutdown_rx: ShutdownReceiver,
        out: mpsc::Sender<AggregateSnapshot>,
    ) -> Result<(), PipelineError> {
        let name = self.source.name();
        self.phase = PipelinePhase::Running;
        info!(
            source = name,
            depth = self.state.depth().get(),
            rate = self.state.rate().get(),
            capacity = self.buffer.capacity().get(),
            "Pipeline started"
        );

        let clock = TickClock::start();
        let mut ticker = interval_at(clock.origin + TICK_INTERVAL, TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut aggregations = JoinSet::new();

        let outcome = loop {
            tokio::select! {
                biased;
                () = wait_for_shutdown(&mut shutdown_rx) => break Ok(()),
                Some(joined) = aggregations.join_next() => match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => break Err(err),
                    Err(err) => break Err(PipelineError::from(err)),
                },
                tick = ticker.tick() => {
                    if let Err(err) = self.on_tick(clock.at(tick), &mut aggregations, &out).await {
                        break Err(err);
                    }
                }
            }
        };

        self.phase = PipelinePhase::Stopping;
        match &outcome {
            Ok(()) => Self::drain(&mut aggregations, name).await,
            Err(err) => {
                warn!(source = name, "Pipeline failed: {}", err);
                aggregations.shutdown().await;
            }
        }
        self.phase = PipelinePhase::Stopped;
        info!(source = name, "Pipeline stopped");
        outcome
    }
}
