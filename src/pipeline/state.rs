use std::num::NonZeroUsize;

/// Tick counter deciding when a window is due.
///
/// After each window the counter drops by `rate` instead of resetting, so
/// consecutive windows overlap by `depth - rate` samples. With `rate > depth`
/// the surplus is consumed as skipped ticks before counting resumes.
#[derive(Debug, Clone)]
pub struct PipelineState {
    depth: NonZeroUsize,
    rate: NonZeroUsize,
    ticks_since_aggregate: usize,
    skip_ticks: usize,
}

impl PipelineState {
    #[must_use]
    pub const fn new(depth: NonZeroUsize, rate: NonZeroUsize) -> Self {
        Self {
            depth,
            rate,
            ticks_since_aggregate: 0,
            skip_ticks: 0,
        }
    }

    #[must_use]
    pub const fn depth(&self) -> NonZeroUsize {
        self.depth
    }

    #[must_use]
    pub const fn rate(&self) -> NonZeroUsize {
        self.rate
    }

    #[must_use]
    pub const fn ticks_since_aggregate(&self) -> usize {
        self.ticks_since_aggregate
    }

    /// Counts one stored sample and reports whether a window is now due.
    pub fn record_tick(&mut self) -> bool {
        if self.skip_ticks > 0 {
            self.skip_ticks = self.skip_ticks.saturating_sub(1);
            return false;
        }
        self.ticks_since_aggregate = self.ticks_since_aggregate.saturating_add(1);
        if self.ticks_since_aggregate < self.depth.get() {
            return false;
        }
        self.ticks_since_aggregate = self.depth.get().saturating_sub(self.rate.get());
        self.skip_ticks = self.rate.get().saturating_sub(self.depth.get());
        true
    }
}
