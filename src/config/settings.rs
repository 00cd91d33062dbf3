use std::num::NonZeroUsize;

use tracing::warn;

use crate::args::{DaemonArgs, OutputFormat, PositiveUsize};
use crate::error::{AppError, AppResult, ConfigError};
use crate::pipeline::PipelineSettings;

use super::types::{ConfigFile, SourceKind};

const DEFAULT_DEPTH: NonZeroUsize = NonZeroUsize::MIN.saturating_add(4);
const DEFAULT_RATE: NonZeroUsize = NonZeroUsize::MIN.saturating_add(1);

/// Effective daemon settings after CLI overrides are applied to the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonSettings {
    pub pipeline: PipelineSettings,
    pub output: OutputFormat,
    pub sources: Vec<SourceKind>,
}

impl DaemonSettings {
    /// Merges `config` with the CLI overrides in `args` and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error when the window settings are invalid or no supported
    /// source is enabled.
    pub fn resolve(args: &DaemonArgs, config: &ConfigFile) -> AppResult<Self> {
        let depth = pick(args.depth, config.depth).unwrap_or(DEFAULT_DEPTH);
        let rate = pick(args.rate, config.rate).unwrap_or(DEFAULT_RATE);
        let mut pipeline = PipelineSettings::new(depth, rate);
        if let Some(capacity) = pick(args.capacity, config.capacity) {
            pipeline = pipeline.with_capacity(capacity);
        }

        for name in config.sources.unsupported() {
            warn!(source = name, "Metric source is not supported; skipping");
        }

        let settings = Self {
            pipeline,
            output: args.output.or(config.output).unwrap_or_default(),
            sources: config.sources.enabled(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// # Errors
    ///
    /// Returns an error when `capacity < depth` or no source is enabled.
    pub fn validate(&self) -> AppResult<()> {
        self.pipeline
            .validate()
            .map_err(|err| AppError::config(ConfigError::Invalid { source: err }))?;
        if self.sources.is_empty() {
            return Err(AppError::config(ConfigError::NoSourcesEnabled));
        }
        Ok(())
    }
}

fn pick(cli: Option<PositiveUsize>, file: Option<PositiveUsize>) -> Option<NonZeroUsize> {
    cli.or(file).map(PositiveUsize::as_non_zero)
}
