use serde::Deserialize;

use crate::args::{OutputFormat, PositiveUsize};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub depth: Option<PositiveUsize>,
    pub rate: Option<PositiveUsize>,
    pub capacity: Option<PositiveUsize>,
    pub output: Option<OutputFormat>,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    pub loadavg: Option<SourceToggle>,
    pub usage_cpu: Option<SourceToggle>,
    pub disks: Option<SourceToggle>,
    pub top_talkers: Option<SourceToggle>,
    pub network: Option<SourceToggle>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SourceToggle {
    #[serde(default)]
    pub enable: bool,
}

impl SourcesConfig {
    fn is_enabled(toggle: Option<SourceToggle>) -> bool {
        toggle.is_some_and(|toggle| toggle.enable)
    }

    /// Enabled sources that have an implementation, in a stable order.
    #[must_use]
    pub fn enabled(&self) -> Vec<SourceKind> {
        let mut kinds = Vec::with_capacity(2);
        if Self::is_enabled(self.loadavg) {
            kinds.push(SourceKind::LoadAverage);
        }
        if Self::is_enabled(self.usage_cpu) {
            kinds.push(SourceKind::CpuUsage);
        }
        kinds
    }

    /// Enabled sections that are recognised but have no sampler.
    #[must_use]
    pub fn unsupported(&self) -> Vec<&'static str> {
        [
            ("disks", self.disks),
            ("top_talkers", self.top_talkers),
            ("network", self.network),
        ]
        .into_iter()
        .filter(|(_, toggle)| Self::is_enabled(*toggle))
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    LoadAverage,
    CpuUsage,
}

impl SourceKind {
    #[must_use]
    pub const fn config_key(self) -> &'static str {
        match self {
            SourceKind::LoadAverage => "loadavg",
            SourceKind::CpuUsage => "usage_cpu",
        }
    }
}
