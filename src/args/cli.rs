use clap::Parser;

use super::parsers::parse_positive_usize;
use super::types::{OutputFormat, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Host-metrics sampling daemon - samples load average and CPU usage every second and prints windowed averages."
)]
pub struct DaemonArgs {
    /// Path to a TOML or JSON config file (defaults to ./hoststat.toml, then ./hoststat.json)
    #[arg(long = "config", short = 'c')]
    pub config: Option<String>,

    /// Samples per averaging window [config: depth, default: 5]
    #[arg(long = "depth", short = 'd', value_parser = parse_positive_usize)]
    pub depth: Option<PositiveUsize>,

    /// Ticks between consecutive windows; below depth the windows overlap [config: rate, default: 2]
    #[arg(long = "rate", short = 'r', value_parser = parse_positive_usize)]
    pub rate: Option<PositiveUsize>,

    /// History kept per source, in samples; must be >= depth [config: capacity, default: depth]
    #[arg(long = "capacity", value_parser = parse_positive_usize)]
    pub capacity: Option<PositiveUsize>,

    /// Output format for aggregated snapshots [config: output, default: text]
    #[arg(long = "output", short = 'o', value_enum)]
    pub output: Option<OutputFormat>,

    /// Enable debug logging (overridden by HOSTSTAT_LOG / RUST_LOG)
    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Disable ANSI colors in log output
    #[arg(long = "no-color")]
    pub no_color: bool,
}
