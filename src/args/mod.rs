//! CLI argument types and parsing helpers.
mod cli;
mod parsers;
mod types;


pub use cli::DaemonArgs;
pub use types::{OutputFormat, PositiveUsize};
