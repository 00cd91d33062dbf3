//! Configuration loading and resolution.
mod loader;
mod settings;
pub mod types;


pub use loader::load_config;
pub use settings::DaemonSettings;
pub use types::{ConfigFile, SourceKind, SourceToggle, SourcesConfig};

#[cfg(test)]
pub(crate) use loader::load_config_file;
