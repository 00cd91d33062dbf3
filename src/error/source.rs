use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_name}: failed to read '{path}': {source}")]
    Unavailable {
        source_name: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{source_name}: invalid source data: {detail}")]
    InvalidData {
        source_name: &'static str,
        detail: String,
    },
    #[error("{source_name} averaging: no samples in window")]
    InsufficientSamples { source_name: &'static str },
}
