use thiserror::Error;

use super::{SourceError, ValidationError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("gathering: {0}")]
    Source(#[from] SourceError),
    #[error("gathering: buffer returned {found} of {expected} window samples")]
    BufferInconsistency { expected: usize, found: usize },
    #[error("gathering: aggregation task failed: {source}")]
    AggregationJoin {
        #[from]
        source: tokio::task::JoinError,
    },
    #[error("invalid pipeline settings: {0}")]
    Validation(#[from] ValidationError),
}
