use thiserror::Error;

use super::PipelineError;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("daemon running: pipeline '{source_name}' failed: {source}")]
    PipelineFailed {
        source_name: &'static str,
        #[source]
        source: PipelineError,
    },
    #[error("daemon running: task failed: {source}")]
    TaskJoin {
        #[from]
        source: tokio::task::JoinError,
    },
    #[error("daemon has no pipelines to run")]
    NoPipelines,
}
