use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to serialize snapshot: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write snapshot: {source}")]
    Write {
        #[source]
        source: std::io::Error,
    },
}
