//! Error types for the answer pipeline.
//!
//! Every failure in the pipeline is scoped to one request; nothing here is
//! fatal to the process. The orchestrator decides per stage whether an error
//! degrades the response or is swallowed entirely.

use thiserror::Error;

/// Main error type for the retrieval and generation pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A retriever backend could not be reached or rejected the query
    #[error("Retrieval unavailable ({source_name}): {reason}")]
    RetrievalUnavailable { source_name: String, reason: String },

    /// Embedding the query text failed
    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    /// The model stream could not be opened
    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// The model stream broke after it started producing fragments
    #[error("Generation interrupted: {0}")]
    GenerationInterrupted(String),

    /// Answer cache read or write failed
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Conversation history could not be persisted
    #[error("History unavailable: {0}")]
    HistoryUnavailable(String),

    /// Streaming frame could not be decoded
    #[error("Stream decode error: {0}")]
    StreamDecode(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Config(err.to_string())
    }
}
