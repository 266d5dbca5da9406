//! ragline - hybrid retrieval-fusion and streaming-answer pipeline
//!
//! Answers natural-language questions by combining retrieval over a private
//! knowledge corpus with a language model, exposing the result as an
//! incrementally streamed answer plus supporting evidence.
//!
//! # Architecture
//!
//! - Answer cache fast path (content-addressed, TTL)
//! - Concurrent dense (Qdrant) + sparse (Elasticsearch) retrieval
//! - Reciprocal rank fusion into one deduplicated ranking
//! - Streamed generation with token-by-token forwarding
//! - Best-effort cache population and durable conversation history

pub mod errors;
pub mod types;
pub mod config;
pub mod fusion;
pub mod embedding;
pub mod retrieval;
pub mod cache;
pub mod history;
pub mod generation;
pub mod pipeline;

// Re-export commonly used types
pub use errors::{PipelineError, Result};
pub use pipeline::{AnswerPipeline, PipelineOptions};
pub use types::{AnswerEvent, Passage, UserRef};
