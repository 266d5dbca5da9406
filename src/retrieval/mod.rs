//! Retriever adapters over the corpus indexes.
//!
//! The orchestrator treats both backends polymorphically: a retriever is a
//! thing that returns ranked passages for a question. Adapters report
//! transport failure as `Err`; the orchestrator maps that to an empty result
//! and logs once, so no backend outage can abort a request.

pub mod keyword;
pub mod vector;

use async_trait::async_trait;

use crate::errors::Result;
use crate::types::Passage;

pub use keyword::KeywordRetriever;
pub use vector::VectorRetriever;

/// A ranked-passage source for a question
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Short name used in logs when this retriever degrades
    fn name(&self) -> &str;

    /// Return up to `k` passages, best-first. May be empty.
    async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Passage>>;
}
