//! Durable conversation history.
//!
//! Every completed pipeline run, cache hit or miss, persists one conversation
//! turn: a conversation row owning a user message and an assistant message.
//! Turns are written atomically and never mutated afterward; messages cascade
//! with their conversation on deletion.

pub mod sqlite;

use async_trait::async_trait;

use crate::errors::Result;
use crate::types::{Metadata, UserRef};

pub use sqlite::SqliteHistory;

/// Number of question characters kept as the conversation title
pub const TITLE_LEN: usize = 30;

/// Persists question/answer/evidence triples as conversation turns
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    /// Record one completed turn. Implementations must write the conversation
    /// row and both message rows atomically.
    async fn record(
        &self,
        user: &UserRef,
        question: &str,
        answer: &str,
        sources: &[Metadata],
    ) -> Result<()>;
}

/// Title derivation: first [`TITLE_LEN`] characters of the question,
/// respecting char boundaries.
pub fn title_for(question: &str) -> String {
    question.chars().take(TITLE_LEN).collect()
}
