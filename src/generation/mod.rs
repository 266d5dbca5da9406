//! Streaming answer generation.
//!
//! The generator is a capability object injected into the pipeline: given a
//! prompt as chat messages it yields text fragments one at a time, suspending
//! between fragments. Fragments are never duplicated or reordered. Dropping
//! the stream early releases the underlying connection.

pub mod client;
pub mod parser;

use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;

use crate::errors::Result;
use crate::types::ChatMessage;

pub use client::OllamaGenerator;

/// Lazy sequence of answer-text fragments
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Streams tokens from a language model given a constructed prompt
#[async_trait]
pub trait Generator: Send + Sync {
    /// Open a token stream for the given prompt messages.
    ///
    /// An `Err` here means generation never started; an `Err` item inside
    /// the stream means it broke mid-answer.
    async fn stream(&self, messages: &[ChatMessage]) -> Result<TokenStream>;
}
