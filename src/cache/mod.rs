//! Content-addressed answer cache.
//!
//! Maps a question to a previously computed answer plus its source metadata,
//! with a time-to-live. The key is a hash of the *exact* question string; no
//! case folding or trimming is applied, so differently-cased questions are
//! distinct entries by design.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

use crate::errors::Result;
use crate::types::Metadata;

pub use memory::MemoryCacheStore;

/// Namespace prefix for cache keys
const KEY_PREFIX: &str = "rag_cache:";

/// Cached value: the full answer text plus the source metadata list.
/// Passage content is not cached; a hit replays metadata only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAnswer {
    pub answer: String,
    pub sources: Vec<Metadata>,
}

/// Backing store seam: string keys, JSON string values, TTL at write.
/// Implementations must be safe for concurrent pipelines.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<()>;
}

/// Derive the cache key for a question: namespace prefix plus the SHA-256
/// hex digest of the raw question bytes.
pub fn cache_key(question: &str) -> String {
    let digest = Sha256::digest(question.as_bytes());
    format!("{}{:x}", KEY_PREFIX, digest)
}

/// Answer cache client over a pluggable store
#[derive(Clone)]
pub struct AnswerCache {
    store: Arc<dyn CacheStore>,
    ttl_secs: u64,
}

impl AnswerCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    /// Look up a previously computed answer. Expired or missing entries read
    /// as `None`; a corrupt value is treated as absent rather than an error.
    pub async fn get(&self, question: &str) -> Result<Option<CachedAnswer>> {
        let key = cache_key(question);
        let raw = match self.store.get(&key).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        match serde_json::from_str::<CachedAnswer>(&raw) {
            Ok(entry) => {
                debug!(key = %key, "answer cache hit");
                Ok(Some(entry))
            }
            Err(err) => {
                debug!(key = %key, error = %err, "discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Store an answer under the question's derived key with the configured
    /// TTL. Callers never retry a failed write synchronously.
    pub async fn put(&self, question: &str, answer: &str, sources: &[Metadata]) -> Result<()> {
        let key = cache_key(question);
        let value = serde_json::to_string(&CachedAnswer {
            answer: answer.to_string(),
            sources: sources.to_vec(),
        })?;
        self.store.set(&key, value, self.ttl_secs).await
    }
}
