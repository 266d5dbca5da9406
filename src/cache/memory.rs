//! In-process cache store with per-entry TTL.
//!
//! Concurrent map of key to value plus deadline; expired entries are treated
//! as absent on read and swept out on every write, so the map size stays
//! bounded by the live working set. This is the shipped backend behind
//! the [`CacheStore`](super::CacheStore) seam; a networked store slots in
//! without touching the pipeline.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::CacheStore;
use crate::errors::Result;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// DashMap-backed TTL store, cheap to clone and share across pipelines
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, Entry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| now < entry.value().expires_at)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(entry) = self.entries.get(key) {
            if Instant::now() < entry.expires_at {
                return Ok(Some(entry.value.clone()));
            }
        }
        // Expired entries are never surfaced; drop them on the way out.
        self.entries
            .remove_if(key, |_, entry| Instant::now() >= entry.expires_at);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<()> {
        // Sweep on write; reads only evict the key they touched.
        let now = Instant::now();
        self.entries.retain(|_, entry| now < entry.expires_at);

        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + Duration::from_secs(ttl_secs),
            },
        );
        Ok(())
    }
}
