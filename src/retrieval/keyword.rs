//! Sparse keyword retrieval over an Elasticsearch full-text index.
//!
//! Issues a standard `match` query on the `content` field. The `_source`
//! document carries the passage text under `content`; remaining scalar
//! fields become provenance metadata.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::Retriever;
use crate::errors::{PipelineError, Result};
use crate::types::{MetaValue, Metadata, Passage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Retriever backed by an Elasticsearch match query
pub struct KeywordRetriever {
    client: Client,
    base_url: String,
    index: String,
}

impl KeywordRetriever {
    pub fn new(base_url: &str, index: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PipelineError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
        })
    }

    fn unavailable(&self, reason: impl std::fmt::Display) -> PipelineError {
        PipelineError::RetrievalUnavailable {
            source_name: "keyword".to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Passage>> {
        let url = format!("{}/{}/_search", self.base_url, self.index);

        let body = json!({
            "query": { "match": { "content": question } },
            "size": k,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        if !response.status().is_success() {
            return Err(self.unavailable(format!("HTTP {}", response.status())));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| self.unavailable(format!("bad response: {}", e)))?;

        Ok(search
            .hits
            .hits
            .into_iter()
            .map(|hit| source_to_passage(hit.source))
            .collect())
    }
}

/// Convert a `_source` document into a passage, keeping only scalar fields.
fn source_to_passage(source: serde_json::Map<String, serde_json::Value>) -> Passage {
    let mut content = String::new();
    let mut metadata = Metadata::new();

    for (key, value) in source {
        if key == "content" {
            if let serde_json::Value::String(s) = value {
                content = s;
            }
        } else if let Some(scalar) = MetaValue::from_json(value) {
            metadata.insert(key, scalar);
        }
    }

    Passage::new(content, metadata)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: serde_json::Map<String, serde_json::Value>,
}
