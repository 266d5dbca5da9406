//! Query embedding capability.
//!
//! The pipeline treats embedding as an opaque text-to-vector function behind
//! the [`Embedder`] trait, constructed once at the process entry point and
//! injected into the vector retriever. Vectors are normalized to unit length
//! before any similarity comparison.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{PipelineError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Opaque text-to-vector function
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a text into a unit-length vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Scale a vector to unit length. Zero vectors are returned unchanged.
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
    vector
}

/// Embedder backed by an Ollama-compatible `/api/embeddings` endpoint
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PipelineError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let request = EmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::EmbeddingFailed(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::EmbeddingFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::EmbeddingFailed(format!("bad response: {}", e)))?;

        if body.embedding.is_empty() {
            return Err(PipelineError::EmbeddingFailed(
                "empty embedding returned".to_string(),
            ));
        }

        Ok(normalize(
            body.embedding.into_iter().map(|v| v as f32).collect(),
        ))
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f64>,
}
