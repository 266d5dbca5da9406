//! Dense similarity retrieval over a Qdrant collection.

use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        with_payload_selector::SelectorOptions, SearchPoints, Value as QdrantValue,
        WithPayloadSelector,
    },
};
use std::sync::Arc;

use super::Retriever;
use crate::embedding::Embedder;
use crate::errors::{PipelineError, Result};
use crate::types::{MetaValue, Metadata, Passage};

/// Payload key holding the passage text; everything else becomes metadata.
const CONTENT_KEY: &str = "content";

/// Retriever backed by a Qdrant dense index.
///
/// The question is embedded through the injected [`Embedder`] capability and
/// compared against the collection by cosine similarity.
pub struct VectorRetriever {
    client: QdrantClient,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl VectorRetriever {
    pub fn new(url: &str, collection: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .map_err(|e| PipelineError::RetrievalUnavailable {
                source_name: "vector".to_string(),
                reason: format!("client setup failed: {}", e),
            })?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            embedder,
        })
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    fn name(&self) -> &str {
        "vector"
    }

    async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Passage>> {
        let query_vector = self.embedder.embed(question).await?;

        let search_result = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: query_vector,
                limit: k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| PipelineError::RetrievalUnavailable {
                source_name: "vector".to_string(),
                reason: e.to_string(),
            })?;

        let passages = search_result
            .result
            .into_iter()
            .map(|point| {
                let mut content = String::new();
                let mut metadata = Metadata::new();
                for (key, value) in point.payload {
                    if key == CONTENT_KEY {
                        content = qdrant_value_to_string(&value).unwrap_or_default();
                    } else if let Some(scalar) = qdrant_value_to_scalar(&value) {
                        metadata.insert(key, scalar);
                    }
                }
                Passage::new(content, metadata)
            })
            .collect();

        Ok(passages)
    }
}

fn qdrant_value_to_scalar(value: &QdrantValue) -> Option<MetaValue> {
    value.kind.as_ref().and_then(|kind| {
        use qdrant_client::qdrant::value::Kind;
        match kind {
            Kind::StringValue(s) => Some(MetaValue::Str(s.clone())),
            Kind::IntegerValue(i) => Some(MetaValue::Int(*i)),
            Kind::DoubleValue(f) => Some(MetaValue::Float(*f)),
            Kind::BoolValue(b) => Some(MetaValue::Bool(*b)),
            // Lists and nested structs are not scalar evidence provenance;
            // stringify so the passage type stays closed.
            Kind::ListValue(_) | Kind::StructValue(_) => {
                Some(MetaValue::Str(format!("{:?}", kind)))
            }
            Kind::NullValue(_) => None,
        }
    })
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    value.kind.as_ref().and_then(|kind| {
        use qdrant_client::qdrant::value::Kind;
        match kind {
            Kind::StringValue(s) => Some(s.clone()),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversion() {
        let v = QdrantValue::from("path/to/doc.pdf".to_string());
        assert_eq!(
            qdrant_value_to_scalar(&v),
            Some(MetaValue::Str("path/to/doc.pdf".to_string()))
        );

        let v = QdrantValue::from(7i64);
        assert_eq!(qdrant_value_to_scalar(&v), Some(MetaValue::Int(7)));

        let v = QdrantValue::from(true);
        assert_eq!(qdrant_value_to_scalar(&v), Some(MetaValue::Bool(true)));
    }

    #[test]
    fn test_content_extraction_requires_string() {
        let v = QdrantValue::from(42i64);
        assert!(qdrant_value_to_string(&v).is_none());
    }
}
