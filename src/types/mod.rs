//! Core types shared across the pipeline.
//!
//! `Passage` is the unit of retrieved evidence; its identity (content plus
//! sorted metadata) is the dedup key used by rank fusion. Metadata values are
//! a closed scalar union so passages stay serializable end to end.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar metadata value attached to a passage.
///
/// Anything non-scalar coming back from a retriever backend is stringified
/// at the adapter boundary; nulls are dropped there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetaValue {
    /// Convert a raw JSON value into a scalar, stringifying structures.
    /// Returns `None` for nulls, which callers drop.
    pub fn from_json(value: serde_json::Value) -> Option<MetaValue> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(MetaValue::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(MetaValue::Int(i))
                } else {
                    n.as_f64().map(MetaValue::Float)
                }
            }
            serde_json::Value::String(s) => Some(MetaValue::Str(s)),
            other => Some(MetaValue::Str(other.to_string())),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Str(s.to_string())
    }
}

impl From<i64> for MetaValue {
    fn from(i: i64) -> Self {
        MetaValue::Int(i)
    }
}

impl From<f64> for MetaValue {
    fn from(f: f64) -> Self {
        MetaValue::Float(f)
    }
}

/// Ordered metadata mapping. BTreeMap keeps keys sorted so the serialized
/// form is byte-stable, which passage identity depends on.
pub type Metadata = BTreeMap<String, MetaValue>;

/// A retrieved unit of evidence text plus provenance metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    pub metadata: Metadata,
}

impl Passage {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Identity key for dedup: content plus sorted-key metadata, serialized.
    /// Two passages are the same evidence iff their keys are byte-identical.
    pub fn identity(&self) -> String {
        let meta = serde_json::to_string(&self.metadata).unwrap_or_default();
        format!("{}\u{0}{}", self.content, meta)
    }
}

/// One event in the incrementally produced answer sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerEvent {
    /// A fragment of answer text, forwarded as soon as it is produced
    Token { text: String },

    /// Provenance footer: metadata of the passages used, in fusion-rank order
    SourcesFooter { sources: Vec<Metadata> },

    /// A stage failed before any answer text existed
    Error { description: String },
}

/// Chat message handed to the generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Reference to the asking user, threaded through to history persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
}

impl UserRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, MetaValue)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_identity_stable_under_insertion_order() {
        let mut a = Metadata::new();
        a.insert("page".to_string(), MetaValue::Int(3));
        a.insert("source".to_string(), "doc.pdf".into());

        let mut b = Metadata::new();
        b.insert("source".to_string(), "doc.pdf".into());
        b.insert("page".to_string(), MetaValue::Int(3));

        let p1 = Passage::new("same text", a);
        let p2 = Passage::new("same text", b);
        assert_eq!(p1.identity(), p2.identity());
    }

    #[test]
    fn test_identity_differs_on_metadata() {
        let p1 = Passage::new("text", meta(&[("page", MetaValue::Int(1))]));
        let p2 = Passage::new("text", meta(&[("page", MetaValue::Int(2))]));
        assert_ne!(p1.identity(), p2.identity());
    }

    #[test]
    fn test_meta_value_from_json_scalars() {
        assert_eq!(
            MetaValue::from_json(serde_json::json!("s")),
            Some(MetaValue::Str("s".to_string()))
        );
        assert_eq!(
            MetaValue::from_json(serde_json::json!(42)),
            Some(MetaValue::Int(42))
        );
        assert_eq!(
            MetaValue::from_json(serde_json::json!(1.5)),
            Some(MetaValue::Float(1.5))
        );
        assert_eq!(
            MetaValue::from_json(serde_json::json!(true)),
            Some(MetaValue::Bool(true))
        );
        assert_eq!(MetaValue::from_json(serde_json::Value::Null), None);
    }

    #[test]
    fn test_meta_value_stringifies_structures() {
        let v = MetaValue::from_json(serde_json::json!({"a": 1})).unwrap();
        assert_eq!(v, MetaValue::Str("{\"a\":1}".to_string()));
    }

    #[test]
    fn test_answer_event_serialization() {
        let event = AnswerEvent::Token {
            text: "hello".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: AnswerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
