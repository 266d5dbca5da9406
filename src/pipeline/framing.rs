//! Caller-facing stream framing.
//!
//! The wire shape is raw answer-text fragments, then a literal delimiter
//! line, then one JSON-serialized metadata object per line, one per used
//! passage, in fusion-rank order.

use crate::types::{AnswerEvent, Metadata};

/// Literal delimiter line between answer text and the source listing
pub const SOURCES_DELIMITER: &str = "---SOURCES---";

/// Render the footer: delimiter line plus one JSON object per source.
pub fn frame_footer(sources: &[Metadata]) -> String {
    let mut out = format!("\n\n{}\n", SOURCES_DELIMITER);
    for metadata in sources {
        let line = serde_json::to_string(metadata).unwrap_or_else(|_| "{}".to_string());
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Fold a finished event sequence into the framed wire text. Error events
/// carry no answer text and are not framed; they are surfaced via logs.
pub fn frame_events<I>(events: I) -> String
where
    I: IntoIterator<Item = AnswerEvent>,
{
    let mut out = String::new();
    for event in events {
        match event {
            AnswerEvent::Token { text } => out.push_str(&text),
            AnswerEvent::SourcesFooter { sources } => out.push_str(&frame_footer(&sources)),
            AnswerEvent::Error { .. } => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetaValue;

    #[test]
    fn test_frame_events_orders_text_before_footer() {
        let mut meta = Metadata::new();
        meta.insert("source".to_string(), MetaValue::Str("a.pdf".to_string()));

        let framed = frame_events(vec![
            AnswerEvent::Token {
                text: "Hello ".to_string(),
            },
            AnswerEvent::Token {
                text: "world".to_string(),
            },
            AnswerEvent::SourcesFooter {
                sources: vec![meta],
            },
        ]);

        let delim_pos = framed.find(SOURCES_DELIMITER).unwrap();
        assert!(framed.starts_with("Hello world"));
        assert!(framed[delim_pos..].contains("{\"source\":\"a.pdf\"}"));
    }

    #[test]
    fn test_footer_one_json_object_per_line() {
        let mut m1 = Metadata::new();
        m1.insert("page".to_string(), MetaValue::Int(1));
        let mut m2 = Metadata::new();
        m2.insert("page".to_string(), MetaValue::Int(2));

        let footer = frame_footer(&[m1, m2]);
        let lines: Vec<&str> = footer.trim().lines().collect();
        assert_eq!(lines[0], SOURCES_DELIMITER);
        assert_eq!(lines[1], "{\"page\":1}");
        assert_eq!(lines[2], "{\"page\":2}");
    }

    #[test]
    fn test_empty_sources_still_emit_delimiter() {
        let footer = frame_footer(&[]);
        assert!(footer.contains(SOURCES_DELIMITER));
    }

    #[test]
    fn test_error_events_are_not_framed() {
        let framed = frame_events(vec![AnswerEvent::Error {
            description: "boom".to_string(),
        }]);
        assert!(framed.is_empty());
    }
}
