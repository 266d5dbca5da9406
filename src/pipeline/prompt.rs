//! Generation prompt construction.
//!
//! The system message carries the evidence block (fused passage contents
//! joined by a fixed delimiter) plus citation instructions; the user message
//! is the raw question. When retrieval produced nothing, the evidence block
//! is replaced by an explicit no-evidence sentence so the model answers from
//! general knowledge instead of hallucinating citations.

use crate::types::{ChatMessage, Passage};

/// Delimiter between passage contents inside the evidence block
pub const EVIDENCE_DELIMITER: &str = "\n\n---\n\n";

/// Marker sentence used when both retrievers came back empty
pub const NO_EVIDENCE_MARKER: &str =
    "No reference passages were found for this question. Answer from your general knowledge.";

const INSTRUCTIONS_WITH_EVIDENCE: &str = "You are a knowledge-base assistant. Use the \
reference passages below together with your general knowledge to answer the user's \
question. Cite the passages you rely on. If the passages do not contain enough \
information, say so honestly.";

const INSTRUCTIONS_WITHOUT_EVIDENCE: &str = "You are a knowledge-base assistant. If you \
are not confident in the answer, say so honestly.";

/// Build the chat messages for one generation call
pub fn build_prompt(question: &str, passages: &[Passage]) -> Vec<ChatMessage> {
    let system = if passages.is_empty() {
        format!("{}\n\n{}", INSTRUCTIONS_WITHOUT_EVIDENCE, NO_EVIDENCE_MARKER)
    } else {
        let evidence = passages
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join(EVIDENCE_DELIMITER);
        format!(
            "{}\n\n[Reference passages]\n{}",
            INSTRUCTIONS_WITH_EVIDENCE, evidence
        )
    };

    vec![ChatMessage::system(system), ChatMessage::user(question)]
}
