//! Incremental parser for newline-delimited JSON chat frames.
//!
//! The chat endpoint streams one JSON object per line; HTTP chunk boundaries
//! fall anywhere, so bytes are buffered until a full line is available. Each
//! frame carries a `message.content` fragment and a `done` flag.

use serde::Deserialize;

use crate::errors::{PipelineError, Result};

/// Maximum buffered bytes before the stream is considered malformed (1MB)
pub const MAX_BUFFER_SIZE: usize = 1_048_576;

/// One decoded chat frame
#[derive(Debug, Clone, PartialEq)]
pub struct ChatFrame {
    /// Answer-text fragment, possibly empty on the final frame
    pub content: String,
    /// True on the terminal frame of the stream
    pub done: bool,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    content: String,
}

/// Line-buffering NDJSON frame parser
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self { buffer: Vec::with_capacity(4096) }
    }

    /// Feed a chunk of bytes, returning every frame completed by it.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<Vec<ChatFrame>> {
        if self.buffer.len() + bytes.len() > MAX_BUFFER_SIZE {
            return Err(PipelineError::StreamDecode(format!(
                "frame buffer overflow: {} bytes exceeds maximum {}",
                self.buffer.len() + bytes.len(),
                MAX_BUFFER_SIZE
            )));
        }

        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            frames.push(Self::decode(trimmed)?);
        }

        Ok(frames)
    }

    fn decode(line: &str) -> Result<ChatFrame> {
        let raw: RawFrame = serde_json::from_str(line)
            .map_err(|e| PipelineError::StreamDecode(format!("bad frame: {}", e)))?;

        Ok(ChatFrame {
            content: raw.message.map(|m| m.content).unwrap_or_default(),
            done: raw.done,
        })
    }

    /// Decode whatever remains after the upstream closed without a newline.
    pub fn finish(&mut self) -> Result<Option<ChatFrame>> {
        let remainder = String::from_utf8_lossy(&self.buffer).trim().to_string();
        self.buffer.clear();
        if remainder.is_empty() {
            return Ok(None);
        }
        Self::decode(&remainder).map(Some)
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_complete_frame() {
        let mut parser = FrameParser::new();
        let frames = parser
            .push_bytes(b"{\"message\":{\"content\":\"Hel\"},\"done\":false}\n")
            .unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].content, "Hel");
        assert!(!frames[0].done);
        assert!(parser.is_empty());
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut parser = FrameParser::new();
        assert!(parser
            .push_bytes(b"{\"message\":{\"content\":")
            .unwrap()
            .is_empty());

        let frames = parser.push_bytes(b"\"lo\"},\"done\":false}\n").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].content, "lo");
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut parser = FrameParser::new();
        let chunk = b"{\"message\":{\"content\":\"a\"},\"done\":false}\n\
                      {\"message\":{\"content\":\"b\"},\"done\":false}\n";
        let frames = parser.push_bytes(chunk).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].content, "a");
        assert_eq!(frames[1].content, "b");
    }

    #[test]
    fn test_done_frame_without_message() {
        let mut parser = FrameParser::new();
        let frames = parser.push_bytes(b"{\"done\":true}\n").unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].content, "");
        assert!(frames[0].done);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut parser = FrameParser::new();
        let frames = parser.push_bytes(b"\n\n{\"done\":true}\n\n").unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_finish_decodes_unterminated_frame() {
        let mut parser = FrameParser::new();
        parser
            .push_bytes(b"{\"message\":{\"content\":\"tail\"},\"done\":true}")
            .unwrap();

        let frame = parser.finish().unwrap().unwrap();
        assert_eq!(frame.content, "tail");
        assert!(frame.done);
        assert!(parser.is_empty());
    }

    #[test]
    fn test_finish_on_empty_buffer() {
        let mut parser = FrameParser::new();
        assert!(parser.finish().unwrap().is_none());
    }

    #[test]
    fn test_garbage_line_is_an_error() {
        let mut parser = FrameParser::new();
        assert!(parser.push_bytes(b"not json\n").is_err());
    }

    #[test]
    fn test_buffer_overflow() {
        let mut parser = FrameParser::new();
        let oversized = vec![b'x'; MAX_BUFFER_SIZE + 1];
        let result = parser.push_bytes(&oversized);
        assert!(matches!(result, Err(PipelineError::StreamDecode(_))));
    }
}
