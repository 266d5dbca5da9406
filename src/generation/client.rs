//! Ollama chat streaming client.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

use super::parser::FrameParser;
use super::{Generator, TokenStream};
use crate::errors::{PipelineError, Result};
use crate::types::ChatMessage;

/// Overall request timeout; individual token gaps are bounded by it too
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Generator backed by an Ollama-compatible `/api/chat` endpoint
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
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

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

struct StreamState {
    body: futures_util::stream::BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    parser: FrameParser,
    pending: VecDeque<String>,
    finished: bool,
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn stream(&self, messages: &[ChatMessage]) -> Result<TokenStream> {
        let url = format!("{}/api/chat", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::GenerationUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::GenerationUnavailable(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let state = StreamState {
            body: response.bytes_stream().boxed(),
            parser: FrameParser::new(),
            pending: VecDeque::new(),
            finished: false,
        };

        // Dropping the returned stream drops the response body with it, so
        // an abandoned consumer releases the connection.
        let stream = futures_util::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(fragment) = state.pending.pop_front() {
                    return Some((Ok(fragment), state));
                }
                if state.finished {
                    return None;
                }

                match state.body.next().await {
                    Some(Ok(chunk)) => match state.parser.push_bytes(&chunk) {
                        Ok(frames) => {
                            for frame in frames {
                                if !frame.content.is_empty() {
                                    state.pending.push_back(frame.content);
                                }
                                if frame.done {
                                    state.finished = true;
                                }
                            }
                        }
                        Err(err) => {
                            state.finished = true;
                            return Some((Err(err), state));
                        }
                    },
                    Some(Err(err)) => {
                        state.finished = true;
                        return Some((
                            Err(PipelineError::GenerationInterrupted(err.to_string())),
                            state,
                        ));
                    }
                    None => {
                        state.finished = true;
                        // Upstream closed without a done frame; salvage any
                        // unterminated tail.
                        if let Ok(Some(frame)) = state.parser.finish() {
                            if !frame.content.is_empty() {
                                state.pending.push_back(frame.content);
                            }
                        }
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }
}
