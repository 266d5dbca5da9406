//! Pipeline orchestrator.
//!
//! Sequences one question through cache check, concurrent retrieval, rank
//! fusion, prompt construction, streamed generation, and cache/history
//! write-back. Events are produced through a bounded channel of capacity 1,
//! so production suspends until the consumer takes each event and a dropped
//! receiver stops the pipeline (the client-disconnect policy).

pub mod framing;
pub mod prompt;

use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::AnswerCache;
use crate::config::RetrievalConfig;
use crate::errors::Result;
use crate::fusion::{reciprocal_rank_fusion, DEFAULT_RRF_K};
use crate::generation::Generator;
use crate::history::HistoryRecorder;
use crate::retrieval::Retriever;
use crate::types::{AnswerEvent, Metadata, Passage, UserRef};

/// Visible notice appended as a token when the model stream breaks mid-answer
pub const INTERRUPTION_NOTICE: &str = "\n[generation interrupted]";

/// Fragment sent when no answer text could be produced at all
pub const APOLOGY: &str =
    "Sorry, something went wrong while answering your question. Please try again.";

/// Orchestrator tuning knobs
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Passages requested from each retriever
    pub retrieval_k: usize,
    /// Fused passages kept for the prompt
    pub used_passages: usize,
    /// Per-retriever timeout; a hang degrades to an empty result
    pub retrieval_timeout: Duration,
    /// RRF smoothing constant
    pub rrf_k: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            retrieval_k: 5,
            used_passages: 6,
            retrieval_timeout: Duration::from_secs(3),
            rrf_k: DEFAULT_RRF_K,
        }
    }
}

impl From<&RetrievalConfig> for PipelineOptions {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            retrieval_k: config.top_k,
            used_passages: config.used_passages,
            retrieval_timeout: Duration::from_millis(config.timeout_ms),
            rrf_k: DEFAULT_RRF_K,
        }
    }
}

/// The answer pipeline. Cheap to clone; all capabilities are shared.
#[derive(Clone)]
pub struct AnswerPipeline {
    vector: Arc<dyn Retriever>,
    keyword: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    cache: AnswerCache,
    history: Arc<dyn HistoryRecorder>,
    options: PipelineOptions,
}

impl AnswerPipeline {
    pub fn new(
        vector: Arc<dyn Retriever>,
        keyword: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        cache: AnswerCache,
        history: Arc<dyn HistoryRecorder>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            vector,
            keyword,
            generator,
            cache,
            history,
            options,
        }
    }

    /// Answer a question as an incrementally produced event sequence.
    ///
    /// The sequence is finite and not restartable; each call re-executes the
    /// full pipeline. The receiver must be consumed to drive production.
    pub fn answer(&self, question: String, user: UserRef) -> mpsc::Receiver<AnswerEvent> {
        let (tx, rx) = mpsc::channel(1);
        let pipeline = self.clone();
        tokio::spawn(async move {
            pipeline.run(question, user, tx).await;
        });
        rx
    }

    async fn run(&self, question: String, user: UserRef, tx: mpsc::Sender<AnswerEvent>) {
        // Fast path: replay a cached answer. A cache read failure is a miss.
        match self.cache.get(&question).await {
            Ok(Some(hit)) => {
                info!("cache hit, replaying answer");
                if !send(&tx, AnswerEvent::Token { text: hit.answer.clone() }).await {
                    return;
                }
                if !send(&tx, AnswerEvent::SourcesFooter { sources: hit.sources.clone() }).await {
                    return;
                }
                // A cache hit still counts as a completed turn.
                self.record_history(&user, &question, &hit.answer, &hit.sources)
                    .await;
                return;
            }
            Ok(None) => debug!("cache miss"),
            Err(err) => warn!(error = %err, "cache lookup failed, treating as miss"),
        }

        // Both retrievers run concurrently; each failure or timeout degrades
        // to an empty list for that retriever only.
        let k = self.options.retrieval_k;
        let timeout = self.options.retrieval_timeout;
        let (vector_result, keyword_result) = tokio::join!(
            tokio::time::timeout(timeout, self.vector.retrieve(&question, k)),
            tokio::time::timeout(timeout, self.keyword.retrieve(&question, k)),
        );
        let vector_passages = flatten_retrieval(self.vector.name(), vector_result);
        let keyword_passages = flatten_retrieval(self.keyword.name(), keyword_result);

        let mut used_passages =
            reciprocal_rank_fusion(&[vector_passages, keyword_passages], self.options.rrf_k);
        used_passages.truncate(self.options.used_passages);
        debug!(count = used_passages.len(), "fused evidence passages");

        let messages = prompt::build_prompt(&question, &used_passages);
        let sources: Vec<Metadata> = used_passages.iter().map(|p| p.metadata.clone()).collect();

        // Stream the answer, forwarding fragments as they arrive while
        // accumulating the full text for write-back. Notices are events
        // only; full_answer holds model output exclusively.
        let mut full_answer = String::new();
        match self.generator.stream(&messages).await {
            Ok(mut stream) => {
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(fragment) => {
                            full_answer.push_str(&fragment);
                            if !send(&tx, AnswerEvent::Token { text: fragment }).await {
                                // Consumer went away: stop generating, skip
                                // write-back for the abandoned request.
                                return;
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "generation interrupted mid-stream");
                            let notice = AnswerEvent::Token {
                                text: INTERRUPTION_NOTICE.to_string(),
                            };
                            if !send(&tx, notice).await {
                                return;
                            }
                            break;
                        }
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "generation never started");
                let description = err.to_string();
                if !send(&tx, AnswerEvent::Error { description }).await {
                    return;
                }
                if !send(&tx, AnswerEvent::Token { text: APOLOGY.to_string() }).await {
                    return;
                }
            }
        }

        if !send(&tx, AnswerEvent::SourcesFooter { sources: sources.clone() }).await {
            return;
        }

        if !full_answer.is_empty() {
            // Cache population is a detached unit of work: dispatched without
            // awaiting, result discarded, failure logged by the task itself.
            let cache = self.cache.clone();
            let cache_question = question.clone();
            let cache_answer = full_answer.clone();
            let cache_sources = sources.clone();
            tokio::spawn(async move {
                if let Err(err) = cache
                    .put(&cache_question, &cache_answer, &cache_sources)
                    .await
                {
                    warn!(error = %err, "cache write-back failed");
                }
            });

            self.record_history(&user, &question, &full_answer, &sources)
                .await;
        }
    }

    /// History write-back: awaited, but failure is logged and swallowed.
    /// The answer has already been delivered by the time this runs.
    async fn record_history(
        &self,
        user: &UserRef,
        question: &str,
        answer: &str,
        sources: &[Metadata],
    ) {
        if let Err(err) = self.history.record(user, question, answer, sources).await {
            warn!(error = %err, "history write-back failed");
        }
    }
}

/// Map a timed retrieval outcome to a passage list, logging degradation once.
fn flatten_retrieval(
    name: &str,
    outcome: std::result::Result<Result<Vec<Passage>>, tokio::time::error::Elapsed>,
) -> Vec<Passage> {
    match outcome {
        Ok(Ok(passages)) => passages,
        Ok(Err(err)) => {
            warn!(retriever = name, error = %err, "retriever failed, degrading to empty");
            Vec::new()
        }
        Err(_) => {
            warn!(retriever = name, "retriever timed out, degrading to empty");
            Vec::new()
        }
    }
}

/// Send an event, reporting whether the consumer is still listening
async fn send(tx: &mpsc::Sender<AnswerEvent>, event: AnswerEvent) -> bool {
    tx.send(event).await.is_ok()
}
