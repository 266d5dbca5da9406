use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ragline::cache::{AnswerCache, MemoryCacheStore};
use ragline::config::Config;
use ragline::embedding::OllamaEmbedder;
use ragline::generation::OllamaGenerator;
use ragline::history::SqliteHistory;
use ragline::pipeline::framing::frame_footer;
use ragline::pipeline::{AnswerPipeline, PipelineOptions};
use ragline::retrieval::{KeywordRetriever, VectorRetriever};
use ragline::types::{AnswerEvent, UserRef};

#[derive(Parser)]
#[command(name = "ragline", version, about = "Ask questions over a private knowledge corpus")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream an answer for a question
    Ask {
        /// The question to answer
        question: String,
        /// User id recorded with the conversation turn
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Create the history database schema
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;

    match Cli::parse().command {
        Command::InitDb => {
            SqliteHistory::open(&config.history.db_path).await?;
            eprintln!("history database ready at {}", config.history.db_path.display());
        }
        Command::Ask { question, user } => {
            let pipeline = build_pipeline(&config).await?;
            let mut events = pipeline.answer(question, UserRef::new(user));

            let mut stdout = std::io::stdout();
            while let Some(event) = events.recv().await {
                match event {
                    AnswerEvent::Token { text } => {
                        stdout.write_all(text.as_bytes())?;
                        stdout.flush()?;
                    }
                    AnswerEvent::SourcesFooter { sources } => {
                        stdout.write_all(frame_footer(&sources).as_bytes())?;
                        stdout.flush()?;
                    }
                    AnswerEvent::Error { description } => {
                        tracing::error!(%description, "pipeline error event");
                    }
                }
            }
        }
    }

    Ok(())
}

/// Construct every capability once at the entry point and inject it.
async fn build_pipeline(config: &Config) -> Result<AnswerPipeline> {
    let embedder = Arc::new(OllamaEmbedder::new(
        &config.llm.base_url,
        &config.llm.embedding_model,
    )?);

    let vector = Arc::new(VectorRetriever::new(
        &config.retrieval.qdrant_url,
        &config.retrieval.collection,
        embedder,
    )?);
    let keyword = Arc::new(KeywordRetriever::new(
        &config.retrieval.elasticsearch_url,
        &config.retrieval.index,
    )?);
    let generator = Arc::new(OllamaGenerator::new(&config.llm.base_url, &config.llm.model)?);
    let cache = AnswerCache::new(Arc::new(MemoryCacheStore::new()), config.cache.ttl_secs);
    let history = Arc::new(SqliteHistory::open(&config.history.db_path).await?);

    Ok(AnswerPipeline::new(
        vector,
        keyword,
        generator,
        cache,
        history,
        PipelineOptions::from(&config.retrieval),
    ))
}
