use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::RagError;
use crate::answer::Answerer;
use crate::chat::OpenAiChatClient;
use crate::config::{Config, get_config_dir};
use crate::embeddings::OpenAiEmbeddingClient;
use crate::index::VectorStore;
use crate::ingest::queue::ChangeQueue;
use crate::ingest::{ContentRecord, Ingestor};

fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    Config::load(config_dir)
}

/// Create the vector index with the configured schema. Safe to run
/// repeatedly; an existing index with a matching layout is left alone.
#[inline]
pub async fn init_index() -> Result<()> {
    let config = load_config()?;

    let store = VectorStore::connect(&config)
        .await
        .context("Failed to initialize vector store")?;

    let count = store.count_documents().await?;
    println!(
        "Index '{}' ready ({} dimensions, {} documents)",
        config.index.name, config.embedding.dimensions, count
    );

    Ok(())
}

/// Enqueue a change notification from a JSON file of content records and
/// drain the queue through the ingestion pipeline.
#[inline]
pub async fn ingest_file(path: &Path) -> Result<()> {
    let config = load_config()?;

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file: {}", path.display()))?;
    let records: Vec<ContentRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse records file: {}", path.display()))?;

    info!("Read {} content records from {}", records.len(), path.display());

    let queue = ChangeQueue::open(config.queue_path())
        .await
        .context("Failed to open change queue")?;
    queue
        .enqueue(&records)
        .await
        .context("Failed to enqueue change events")?;

    let embedder = Arc::new(
        OpenAiEmbeddingClient::new(&config.embedding)
            .context("Failed to create embedding client")?,
    );
    let store = Arc::new(
        VectorStore::connect(&config)
            .await
            .context("Failed to initialize vector store")?,
    );
    let ingestor = Ingestor::new(embedder, store, &config.ingest);

    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} Ingesting {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(format!("{} change events", records.len()));
    bar.enable_steady_tick(std::time::Duration::from_millis(120));

    let report = queue.drain(&ingestor, &config.ingest).await;
    bar.finish_and_clear();

    let report = report.context("Ingestion failed")?;
    println!(
        "Ingest complete: {} documents upserted, {} records skipped, {} failed attempts",
        report.succeeded, report.skipped, report.failed
    );

    Ok(())
}

/// Answer one question from the command line.
#[inline]
pub async fn ask(question: &str) -> Result<()> {
    let config = load_config()?;

    let embedder = Arc::new(
        OpenAiEmbeddingClient::new(&config.embedding)
            .context("Failed to create embedding client")?,
    );
    let chat =
        Arc::new(OpenAiChatClient::new(&config.chat).context("Failed to create chat client")?);
    let store = Arc::new(
        VectorStore::connect(&config)
            .await
            .context("Failed to initialize vector store")?,
    );

    let answerer = Answerer::new(embedder, store, chat, config.index.top_k);

    match answerer.answer(question).await {
        Ok(answer) => {
            println!("{}", answer);
            Ok(())
        }
        Err(RagError::InvalidInput(message)) => {
            println!("Please enter a question ({}).", message);
            Ok(())
        }
        Err(e) => {
            // Detail goes to the log; the user sees a generic failure
            // rather than raw provider error text.
            error!("Failed to answer question: {}", e);
            println!("Sorry, something went wrong while answering. Please try again.");
            Ok(())
        }
    }
}

/// Show index and queue health.
#[inline]
pub async fn show_status() -> Result<()> {
    let config = load_config()?;

    let store = VectorStore::connect(&config)
        .await
        .context("Failed to initialize vector store")?;
    let document_count = store.count_documents().await?;

    let queue = ChangeQueue::open(config.queue_path())
        .await
        .context("Failed to open change queue")?;
    let stats = queue.stats().await?;

    println!("📦 Index '{}'", config.index.name);
    println!("   Documents: {}", document_count);
    println!("   Dimensions: {}", config.embedding.dimensions);
    println!();
    println!("🗂  Change queue");
    println!("   Pending: {}", stats.pending);
    println!("   Completed: {}", stats.completed);
    println!("   Failed: {}", stats.failed);

    if stats.failed > 0 {
        println!();
        println!(
            "⚠️  {} change events exhausted their retries; fix the cause and re-ingest.",
            stats.failed
        );
    }

    Ok(())
}

/// Run the interactive configuration flow.
#[inline]
pub fn configure() -> Result<()> {
    let config = load_config()?;
    crate::config::run_interactive_config(config)
}

/// Print the current configuration.
#[inline]
pub fn print_config() -> Result<()> {
    let config = load_config()?;
    crate::config::show_config(&config)
}
