//! Hansard document ingest
//!
//! Usage:
//!   hansard-ingest <DOCUMENTS_JSONL> [CONFIG_PATH]
//!
//! Reads one JSON document per line and indexes it: clean, chunk, embed,
//! and replace any chunks from earlier ingests of the same document.

use hansard_rag::config::RagConfig;
use hansard_rag::embedding::OllamaEmbedder;
use hansard_rag::index::SolrGateway;
use hansard_rag::ingest::IngestPipeline;
use hansard_rag::TranscriptChunker;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let documents_path = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: hansard-ingest <DOCUMENTS_JSONL> [CONFIG_PATH]"))?;

    let mut config = match args.next() {
        Some(path) => RagConfig::from_file(&path)?,
        None => RagConfig::default(),
    };
    config.apply_env();
    config.validate()?;

    info!("Ingesting documents from {}", documents_path);
    info!("Index engine: {}", config.index.url);
    info!("Chunking strategy: {:?}", config.chunking.strategy);

    let pipeline = IngestPipeline::new(
        TranscriptChunker::new(config.chunking.clone()),
        Arc::new(OllamaEmbedder::new(config.embedding.clone())),
        Arc::new(SolrGateway::new(config.index.clone())),
        config.embedding.batch_size,
    );

    let summary = pipeline.ingest_jsonl(&documents_path).await?;

    info!(
        "Done: {} documents, {} chunks indexed ({} lexical-only), {} failures",
        summary.documents, summary.chunks, summary.chunks_without_vector, summary.failures
    );

    Ok(())
}
