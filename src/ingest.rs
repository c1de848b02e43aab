//! Ingest pipeline: clean, chunk, embed, and index documents
//!
//! Re-ingesting a document replaces all of its chunks (delete-then-insert,
//! serialized per document id by the gateway). Embedding failures do not
//! block ingest: the affected chunks are indexed lexical-only and can be
//! backfilled by a later upsert.

use crate::chunking::{clean_content, Document, TranscriptChunker};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::index::{IndexGateway, IndexedRecord};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of ingesting one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub doc_id: String,
    pub chunks_indexed: usize,
    /// Chunks indexed without a dense vector after embedding failures
    pub chunks_without_vector: usize,
}

/// Outcome of ingesting a document stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestSummary {
    pub documents: usize,
    pub chunks: usize,
    pub chunks_without_vector: usize,
    pub failures: usize,
}

pub struct IngestPipeline {
    chunker: TranscriptChunker,
    embedder: Arc<dyn Embedder>,
    gateway: Arc<dyn IndexGateway>,
    embed_batch_size: usize,
}

impl IngestPipeline {
    pub fn new(
        chunker: TranscriptChunker,
        embedder: Arc<dyn Embedder>,
        gateway: Arc<dyn IndexGateway>,
        embed_batch_size: usize,
    ) -> Self {
        Self {
            chunker,
            embedder,
            gateway,
            embed_batch_size: embed_batch_size.max(1),
        }
    }

    /// Clean, chunk, embed, and index one document, replacing any chunks
    /// from an earlier ingest of the same `doc_id`.
    pub async fn ingest_document(&self, doc: &Document) -> Result<IngestReport> {
        let mut cleaned = doc.clone();
        cleaned.content = clean_content(&doc.content);

        let chunks = self.chunker.chunk(&cleaned);
        if chunks.is_empty() {
            info!("Document {} produced no chunks", doc.doc_id);
            self.gateway.delete_by_doc_id(&doc.doc_id).await?;
            return Ok(IngestReport {
                doc_id: doc.doc_id.clone(),
                chunks_indexed: 0,
                chunks_without_vector: 0,
            });
        }

        let mut records = Vec::with_capacity(chunks.len());
        let mut without_vector = 0usize;

        for batch in chunks.chunks(self.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            match self.embedder.encode_batch(&texts).await {
                Ok(vectors) => {
                    for (chunk, vector) in batch.iter().zip(vectors) {
                        records.push(IndexedRecord::with_vector(chunk.clone(), vector));
                    }
                }
                Err(e) => {
                    // Indexed without vectors; a later upsert can backfill
                    warn!(
                        "Embedding failed for {} chunks of {}, indexing lexical-only: {}",
                        batch.len(),
                        doc.doc_id,
                        e
                    );
                    without_vector += batch.len();
                    for chunk in batch {
                        records.push(IndexedRecord::new(chunk.clone()));
                    }
                }
            }
        }

        self.gateway.replace_document(&doc.doc_id, &records).await?;

        info!(
            "Ingested {}: {} chunks ({} lexical-only)",
            doc.doc_id,
            records.len(),
            without_vector
        );

        Ok(IngestReport {
            doc_id: doc.doc_id.clone(),
            chunks_indexed: records.len(),
            chunks_without_vector: without_vector,
        })
    }

    /// Ingest a JSONL stream of documents, one JSON object per line.
    /// Malformed lines and per-document failures are logged and counted,
    /// not fatal.
    pub async fn ingest_jsonl<P: AsRef<Path>>(&self, path: P) -> Result<IngestSummary> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);

        let mut summary = IngestSummary::default();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let mut doc: Document = match serde_json::from_str(&line) {
                Ok(doc) => doc,
                Err(e) => {
                    error!("Skipping malformed document on line {}: {}", line_no + 1, e);
                    summary.failures += 1;
                    continue;
                }
            };

            // Documents arriving without an id get one minted here; the id
            // is what makes later re-ingests replace instead of duplicate
            if doc.doc_id.trim().is_empty() {
                doc.doc_id = uuid::Uuid::new_v4().to_string();
            }

            match self.ingest_document(&doc).await {
                Ok(report) => {
                    summary.documents += 1;
                    summary.chunks += report.chunks_indexed;
                    summary.chunks_without_vector += report.chunks_without_vector;
                }
                Err(e) => {
                    error!("Failed to ingest document {}: {}", doc.doc_id, e);
                    summary.failures += 1;
                }
            }
        }

        info!(
            "Ingest complete: {} documents, {} chunks, {} failures",
            summary.documents, summary.chunks, summary.failures
        );

        Ok(summary)
    }
}
