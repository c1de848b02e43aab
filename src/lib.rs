//! Hansard RAG Library
//!
//! Retrieval-augmented question answering over Pacific parliamentary
//! transcripts:
//! - speaker-aware chunking of Hansard documents
//! - hybrid retrieval (BM25 + dense vectors) fused with Reciprocal Rank
//!   Fusion, with query analysis and multi-pass expansion
//! - grounded answer generation with inline `[#i]` citations
//! - a REST API for search, Q&A, and document access
//!
//! # Example
//!
//! ```rust,no_run
//! use hansard_rag::{api, RagConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RagConfig::default();
//!     let state = api::AppState::new(config.clone());
//!     api::start_server(state, &config.server.host, config.server.port).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generator;
pub mod index;
pub mod ingest;
pub mod prompt;
pub mod rag;
pub mod retrieval;

// Re-export main types
pub use chunking::{
    clean_content, content_hash, Chunk, ChunkingConfig, ChunkingStrategy, Document,
    TranscriptChunker,
};
pub use config::{
    EmbeddingConfig, GeneratorConfig, IndexConfig, RagConfig, RetrievalConfig, ServerConfig,
};
pub use embedding::{Embedder, OllamaEmbedder};
pub use error::{EmbeddingError, GenerationError, IndexError, RagError, Result};
pub use generator::{Generator, GenerationOutput, OllamaGenerator};
pub use index::{
    FullDocument, IndexGateway, IndexStats, IndexedRecord, RawHit, SearchFilters, SolrGateway,
};
pub use ingest::{IngestPipeline, IngestReport, IngestSummary};
pub use prompt::Prompter;
pub use rag::{AnswerOutcome, AnswerOutcomeKind, RagOrchestrator, SourceCitation};
pub use retrieval::{
    AuthorityLevel, EnhancedRetriever, HybridRetriever, QueryAnalysis, QueryAnalyzer, QueryIntent,
    Reranker, SearchResult,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
