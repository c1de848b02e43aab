//! Document chunking for the retrieval pipeline
//!
//! Turns transcripts into retrievable units:
//! - paragraph accumulation with topic-transition splits, falling back to
//!   sentence accumulation for unstructured text
//! - a force-split pass that bounds every chunk's size
//! - an optional speaker-aware mode that segments on titled speakers first
//!
//! Chunk ids are stable: the same document content always produces the
//! same chunks.

pub mod chunker;
pub mod speaker;
pub mod types;

pub use chunker::{clean_content, TranscriptChunker};
pub use speaker::{extract_segments, SpeakerSegment};
pub use types::{
    content_hash, Chunk, ChunkingConfig, ChunkingStrategy, Document, DOCUMENT_HEADER_SPEAKER,
    UNKNOWN_SPEAKER,
};
