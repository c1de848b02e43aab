//! Type definitions for transcript chunking

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Speaker label for content preceding any attributed speaker
pub const DOCUMENT_HEADER_SPEAKER: &str = "Document Header";

/// Speaker label when no speaker could be attributed
pub const UNKNOWN_SPEAKER: &str = "Unknown Speaker";

/// A source document to be chunked and indexed.
///
/// `doc_id` is a UUID chosen at ingest time and never changes; re-ingest
/// replaces all chunks for the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// UUID chosen at ingest; minted by the pipeline when absent
    #[serde(default)]
    pub doc_id: String,
    #[serde(default)]
    pub title: String,
    /// ISO-8601 day (YYYY-MM-DD)
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub country: String,
    #[serde(default = "default_chamber")]
    pub chamber: String,
    #[serde(default)]
    pub speaker_hint: Option<String>,
    #[serde(default = "default_document_type")]
    pub document_type: String,
    #[serde(default)]
    pub url: String,
    pub content: String,
}

fn default_chamber() -> String {
    "Parliament".to_string()
}

fn default_document_type() -> String {
    "Hansard Document".to_string()
}

impl Document {
    pub fn new(doc_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            title: String::new(),
            date: None,
            country: String::new(),
            chamber: default_chamber(),
            speaker_hint: None,
            document_type: default_document_type(),
            url: String::new(),
            content: content.into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }
}

/// A retrievable chunk of a document.
///
/// `chunk_id` is `"{doc_id}_{index}"` with a dense 0-based index; ids are
/// stable across re-ingests of byte-identical content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub doc_id: String,
    pub chunk_index: usize,
    pub speaker: String,
    pub text: String,
    /// Rough token count (1 token ~= 4 characters of English)
    pub token_estimate: usize,
    /// Hex SHA-256 of `text`
    pub content_hash: String,
    pub date: Option<String>,
    pub country: String,
    pub chamber: String,
    pub title: String,
    pub url: String,
    pub document_type: String,
}

/// Hex SHA-256 digest of chunk text; pure function of the input.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Chunking strategy selected per deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Paragraph/sentence chunking over the whole document
    #[default]
    Plain,
    /// Split on titled-speaker boundaries first, then chunk each segment
    SpeakerAware,
}

/// Configuration for the transcript chunker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Chunking strategy
    #[serde(default)]
    pub strategy: ChunkingStrategy,

    /// Maximum chunk size in characters (~1000 tokens)
    pub max_chars: usize,

    /// Overlap carried between size-split chunks (~120 tokens)
    pub overlap_chars: usize,

    /// Minimum accumulated size before a topic transition forces a split
    pub min_topic_split_chars: usize,

    /// Chunks longer than `max_chars * force_split_tolerance` are force-split
    pub force_split_tolerance: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategy::default(),
            max_chars: 4000,
            overlap_chars: 480,
            min_topic_split_chars: 500,
            force_split_tolerance: 1.5,
        }
    }
}

impl ChunkingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_chars == 0 {
            return Err(anyhow::anyhow!("max_chars must be greater than 0"));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(anyhow::anyhow!(
                "overlap_chars must be smaller than max_chars"
            ));
        }
        if self.force_split_tolerance < 1.0 {
            return Err(anyhow::anyhow!(
                "force_split_tolerance must be at least 1.0"
            ));
        }
        Ok(())
    }

    /// Hard cap on emitted chunk length in bytes
    pub fn force_split_threshold(&self) -> usize {
        (self.max_chars as f32 * self.force_split_tolerance) as usize
    }
}
