//! Configuration management for the RAG service

use crate::chunking::ChunkingConfig;
use serde::{Deserialize, Serialize};

/// Main configuration for the RAG service
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagConfig {
    /// Search index engine configuration
    pub index: IndexConfig,

    /// Embedding service configuration
    pub embedding: EmbeddingConfig,

    /// Generative model configuration
    pub generator: GeneratorConfig,

    /// Document chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Retrieval pipeline configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Search index engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Base URL of the index core (Solr-style select/update API)
    pub url: String,

    /// Request timeout in seconds
    pub timeout: u64,
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding server URL
    pub url: String,

    /// Model identifier, fixed for the lifetime of the client
    pub model: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Maximum retry attempts for transport failures
    pub max_retries: u32,

    /// Number of texts encoded per sub-batch
    pub batch_size: usize,
}

/// Generative model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Generation server URL
    pub url: String,

    /// Model used for answer generation
    pub model: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Default temperature for generation
    pub temperature: f32,

    /// Nucleus sampling parameter
    pub top_p: f32,

    /// Repetition penalty passed to the model
    pub repeat_penalty: f32,

    /// Stop sequence terminating the structured answer
    pub stop: Vec<String>,

    /// Strip CJK character blocks from model output
    pub strip_cjk: bool,

    /// Answer patterns that indicate the model ignored the provided
    /// context; an uncited answer matching any of these is replaced with
    /// the canonical no-information message
    #[serde(default = "default_suspicious_patterns")]
    pub suspicious_patterns: Vec<String>,

    /// Maximum concurrent generation calls
    pub max_concurrent: usize,

    /// Bounded wait for a generation slot, in seconds
    pub queue_wait: u64,
}

/// Retrieval pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Reciprocal Rank Fusion constant
    pub rrf_k: u32,

    /// Enable the lexical-feature reranker
    pub rerank_enabled: bool,

    /// Reranker score boost factor
    pub rerank_boost: f32,

    /// Default number of results when the request does not specify one
    pub default_top_k: usize,

    /// Maximum chunks handed to the generator as context
    pub max_context_chunks: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,
}

fn default_suspicious_patterns() -> Vec<String> {
    vec![
        "education.*grant".to_string(),
        "fiji.*education".to_string(),
        "boarding.*grant".to_string(),
        "vat.*increase".to_string(),
    ]
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8983/solr/hansard_core".to_string(),
            timeout: 30,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            timeout: 30,
            max_retries: 3,
            batch_size: 32,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b".to_string(),
            timeout: 60,
            temperature: 0.1,
            top_p: 0.9,
            repeat_penalty: 1.1,
            stop: vec!["</answer>".to_string()],
            strip_cjk: true,
            suspicious_patterns: default_suspicious_patterns(),
            max_concurrent: 4,
            queue_wait: 10,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60,
            rerank_enabled: true,
            rerank_boost: 0.1,
            default_top_k: 12,
            max_context_chunks: 5,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl RagConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let config = match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yml::from_str(&content)?,
            _ => return Err(anyhow::anyhow!("Unsupported config file format")),
        };
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("HANSARD_INDEX_URL") {
            self.index.url = url;
        }
        if let Ok(url) = std::env::var("HANSARD_EMBEDDING_URL") {
            self.embedding.url = url;
        }
        if let Ok(model) = std::env::var("HANSARD_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Ok(url) = std::env::var("HANSARD_GENERATOR_URL") {
            self.generator.url = url;
        }
        if let Ok(model) = std::env::var("HANSARD_GENERATOR_MODEL") {
            self.generator.model = model;
        }
        if let Ok(timeout) = std::env::var("HANSARD_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.index.timeout = secs;
                self.embedding.timeout = secs;
                self.generator.timeout = secs;
            }
        }
        if let Ok(host) = std::env::var("HANSARD_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("HANSARD_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.index.url.starts_with("http") {
            return Err(anyhow::anyhow!("Invalid index URL: {}", self.index.url));
        }

        if !self.embedding.url.starts_with("http") {
            return Err(anyhow::anyhow!(
                "Invalid embedding URL: {}",
                self.embedding.url
            ));
        }

        if !self.generator.url.starts_with("http") {
            return Err(anyhow::anyhow!(
                "Invalid generator URL: {}",
                self.generator.url
            ));
        }

        if self.embedding.model.is_empty() {
            return Err(anyhow::anyhow!("Embedding model name cannot be empty"));
        }

        if self.generator.model.is_empty() {
            return Err(anyhow::anyhow!("Generator model name cannot be empty"));
        }

        if self.embedding.batch_size == 0 {
            return Err(anyhow::anyhow!(
                "Embedding batch size must be greater than 0"
            ));
        }

        if !(0.0..=1.0).contains(&self.generator.temperature) {
            return Err(anyhow::anyhow!(
                "Generator temperature must be between 0.0 and 1.0"
            ));
        }

        if self.generator.max_concurrent == 0 {
            return Err(anyhow::anyhow!(
                "Generator max_concurrent must be greater than 0"
            ));
        }

        if self.retrieval.max_context_chunks == 0 {
            return Err(anyhow::anyhow!("max_context_chunks must be greater than 0"));
        }

        self.chunking.validate()?;

        Ok(())
    }
}
