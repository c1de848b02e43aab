//! Error handling for the RAG pipeline

use thiserror::Error;

/// Result type alias for the RAG pipeline
pub type Result<T> = std::result::Result<T, RagError>;

/// Main error type for the RAG pipeline
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service busy: {0}")]
    Busy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Errors related to the external search index engine
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Upsert failed: {0}")]
    UpsertFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout: index operation took too long")]
    Timeout,
}

/// Errors related to the embedding service
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Timeout: embedding request took too long")]
    Timeout,
}

/// Errors related to the generative model service
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout: generation took too long")]
    Timeout,
}

impl RagError {
    /// Build a validation error for a named request field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        RagError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::Index(IndexError::Timeout)
                | RagError::Index(IndexError::ConnectionFailed(_))
                | RagError::Embedding(EmbeddingError::Timeout)
                | RagError::Embedding(EmbeddingError::ConnectionFailed(_))
                | RagError::Generation(GenerationError::Timeout)
                | RagError::Generation(GenerationError::ConnectionFailed(_))
                | RagError::Http(_)
        )
    }

    /// Get error category for logging/metrics
    pub fn category(&self) -> &'static str {
        match self {
            RagError::Index(_) => "index",
            RagError::Embedding(_) => "embedding",
            RagError::Generation(_) => "generation",
            RagError::Validation { .. } => "validation",
            RagError::Config(_) => "config",
            RagError::NotFound(_) => "not_found",
            RagError::Busy(_) => "busy",
            RagError::Io(_) => "io",
            RagError::Serialization(_) => "serialization",
            RagError::Http(_) => "http",
            RagError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let timeout_error = RagError::Index(IndexError::Timeout);
        assert!(timeout_error.is_retryable());

        let config_error = RagError::Config("invalid config".to_string());
        assert!(!config_error.is_retryable());
    }

    #[test]
    fn test_error_category() {
        let index_error = RagError::Index(IndexError::Timeout);
        assert_eq!(index_error.category(), "index");

        let gen_error = RagError::Generation(GenerationError::Timeout);
        assert_eq!(gen_error.category(), "generation");
    }

    #[test]
    fn test_validation_helper() {
        let err = RagError::validation("top_k", "must be between 1 and 50");
        assert_eq!(err.category(), "validation");
        assert!(err.to_string().contains("top_k"));
    }
}
