//! Retrieval pipeline: hybrid search, fusion, reranking, and multi-pass
//! query-aware retrieval
//!
//! The layering is:
//! - `hybrid` runs lexical and vector passes against the index gateway
//!   and fuses them with Reciprocal Rank Fusion
//! - `reranker` rescores a fused list with lexical overlap features
//! - `analyzer` classifies the query and expands its terminology
//! - `enhanced` fans out multiple hybrid passes and merges them with
//!   dedup, analysis-driven bonuses, and diversity selection

pub mod analyzer;
pub mod enhanced;
pub mod hybrid;
pub mod reranker;
pub mod types;

pub use analyzer::QueryAnalyzer;
pub use enhanced::EnhancedRetriever;
pub use hybrid::{reciprocal_rank_fusion, HybridRetriever};
pub use reranker::Reranker;
pub use types::{AuthorityLevel, QueryAnalysis, QueryIntent, SearchResult};
