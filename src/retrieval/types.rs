//! Types shared across the retrieval pipeline

use crate::index::RawHit;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One ranked retrieval result.
///
/// `score` is the fused score (RRF plus rerank bonuses); it is comparable
/// within one response, not across responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    /// Unique chunk ID
    pub chunk_id: String,
    /// Source document ID
    pub doc_id: String,
    /// Chunk text content
    pub text: String,
    /// Speaker name
    pub speaker: String,
    /// Document date
    pub date: String,
    /// Country/source
    pub country: String,
    /// Parliament chamber
    pub chamber: String,
    /// Source document URL
    pub url: String,
    /// Relevance score
    pub score: f32,
    /// Chunk position in document
    pub chunk_index: usize,
}

impl From<RawHit> for SearchResult {
    fn from(hit: RawHit) -> Self {
        Self {
            chunk_id: hit.chunk_id,
            doc_id: hit.doc_id,
            text: hit.text,
            speaker: hit.speaker,
            date: hit.date,
            country: hit.country,
            chamber: hit.chamber,
            url: hit.url,
            score: hit.score,
            chunk_index: hit.chunk_index,
        }
    }
}

/// Query intent classes, picked by the first matching keyword rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// Asking for a stance, position, or policy
    Position,
    /// Asking when something happened
    Timeline,
    /// Asking to compare things
    Comparison,
    /// Asking what/how/why
    Factual,
    /// Everything else
    General,
}

/// How authoritative the sought statements should be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityLevel {
    /// Government or ministerial statements
    Official,
    /// Debate and committee discussion
    Discussion,
    /// No preference
    Any,
}

/// Deterministic analysis of a user query, guiding the retrieval passes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub intent: QueryIntent,
    /// Known entities matched in the query (dictionary keys)
    pub entities: Vec<String>,
    /// Broader topic categories
    pub topics: Vec<String>,
    /// Temporal hints like "recent" or "last year"
    pub time_indicators: Vec<String>,
    pub authority_level: AuthorityLevel,
    /// Synonyms of the matched entities, in dictionary order
    pub expanded_terms: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit() -> RawHit {
        RawHit {
            chunk_id: "d1_0".to_string(),
            doc_id: "d1".to_string(),
            text: "The seabed minerals bill".to_string(),
            speaker: "HON. T. PUNA".to_string(),
            date: "2021-02-10".to_string(),
            country: "Cook Islands".to_string(),
            chamber: "Parliament".to_string(),
            title: "Hansard".to_string(),
            url: "/doc/d1".to_string(),
            score: 2.0,
            chunk_index: 0,
        }
    }

    #[test]
    fn test_search_result_from_hit() {
        let result = SearchResult::from(hit());
        assert_eq!(result.chunk_id, "d1_0");
        assert_eq!(result.doc_id, "d1");
        assert_eq!(result.score, 2.0);
    }

    #[test]
    fn test_intent_serde_names() {
        let json = serde_json::to_string(&QueryIntent::Position).unwrap();
        assert_eq!(json, "\"position\"");
        let json = serde_json::to_string(&AuthorityLevel::Official).unwrap();
        assert_eq!(json, "\"official\"");
    }
}
