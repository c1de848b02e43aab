//! Deterministic query analysis guiding the multi-pass retriever

use super::types::{AuthorityLevel, QueryAnalysis, QueryIntent};

const POSITION_KEYWORDS: &[&str] = &["stance", "position", "policy", "view", "approach"];
const TIMELINE_KEYWORDS: &[&str] = &["when", "date", "time", "recent", "latest"];
const COMPARISON_KEYWORDS: &[&str] = &["compare", "difference", "versus", "vs"];
const FACTUAL_KEYWORDS: &[&str] = &["what", "how", "why", "explain"];

const TIME_INDICATORS: &[&str] = &[
    "recent",
    "latest",
    "current",
    "now",
    "today",
    "this year",
    "last year",
];

const OFFICIAL_KEYWORDS: &[&str] = &["government", "official", "minister", "policy"];
const DISCUSSION_KEYWORDS: &[&str] = &["discussion", "debate", "opinion"];

/// Parliamentary terminology: entity -> synonyms and related terms
const TERM_EXPANSIONS: &[(&str, &[&str])] = &[
    (
        "stance",
        &["position", "policy", "view", "opinion", "approach"],
    ),
    (
        "government",
        &["administration", "cabinet", "minister", "ministry", "official"],
    ),
    (
        "seabed mining",
        &[
            "deep sea mining",
            "ocean mining",
            "seabed minerals",
            "marine mining",
            "nodule mining",
        ],
    ),
    (
        "exploration",
        &["prospecting", "survey", "investigation", "research", "study"],
    ),
    (
        "regulation",
        &["law", "legislation", "rule", "policy", "framework", "governance"],
    ),
    (
        "license",
        &["permit", "authorization", "approval", "certificate"],
    ),
    (
        "environment",
        &["environmental", "ecology", "marine", "ocean", "conservation"],
    ),
    (
        "economy",
        &["economic", "financial", "revenue", "income", "development"],
    ),
];

/// Topic categories keyed by indicator terms
const TOPIC_PATTERNS: &[(&str, &[&str])] = &[
    ("mining", &["mining", "extraction", "seabed", "minerals"]),
    (
        "environment",
        &["environment", "marine", "ocean", "conservation"],
    ),
    ("economy", &["economy", "economic", "financial", "revenue"]),
    ("governance", &["government", "policy", "regulation", "law"]),
    (
        "international",
        &["china", "cooperation", "agreement", "treaty"],
    ),
];

/// Indicator phrases by speaker authority tier
pub const HIGH_AUTHORITY_INDICATORS: &[&str] = &[
    "prime minister",
    "minister",
    "government",
    "cabinet",
    "official statement",
];
pub const MEDIUM_AUTHORITY_INDICATORS: &[&str] =
    &["member of parliament", "mp", "honorable", "speaker"];

/// Maps a query string to a `QueryAnalysis`. The mapping is a pure
/// function of the query: fixed rule order, closed keyword sets.
#[derive(Debug, Clone, Default)]
pub struct QueryAnalyzer;

impl QueryAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        let query_lower = query.to_lowercase();

        let intent = if contains_any(&query_lower, POSITION_KEYWORDS) {
            QueryIntent::Position
        } else if contains_any(&query_lower, TIMELINE_KEYWORDS) {
            QueryIntent::Timeline
        } else if contains_any(&query_lower, COMPARISON_KEYWORDS) {
            QueryIntent::Comparison
        } else if contains_any(&query_lower, FACTUAL_KEYWORDS) {
            QueryIntent::Factual
        } else {
            QueryIntent::General
        };

        let mut entities = Vec::new();
        for (term, synonyms) in TERM_EXPANSIONS {
            if query_lower.contains(term) || contains_any(&query_lower, synonyms) {
                entities.push(term.to_string());
            }
        }

        let mut topics = Vec::new();
        for (topic, keywords) in TOPIC_PATTERNS {
            if contains_any(&query_lower, keywords) {
                topics.push(topic.to_string());
            }
        }

        let time_indicators = TIME_INDICATORS
            .iter()
            .filter(|indicator| query_lower.contains(*indicator))
            .map(|indicator| indicator.to_string())
            .collect();

        let authority_level = if contains_any(&query_lower, OFFICIAL_KEYWORDS) {
            AuthorityLevel::Official
        } else if contains_any(&query_lower, DISCUSSION_KEYWORDS) {
            AuthorityLevel::Discussion
        } else {
            AuthorityLevel::Any
        };

        let mut expanded_terms = Vec::new();
        for entity in &entities {
            if let Some((_, synonyms)) = TERM_EXPANSIONS.iter().find(|(term, _)| term == entity) {
                expanded_terms.extend(synonyms.iter().map(|s| s.to_string()));
            }
        }

        QueryAnalysis {
            intent,
            entities,
            topics,
            time_indicators,
            authority_level,
            expanded_terms,
        }
    }
}

/// Authority indicator phrases for the given level, strongest first
pub fn authority_indicators(level: AuthorityLevel) -> &'static [&'static str] {
    match level {
        AuthorityLevel::Official => HIGH_AUTHORITY_INDICATORS,
        _ => MEDIUM_AUTHORITY_INDICATORS,
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
