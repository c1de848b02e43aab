//! Lexical-feature reranking of fused search results

use super::types::SearchResult;
use std::collections::HashSet;
use tracing::debug;

/// Stopwords removed from queries before feature extraction
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "about", "what", "when", "where", "why", "how", "who", "which", "that", "this", "these",
    "those", "is", "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did",
    "can", "could", "should", "would", "will",
];

/// Rescores results against the original query using lexical overlap
/// features, then re-sorts. The permutation is stable: ties keep their
/// previous order. When disabled the reranker is the identity.
#[derive(Debug, Clone)]
pub struct Reranker {
    enabled: bool,
    boost: f32,
}

impl Reranker {
    pub fn new(enabled: bool, boost: f32) -> Self {
        Self { enabled, boost }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Rescore and re-sort `results` for `query`.
    pub fn rerank(&self, query: &str, mut results: Vec<SearchResult>) -> Vec<SearchResult> {
        if !self.enabled || results.is_empty() {
            return results;
        }

        let query_terms = extract_query_terms(query);
        debug!(
            "Reranking {} results over {} query terms",
            results.len(),
            query_terms.len()
        );

        for result in &mut results {
            let relevance = relevance_score(&query_terms, &result.text);
            result.score += self.boost * relevance;
        }

        // Stable sort preserves prior order on equal scores
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        results
    }
}

impl Default for Reranker {
    fn default() -> Self {
        Self::new(true, 0.1)
    }
}

/// Lowercase, strip punctuation, drop stopwords and short tokens
fn extract_query_terms(query: &str) -> Vec<String> {
    let stopwords: HashSet<&str> = STOPWORDS.iter().copied().collect();

    query
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|word| word.len() > 2 && !stopwords.contains(word))
        .map(|word| word.to_string())
        .collect()
}

/// Weighted combination of term coverage, term frequency, and full-phrase
/// presence
fn relevance_score(query_terms: &[String], text: &str) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }

    let content = text.to_lowercase();
    let word_count = content.split_whitespace().count().max(1);

    let mut terms_present = 0usize;
    let mut total_matches = 0usize;
    for term in query_terms {
        let matches = content.matches(term.as_str()).count();
        if matches > 0 {
            terms_present += 1;
            total_matches += matches;
        }
    }

    let term_coverage = terms_present as f32 / query_terms.len() as f32;
    let term_frequency = total_matches as f32 / word_count as f32;
    let phrase_match = if query_terms.len() > 1 && content.contains(&query_terms.join(" ")) {
        1.0
    } else {
        0.0
    };

    0.5 * term_coverage + 0.3 * term_frequency + 0.2 * phrase_match
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(chunk_id: &str, text: &str, score: f32) -> SearchResult {
        SearchResult {
            chunk_id: chunk_id.to_string(),
            doc_id: chunk_id.split('_').next().unwrap_or(chunk_id).to_string(),
            text: text.to_string(),
            speaker: "Speaker".to_string(),
            date: "2021-02-10".to_string(),
            country: "Fiji".to_string(),
            chamber: "Parliament".to_string(),
            url: String::new(),
            score,
            chunk_index: 0,
        }
    }

    #[test]
    fn test_disabled_is_identity() {
        let reranker = Reranker::new(false, 0.1);
        let results = vec![
            result("a_0", "minister price gouging", 0.6),
            result("b_0", "unrelated procedures", 0.8),
        ];
        let order: Vec<String> = results.iter().map(|r| r.chunk_id.clone()).collect();
        let scores: Vec<f32> = results.iter().map(|r| r.score).collect();

        let output = reranker.rerank("minister price gouging", results);
        let out_order: Vec<String> = output.iter().map(|r| r.chunk_id.clone()).collect();
        let out_scores: Vec<f32> = output.iter().map(|r| r.score).collect();

        assert_eq!(order, out_order);
        assert_eq!(scores, out_scores);
    }

    #[test]
    fn test_zero_boost_preserves_order() {
        let reranker = Reranker::new(true, 0.0);
        let results = vec![
            result("a_0", "minister price gouging policies", 0.5),
            result("b_0", "speaker guidelines", 0.5),
        ];

        let output = reranker.rerank("minister price gouging", results);
        assert_eq!(output[0].chunk_id, "a_0");
        assert_eq!(output[1].chunk_id, "b_0");
        assert_eq!(output[0].score, 0.5);
    }

    #[test]
    fn test_matching_text_boosted_above_nonmatching() {
        let reranker = Reranker::default();
        let results = vec![
            result("b_0", "parliamentary procedures and guidelines", 0.6),
            result("a_0", "the minister discussed price gouging policies", 0.58),
        ];

        let output = reranker.rerank("minister price gouging", results);
        assert_eq!(output[0].chunk_id, "a_0");
        assert!(output[0].score > 0.58);
    }

    #[test]
    fn test_query_term_extraction() {
        let terms = extract_query_terms("What is the Minister's stance on seabed mining?");
        assert_eq!(
            terms,
            vec![
                "minister".to_string(),
                "stance".to_string(),
                "seabed".to_string(),
                "mining".to_string(),
            ]
        );
    }

    #[test]
    fn test_phrase_match_bonus() {
        let with_phrase = relevance_score(
            &["seabed".to_string(), "mining".to_string()],
            "debate on seabed mining licensing",
        );
        let without_phrase = relevance_score(
            &["seabed".to_string(), "mining".to_string()],
            "mining debate and the seabed question licensing",
        );
        assert!(with_phrase > without_phrase);
    }
}
