//! Multi-pass retrieval driven by query analysis
//!
//! Issues up to four hybrid passes in parallel (original, synonym-expanded,
//! entity-focused, authority-weighted), merges them in pass order, then
//! deduplicates, applies analysis-driven score bonuses, and selects a
//! diverse final set.

use super::analyzer::{authority_indicators, QueryAnalyzer, HIGH_AUTHORITY_INDICATORS};
use super::hybrid::HybridRetriever;
use super::types::{AuthorityLevel, QueryAnalysis, QueryIntent, SearchResult};
use crate::index::SearchFilters;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

const POSITION_CONTENT_TERMS: &[&str] = &["position", "stance", "policy", "approach"];
const FACTUAL_CONTENT_TERMS: &[&str] = &["act", "regulation", "law", "bill"];

/// Results shorter than this are penalized as likely incomplete
const SHORT_TEXT_CHARS: usize = 200;

pub struct EnhancedRetriever {
    retriever: Arc<HybridRetriever>,
    analyzer: QueryAnalyzer,
}

impl EnhancedRetriever {
    pub fn new(retriever: Arc<HybridRetriever>) -> Self {
        Self {
            retriever,
            analyzer: QueryAnalyzer::new(),
        }
    }

    /// Analyze the query, fan out the retrieval passes, and merge.
    ///
    /// Pass failures degrade to empty result sets inside the hybrid
    /// retriever; the merge order is the pass index, not completion
    /// order, so the output is deterministic for a fixed index state.
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        k: usize,
    ) -> Vec<SearchResult> {
        let analysis = self.analyzer.analyze(query);
        info!(
            "Enhanced search: intent {:?}, {} entities, {} expanded terms",
            analysis.intent,
            analysis.entities.len(),
            analysis.expanded_terms.len()
        );

        let pass_queries = self.build_pass_queries(query, &analysis);
        debug!("Running {} retrieval passes", pass_queries.len());

        let passes = join_all(
            pass_queries
                .iter()
                .map(|pass_query| self.retriever.search(pass_query, filters, k)),
        )
        .await;

        let mut merged: Vec<SearchResult> = passes.into_iter().flatten().collect();

        if merged.is_empty() {
            // Every pass came back empty; one plain hybrid attempt remains
            // the degradation floor
            debug!("All passes empty, falling back to plain hybrid search");
            merged = self.retriever.search(query, filters, k).await;
        }

        let unique = deduplicate(merged);
        let reranked = intelligent_rerank(unique, &analysis);
        let selected = select_diverse(reranked, k);

        info!("Enhanced search complete: {} final results", selected.len());
        selected
    }

    /// The up-to-four pass queries, in fixed pass order
    fn build_pass_queries(&self, query: &str, analysis: &QueryAnalysis) -> Vec<String> {
        let mut passes = vec![query.to_string()];

        passes.push(expanded_query(query, analysis));

        if !analysis.entities.is_empty() {
            passes.push(analysis.entities.join(" "));
        }

        let wants_authority = analysis.intent == QueryIntent::Position
            || query.to_lowercase().contains("stance");
        if wants_authority {
            let indicators = authority_indicators(analysis.authority_level);
            let boost = indicators
                .iter()
                .take(2)
                .copied()
                .collect::<Vec<_>>()
                .join(" ");
            passes.push(format!("{} {}", query, boost));
        }

        passes
    }
}

/// Original query widened with top synonyms and topic boost terms
fn expanded_query(query: &str, analysis: &QueryAnalysis) -> String {
    let mut expanded = query.to_string();

    // Cap the expansion to avoid drowning the original terms
    if !analysis.expanded_terms.is_empty() {
        let top: Vec<&str> = analysis
            .expanded_terms
            .iter()
            .take(3)
            .map(|s| s.as_str())
            .collect();
        expanded.push(' ');
        expanded.push_str(&top.join(" "));
    }

    if analysis.topics.iter().any(|t| t == "mining") {
        expanded.push_str(" exploration license regulation");
    }
    if analysis.topics.iter().any(|t| t == "governance") {
        expanded.push_str(" government minister policy");
    }

    expanded
}

/// Keep the first occurrence of each `(doc_id, chunk_index)` pair
fn deduplicate(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|result| seen.insert((result.doc_id.clone(), result.chunk_index)))
        .collect()
}

/// Add analysis-driven bonuses to each score and re-sort descending
fn intelligent_rerank(
    mut results: Vec<SearchResult>,
    analysis: &QueryAnalysis,
) -> Vec<SearchResult> {
    for result in &mut results {
        let content = result.text.to_lowercase();
        let mut bonus = 0.0f32;

        if analysis.authority_level == AuthorityLevel::Official
            && HIGH_AUTHORITY_INDICATORS
                .iter()
                .any(|indicator| content.contains(indicator))
        {
            bonus += 0.3;
        }

        let entity_matches = analysis
            .entities
            .iter()
            .filter(|entity| content.contains(entity.as_str()))
            .count();
        bonus += entity_matches as f32 * 0.2;

        match analysis.intent {
            QueryIntent::Position
                if POSITION_CONTENT_TERMS.iter().any(|t| content.contains(t)) =>
            {
                bonus += 0.25;
            }
            QueryIntent::Factual
                if FACTUAL_CONTENT_TERMS.iter().any(|t| content.contains(t)) =>
            {
                bonus += 0.25;
            }
            _ => {}
        }

        if result.text.len() < SHORT_TEXT_CHARS {
            bonus -= 0.1;
        }

        result.score += bonus;
    }

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results
}

/// Greedy selection bounded to 2 chunks per document and 3 per speaker,
/// relaxed in rank order if the strict pass cannot reach `k`
fn select_diverse(results: Vec<SearchResult>, k: usize) -> Vec<SearchResult> {
    if results.is_empty() {
        return results;
    }

    let mut selected: Vec<SearchResult> = Vec::with_capacity(k);

    for result in &results {
        if selected.len() >= k {
            break;
        }

        let doc_count = selected
            .iter()
            .filter(|s| s.doc_id == result.doc_id)
            .count();
        let speaker_count = selected
            .iter()
            .filter(|s| s.speaker == result.speaker)
            .count();

        if doc_count >= 2 || speaker_count >= 3 {
            continue;
        }

        selected.push(result.clone());
    }

    if selected.len() < k {
        let chosen: HashSet<String> = selected.iter().map(|s| s.chunk_id.clone()).collect();
        for result in results {
            if selected.len() >= k {
                break;
            }
            if !chosen.contains(&result.chunk_id) {
                selected.push(result);
            }
        }
    }

    debug!(
        "Selected {} diverse chunks from {} documents",
        selected.len(),
        selected
            .iter()
            .map(|s| s.doc_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    );

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(chunk_id: &str, doc_id: &str, chunk_index: usize, score: f32) -> SearchResult {
        SearchResult {
            chunk_id: chunk_id.to_string(),
            doc_id: doc_id.to_string(),
            text: "The minister outlined the government position on seabed mining and the \
                   licensing framework that would govern exploration in territorial waters, \
                   noting the environmental safeguards under consideration by the committee."
                .to_string(),
            speaker: "Speaker".to_string(),
            date: "2021-02-10".to_string(),
            country: "Fiji".to_string(),
            chamber: "Parliament".to_string(),
            url: String::new(),
            score,
            chunk_index,
        }
    }

    fn analysis() -> QueryAnalysis {
        QueryAnalyzer::new().analyze("government stance on seabed mining")
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let a = result("a", "d1", 0, 0.9);
        let b = result("b", "d2", 0, 0.8);
        let mut a_again = result("a2", "d1", 0, 0.7);
        a_again.text = "different text, same chunk coordinates".to_string();

        let unique = deduplicate(vec![a.clone(), b, a_again]);

        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].chunk_id, "a");
        assert_eq!(unique[0].score, 0.9);
        assert!(!unique.iter().any(|r| r.chunk_id == "a2"));
    }

    #[test]
    fn test_rerank_bonuses_applied() {
        let analysis = analysis();
        assert_eq!(analysis.intent, QueryIntent::Position);
        assert_eq!(analysis.authority_level, AuthorityLevel::Official);

        let mut matching = result("a", "d1", 0, 0.5);
        matching.text = "The Prime Minister set out the government position on seabed mining \
                         and the stance cabinet would take on the licensing framework during \
                         the second reading of the bill before the house committee this week."
            .to_string();

        let mut short = result("b", "d2", 0, 0.5);
        short.text = "Brief remark.".to_string();

        let reranked = intelligent_rerank(vec![short, matching], &analysis);

        assert_eq!(reranked[0].chunk_id, "a");
        // authority 0.3 + entities + position intent 0.25 on top of 0.5
        assert!(reranked[0].score > 1.0);
        // short chunk penalized below its base score
        assert!(reranked[1].score < 0.5);
    }

    #[test]
    fn test_diversity_bounds_per_doc() {
        // Scenario: 8 candidates from one document, k = 5 -> strict pass
        // admits 2, relaxation fills to 5
        let results: Vec<SearchResult> = (0..8)
            .map(|i| result(&format!("a_{}", i), "A", i, 1.0 - i as f32 * 0.05))
            .collect();

        let selected = select_diverse(results, 5);

        assert_eq!(selected.len(), 5);
        // Strict picks stay in front
        assert_eq!(selected[0].chunk_id, "a_0");
        assert_eq!(selected[1].chunk_id, "a_1");
        assert_eq!(selected[2].chunk_id, "a_2");
    }

    #[test]
    fn test_diversity_speaker_bound() {
        let mut results = Vec::new();
        for i in 0..4 {
            let mut r = result(&format!("s_{}", i), &format!("d{}", i), 0, 1.0);
            r.speaker = "HON. SAME SPEAKER".to_string();
            results.push(r);
        }
        let mut other = result("other", "d9", 0, 0.1);
        other.speaker = "HON. SOMEONE ELSE".to_string();
        results.push(other);

        let selected = select_diverse(results, 4);

        assert_eq!(selected.len(), 4);
        // Only 3 picks share a speaker in the strict pass; the lower-scored
        // distinct speaker enters before relaxation back-fills
        let same: Vec<_> = selected
            .iter()
            .filter(|r| r.speaker == "HON. SAME SPEAKER")
            .collect();
        assert_eq!(same.len(), 3);
        assert_eq!(selected[3].chunk_id, "other");
    }

    #[test]
    fn test_diversity_under_k_keeps_everything() {
        let results = vec![result("a", "d1", 0, 1.0), result("b", "d2", 0, 0.9)];
        let selected = select_diverse(results, 10);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_expanded_query_includes_topic_boosts() {
        let analysis = analysis();
        let expanded = expanded_query("government stance on seabed mining", &analysis);

        assert!(expanded.starts_with("government stance on seabed mining"));
        assert!(expanded.contains("exploration license regulation"));
        assert!(expanded.contains("government minister policy"));
    }
}
