//! Hybrid retrieval: concurrent lexical and vector passes fused with
//! Reciprocal Rank Fusion

use super::reranker::Reranker;
use super::types::SearchResult;
use crate::embedding::Embedder;
use crate::index::{IndexGateway, SearchFilters};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Combines a lexical pass and a vector pass over the index.
///
/// Both passes are launched together and fused with RRF; if exactly one
/// backend fails the other's ranking is returned, and only when both fail
/// is the result empty. For a fixed index state, query, filters, and `k`
/// the output order is deterministic.
pub struct HybridRetriever {
    gateway: Arc<dyn IndexGateway>,
    embedder: Arc<dyn Embedder>,
    reranker: Reranker,
    rrf_k: u32,
}

impl HybridRetriever {
    pub fn new(
        gateway: Arc<dyn IndexGateway>,
        embedder: Arc<dyn Embedder>,
        reranker: Reranker,
        rrf_k: u32,
    ) -> Self {
        Self {
            gateway,
            embedder,
            reranker,
            rrf_k,
        }
    }

    /// Run both passes, fuse, rerank, and truncate to `k`.
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        k: usize,
    ) -> Vec<SearchResult> {
        // Fetch deeper than k so fusion has signal from both passes
        let fetch = k * 2;

        let lexical_pass = self.gateway.lexical_search(query, filters, fetch);
        let vector_pass = async {
            let query_vector = self.embedder.encode_query(query).await?;
            self.gateway.vector_search(&query_vector, filters, fetch).await
        };

        let (lexical, vector) = tokio::join!(lexical_pass, vector_pass);

        let (lexical, vector) = match (lexical, vector) {
            (Ok(lexical), Ok(vector)) => (lexical, vector),
            (Ok(lexical), Err(e)) => {
                warn!("Vector pass failed, degrading to lexical only: {}", e);
                return lexical
                    .into_iter()
                    .map(SearchResult::from)
                    .take(k)
                    .collect();
            }
            (Err(e), Ok(vector)) => {
                warn!("Lexical pass failed, degrading to vector only: {}", e);
                return vector
                    .into_iter()
                    .map(SearchResult::from)
                    .take(k)
                    .collect();
            }
            (Err(lexical_err), Err(vector_err)) => {
                warn!(
                    "Both retrieval passes failed (lexical: {}, vector: {})",
                    lexical_err, vector_err
                );
                return Vec::new();
            }
        };

        debug!(
            "Fusing {} lexical and {} vector hits",
            lexical.len(),
            vector.len()
        );

        let lexical: Vec<SearchResult> = lexical.into_iter().map(SearchResult::from).collect();
        let vector: Vec<SearchResult> = vector.into_iter().map(SearchResult::from).collect();

        let fused = reciprocal_rank_fusion(lexical, vector, self.rrf_k);
        info!("Hybrid search fused {} unique chunks", fused.len());

        let mut reranked = self.reranker.rerank(query, fused);
        reranked.truncate(k);
        reranked
    }
}

/// Fuse two ranked lists with Reciprocal Rank Fusion.
///
/// `rrf(c) = [c in L] / (K + rank_L(c)) + [c in V] / (K + rank_V(c))`
/// with 1-based ranks. Ties break on lexical rank, then vector rank,
/// then lexicographic chunk id, so the order is reproducible.
pub fn reciprocal_rank_fusion(
    lexical: Vec<SearchResult>,
    vector: Vec<SearchResult>,
    k: u32,
) -> Vec<SearchResult> {
    struct Fused {
        result: SearchResult,
        rrf: f64,
        lexical_rank: usize,
        vector_rank: usize,
    }

    let mut by_id: HashMap<String, Fused> = HashMap::new();

    for (i, result) in lexical.into_iter().enumerate() {
        let rank = i + 1;
        by_id.insert(
            result.chunk_id.clone(),
            Fused {
                result,
                rrf: 1.0 / f64::from(k + rank as u32),
                lexical_rank: rank,
                vector_rank: usize::MAX,
            },
        );
    }

    for (i, result) in vector.into_iter().enumerate() {
        let rank = i + 1;
        let contribution = 1.0 / f64::from(k + rank as u32);
        by_id
            .entry(result.chunk_id.clone())
            .and_modify(|fused| {
                fused.rrf += contribution;
                fused.vector_rank = rank;
            })
            .or_insert(Fused {
                result,
                rrf: contribution,
                lexical_rank: usize::MAX,
                vector_rank: rank,
            });
    }

    let mut fused: Vec<Fused> = by_id.into_values().collect();
    fused.sort_by(|a, b| {
        b.rrf
            .partial_cmp(&a.rrf)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.lexical_rank.cmp(&b.lexical_rank))
            .then_with(|| a.vector_rank.cmp(&b.vector_rank))
            .then_with(|| a.result.chunk_id.cmp(&b.result.chunk_id))
    });

    fused
        .into_iter()
        .map(|f| {
            let mut result = f.result;
            result.score = f.rrf as f32;
            result
        })
        .collect()
}
