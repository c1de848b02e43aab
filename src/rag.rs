//! End-to-end answer orchestration: retrieve, prompt, generate, cite

use crate::error::{GenerationError, RagError, Result};
use crate::generator::{
    Generator, GENERATION_ERROR_ANSWER, SLOW_MODEL_ANSWER,
};
use crate::index::{truncate_to_day, SearchFilters};
use crate::prompt::Prompter;
use crate::retrieval::{EnhancedRetriever, SearchResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// Canonical answer when retrieval produced no candidates
pub const NOT_FOUND_ANSWER: &str = "Not found in the provided records. \
     No relevant parliamentary documents were found for your question.";

/// How many retrieved chunks are always surfaced as sources
const SOURCE_COUNT: usize = 3;

/// Maximum length of a source text preview
const PREVIEW_CHARS: usize = 150;

/// A cited source returned alongside an answer
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SourceCitation {
    /// Chunk ID
    pub chunk_id: String,
    /// Document ID
    pub doc_id: String,
    /// Chunk position in document
    pub chunk_index: usize,
    /// Speaker name
    pub speaker: String,
    /// Document date (day precision)
    pub date: String,
    /// Country/source
    pub country: String,
    /// Source document URL
    pub url: String,
    /// Preview of source text
    pub text_preview: String,
    /// Complete source text
    pub full_text: String,
}

/// Why the orchestrator returned the answer it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcomeKind {
    /// The generator produced an answer over retrieved context
    Answered,
    /// No candidates after all retrieval passes
    RetrievalEmpty,
    /// Retrieval succeeded but generation failed; sources still returned
    GenerationFailed,
}

/// The orchestrator's end-to-end result
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub answer: String,
    pub sources: Vec<SourceCitation>,
    pub model_used: String,
    pub chunks_used: usize,
    pub kind: AnswerOutcomeKind,
}

/// Stateless per-request RAG pipeline over long-lived components.
///
/// Concurrent generation is bounded by a semaphore; requests that cannot
/// get a slot within the configured wait fail fast with a busy error.
pub struct RagOrchestrator {
    retriever: Arc<EnhancedRetriever>,
    generator: Arc<dyn Generator>,
    prompter: Prompter,
    generation_permits: Arc<Semaphore>,
    queue_wait: Duration,
    max_context_chunks: usize,
}

impl RagOrchestrator {
    pub fn new(
        retriever: Arc<EnhancedRetriever>,
        generator: Arc<dyn Generator>,
        max_concurrent: usize,
        queue_wait: Duration,
        max_context_chunks: usize,
    ) -> Self {
        Self {
            retriever,
            generator,
            prompter: Prompter::new(),
            generation_permits: Arc::new(Semaphore::new(max_concurrent)),
            queue_wait,
            max_context_chunks,
        }
    }

    /// Answer a question over the corpus.
    ///
    /// Retrieval failure degrades to the canonical not-found answer;
    /// generation failure degrades to the canonical apology with the
    /// retrieved sources intact. Only a saturated generation pool is an
    /// error (`RagError::Busy`).
    pub async fn answer(
        &self,
        question: &str,
        filters: &SearchFilters,
        top_k: usize,
        temperature: f32,
    ) -> Result<AnswerOutcome> {
        let results = self.retriever.search(question, filters, top_k).await;

        if results.is_empty() {
            info!("Retrieval returned no candidates");
            return Ok(AnswerOutcome {
                answer: NOT_FOUND_ANSWER.to_string(),
                sources: Vec::new(),
                model_used: self.generator.model_name().to_string(),
                chunks_used: 0,
                kind: AnswerOutcomeKind::RetrievalEmpty,
            });
        }

        let context_len = top_k.min(self.max_context_chunks).min(results.len());
        let context = &results[..context_len];
        debug!("Using {} chunks as generation context", context.len());

        // Sources are the leading retrieved chunks regardless of which the
        // model ends up citing; the UI shows provenance either way
        let sources = build_sources(context);

        let prompt = self.prompter.build(question, context);

        let permit = match timeout(
            self.queue_wait,
            self.generation_permits.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return Err(RagError::Busy("generation pool closed".to_string()));
            }
            Err(_) => {
                warn!("Generation queue full, rejecting request");
                return Err(RagError::Busy(
                    "too many concurrent generation requests".to_string(),
                ));
            }
        };

        let generation = self.generator.generate(&prompt, temperature).await;
        drop(permit);

        match generation {
            Ok(output) => Ok(AnswerOutcome {
                answer: output.text,
                sources,
                model_used: output.model,
                chunks_used: context.len(),
                kind: AnswerOutcomeKind::Answered,
            }),
            Err(e) => {
                warn!("Generation failed, returning sources only: {}", e);
                let answer = match &e {
                    RagError::Generation(GenerationError::Timeout) => SLOW_MODEL_ANSWER,
                    _ => GENERATION_ERROR_ANSWER,
                };
                Ok(AnswerOutcome {
                    answer: answer.to_string(),
                    sources,
                    model_used: self.generator.model_name().to_string(),
                    chunks_used: context.len(),
                    kind: AnswerOutcomeKind::GenerationFailed,
                })
            }
        }
    }
}

/// Citations for the leading retrieved chunks
fn build_sources(context: &[SearchResult]) -> Vec<SourceCitation> {
    context
        .iter()
        .take(SOURCE_COUNT)
        .map(|result| SourceCitation {
            chunk_id: result.chunk_id.clone(),
            doc_id: result.doc_id.clone(),
            chunk_index: result.chunk_index,
            speaker: result.speaker.clone(),
            date: truncate_to_day(&result.date),
            country: result.country.clone(),
            url: result.url.clone(),
            text_preview: preview(&result.text),
            full_text: result.text.clone(),
        })
        .collect()
}

fn preview(text: &str) -> String {
    if text.len() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let mut end = PREVIEW_CHARS;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

fn citation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[#(\d+)\]").expect("static regex"))
}

/// Chunk indices cited in an answer, in order of appearance
pub fn cited_indices(answer: &str) -> Vec<usize> {
    citation_re()
        .captures_iter(answer)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_with_ellipsis() {
        let text = "a".repeat(400);
        let p = preview(&text);
        assert_eq!(p.len(), PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));

        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_cited_indices() {
        let answer = "The bill passed [#0] and was opposed [#2]. See also [#0].";
        assert_eq!(cited_indices(answer), vec![0, 2, 0]);
        assert!(cited_indices("no citations here").is_empty());
    }

    #[test]
    fn test_build_sources_takes_leading_three() {
        let results: Vec<SearchResult> = (0..5)
            .map(|i| SearchResult {
                chunk_id: format!("d{}_0", i),
                doc_id: format!("d{}", i),
                text: "x".repeat(200),
                speaker: "Speaker".to_string(),
                date: "2021-02-10T00:00:00Z".to_string(),
                country: "Fiji".to_string(),
                chamber: "Parliament".to_string(),
                url: String::new(),
                score: 1.0,
                chunk_index: 0,
            })
            .collect();

        let sources = build_sources(&results);
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].chunk_id, "d0_0");
        assert_eq!(sources[0].date, "2021-02-10");
        assert!(sources[0].text_preview.ends_with("..."));
        assert_eq!(sources[0].full_text.len(), 200);
    }
}
