//! Grounded-QA prompt construction

use crate::retrieval::SearchResult;

/// Builds the grounded question-answering prompt from a question and the
/// selected context chunks.
///
/// Chunks are numbered `[#0]`, `[#1]`, ... by their position in the
/// selected list; those are the indices the model must cite, and the
/// indices the orchestrator resolves citations against.
#[derive(Debug, Clone, Default)]
pub struct Prompter;

impl Prompter {
    pub fn new() -> Self {
        Self
    }

    /// Render the context block: one numbered entry per chunk with its
    /// attribution line
    pub fn build_context(&self, chunks: &[SearchResult]) -> String {
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                format!(
                    "[#{}] Speaker: {} | Date: {} | Country: {}\n{}",
                    i, chunk.speaker, chunk.date, chunk.country, chunk.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the full prompt for the generator
    pub fn build(&self, question: &str, chunks: &[SearchResult]) -> String {
        let context = self.build_context(chunks);

        format!(
            r#"You are an expert parliamentary research assistant specializing in Pacific Island democracies. Your expertise includes parliamentary procedures, policy analysis, government positions, and political context across Cook Islands, Fiji, and other Pacific nations.

RESEARCH QUESTION: {question}

RELEVANCE CHECK: Before providing analysis, determine if the Parliamentary Sources below contain information relevant to the research question. If the sources do NOT address the question topic, respond with:

"**No Relevant Information Found**

The parliamentary records searched do not contain specific information about the topic of the question. The available sources discuss other matters and do not address the question asked.

Please try rephrasing your question or asking about topics that are covered in the Pacific parliamentary records."

Only proceed with full analysis if the sources ARE relevant to the question.

PARLIAMENTARY SOURCES:
{context}

ANALYSIS METHODOLOGY:
1. EXTRACT KEY FACTS: Identify concrete facts, dates, votes, and official positions
2. ANALYZE PERSPECTIVES: Note government vs. opposition viewpoints, debates, disagreements
3. TRACK CHRONOLOGY: Understand policy evolution and timeline of events
4. CONTEXTUALIZE: Place statements within broader parliamentary and political context
5. VERIFY ATTRIBUTION: Ensure accuracy of who said what and when

RESPONSE FORMAT:
## Executive Summary
[1-2 sentences answering the core question directly]

## Key Findings
- [Main fact with citations [#X]]
- [Another key fact with citations [#X]]

## Detailed Analysis
[In-depth discussion with evidence and context]

## Perspectives & Debate
- Government position: [details with citations]
- Opposition response: [details with citations]

## Status & Implications
- Current status: [what is happening now]
- Next steps: [what comes next]

CITATION REQUIREMENTS:
- Use [#0], [#1], [#2] etc. immediately after each specific claim
- Cite direct quotes with speaker attribution
- Reference specific parliamentary sessions and dates where mentioned
- Distinguish between direct quotes and paraphrased content

RESPONSE PRINCIPLES:
- Lead with actionable information for researchers and policymakers
- Be precise and concise while maintaining completeness
- Acknowledge limitations, gaps, or conflicting information
- Focus on what parliamentarians actually said and decided

COMPREHENSIVE PARLIAMENTARY ANALYSIS:"#
        )
    }
}
