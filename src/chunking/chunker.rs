//! Size-bounded, topic-aware chunking of transcript content

use super::speaker::{extract_segments, SpeakerSegment};
use super::types::{content_hash, Chunk, ChunkingConfig, ChunkingStrategy, Document, UNKNOWN_SPEAKER};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Explicit phrases that open a new agenda item or subject
const TRANSITION_PHRASES: &[&str] = &[
    "moving to a completely different topic",
    "moving to another topic",
    "turning to a different matter",
    "in other business",
    "moving on to",
    "next item on the agenda",
    "another matter",
    "different subject",
    "separate issue",
    "unrelated matter",
];

/// Structural markers for legislative document divisions
const STRUCTURAL_MARKERS: &[&str] = &["clause", "section", "part", "schedule"];

/// Closed topical vocabulary used for keyword-overlap transition detection
const TOPIC_VOCABULARY: &[&str] = &[
    // Environmental
    "environment",
    "environmental",
    "climate",
    "conservation",
    "pollution",
    "seabed",
    "mining",
    "ocean",
    "marine",
    "fishing",
    "coral",
    "reef",
    // Legal/Legislative
    "law",
    "legal",
    "regulation",
    "clause",
    "section",
    "act",
    "bill",
    "nuclear",
    "waste",
    "radioactive",
    "transport",
    "offence",
    // Economic
    "economy",
    "economic",
    "trade",
    "business",
    "industry",
    "development",
    "budget",
    "finance",
    "revenue",
    "tax",
    "vat",
    // Social
    "education",
    "health",
    "housing",
    "employment",
    "social",
    "community",
    "grant",
    "scholarship",
    "boarding",
    "school",
    // Political
    "government",
    "parliament",
    "minister",
    "committee",
    "vote",
    "policy",
];

fn titled_speaker_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(mr\.|ms\.|mrs\.|dr\.|hon\.|the\s+speaker|minister)")
            .expect("static regex")
    })
}

fn caps_speaker_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z\s]+:").expect("static regex"))
}

fn blank_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("static regex"))
}

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"))
}

fn ocr_artifact_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[^\w\s.,;:!?\-()"'/]"#).expect("static regex"))
}

fn hyphen_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\w+)-\s+(\w+)").expect("static regex"))
}

/// Normalize scraped content before chunking: drop HTML tags, collapse
/// horizontal whitespace, remove OCR noise outside the punctuation
/// whitelist, and re-join words hyphenated across line breaks. Blank-line
/// paragraph boundaries are preserved for the paragraph strategy.
pub fn clean_content(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }
    let content = html_tag_re().replace_all(content, " ");
    let content = ocr_artifact_re().replace_all(&content, " ");
    let content = hyphen_break_re().replace_all(&content, "$1$2");

    let lines: Vec<String> = content
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    let joined = lines.join("\n");

    blank_line_re().replace_all(&joined, "\n\n").trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits documents into speaker-aware, size-bounded, overlapping chunks
/// with stable ids.
///
/// The output is a pure function of the document content and metadata:
/// chunking the same document twice yields byte-identical chunks.
#[derive(Debug, Clone)]
pub struct TranscriptChunker {
    config: ChunkingConfig,
}

impl TranscriptChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Chunk a document according to the configured strategy.
    ///
    /// Whitespace-only content yields no chunks; malformed content never
    /// errors. Every emitted chunk is at most
    /// `max_chars * force_split_tolerance` long and chunk indices are
    /// dense from 0.
    pub fn chunk(&self, doc: &Document) -> Vec<Chunk> {
        let segments = match self.config.strategy {
            ChunkingStrategy::Plain => {
                let speaker = doc
                    .speaker_hint
                    .clone()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_SPEAKER.to_string());
                vec![SpeakerSegment {
                    speaker,
                    text: doc.content.clone(),
                }]
            }
            ChunkingStrategy::SpeakerAware => extract_segments(&doc.content),
        };

        let mut pieces: Vec<(String, String)> = Vec::new();
        for segment in &segments {
            for text in self.split_segment(&segment.text) {
                pieces.push((segment.speaker.clone(), text));
            }
        }

        // Force-split pass: slice anything still over the hard cap
        let threshold = self.config.force_split_threshold();
        let mut bounded: Vec<(String, String)> = Vec::new();
        for (speaker, text) in pieces {
            if text.len() > threshold {
                for window in self.force_split(&text) {
                    bounded.push((speaker.clone(), window));
                }
            } else {
                bounded.push((speaker, text));
            }
        }

        // Re-index pass: dense indices in emission order
        bounded
            .into_iter()
            .enumerate()
            .map(|(i, (speaker, text))| self.build_chunk(doc, i, speaker, text))
            .collect()
    }

    fn build_chunk(&self, doc: &Document, index: usize, speaker: String, text: String) -> Chunk {
        Chunk {
            chunk_id: format!("{}_{}", doc.doc_id, index),
            doc_id: doc.doc_id.clone(),
            chunk_index: index,
            speaker,
            token_estimate: text.len() / 4,
            content_hash: content_hash(&text),
            text,
            date: doc.date.clone(),
            country: doc.country.clone(),
            chamber: doc.chamber.clone(),
            title: doc.title.clone(),
            url: doc.url.clone(),
            document_type: doc.document_type.clone(),
        }
    }

    /// Split one speaker segment into size-bounded pieces.
    ///
    /// Paragraph accumulation with topic-transition splits when the input
    /// has blank-line breaks; sentence accumulation otherwise.
    fn split_segment(&self, content: &str) -> Vec<String> {
        let paragraphs: Vec<String> = blank_line_re()
            .split(content)
            .map(collapse_whitespace)
            .filter(|p| !p.is_empty())
            .collect();

        if paragraphs.is_empty() {
            return Vec::new();
        }

        if paragraphs.len() > 1 {
            self.chunk_paragraphs(&paragraphs)
        } else {
            self.chunk_sentences(&paragraphs[0])
        }
    }

    fn chunk_paragraphs(&self, paragraphs: &[String]) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut previous: Option<&str> = None;

        for paragraph in paragraphs {
            let topic_break = previous
                .map(|prev| is_topic_transition(paragraph, prev))
                .unwrap_or(false);

            // Hypothetical size with the two-char paragraph separator
            let candidate_len = if current.is_empty() {
                paragraph.len()
            } else {
                current.len() + 2 + paragraph.len()
            };

            let size_exceeded = candidate_len > self.config.max_chars && !current.is_empty();
            let topic_split = topic_break && current.len() > self.config.min_topic_split_chars;

            if size_exceeded || topic_split {
                pieces.push(current.trim().to_string());

                if topic_break {
                    // New topic starts clean, no carried overlap
                    current = paragraph.clone();
                } else {
                    let overlap = overlap_suffix(&current, self.config.overlap_chars);
                    current = if overlap.is_empty() {
                        paragraph.clone()
                    } else {
                        format!("{}\n\n{}", overlap, paragraph)
                    };
                }
            } else if current.is_empty() {
                current = paragraph.clone();
            } else {
                current.push_str("\n\n");
                current.push_str(paragraph);
            }

            previous = Some(paragraph);
        }

        let current = current.trim();
        if !current.is_empty() {
            pieces.push(current.to_string());
        }

        pieces
    }

    fn chunk_sentences(&self, content: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current = String::new();

        for sentence in split_sentences(content) {
            let candidate_len = if current.is_empty() {
                sentence.len()
            } else {
                current.len() + 1 + sentence.len()
            };

            if candidate_len > self.config.max_chars && !current.is_empty() {
                pieces.push(current.trim().to_string());

                let overlap = overlap_suffix(&current, self.config.overlap_chars);
                current = if overlap.is_empty() {
                    sentence.to_string()
                } else {
                    format!("{} {}", overlap, sentence)
                };
            } else if current.is_empty() {
                current = sentence.to_string();
            } else {
                current.push(' ');
                current.push_str(sentence);
            }
        }

        let current = current.trim();
        if !current.is_empty() {
            pieces.push(current.to_string());
        }

        pieces
    }

    /// Slice an oversized piece into `max_chars` windows, each ending on
    /// the last space inside a 100-char look-back, with consecutive
    /// windows overlapping by `overlap_chars`.
    fn force_split(&self, text: &str) -> Vec<String> {
        let max_chars = self.config.max_chars;
        let overlap = self.config.overlap_chars;
        let n = text.len();

        let mut windows = Vec::new();
        let mut start = 0;

        while start < n {
            let raw_end = start + max_chars;
            let mut end = floor_char_boundary(text, raw_end.min(n));

            if raw_end < n {
                let lookback = floor_char_boundary(text, end.saturating_sub(100).max(start));
                if let Some(pos) = text[lookback..end].rfind(' ') {
                    let boundary = lookback + pos;
                    if boundary > start {
                        end = boundary;
                    }
                }
            }

            let window = text[start..end].trim();
            if !window.is_empty() {
                windows.push(window.to_string());
            }

            if raw_end >= n && end >= n {
                break;
            }

            let next = end.saturating_sub(overlap).max(start + 1);
            start = ceil_char_boundary(text, next);
        }

        windows
    }
}

impl Default for TranscriptChunker {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

/// Detect whether `current` opens a new topic relative to `previous`.
fn is_topic_transition(current: &str, previous: &str) -> bool {
    if previous.is_empty() {
        return false;
    }

    let current_lower = current.to_lowercase();

    for phrase in TRANSITION_PHRASES {
        if current_lower.starts_with(phrase) {
            return true;
        }
    }

    for marker in STRUCTURAL_MARKERS {
        if current_lower.starts_with(marker) {
            return true;
        }
    }

    if titled_speaker_line_re().is_match(current) || caps_speaker_line_re().is_match(current) {
        return true;
    }

    // Disjoint topical vocabulary with substantial content on our side
    let current_topics = extract_topic_keywords(&current_lower);
    if current_topics.len() >= 2 {
        let previous_topics = extract_topic_keywords(&previous.to_lowercase());
        if !previous_topics.is_empty() && current_topics.is_disjoint(&previous_topics) {
            return true;
        }
    }

    false
}

fn extract_topic_keywords(text_lower: &str) -> HashSet<&'static str> {
    TOPIC_VOCABULARY
        .iter()
        .filter(|keyword| text_lower.contains(*keyword))
        .copied()
        .collect()
}

/// Longest word-aligned suffix of `text` no longer than `overlap_chars`.
fn overlap_suffix(text: &str, overlap_chars: usize) -> String {
    if text.len() <= overlap_chars {
        return text.to_string();
    }

    let mut overlap = String::new();
    for word in text.split_whitespace().rev() {
        let candidate_len = if overlap.is_empty() {
            word.len()
        } else {
            word.len() + 1 + overlap.len()
        };
        if candidate_len > overlap_chars {
            break;
        }
        overlap = if overlap.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", word, overlap)
        };
    }

    overlap
}

/// Split on sentence endings (. ! ?) followed by whitespace, keeping the
/// punctuation with the sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if matches!(bytes[i], b'.' | b'!' | b'?') {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if j > i + 1 {
                let sentence = text[start..i + 1].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }

    if start < text.len() {
        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail);
        }
    }

    sentences
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker() -> TranscriptChunker {
        TranscriptChunker::default()
    }

    #[test]
    fn test_empty_content_yields_no_chunks() {
        let doc = Document::new("d1", "");
        assert!(chunker().chunk(&doc).is_empty());

        let doc = Document::new("d1", "   \n\n  \t ");
        assert!(chunker().chunk(&doc).is_empty());
    }

    #[test]
    fn test_single_short_paragraph() {
        let text = "The Minister for Marine Resources addressed the seabed minerals \
                    framework and outlined the licensing conditions that would apply to \
                    exploration activity within the exclusive economic zone this session.";
        let doc = Document::new("d1", text);
        let chunks = chunker().chunk(&doc);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].chunk_id, "d1_0");
        assert_eq!(chunks[0].text, collapse_whitespace(text));
    }

    #[test]
    fn test_topic_transition_splits_without_overlap() {
        let first = "The budget appropriation was debated at length. ".repeat(16);
        let second = format!(
            "Moving to a completely different topic, {}",
            "the fisheries licensing amendments were tabled. ".repeat(16)
        );
        let content = format!("{}\n\n{}", first.trim(), second.trim());

        let doc = Document::new("d1", &content);
        let chunks = chunker().chunk(&doc);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, collapse_whitespace(first.trim()));
        assert!(chunks[1]
            .text
            .starts_with("Moving to a completely different topic"));
    }

    #[test]
    fn test_size_split_carries_overlap() {
        let paragraphs: Vec<String> = (0..6)
            .map(|i| format!("Paragraph {} on the appropriation debate. ", i).repeat(30))
            .map(|p| p.trim().to_string())
            .collect();
        let content = paragraphs.join("\n\n");

        let doc = Document::new("d1", &content);
        let chunks = chunker().chunk(&doc);

        assert!(chunks.len() > 1);
        // The second chunk opens with the word-aligned tail of the first
        let overlap = overlap_suffix(&chunks[0].text, 480);
        assert!(!overlap.is_empty());
        assert!(chunks[1].text.starts_with(&overlap));
    }

    #[test]
    fn test_sentence_fallback_for_single_paragraph() {
        let content = "The honourable member raised the question of school boarding costs. "
            .repeat(100);
        let doc = Document::new("d1", content.trim());
        let chunks = chunker().chunk(&doc);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.len() <= 6000);
            // Sentence accumulation never cuts mid-sentence
            assert!(chunk.text.ends_with('.'));
        }
    }

    #[test]
    fn test_force_split_bounds_unbreakable_content() {
        let content = "x".repeat(20_000);
        let doc = Document::new("d1", &content);
        let chunks = chunker().chunk(&doc);

        assert!(chunks.len() > 1);
        let threshold = ChunkingConfig::default().force_split_threshold();
        for chunk in &chunks {
            assert!(chunk.text.len() <= threshold);
        }
    }

    #[test]
    fn test_indices_dense_and_ids_stable() {
        let content = "The appropriation bill was read a second time. ".repeat(400);
        let doc = Document::new("d1", content.trim());

        let first = chunker().chunk(&doc);
        let second = chunker().chunk(&doc);

        assert_eq!(first.len(), second.len());
        for (i, (a, b)) in first.iter().zip(&second).enumerate() {
            assert_eq!(a.chunk_index, i);
            assert_eq!(a.chunk_id, format!("d1_{}", i));
            assert_eq!(a.chunk_id, b.chunk_id);
            assert_eq!(a.text, b.text);
            assert_eq!(a.content_hash, b.content_hash);
        }
    }

    #[test]
    fn test_speaker_aware_strategy_labels_segments() {
        let mut config = ChunkingConfig::default();
        config.strategy = ChunkingStrategy::SpeakerAware;
        let chunker = TranscriptChunker::new(config);

        let content = "Order of business for the sitting of the House. \
                       MR. SPEAKER: The House will come to order for the first reading. \
                       HON. T. BROWN: I rise to speak on the seabed minerals amendment bill.";
        let doc = Document::new("d1", content);
        let chunks = chunker.chunk(&doc);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].speaker, "Document Header");
        assert_eq!(chunks[1].speaker, "MR. SPEAKER");
        assert_eq!(chunks[2].speaker, "HON. T. BROWN");
        // Re-index spans segments
        assert_eq!(chunks[2].chunk_id, "d1_2");
    }

    #[test]
    fn test_is_topic_transition_signals() {
        assert!(is_topic_transition(
            "Moving on to the housing portfolio review",
            "Previous remarks about the budget"
        ));
        assert!(is_topic_transition(
            "Clause 4 provides for the licensing regime",
            "General debate continued"
        ));
        assert!(is_topic_transition(
            "MR. SPEAKER: order please",
            "Some earlier text"
        ));
        assert!(!is_topic_transition(
            "the discussion continued as before",
            "the discussion started earlier"
        ));
        assert!(!is_topic_transition("anything at all", ""));
    }

    #[test]
    fn test_topic_keyword_disjointness() {
        // Mining/environment paragraph vs education paragraph: no shared
        // vocabulary, two keywords on the current side
        assert!(is_topic_transition(
            "the education grant and scholarship scheme were reviewed",
            "seabed mining exploration in the marine environment"
        ));
    }

    #[test]
    fn test_overlap_suffix_word_aligned() {
        let text = "alpha beta gamma delta epsilon";
        let overlap = overlap_suffix(text, 13);
        assert_eq!(overlap, "delta epsilon");

        // Whole text fits
        assert_eq!(overlap_suffix("short", 480), "short");
    }

    #[test]
    fn test_split_sentences_keeps_punctuation() {
        let sentences = split_sentences("First point. Second point! Third point? Fourth");
        assert_eq!(
            sentences,
            vec!["First point.", "Second point!", "Third point?", "Fourth"]
        );
    }

    #[test]
    fn test_clean_content() {
        let cleaned = clean_content("<p>The   seabed</p> mining pro-  posal \u{2603} text");
        assert_eq!(cleaned, "The seabed mining proposal text");
    }

    #[test]
    fn test_clean_content_keeps_paragraph_breaks() {
        let cleaned = clean_content("First  paragraph here.\n\n\n\nSecond   paragraph here.");
        assert_eq!(cleaned, "First paragraph here.\n\nSecond paragraph here.");
    }
}
