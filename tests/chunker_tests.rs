//! Chunker invariants: coverage, size bounds, and id stability

use hansard_rag::{Chunk, ChunkingConfig, ChunkingStrategy, Document, TranscriptChunker};
use proptest::prelude::*;
use std::collections::HashSet;

fn chunk(content: &str) -> Vec<Chunk> {
    let doc = Document::new("d1", content);
    TranscriptChunker::default().chunk(&doc)
}

fn words(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|w| w.to_string()).collect()
}

fn normalized(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

// --- Literal scenarios ---

#[test]
fn empty_content_yields_no_chunks() {
    assert!(chunk("").is_empty());
    assert!(chunk(" \n \t \n\n ").is_empty());
}

#[test]
fn single_paragraph_under_max_is_one_chunk() {
    let sentence = "The Clerk read the orders of the day to the assembled members. ";
    let content: String = sentence.repeat(5).trim().to_string();
    assert!(content.len() < 400);

    let chunks = chunk(&content);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].chunk_index, 0);
    assert_eq!(chunks[0].chunk_id, "d1_0");
    assert_eq!(chunks[0].text, normalized(&content));
    assert_eq!(chunks[0].token_estimate, chunks[0].text.len() / 4);
}

#[test]
fn topic_transition_starts_a_fresh_chunk() {
    let first = "The appropriation debate continued through the morning sitting. "
        .repeat(13)
        .trim()
        .to_string();
    let second = format!(
        "Moving to a completely different topic, {}",
        "the fisheries quota review was presented to members. "
            .repeat(14)
            .trim()
    );
    assert!(first.len() > 500 && first.len() < 4000);

    let chunks = chunk(&format!("{}\n\n{}", first, second));

    assert_eq!(chunks.len(), 2);
    // First chunk ends exactly at the end of paragraph one
    assert_eq!(chunks[0].text, first);
    // Second chunk starts at paragraph two's first character: no overlap
    assert!(chunks[1]
        .text
        .starts_with("Moving to a completely different topic,"));
    assert!(!chunks[1].text.contains("appropriation"));
}

#[test]
fn size_split_carries_word_aligned_overlap() {
    let paragraphs: Vec<String> = (0..8)
        .map(|i| {
            format!("Members continued the general debate in sitting {} today. ", i)
                .repeat(25)
                .trim()
                .to_string()
        })
        .collect();

    let chunks = chunk(&paragraphs.join("\n\n"));

    assert!(chunks.len() > 1);
    for pair in chunks.windows(2) {
        // Size splits carry a suffix of the previous chunk forward
        let overlap_head: String = pair[1]
            .text
            .split_whitespace()
            .take(5)
            .collect::<Vec<_>>()
            .join(" ");
        assert!(
            pair[0].text.contains(&overlap_head),
            "expected overlap head {:?} inside previous chunk",
            overlap_head
        );
    }
}

// --- Word coverage ---

fn paragraph_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,10}", 1..60).prop_map(|words| words.join(" "))
}

fn content_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(paragraph_strategy(), 1..8).prop_map(|paras| paras.join("\n\n"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_source_word_appears_in_some_chunk(content in content_strategy()) {
        let chunks = chunk(&content);
        let mut emitted = HashSet::new();
        for c in &chunks {
            emitted.extend(words(&c.text));
        }

        for word in words(&normalized(&content)) {
            prop_assert!(
                emitted.contains(&word),
                "word {:?} lost during chunking",
                word
            );
        }
    }

    // --- Size bound ---

    #[test]
    fn chunk_size_is_bounded(content in content_strategy()) {
        let config = ChunkingConfig::default();
        let limit = config.force_split_threshold();
        for c in chunk(&content) {
            prop_assert!(c.text.len() <= limit);
        }
    }

    // --- Determinism and content sensitivity ---

    #[test]
    fn chunking_is_deterministic(content in content_strategy()) {
        let doc = Document::new("d1", &content);
        let chunker = TranscriptChunker::default();

        let first = chunker.chunk(&doc);
        let second = chunker.chunk(&doc);

        prop_assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            prop_assert_eq!(&a.chunk_id, &b.chunk_id);
            prop_assert_eq!(&a.text, &b.text);
            prop_assert_eq!(&a.content_hash, &b.content_hash);
        }
    }

    #[test]
    fn single_character_edit_changes_a_hash(content in content_strategy()) {
        let original = chunk(&content);
        let edited = chunk(&format!("{}z", content));

        let original_hashes: HashSet<String> =
            original.iter().map(|c| c.content_hash.clone()).collect();
        let edited_hashes: HashSet<String> =
            edited.iter().map(|c| c.content_hash.clone()).collect();

        prop_assert_ne!(original_hashes, edited_hashes);
    }

    // --- Dense indices in both strategies ---

    #[test]
    fn chunk_indices_are_dense(content in content_strategy()) {
        for (i, c) in chunk(&content).iter().enumerate() {
            prop_assert_eq!(c.chunk_index, i);
            prop_assert_eq!(&c.chunk_id, &format!("d1_{}", i));
        }
    }
}

#[test]
fn unbreakable_content_is_force_split_within_bound() {
    let config = ChunkingConfig::default();
    let chunks = chunk(&"m".repeat(25_000));

    assert!(chunks.len() > 1);
    for c in &chunks {
        assert!(c.text.len() <= config.force_split_threshold());
    }
    // Dense re-index still holds after force splitting
    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.chunk_index, i);
    }
}

#[test]
fn speaker_aware_mode_keeps_invariants() {
    let mut config = ChunkingConfig::default();
    config.strategy = ChunkingStrategy::SpeakerAware;
    let chunker = TranscriptChunker::new(config.clone());

    let body = "I thank the honourable member for the question about marine resources. "
        .repeat(80);
    let content = format!(
        "Opening of the sitting and prayers were read to the chamber. \
         MR. SPEAKER: Order, order, the House will now proceed to questions without notice. \
         HON. M. BROWN: {}",
        body
    );

    let doc = Document::new("d1", &content);
    let chunks = chunker.chunk(&doc);

    assert!(chunks.len() >= 3);
    assert_eq!(chunks[0].speaker, "Document Header");
    assert_eq!(chunks[1].speaker, "MR. SPEAKER");
    assert!(chunks[2..].iter().all(|c| c.speaker == "HON. M. BROWN"));

    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.chunk_index, i);
        assert_eq!(c.chunk_id, format!("d1_{}", i));
        assert!(c.text.len() <= config.force_split_threshold());
    }
}

#[test]
fn metadata_is_denormalized_onto_chunks() {
    let doc = Document::new("d1", "A short sitting record for the day.")
        .with_title("Daily Hansard")
        .with_country("Cook Islands")
        .with_date("2021-02-10");

    let chunks = TranscriptChunker::default().chunk(&doc);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].country, "Cook Islands");
    assert_eq!(chunks[0].title, "Daily Hansard");
    assert_eq!(chunks[0].date.as_deref(), Some("2021-02-10"));
    assert_eq!(chunks[0].chamber, "Parliament");
}
