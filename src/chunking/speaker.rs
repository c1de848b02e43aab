//! Speaker segmentation for parliamentary transcripts
//!
//! Hansard text attributes speech with titled headers like
//! `MR. SPEAKER:` or `HON. T. PUNA:`. This pass splits content at those
//! boundaries so each chunk can carry its speaker.

use super::types::{DOCUMENT_HEADER_SPEAKER, UNKNOWN_SPEAKER};
use regex::Regex;
use std::sync::OnceLock;

/// Segments shorter than this are discarded as header noise
const MIN_SEGMENT_CHARS: usize = 10;

/// A contiguous run of content attributed to one speaker
#[derive(Debug, Clone)]
pub struct SpeakerSegment {
    pub speaker: String,
    pub text: String,
}

fn speaker_heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)((?:MR\.|MS\.|HON\.|DR\.|MADAM|SIR)\s+[A-Z][A-Z\s\-.]*?):")
            .expect("static regex")
    })
}

/// Split content on titled-speaker headings.
///
/// Text before the first heading becomes a "Document Header" segment;
/// content with no headings at all becomes a single "Unknown Speaker"
/// segment. Segments of fewer than 10 characters are dropped.
pub fn extract_segments(content: &str) -> Vec<SpeakerSegment> {
    let mut segments = Vec::new();

    let matches: Vec<(usize, usize, String)> = speaker_heading_re()
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str().trim().to_string();
            Some((whole.start(), whole.end(), name))
        })
        .collect();

    if matches.is_empty() {
        let text = content.trim();
        if !text.is_empty() {
            segments.push(SpeakerSegment {
                speaker: UNKNOWN_SPEAKER.to_string(),
                text: text.to_string(),
            });
        }
        return segments;
    }

    let preamble = content[..matches[0].0].trim();
    if !preamble.is_empty() {
        segments.push(SpeakerSegment {
            speaker: DOCUMENT_HEADER_SPEAKER.to_string(),
            text: preamble.to_string(),
        });
    }

    for (i, (_, heading_end, speaker)) in matches.iter().enumerate() {
        let text_end = matches
            .get(i + 1)
            .map(|next| next.0)
            .unwrap_or(content.len());
        let text = content[*heading_end..text_end].trim();

        if text.len() > MIN_SEGMENT_CHARS {
            segments.push(SpeakerSegment {
                speaker: speaker.clone(),
                text: text.to_string(),
            });
        }
    }

    segments
}
