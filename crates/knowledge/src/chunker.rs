//! Splitting source text into overlapping passages.

use crate::types::{ChunkCandidate, TextSpan};

/// Cut points in order of preference: paragraph, line, word.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Split `text` into chunks of at most `chunk_size` characters, each
/// sharing up to `overlap` characters with its predecessor.
///
/// Inside each window the cut goes after the last paragraph break, else the
/// last line break, else the last space; a window with none of these is cut
/// hard. Chunks are trimmed and whitespace-only chunks are dropped, so
/// positions stay dense.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<ChunkCandidate> {
    if chunk_size == 0 {
        return Vec::new();
    }

    // Byte offset of every char, plus the end of the text
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let limit = (start + chunk_size).min(total);
        let end = if limit == total {
            total
        } else {
            preferred_cut(text, &bounds, (start + overlap + 1).min(limit), limit)
        };

        let raw = &text[bounds[start]..bounds[end]];
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let span_start = bounds[start] + (raw.len() - raw.trim_start().len());
            chunks.push(ChunkCandidate {
                position: chunks.len() as u32,
                text: trimmed.to_string(),
                span: TextSpan {
                    start: span_start,
                    end: span_start + trimmed.len(),
                },
            });
        }

        if end == total {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    tracing::debug!(
        "Chunked {} chars into {} chunks (size: {}, overlap: {})",
        total,
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

/// Char index just past the best separator in chars `from..limit`, or `limit`.
fn preferred_cut(text: &str, bounds: &[usize], from: usize, limit: usize) -> usize {
    let window = &text[bounds[from]..bounds[limit]];

    SEPARATORS
        .iter()
        .find_map(|sep| window.rfind(sep).map(|at| bounds[from] + at + sep.len()))
        .and_then(|byte| bounds.binary_search(&byte).ok())
        .unwrap_or(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_cuts_without_separators() {
        let text = "a".repeat(300);
        let chunks = chunk_text(&text, 100, 0);

        assert_eq!(chunks.len(), 3);
        let positions: Vec<u32> = chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_and_blank_text() {
        assert!(chunk_text("", 100, 10).is_empty());
        assert!(chunk_text("   \n\n  ", 100, 10).is_empty());
        assert!(chunk_text("text", 0, 0).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("Retrieval augmented generation.", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Retrieval augmented generation.");
    }

    #[test]
    fn test_overlap_repeats_tail() {
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(10);
        let chunks = chunk_text(&text, 50, 10);

        assert!(chunks.len() >= 2);
        let first = &chunks[0].text;
        assert_eq!(first.len(), 50);
        assert_eq!(&first[40..], &chunks[1].text[..10]);
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let text = "First paragraph here.\n\nSecond paragraph text that goes on.";
        let chunks = chunk_text(text, 30, 0);

        assert_eq!(chunks[0].text, "First paragraph here.");
        assert!(chunks[1].text.starts_with("Second paragraph"));
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 30);
        }
    }

    #[test]
    fn test_falls_back_to_word_break() {
        let chunks = chunk_text("alpha beta gamma delta", 12, 0);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn test_sizes_count_characters() {
        let text = "é".repeat(100);
        let chunks = chunk_text(&text, 15, 4);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 15);
            assert!(chunk.text.chars().all(|c| c == 'é'));
        }
    }

    #[test]
    fn test_span_points_at_trimmed_text() {
        let text = "  hello world  ";
        let chunks = chunk_text(text, 100, 0);

        assert_eq!(chunks.len(), 1);
        let span = chunks[0].span;
        assert_eq!(span, TextSpan { start: 2, end: 13 });
        assert_eq!(&text[span.start..span.end], chunks[0].text);
    }

    #[test]
    fn test_oversized_overlap_still_progresses() {
        let chunks = chunk_text(&"x".repeat(20), 5, 10);
        assert!(!chunks.is_empty());
        assert!(chunks.len() <= 20);
    }
}
