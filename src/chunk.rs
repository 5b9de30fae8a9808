//! Recursive overlapping text splitter.
//!
//! Splits document text at the largest boundary available: blank lines
//! first, then line breaks, then sentence terminators, then plain spaces,
//! hard-cutting only when a piece contains no boundary at all. Consecutive
//! chunks share up to `overlap` bytes of trailing context so information
//! spanning a cut is not lost.
//!
//! Each chunk receives an id derived from its document id and index, plus a
//! SHA-256 hash of its text. Splitting is deterministic for identical input
//! and parameters, which index rebuilds rely on.

use std::collections::VecDeque;

use sha2::{Digest, Sha256};

use crate::models::Chunk;

/// Boundary ladder, largest first.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ".", " "];

/// Split a document body and wrap the pieces as [`Chunk`]s with contiguous
/// indices starting at 0.
pub fn chunk_document(
    document_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<Chunk> {
    split_text(text, chunk_size, overlap)
        .into_iter()
        .enumerate()
        .map(|(index, piece)| make_chunk(document_id, index, piece))
        .collect()
}

/// Split `text` into overlapping pieces of at most `chunk_size` bytes.
///
/// Returns an empty vector for blank input and a single piece when the
/// whole text fits. `overlap` must be smaller than `chunk_size` (config
/// validation enforces this); the splitter still terminates if it is not.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    split_on(text, chunk_size, overlap, &SEPARATORS)
}

fn split_on(text: &str, chunk_size: usize, overlap: usize, separators: &[&str]) -> Vec<String> {
    // First separator in the ladder that actually occurs here.
    let (sep_pos, sep) = match separators.iter().enumerate().find(|(_, s)| text.contains(**s)) {
        Some((i, s)) => (i, *s),
        None => return hard_cut(text, chunk_size, overlap),
    };
    let deeper = &separators[sep_pos + 1..];

    let mut out = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for piece in text.split(sep) {
        if piece.len() < chunk_size {
            pending.push(piece);
            continue;
        }
        // Oversized piece: flush what fits, then descend one ladder level.
        if !pending.is_empty() {
            merge_pieces(&pending, sep, chunk_size, overlap, &mut out);
            pending.clear();
        }
        if deeper.is_empty() {
            out.extend(hard_cut(piece, chunk_size, overlap));
        } else {
            out.extend(split_on(piece, chunk_size, overlap, deeper));
        }
    }
    if !pending.is_empty() {
        merge_pieces(&pending, sep, chunk_size, overlap, &mut out);
    }
    out
}

/// Greedily pack pieces into chunks of at most `chunk_size` bytes, carrying
/// a tail of at most `overlap` bytes from one chunk into the next.
fn merge_pieces(
    pieces: &[&str],
    sep: &str,
    chunk_size: usize,
    overlap: usize,
    out: &mut Vec<String>,
) {
    let sep_len = sep.len();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let len = piece.len();
        let joint = if window.is_empty() { 0 } else { sep_len };
        if total + len + joint > chunk_size && !window.is_empty() {
            if let Some(chunk) = join_window(&window, sep) {
                out.push(chunk);
            }
            // Shrink the window to the overlap budget, and keep shrinking
            // while the incoming piece would still not fit.
            while total > overlap
                || (total + len + if window.is_empty() { 0 } else { sep_len } > chunk_size
                    && total > 0)
            {
                let front = match window.pop_front() {
                    Some(front) => front,
                    None => break,
                };
                total -= front.len() + if window.is_empty() { 0 } else { sep_len };
            }
        }
        window.push_back(piece);
        total += len + if window.len() > 1 { sep_len } else { 0 };
    }

    if let Some(chunk) = join_window(&window, sep) {
        out.push(chunk);
    }
}

fn join_window(window: &VecDeque<&str>, sep: &str) -> Option<String> {
    let joined = window.iter().copied().collect::<Vec<_>>().join(sep);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Fixed-width slicing for text with no separators at all. Steps by
/// `chunk_size - overlap` so consecutive slices still share context. Cut
/// points are clamped to char boundaries, so a slice may run a few bytes
/// short of `chunk_size` but never over it.
fn hard_cut(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut out = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // chunk_size is smaller than one char; take the whole char.
            end = start + 1;
            while end < text.len() && !text.is_char_boundary(end) {
                end += 1;
            }
        }
        out.push(text[start..end].to_string());
        if end == text.len() {
            break;
        }
        start += step;
        while start < text.len() && !text.is_char_boundary(start) {
            start += 1;
        }
    }
    out
}

fn make_chunk(document_id: &str, index: usize, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: format!("{}_chunk_{}", document_id, index),
        document_id: document_id.to_string(),
        chunk_index: index,
        text,
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(split_text("", 800, 100).is_empty());
        assert!(split_text("   \n\n  ", 800, 100).is_empty());
        assert!(chunk_document("doc1", "", 800, 100).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = split_text("Alice has a red ball.", 1000, 100);
        assert_eq!(chunks, vec!["Alice has a red ball.".to_string()]);
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta gamma. Delta epsilon zeta.\n\nEta theta iota kappa lambda.";
        let a = chunk_document("doc1", text, 30, 8);
        let b = chunk_document("doc1", text, 30, 8);
        assert_eq!(a, b);
    }

    #[test]
    fn test_chunks_respect_size_limit() {
        let text = (0..40)
            .map(|i| format!("Sentence number {} talks about something moderately long.", i))
            .collect::<Vec<_>>()
            .join(" ");
        for chunk in split_text(&text, 120, 30) {
            assert!(chunk.len() <= 120, "chunk too large: {} bytes", chunk.len());
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn test_paragraphs_kept_whole_when_they_fit() {
        let text = "First paragraph with a few words in it.\n\nSecond paragraph, also short.";
        let chunks = split_text(text, 45, 10);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "First paragraph with a few words in it.");
        assert_eq!(chunks[1], "Second paragraph, also short.");
    }

    #[test]
    fn test_overlap_carries_context() {
        let chunks = split_text("one two three four five", 10, 4);
        assert_eq!(chunks, vec!["one two", "two three", "four five"]);
    }

    #[test]
    fn test_zero_overlap_covers_all_content() {
        let text = "First sentence. Second sentence.\n\nSecond paragraph here.\nAnother line with words.";
        let chunks = split_text(text, 24, 0);
        let strip = |s: &str| {
            s.chars()
                .filter(|c| !c.is_whitespace() && *c != '.')
                .collect::<String>()
        };
        let merged: String = chunks.iter().map(|c| strip(c)).collect();
        assert_eq!(merged, strip(text));
    }

    #[test]
    fn test_no_boundary_input_hard_cuts() {
        let text = "x".repeat(2500);
        let chunks = split_text(&text, 800, 100);
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.len() <= 800));
        // Steps of chunk_size - overlap: starts at 0, 700, 1400, 2100.
        assert_eq!(chunks[3].len(), 400);
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let text = "日本語".repeat(300);
        let chunks = split_text(&text, 800, 100);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 800);
            assert!(chunk.chars().all(|c| "日本語".contains(c)));
        }
    }

    #[test]
    fn test_chunk_ids_and_indices() {
        let text = "One short sentence. Another short sentence. And a third one here.";
        let chunks = chunk_document("doc1", text, 30, 5);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.id, format!("doc1_chunk_{}", i));
            assert_eq!(chunk.document_id, "doc1");
            assert_eq!(chunk.hash.len(), 64);
        }
    }
}
