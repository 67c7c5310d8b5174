//! Text chunking for speech synthesis
//!
//! The synthesis provider enforces a per-request character limit. Long
//! articles are split into chunks under that limit by a greedy heuristic
//! that prefers natural pauses, in order:
//!
//! 1. the last sentence-ending punctuation within the budget;
//! 2. the last clause/word boundary from a fallback list;
//! 3. a forced split at the budget boundary, backing off to the nearest
//!    preceding space;
//! 4. an emergency split at half the budget when no space exists at all.
//!
//! Every chunk is non-empty and at most `limit` characters; an input at or
//! under the limit yields exactly one chunk equal to the trimmed input.

/// Sentence-ending boundaries, best split points
const SENTENCE_BREAKS: &[&str] = &[". ", "! ", "? ", "．", "。"];

/// Clause/word boundaries tried when no sentence break fits
const FALLBACK_BREAKS: &[&str] = &["; ", ": ", ", ", " — ", " "];

/// Split `text` into chunks of at most `limit` characters.
///
/// Whitespace at chunk boundaries is trimmed away; empty input produces no
/// chunks. Limits below 2 are clamped to 2 so a boundary marker can fit.
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(2);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if char_count(trimmed) <= limit {
        return vec![trimmed.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = trimmed;

    while !rest.is_empty() {
        if char_count(rest) <= limit {
            let tail = rest.trim();
            if !tail.is_empty() {
                chunks.push(tail.to_string());
            }
            break;
        }

        let window_end = byte_index_of_char(rest, limit);
        let window = &rest[..window_end];

        let split = find_break(window, SENTENCE_BREAKS)
            .or_else(|| find_break(window, FALLBACK_BREAKS))
            .unwrap_or_else(|| force_split(window, limit));

        let (chunk, tail) = rest.split_at(split);
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        rest = tail.trim_start();
    }

    chunks
}

/// Find the end of the last occurrence of any marker in the window.
/// The marker itself stays with the chunk (trailing spaces are trimmed off
/// later).
fn find_break(window: &str, markers: &[&str]) -> Option<usize> {
    markers
        .iter()
        .filter_map(|marker| window.rfind(marker).map(|pos| pos + marker.len()))
        .max()
}

/// No boundary marker in the window: back off to the nearest preceding
/// space, or emergency-split at half the budget when the window is one
/// unbroken run.
fn force_split(window: &str, limit: usize) -> usize {
    match window.rfind(' ') {
        Some(pos) if pos > 0 => pos,
        _ => byte_index_of_char(window, (limit / 2).max(1)),
    }
}

fn char_count(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the nth character, or the string length if shorter
fn byte_index_of_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}
