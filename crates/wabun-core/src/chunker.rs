//! Paragraph-bounded text fragmentation.
//!
//! Text is split on blank lines (`"\n\n"`) and consecutive paragraphs are
//! packed into one fragment while the packed length (in characters,
//! separators included) stays within the target size. Paragraphs are never
//! split, so a single paragraph longer than the target becomes its own
//! oversize fragment.
//!
//! Rejoining the fragments with `"\n\n"` reproduces the input up to
//! trailing whitespace, which is trimmed from every fragment.

use crate::constants::PARAGRAPH_SEPARATOR;
use crate::text::char_len;

/// Split `text` into ordered paragraph-aligned fragments.
///
/// A fragment packing two or more paragraphs stays within `target_size`
/// characters. A lone paragraph longer than `target_size` is emitted whole.
/// Text shorter than `target_size` comes back as a single fragment. Empty
/// input yields exactly one empty fragment; callers reject empty records
/// before reaching this point.
pub fn fragment(text: &str, target_size: usize) -> Vec<String> {
    if char_len(text) < target_size {
        return vec![text.trim_end().to_owned()];
    }

    let separator_len = char_len(PARAGRAPH_SEPARATOR);
    let mut fragments = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0;
    let mut buffered_paragraphs = 0_usize;

    for paragraph in text.split(PARAGRAPH_SEPARATOR) {
        let paragraph_len = char_len(paragraph);
        if buffered_paragraphs > 0 && buffer_len + separator_len + paragraph_len > target_size {
            emit(&mut fragments, &buffer);
            buffer.clear();
            buffer_len = 0;
            buffered_paragraphs = 0;
        }
        if buffered_paragraphs > 0 {
            buffer.push_str(PARAGRAPH_SEPARATOR);
            buffer_len += separator_len;
        }
        buffer.push_str(paragraph);
        buffer_len += paragraph_len;
        buffered_paragraphs += 1;
    }
    emit(&mut fragments, &buffer);

    if fragments.is_empty() {
        fragments.push(text.trim_end().to_owned());
    }
    fragments
}

fn emit(fragments: &mut Vec<String>, buffer: &str) {
    let trimmed = buffer.trim_end();
    if !trimmed.is_empty() {
        fragments.push(trimmed.to_owned());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
