//! UTF-8–safe, character-counted string helpers.
//!
//! Record text is mostly Spanish prose, so every length in the archive is a
//! character count rather than a byte count. Slicing with `&str[..n]` would
//! panic inside a multi-byte character; these helpers always cut at a char
//! boundary.

/// Suffix appended to excerpts that were cut short.
pub const ELLIPSIS: &str = "...";

/// Number of characters in `s`.
#[inline]
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Excerpt of at most `max_chars` characters, with [`ELLIPSIS`] appended
/// when the text was cut.
pub fn excerpt(s: &str, max_chars: usize) -> String {
    let prefix = truncate_chars(s, max_chars);
    if prefix.len() == s.len() {
        s.to_owned()
    } else {
        format!("{prefix}{ELLIPSIS}")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
