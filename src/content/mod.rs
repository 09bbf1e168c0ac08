//! Content processing for crawled pages
//!
//! - `content_hash` / `document_id`: SHA-256 fingerprints of cleaned text
//! - `MarkupReducer`: raw markup to plain text
//! - `truncate_to_bytes`: byte cap applied before storage

mod hash;
mod reducer;

pub use hash::{content_hash, document_id};
pub use reducer::{HtmlReducer, MarkupReducer};

/// Truncates text to at most `max_bytes` bytes of UTF-8
///
/// The cut may land inside a multi-byte character; the partial character is
/// dropped rather than replaced.
pub fn truncate_to_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }

    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
