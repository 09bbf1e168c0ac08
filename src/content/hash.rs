use sha2::{Digest, Sha256};

/// Computes the hex-encoded SHA-256 digest of a piece of text
///
/// Used both as the dedup fingerprint of cleaned page text and, over the
/// concatenation of text and page URL, as the document identifier.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derives the storage slot identifier for a page's cleaned text
pub fn document_id(cleaned_text: &str, page_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cleaned_text.as_bytes());
    hasher.update(page_url.as_bytes());
    hex::encode(hasher.finalize())
}
