/// Scheme prefixes accepted as already present
const SCHEME_PREFIXES: &[&str] = &["http://", "https://"];

/// Prefix added to addresses that arrive without a scheme
const DEFAULT_PREFIX: &str = "https://";

/// Normalizes a site address into the key used to partition stored documents
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. If the address has no `http://` or `https://` prefix (in any letter case),
///    prepend `https://`
/// 3. Remove trailing `/` characters that follow the scheme prefix
///
/// No parsing or network access happens here; seed lists arrive in many
/// shapes and only these rewrites are applied. The result is stable
/// under repeated application.
///
/// # Examples
///
/// ```
/// use corpus_sieve::url::normalize_site_url;
///
/// assert_eq!(normalize_site_url("www.example.edu/"), "https://www.example.edu");
/// assert_eq!(normalize_site_url("http://example.edu"), "http://example.edu");
/// ```
pub fn normalize_site_url(raw: &str) -> String {
    let raw = raw.trim();

    let (prefix, rest) = match split_scheme(raw) {
        Some((prefix, rest)) => (prefix, rest),
        None => (DEFAULT_PREFIX, raw),
    };

    format!("{}{}", prefix, rest.trim_end_matches('/'))
}

/// Splits a recognized scheme prefix off the address, matching case-insensitively
fn split_scheme(raw: &str) -> Option<(&str, &str)> {
    SCHEME_PREFIXES.iter().find_map(|prefix| {
        let head = raw.get(..prefix.len())?;
        if head.eq_ignore_ascii_case(prefix) {
            Some((head, &raw[prefix.len()..]))
        } else {
            None
        }
    })
}
