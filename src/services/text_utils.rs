//! Shared text normalization utilities
//!
//! Slugs for trailer filenames and redaction of secrets before they reach
//! the log.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-z0-9]+").expect("static slug regex is valid")
});

/// Render a title as a lowercase, hyphen-separated, filesystem-safe slug.
///
/// Accented letters are folded to their ASCII base, apostrophes and quotes
/// disappear, `&` and `@` become words, and every other run of punctuation
/// or whitespace becomes a single hyphen.
///
/// # Example
/// ```
/// use scavenge::services::text_utils::slugify;
/// assert_eq!(slugify("Dune: Part Two"), "dune-part-two");
/// assert_eq!(slugify("Amélie"), "amelie");
/// ```
pub fn slugify(title: &str) -> String {
    let mut folded = String::with_capacity(title.len());
    for c in title.nfkd() {
        match c {
            '\'' | '"' | '\u{2018}' | '\u{2019}' | '`' => {}
            '&' => folded.push_str(" and "),
            '@' => folded.push_str(" at "),
            c if is_combining_mark(c) => {}
            c if c.is_ascii() => folded.push(c.to_ascii_lowercase()),
            _ => folded.push(' '),
        }
    }

    NON_ALPHANUMERIC
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}

/// Reduce a secret to a short, stable fingerprint safe to log.
///
/// Empty secrets are reported as `<empty>` so a missing key is still visible.
pub fn redact_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "<empty>".to_string();
    }
    let digest = Sha256::digest(secret.as_bytes());
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}
