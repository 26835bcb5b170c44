//! Text normalization and token-set extraction for cross-catalog matching.
//!
//! Both sides of a comparison (condition questions and market titles) go
//! through the same pipeline: normalize, lowercase-split on whitespace,
//! drop short tokens. Matching operates on the resulting sets.

use deunicode::deunicode;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

/// Normalize a proposition for matching:
/// lowercase, strip URLs, deunicode (é -> e, ñ -> n, ...), collapse whitespace.
pub fn normalize_for_matching(text: &str) -> String {
    lazy_static! {
        static ref URL_RE: Regex = Regex::new(r"https?://\S+").unwrap();
    }

    let lower = text.to_lowercase();
    let no_url = URL_RE.replace_all(&lower, "");
    let ascii = deunicode(&no_url);

    // collapse tabs/newlines/multiple spaces into a single space
    ascii.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Token set for similarity scoring. Tokens with length <= `min_token_len`
/// are discarded (default 3 upstream), so "by", "the", "of" never count
/// toward overlap.
pub fn token_set(text: &str, min_token_len: usize) -> HashSet<String> {
    normalize_for_matching(text)
        .split_whitespace()
        .filter(|t| t.len() > min_token_len)
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_urls_and_unicode() {
        let s = normalize_for_matching("Será que sí?  https://example.com/x \t next");
        assert_eq!(s, "sera que si? next");
    }

    #[test]
    fn test_token_set_drops_short_tokens() {
        let tokens = token_set("Will the Fed cut rates by March", 3);
        assert!(tokens.contains("will"));
        assert!(tokens.contains("rates"));
        assert!(tokens.contains("march"));
        // <= 3 chars are discarded
        assert!(!tokens.contains("the"));
        assert!(!tokens.contains("fed"));
        assert!(!tokens.contains("cut"));
        assert!(!tokens.contains("by"));
    }

    #[test]
    fn test_token_set_is_deduplicated() {
        let tokens = token_set("rates rates RATES", 3);
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn test_empty_input_yields_empty_set() {
        assert!(token_set("", 3).is_empty());
        assert!(token_set("a an of by", 3).is_empty());
    }
}
