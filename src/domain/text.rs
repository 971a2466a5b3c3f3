//! Text folding shared by free-text matching and zone lookups.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Folds text for keyword comparison.
///
/// - Unicode NFD decomposition with combining marks dropped (`Kipé` → `kipe`)
/// - Lowercase conversion
/// - Punctuation replaced by spaces (digits kept)
/// - Whitespace collapsed
pub fn normalize(s: &str) -> String {
    let stripped: String = s
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Word-boundary containment on already normalized text.
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let padded_haystack = format!(" {haystack} ");
    let padded_phrase = format!(" {phrase} ");
    padded_haystack.contains(&padded_phrase)
}

/// Truncates to at most `max` characters, never splitting a code point.
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
