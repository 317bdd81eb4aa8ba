//! `@username` extraction from free text.

use regex::Regex;
use std::sync::LazyLock;

// Usernames are ASCII letters, digits and underscores.
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z0-9_]+)").expect("mention pattern is valid"));

/// Returns every mentioned username in order of appearance.
///
/// Repeated mentions are kept; callers decide whether to dedupe. Any `@`
/// followed by at least one username character counts, including one in the
/// middle of a word.
pub fn extract_mentions(text: &str) -> Vec<String> {
    MENTION_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
