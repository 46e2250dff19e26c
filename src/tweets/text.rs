//! Mention and hashtag extraction from tweet text. Both are
//! case-insensitive; results are lowercased for account/tag resolution.

use std::sync::OnceLock;

use regex::Regex;

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@(\w+)").expect("valid mention regex"))
}

fn hashtag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#(\w+)").expect("valid hashtag regex"))
}

/// Usernames mentioned as @name, lowercased, deduplicated, in order of first
/// appearance.
pub fn extract_mentions(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for cap in mention_re().captures_iter(text) {
        let name = cap[1].to_lowercase();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Hashtags as #tag, lowercased, deduplicated, in order of first appearance.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for cap in hashtag_re().captures_iter(text) {
        let tag = cap[1].to_lowercase();
        if !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}
