use std::sync::OnceLock;

use regex::Regex;

const REPLACEMENTS: [(&str, &str); 6] = [
    ("’", "'"),
    ("&", "and"),
    ("-", " "),
    ("(", ""),
    (")", ""),
    (".", ""),
];

/// Words that mark a different recording of the same song.
const VERSION_KEYWORDS: [&str; 4] = ["instrumental", "acapella", "remix", "live"];

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap())
}

fn punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"[^\p{L}\p{N}\s]+")
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\s+")
}

fn sections() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\([^)]*\)|\[[^\]]*\]")
}

fn artist_separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"(?i)\s*(?:,|&|\bfeat\b\.?|\bft\b\.?|\bfeaturing\b|\bwith\b)\s*",
    )
}

/// Lowercases, applies the character replacements and drops remaining
/// punctuation.
pub fn normalize(value: &str) -> String {
    let mut value = value.trim().to_lowercase();
    for (from, to) in REPLACEMENTS {
        value = value.replace(from, to);
    }
    let value = punctuation().replace_all(&value, "");
    whitespace().replace_all(value.trim(), " ").to_string()
}

/// Like [`normalize`], but without bracketed sections such as
/// `(feat. x)` or `[2011 remaster]` and without a `" - "` suffix.
pub fn simplify(value: &str) -> String {
    let head = value.split(" - ").next().unwrap_or(value);
    normalize(&sections().replace_all(head, " "))
}

pub fn split_artists(value: &str) -> Vec<String> {
    artist_separators()
        .split(value)
        .map(normalize)
        .filter(|a| !a.is_empty())
        .collect()
}

pub fn version_keywords(title: &str) -> Vec<&'static str> {
    let title = normalize(title);
    VERSION_KEYWORDS
        .into_iter()
        .filter(|keyword| title.split(' ').any(|word| word == *keyword))
        .collect()
}
