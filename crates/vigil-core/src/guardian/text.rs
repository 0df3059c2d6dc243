//! Text normalisation shared by the rule, injection and policy passes.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const ZERO_WIDTH: &[char] = &['\u{200b}', '\u{200c}', '\u{200d}', '\u{2060}', '\u{feff}'];

static SYNONYMS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\bbring\s+down\b", "shutdown"),
        (r"\b(?:wipe|purge|remove|erase|drop)\b", "delete"),
        (r"\breboot\b", "restart"),
    ]
    .into_iter()
    .map(|(pattern, canonical)| {
        (
            Regex::new(pattern).expect("SYNONYMS are compile-time constants"),
            canonical,
        )
    })
    .collect()
});

/// Remove zero-width and control characters. Whitespace controls become spaces.
pub(crate) fn strip_invisible(text: &str) -> String {
    text.chars()
        .filter(|c| !ZERO_WIDTH.contains(c))
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect()
}

fn unleet(c: char) -> char {
    match c {
        '0' => 'o',
        '1' => 'i',
        '3' => 'e',
        '4' => 'a',
        '5' => 's',
        '7' => 't',
        '@' => 'a',
        '$' => 's',
        other => other,
    }
}

/// Lowercased, leet-mapped, punctuation runs collapsed to single spaces
pub(crate) fn deobfuscate(text: &str) -> String {
    let mapped: String = strip_invisible(text)
        .to_lowercase()
        .chars()
        .map(unleet)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased with synonyms mapped onto their canonical verb
pub(crate) fn canonicalize(text: &str) -> String {
    let mut out = strip_invisible(text).to_lowercase();
    for (pattern, canonical) in SYNONYMS.iter() {
        out = pattern.replace_all(&out, *canonical).into_owned();
    }
    out
}

fn token_list(text: &str) -> Vec<String> {
    canonicalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Canonical token set
pub(crate) fn tokens(text: &str) -> HashSet<String> {
    token_list(text).into_iter().collect()
}

/// Jaccard overlap of the canonical token sets; 0.0 when either side is empty
pub(crate) fn jaccard(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let shared = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    shared as f64 / union as f64
}

/// Whether `phrase` occurs in `text` as a run of whole canonical tokens
pub(crate) fn contains_phrase(text: &str, phrase: &str) -> bool {
    let needle = token_list(phrase);
    if needle.is_empty() {
        return false;
    }
    let hay = token_list(text);
    hay.windows(needle.len()).any(|w| w == needle.as_slice())
}
