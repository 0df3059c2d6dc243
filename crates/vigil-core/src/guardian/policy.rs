//! Policy snippet parsing and scoring

use super::text::{contains_phrase, jaccard};
use crate::capabilities::PolicySnippet;
use tracing::warn;

const DISALLOW_PREFIX: &str = "disallow:";

/// A usable policy snippet
#[derive(Debug, Clone)]
pub(crate) enum PolicyRule {
    /// `Disallow: <phrase>`; can deny
    Disallow {
        phrase: String,
        snippet: PolicySnippet,
    },
    /// Free-form guidance; only ever produces warnings
    Advisory { snippet: PolicySnippet },
}

impl PolicyRule {
    pub(crate) fn snippet(&self) -> &PolicySnippet {
        match self {
            Self::Disallow { snippet, .. } | Self::Advisory { snippet } => snippet,
        }
    }
}

/// Parse snippets, skipping malformed ones with a warning each.
pub(crate) fn parse_snippets(
    snippets: Vec<PolicySnippet>,
    warnings: &mut Vec<String>,
) -> Vec<PolicyRule> {
    let mut rules = Vec::with_capacity(snippets.len());
    for snippet in snippets {
        match classify(&snippet) {
            Ok(rule) => rules.push(rule),
            Err(problem) => {
                let source = if snippet.source.is_empty() {
                    "unknown source"
                } else {
                    snippet.source.as_str()
                };
                warn!(source = %source, problem = %problem, "Skipping malformed policy snippet");
                warnings.push(format!("skipped malformed policy from {}: {}", source, problem));
            }
        }
    }
    rules
}

fn classify(snippet: &PolicySnippet) -> Result<PolicyRule, &'static str> {
    let text = snippet.text.trim();
    if text.is_empty() {
        return Err("empty text");
    }
    if !snippet.weight.is_finite() || !(0.0..=1.0).contains(&snippet.weight) {
        return Err("weight outside [0, 1]");
    }

    let is_disallow = text
        .get(..DISALLOW_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(DISALLOW_PREFIX));
    if is_disallow {
        let phrase = text[DISALLOW_PREFIX.len()..].trim();
        if phrase.is_empty() {
            return Err("disallow rule without a phrase");
        }
        return Ok(PolicyRule::Disallow {
            phrase: phrase.to_string(),
            snippet: snippet.clone(),
        });
    }
    Ok(PolicyRule::Advisory {
        snippet: snippet.clone(),
    })
}

/// Score of one rule against the scanned texts
#[derive(Debug, Clone)]
pub(crate) struct PolicyMatch {
    pub score: f64,
    pub violation: bool,
    pub snippet: PolicySnippet,
}

/// Weighted score of a text against a phrase: 1.0 when the phrase occurs
/// as whole words, otherwise the Jaccard token overlap.
pub(crate) fn phrase_score(text: &str, phrase: &str, weight: f64) -> f64 {
    let raw = if contains_phrase(text, phrase) {
        1.0
    } else {
        jaccard(text, phrase)
    };
    raw * weight
}

/// Best score per rule across `texts`, highest first. Zero scores are dropped.
pub(crate) fn score_rules(texts: &[String], rules: &[PolicyRule]) -> Vec<PolicyMatch> {
    let mut matches: Vec<PolicyMatch> = rules
        .iter()
        .filter_map(|rule| {
            let (phrase, violation) = match rule {
                PolicyRule::Disallow { phrase, .. } => (phrase.as_str(), true),
                PolicyRule::Advisory { snippet } => (snippet.text.as_str(), false),
            };
            let weight = rule.snippet().weight;
            let best = texts
                .iter()
                .map(|t| phrase_score(t, phrase, weight))
                .fold(0.0_f64, f64::max);
            (best > 0.0).then(|| PolicyMatch {
                score: best,
                violation,
                snippet: rule.snippet().clone(),
            })
        })
        .collect();
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_malformed() {
        let mut warnings = Vec::new();
        let rules = parse_snippets(
            vec![
                PolicySnippet::new("Disallow: delete", "seed"),
                PolicySnippet::new("   ", "broken"),
                PolicySnippet::new("Disallow:", "half"),
                PolicySnippet::new("Disallow: reboot", "seed").with_weight(f64::NAN),
                PolicySnippet::new("Prefer read-only tools", ""),
            ],
            &mut warnings,
        );
        assert_eq!(rules.len(), 2);
        assert!(matches!(&rules[0], PolicyRule::Disallow { phrase, .. } if phrase == "delete"));
        assert!(matches!(rules[1], PolicyRule::Advisory { .. }));
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("broken"));
    }

    #[test]
    fn test_disallow_prefix_is_case_insensitive() {
        let mut warnings = Vec::new();
        let rules = parse_snippets(vec![PolicySnippet::new("DISALLOW: Shutdown", "x")], &mut warnings);
        assert!(matches!(&rules[0], PolicyRule::Disallow { phrase, .. } if phrase == "Shutdown"));
    }

    #[test]
    fn test_whole_word_phrase_scores_full_weight() {
        assert_eq!(phrase_score("wipe the temp directory", "delete", 1.0), 1.0);
        assert_eq!(phrase_score("wipe the temp directory", "delete", 0.5), 0.5);
        assert_eq!(phrase_score("list undeleted files", "delete", 1.0), 0.0);
    }

    #[test]
    fn test_score_rules_orders_best_first() {
        let mut warnings = Vec::new();
        let rules = parse_snippets(
            vec![
                PolicySnippet::new("Disallow: delete user data", "a"),
                PolicySnippet::new("Disallow: shutdown", "b"),
            ],
            &mut warnings,
        );
        let matches = score_rules(&["export user data".to_string()], &rules);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].snippet.source, "a");
        assert!((matches[0].score - 0.5).abs() < 1e-9);
    }
}
