//! Deterministic hard-deny rules
//!
//! Destructive filesystem operations, privileged shutdown and format
//! commands, and raw block-device access. A match is final: no policy
//! score or fallback answer can override it.

use super::text::{deobfuscate, strip_invisible};
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// A hard-deny rule
#[derive(Debug, Clone, Copy)]
pub struct HardDenyRule {
    /// Short identifier, quoted in deny reasons
    pub id: &'static str,
    /// What the rule guards against
    pub description: &'static str,
    pattern: &'static str,
}

/// Matched against the lowercased text and its deobfuscated form
pub const HARD_DENY_RULES: &[HardDenyRule] = &[
    HardDenyRule {
        id: "rm -rf",
        description: "recursive forced delete",
        pattern: r"\brm\s+-(?:[a-z]*r[a-z]*f|[a-z]*f[a-z]*r)[a-z]*\b",
    },
    HardDenyRule {
        id: "rm -rf",
        description: "recursive forced delete (obfuscated)",
        pattern: r"\br\s?m\s+(?:r\s?f|f\s?r)\b",
    },
    HardDenyRule {
        id: "shutdown",
        description: "system shutdown",
        pattern: r"\bshutdown\b",
    },
    HardDenyRule {
        id: "format disk",
        description: "disk format",
        pattern: r"\bformat\s+(?:the\s+)?(?:disk|drive)\b",
    },
    HardDenyRule {
        id: "mkfs",
        description: "filesystem creation",
        pattern: r"\bmkfs\b",
    },
    HardDenyRule {
        id: "raw device",
        description: "direct raw block-device access",
        pattern: r"/dev/(?:sd[a-z]|nvme\d|hd[a-z]|xvd[a-z]|mmcblk\d)",
    },
    HardDenyRule {
        id: "dd to device",
        description: "raw write to a block device",
        pattern: r"\bdd\s+[^\n]*\bof=/dev/",
    },
    HardDenyRule {
        id: "fork bomb",
        description: "shell fork bomb",
        pattern: r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
    },
];

static COMPILED: LazyLock<Vec<(HardDenyRule, Regex)>> = LazyLock::new(|| {
    HARD_DENY_RULES
        .iter()
        .map(|rule| {
            (
                *rule,
                Regex::new(rule.pattern).expect("HARD_DENY_RULES are compile-time constants"),
            )
        })
        .collect()
});

/// First rule matching `text`, if any
pub fn hard_deny_match(text: &str) -> Option<HardDenyRule> {
    let lowered = strip_invisible(text).to_lowercase();
    let deobfuscated = deobfuscate(text);

    let hit = COMPILED
        .iter()
        .find(|(_, rx)| rx.is_match(&lowered) || rx.is_match(&deobfuscated))
        .map(|(rule, _)| *rule);

    if let Some(rule) = hit {
        warn!(rule = %rule.id, "Hard-deny pattern detected");
    }
    hit
}
