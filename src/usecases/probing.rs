//! Command-probing heuristics: unknown-response phrases, help-text command
//! extraction, and the common-command probe list.
//!
//! The phrase list is a fixed, language-specific heuristic. Bots phrase
//! rejections freely, so both false positives and false negatives are
//! possible; classification results are best-effort, not authoritative.

use regex::Regex;
use std::sync::LazyLock;

/// Phrases that mark a response as "command not understood".
/// Case-insensitive substring match.
pub const UNKNOWN_PHRASES: &[&str] = &[
    "unknown command",
    "i don't understand",
    "i don't know that command",
    "unrecognized command",
    "invalid command",
    "command not found",
    "не понимаю",
    "неизвестная команда",
];

/// Commands many bots implement without registering them.
pub const COMMON_COMMANDS: &[&str] = &[
    "/settings",
    "/menu",
    "/info",
    "/about",
    "/status",
    "/profile",
    "/language",
    "/lang",
    "/cancel",
];

static COMMAND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/[a-zA-Z_][a-zA-Z0-9_]*").expect("command pattern is valid")
});

/// True when the text contains any unknown-command phrase.
pub fn is_unknown_response(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    UNKNOWN_PHRASES.iter().any(|p| lower.contains(p))
}

/// Scan help text for `/command` tokens: a slash followed by a word of
/// letters/digits/underscore starting with a letter or underscore.
/// Deduplicates preserving first-seen order.
pub fn commands_from_help(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    COMMAND_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|cmd| seen.insert(cmd.clone()))
        .collect()
}
