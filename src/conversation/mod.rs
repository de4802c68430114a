use once_cell::sync::Lazy;
use regex::Regex;

use crate::{model::ChatTurn, prompts};

static DECORATIVE_SYMBOLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*_~-]").expect("invalid decorative symbol pattern"));
static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*[0-9]+\.\s*").expect("invalid list marker pattern"));
static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("invalid blank line pattern"));

/// Builds the sequence sent upstream: the system prompt followed by the
/// caller's turns in their original order. `messages` is left untouched.
pub fn build_outbound(messages: &[ChatTurn]) -> Vec<ChatTurn> {
    let mut outbound = Vec::with_capacity(messages.len() + 1);
    outbound.push(prompts::system_turn().clone());
    outbound.extend_from_slice(messages);
    outbound
}

/// Strips formatting the coach must not emit: decorative symbols, numbered
/// list markers, blank lines, and surrounding whitespace.
///
/// A single pass is not always stable (removing a marker can expose another
/// one at the start of the same line), so passes repeat until the text stops
/// changing. Every changing pass shortens the text, so this terminates.
pub fn filter_symbols(text: &str) -> String {
    let mut current = filter_pass(text);
    loop {
        let next = filter_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn filter_pass(text: &str) -> String {
    let without_symbols = DECORATIVE_SYMBOLS.replace_all(text, "");
    let without_markers = LIST_MARKER.replace_all(&without_symbols, "");
    let collapsed = BLANK_LINES.replace_all(&without_markers, "\n");
    collapsed.trim().to_string()
}
