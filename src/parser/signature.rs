//! Trailing signature removal.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::QuoteConfig;

fn closing_quote_re() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^>>.*<<$").expect("valid closing quote regex"))
}

/// Strip a trailing signature block using the default window settings.
pub fn strip_signature(text: &str) -> String {
    strip_signature_with(text, &QuoteConfig::default())
}

/// Strip a trailing signature block.
///
/// The last `signature_window` lines are scanned from the bottom up; the first
/// delimiter line below index `signature_min_index` cuts the text there. When
/// the window holds no delimiter, a dash-style delimiter further up still cuts
/// if it follows a short greeting (at most `signature_min_index` non-blank
/// lines) and at most `max_signature_lines` lines follow it. `=` and `_` rules
/// that far up are heading underlines and never cut.
///
/// The result is always trimmed. Leaving a signature in place is preferred to
/// cutting real content, so anything that is not clearly a delimiter is kept.
///
/// Only the lowest delimiter cuts, so a text with two delimiters in the window
/// can lose more on a second pass: `"a\nb\nc\nd\n-----\ne\nf\n=====\ng"`
/// keeps `-----\ne\nf` the first time and drops it the second. Stripping is
/// idempotent whenever at most one delimiter remains after the first cut.
pub fn strip_signature_with(text: &str, config: &QuoteConfig) -> String {
    let trimmed = text.trim();
    let lines: Vec<&str> = trimmed.lines().collect();

    let window_start = lines.len().saturating_sub(config.signature_window);
    let in_window = (window_start..lines.len())
        .rev()
        .find(|&idx| idx > config.signature_min_index && is_delimiter(lines[idx]));

    let cut = in_window.or_else(|| {
        (1..window_start).rev().find(|&idx| {
            let text_above = lines[..idx]
                .iter()
                .filter(|line| !line.trim().is_empty())
                .count();
            is_dash_delimiter(lines[idx])
                && lines.len() - idx - 1 <= config.max_signature_lines
                && (1..=config.signature_min_index).contains(&text_above)
        })
    });

    let Some(idx) = cut else {
        return trimmed.to_string();
    };

    // A stack of delimiter lines goes with the signature
    let mut end = idx;
    while end > 0 && (lines[end - 1].trim().is_empty() || is_delimiter(lines[end - 1])) {
        end -= 1;
    }
    lines[..end].join("\n").trim_end().to_string()
}

/// Whether a line separates a body from its signature.
///
/// Delimiters are a single character repeated: four or more `-`, or five or
/// more of `－`, `ー`, `―`, `_`, `=`. A `>>…<<` closing line also counts.
pub fn is_delimiter(line: &str) -> bool {
    let line = line.trim();
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    let min_repeat = match first {
        '-' => 4,
        '－' | 'ー' | '―' | '_' | '=' => 5,
        _ => return closing_quote_re().is_match(line),
    };
    chars.all(|c| c == first) && line.chars().count() >= min_repeat
}

/// A delimiter made of dashes (`-`, `－`, `ー`, `―`), as opposed to an underline.
fn is_dash_delimiter(line: &str) -> bool {
    is_delimiter(line)
        && line
            .trim()
            .starts_with(|c: char| matches!(c, '-' | '－' | 'ー' | '―'))
}
