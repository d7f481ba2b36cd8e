//! Reply-chain reconstruction from a plain-text body.
//!
//! A body such as
//!
//! ```text
//! Thanks!
//! 2026年2月19日(木) 15:47 田中太郎 <tanaka@example.com>:
//! > Please confirm.
//! ```
//!
//! is split into the messages it quotes, oldest first. An attribution header
//! at quote level `L` opens a message whose body lines sit at level `L + 1`;
//! anything quoted deeper belongs to older messages and is parsed recursively
//! once the message that quotes it has been recorded.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::config::QuoteConfig;
use crate::model::message::{ParsedEmailMessage, QuoteHeader};
use crate::parser::quote_header::match_quote_header;
use crate::parser::signature::strip_signature_with;

fn dangling_angle_re() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"<\n[ \t]*([^\s<>@]+@[^\s<>@]+>)").expect("valid dangling angle regex")
    })
}

fn wrapped_email_re() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\n[ \t]+(<?[^\s<>@]+@[^\s<>@]+>)").expect("valid wrapped email regex")
    })
}

/// Reconstruct the messages of a reply chain with the default settings.
pub fn parse_quote_chain(text: &str) -> Vec<ParsedEmailMessage> {
    parse_quote_chain_with(text, &QuoteConfig::default())
}

/// Reconstruct the messages of a reply chain, oldest first.
///
/// The last element is the unquoted newest reply (empty sender) when it has
/// any text. A body without quoting yields exactly one message. Messages whose
/// body is empty after signature stripping are dropped.
pub fn parse_quote_chain_with(text: &str, config: &QuoteConfig) -> Vec<ParsedEmailMessage> {
    split_quote_chain(text, config).into_messages()
}

/// A reply chain with the unquoted reply kept apart from the quoted history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteChain {
    /// Text written above the quoted tail, or the whole body when nothing is quoted.
    pub newest: Option<ParsedEmailMessage>,
    /// Quoted messages, oldest first. Quotes without attribution have an empty sender.
    pub quoted: Vec<ParsedEmailMessage>,
}

impl QuoteChain {
    /// Flatten to the oldest-first list, newest reply last.
    pub fn into_messages(self) -> Vec<ParsedEmailMessage> {
        let mut messages = self.quoted;
        messages.extend(self.newest);
        messages
    }
}

/// Like [`parse_quote_chain_with`], but tells the unquoted reply apart from an
/// unattributed quote, which both have an empty sender.
pub fn split_quote_chain(text: &str, config: &QuoteConfig) -> QuoteChain {
    let normalized = repair_wrapped_headers(&normalize_newlines(text));
    let lines: Vec<Line<'_>> = normalized.lines().map(Line::parse).collect();

    let Some(boundary) = find_boundary(&lines, config) else {
        return QuoteChain {
            newest: Some(ParsedEmailMessage::unattributed(strip_signature_with(
                &normalized,
                config,
            ))),
            quoted: Vec::new(),
        };
    };
    debug!(boundary, lines = lines.len(), "Quote chain boundary found");

    let newest = lines[..boundary]
        .iter()
        .map(|line| line.text)
        .collect::<Vec<_>>()
        .join("\n");
    let newest = strip_signature_with(&newest, config);

    let mut walk = Walk {
        config,
        out: Vec::new(),
    };
    walk.parse_level(&lines[boundary..], 0);

    let mut quoted = walk.out;
    quoted.reverse();
    QuoteChain {
        newest: (!newest.is_empty()).then(|| ParsedEmailMessage::unattributed(newest)),
        quoted,
    }
}

/// Number of leading `>` markers, each optionally followed by one space.
pub fn quote_level(line: &str) -> usize {
    strip_quote_prefix(line, usize::MAX).0
}

/// Remove up to `max` quote markers, returning how many were removed and the rest.
fn strip_quote_prefix(line: &str, max: usize) -> (usize, &str) {
    let mut level = 0;
    let mut rest = line;
    while level < max {
        let Some(after) = rest.strip_prefix('>') else {
            break;
        };
        rest = after.strip_prefix(' ').unwrap_or(after);
        level += 1;
    }
    (level, rest)
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Rejoin attribution lines that a mail client hard-wrapped right before the address.
fn repair_wrapped_headers(text: &str) -> String {
    let joined = dangling_angle_re().replace_all(text, "<$1");
    wrapped_email_re().replace_all(&joined, " $1").into_owned()
}

/// Index of the first line of the quoted tail.
///
/// Either an unquoted attribution header, or a quoted line followed by enough
/// quoted lines to rule out a stray `>` (mailers that quote without a header).
fn find_boundary(lines: &[Line<'_>], config: &QuoteConfig) -> Option<usize> {
    lines.iter().enumerate().position(|(idx, line)| {
        if line.level == 0 {
            return line.header.is_some();
        }
        let quoted_after = lines[idx + 1..]
            .iter()
            .take(config.sniff_lookahead)
            .filter(|next| next.level > 0)
            .count();
        quoted_after >= config.sniff_min_quoted
    })
}

struct Line<'a> {
    text: &'a str,
    level: usize,
    header: Option<QuoteHeader>,
}

impl<'a> Line<'a> {
    fn parse(text: &'a str) -> Self {
        let (level, content) = strip_quote_prefix(text, usize::MAX);
        Self {
            text,
            level,
            header: match_quote_header(content),
        }
    }

    /// The line as body text of a message at `levels` depth (deeper markers are kept).
    fn body_at(&self, levels: usize) -> &'a str {
        strip_quote_prefix(self.text, levels).1
    }
}

/// A message being collected: its attribution (if any) and body lines.
struct Open<'a> {
    header: Option<QuoteHeader>,
    body: Vec<&'a str>,
}

impl Open<'_> {
    fn new(header: Option<QuoteHeader>) -> Self {
        Self {
            header,
            body: Vec::new(),
        }
    }
}

struct Walk<'c> {
    config: &'c QuoteConfig,
    /// Newest first until the final reverse.
    out: Vec<ParsedEmailMessage>,
}

impl Walk<'_> {
    /// Collect the messages whose attribution headers sit at `level`.
    ///
    /// Deeper ranges are held back until the message quoting them is flushed,
    /// so each message is recorded before the older ones it quotes.
    fn parse_level<'a>(&mut self, lines: &[Line<'a>], level: usize) {
        let can_descend = level + 1 < self.config.max_quote_depth;
        let mut current: Option<Open<'a>> = None;
        let mut pending: Vec<&[Line<'a>]> = Vec::new();

        let mut idx = 0;
        while idx < lines.len() {
            let line = &lines[idx];

            if line.level == level && line.header.is_some() {
                self.flush(current.take(), &mut pending, level);
                current = Some(Open::new(line.header.clone()));
                idx += 1;
                continue;
            }

            let deeper =
                line.level > level + 1 || (line.level == level + 1 && line.header.is_some());
            if deeper && can_descend {
                let end = deeper_range_end(lines, idx, level);
                let range = &lines[idx..end];
                let open = current.get_or_insert_with(|| Open::new(None));
                if range.iter().any(|l| l.header.is_some()) {
                    pending.push(range);
                } else {
                    // Quoted text that never resolves to a header stays with this message
                    open.body.extend(range.iter().map(|l| l.body_at(level + 1)));
                }
                idx = end;
                continue;
            }

            current
                .get_or_insert_with(|| Open::new(None))
                .body
                .push(line.body_at(level + 1));
            idx += 1;
        }

        self.flush(current, &mut pending, level);
    }

    fn flush<'a>(&mut self, current: Option<Open<'a>>, pending: &mut Vec<&[Line<'a>]>, level: usize) {
        if let Some(open) = current {
            let body = strip_signature_with(&open.body.join("\n"), self.config);
            if body.is_empty() {
                trace!(level, "Dropping message with empty body");
            } else {
                self.out.push(match &open.header {
                    Some(header) => ParsedEmailMessage::from_header(header, body),
                    None => ParsedEmailMessage::unattributed(body),
                });
            }
        }
        for range in pending.drain(..) {
            self.parse_level(range, level + 1);
        }
    }
}

/// End (exclusive) of the deeper range starting at `start`.
///
/// The range stops at a line at `level` or shallower, or at a plain line one
/// level deeper once lines two or more levels deeper have been seen: that line
/// is the quoting message resuming after an inline quote.
fn deeper_range_end(lines: &[Line<'_>], start: usize, level: usize) -> usize {
    let mut seen_deep = lines[start].level >= level + 2;
    let mut end = start + 1;
    while let Some(line) = lines.get(end) {
        if line.level <= level {
            break;
        }
        if line.level == level + 1 && line.header.is_none() && seen_deep {
            break;
        }
        if line.level >= level + 2 {
            seen_deep = true;
        }
        end += 1;
    }
    end
}
