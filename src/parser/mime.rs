//! MIME body extraction: the top-level entry from a raw message to its readable text.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::config::DecoderConfig;
use crate::model::message::DecodedBody;
use crate::model::mime_part::ContentKind;
use crate::parser::content::decode_content;
use crate::parser::header::{looks_like_header_block, split_header_body};
use crate::parser::multipart::{parse_multipart_body, parse_part_tree, select_text_part};

fn delimiter_line_re() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^--(\S{1,70})$").expect("valid delimiter regex"))
}

/// Decode a raw RFC 822 message into its best plain-text body.
///
/// Never fails: the worst case is the decode-failure sentinel, or a preview
/// of the unparsed source when nothing decodes to text at all.
pub fn decode_mime_body(raw: &str) -> DecodedBody {
    decode_mime_body_with(raw, &DecoderConfig::default())
}

/// [`decode_mime_body`] with explicit decoder settings.
///
/// Order of attempts:
/// 1. declared `multipart/*` with a boundary: best text leaf of the tree
/// 2. boundary sniffing, once, when the body opens with a `--token` line
/// 3. flat decode of the body
///
/// Step 2 is a heuristic for senders that omit or mangle the multipart
/// declaration. It runs when no multipart structure was recovered from the
/// headers; a body that merely starts with dashes and does not split into a
/// readable part is decoded flat instead.
pub fn decode_mime_body_with(raw: &str, config: &DecoderConfig) -> DecodedBody {
    let source = skip_from_line(raw);
    let root = parse_part_tree(source);

    if root.content_type.is_multipart() && !root.children.is_empty() {
        return select_text_part(&root).unwrap_or_else(DecodedBody::failure);
    }

    if let Some(boundary) = sniff_boundary(&root.raw_body) {
        debug!(boundary, "Retrying body with sniffed multipart boundary");
        let sniffed = parse_multipart_body(&root.raw_body, boundary);
        if let Some(text) = select_text_part(&sniffed) {
            return text;
        }
        debug!(boundary, "Sniffed boundary did not recover a text part");
    }

    let kind = if root.content_type == ContentKind::Html {
        ContentKind::Html
    } else {
        ContentKind::PlainText
    };
    let decoded = decode_content(
        &root.raw_body,
        root.transfer_encoding,
        kind,
        root.charset.as_deref(),
    );

    if decoded.as_str().is_empty() && !source.trim().is_empty() {
        debug!("Body decoded to nothing, returning source preview");
        return DecodedBody::new(preview(source, config.fallback_preview_chars));
    }
    decoded
}

/// Token of a `--token` line opening the body (first non-blank line), if the
/// body also carries the matching `--token--` closing line.
fn sniff_boundary(body: &str) -> Option<&str> {
    let first = body.lines().find(|line| !line.trim().is_empty())?.trim_end();
    let token = delimiter_line_re().captures(first)?.get(1)?.as_str();
    let close = format!("--{token}--");
    body.lines()
        .any(|line| line.trim_end() == close)
        .then_some(token)
}

/// Skip a UTF-8 BOM and the `From ` separator line of MBOX-exported messages.
///
/// The `From ` line is only dropped when a header block follows it, so a
/// headerless body that starts with "From now on…" is left alone.
fn skip_from_line(raw: &str) -> &str {
    let data = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    if data.starts_with("From ") {
        if let Some(pos) = data.find('\n') {
            let rest = &data[pos + 1..];
            let followed_by_headers = split_header_body(rest)
                .is_some_and(|(headers, _)| !headers.is_empty() && looks_like_header_block(headers));
            if followed_by_headers {
                return rest;
            }
        }
    }
    data
}

fn preview(source: &str, max_chars: usize) -> String {
    source
        .chars()
        .take(max_chars)
        .collect::<String>()
        .trim()
        .to_string()
}
