//! Multipart splitting, MIME tree construction, and best-text selection.

use tracing::{debug, warn};

use crate::model::message::DecodedBody;
use crate::model::mime_part::{ContentKind, MimePart, TransferEncoding};
use crate::parser::content::decode_content;
use crate::parser::header::{
    get_header, header_param, looks_like_header_block, split_header_body, unfold_headers,
};

/// Maximum depth for recursive multipart parsing (to prevent stack overflow on adversarial input).
pub const MAX_MIME_DEPTH: usize = 32;

/// Split a multipart body on `--{boundary}` delimiter lines.
///
/// The preamble before the first delimiter and everything after the closing
/// `--{boundary}--` line are discarded, as are whitespace-only segments. When
/// the closing delimiter is missing, the last part runs to the end of the body.
pub fn split_multipart<'a>(body: &'a str, boundary: &str) -> Vec<&'a str> {
    let open = format!("--{boundary}");
    let close = format!("--{boundary}--");

    let mut segments = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;
    let mut closed = false;

    for line in body.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let trimmed = line.trim_end();

        if trimmed == close {
            if let Some(s) = start.take() {
                segments.push(&body[s..line_start]);
            }
            closed = true;
            break;
        }
        if trimmed == open {
            if let Some(s) = start {
                segments.push(&body[s..line_start]);
            }
            start = Some(offset);
        }
    }

    if !closed {
        if let Some(s) = start {
            segments.push(&body[s..]);
        }
    }

    segments.retain(|segment| !segment.trim().is_empty());
    segments
}

/// Parse a message or part (headers + body) into a [`MimePart`] tree.
///
/// Text without a recognizable header block is a single `text/plain` leaf.
pub fn parse_part_tree(text: &str) -> MimePart {
    parse_part(text, 0)
}

/// Build a multipart node directly from a body and a boundary.
///
/// Used when the boundary was not declared in a header but sniffed from the body.
pub fn parse_multipart_body(body: &str, boundary: &str) -> MimePart {
    let children = split_multipart(body, boundary)
        .into_iter()
        .map(|segment| parse_part(segment, 1))
        .collect();
    MimePart {
        content_type: ContentKind::MultipartMixed,
        transfer_encoding: TransferEncoding::SevenBit,
        charset: None,
        boundary: Some(boundary.to_string()),
        is_attachment: false,
        raw_body: String::new(),
        children,
    }
}

fn parse_part(text: &str, depth: usize) -> MimePart {
    let (header_block, body) = match split_header_body(text) {
        Some((headers, body)) if headers.is_empty() || looks_like_header_block(headers) => {
            (headers, body)
        }
        None if looks_like_header_block(text) => (text, ""),
        _ => ("", text),
    };

    let headers = unfold_headers(header_block);
    let content_type_raw = get_header(&headers, "content-type").unwrap_or_default();
    let content_type = ContentKind::from_header(content_type_raw);
    let transfer_encoding = TransferEncoding::from_header(
        get_header(&headers, "content-transfer-encoding").unwrap_or_default(),
    );
    let is_attachment = get_header(&headers, "content-disposition")
        .is_some_and(|d| d.trim_start().to_ascii_lowercase().starts_with("attachment"));
    let boundary = header_param(content_type_raw, "boundary");

    let children: Vec<MimePart> = match boundary.as_deref() {
        Some(b) if content_type.is_multipart() && depth < MAX_MIME_DEPTH => split_multipart(body, b)
            .into_iter()
            .map(|segment| parse_part(segment, depth + 1))
            .collect(),
        Some(_) if content_type.is_multipart() => {
            warn!(depth, "MIME nesting too deep, treating part as opaque");
            Vec::new()
        }
        _ => Vec::new(),
    };

    MimePart {
        content_type,
        transfer_encoding,
        charset: header_param(content_type_raw, "charset"),
        boundary,
        is_attachment,
        raw_body: if children.is_empty() {
            body.to_string()
        } else {
            String::new()
        },
        children,
    }
}

/// Choose the best text representation of a MIME tree.
///
/// The first `text/plain` leaf in document order that decodes to readable text
/// wins; failing that, the first such `text/html` leaf (tag-stripped).
/// Attachments and non-text leaves are never chosen. `None` when nothing qualifies.
pub fn select_text_part(root: &MimePart) -> Option<DecodedBody> {
    let mut leaves = Vec::new();
    collect_text_leaves(root, &mut leaves);

    let first_readable = |kind: ContentKind| {
        leaves
            .iter()
            .filter(|part| part.content_type == kind)
            .map(|part| {
                decode_content(
                    &part.raw_body,
                    part.transfer_encoding,
                    part.content_type,
                    part.charset.as_deref(),
                )
            })
            .find(|decoded| !decoded.as_str().is_empty() && !decoded.is_failure())
    };

    let selected = first_readable(ContentKind::PlainText).or_else(|| first_readable(ContentKind::Html));
    if selected.is_none() {
        debug!(leaves = leaves.len(), "No readable text leaf in MIME tree");
    }
    selected
}

fn collect_text_leaves<'a>(part: &'a MimePart, out: &mut Vec<&'a MimePart>) {
    if part.children.is_empty() {
        if part.content_type.is_text() && !part.is_attachment {
            out.push(part);
        }
        return;
    }
    for child in &part.children {
        collect_text_leaves(child, out);
    }
}
