//! RFC 5322 header handling: folding, parameters, encoded-words (RFC 2047), and the envelope.

use base64::Engine as _;

use crate::model::address::EmailAddress;
use crate::model::thread::Envelope;
use crate::parser::content::{decode_charset_lossy, BASE64_LENIENT};
use crate::parser::date::parse_date;

/// Split a message (or MIME part) into its header block and body at the first blank line.
///
/// Whichever of `\r\n\r\n` or `\n\n` comes first wins; in a CRLF message `\n\n`
/// never occurs before the real separator. A text that starts with a blank line
/// has an empty header block. Returns `None` when there is no blank line at all.
pub fn split_header_body(text: &str) -> Option<(&str, &str)> {
    if let Some(rest) = text.strip_prefix("\r\n") {
        return Some(("", rest));
    }
    if let Some(rest) = text.strip_prefix('\n') {
        return Some(("", rest));
    }

    let crlf = text.find("\r\n\r\n").map(|pos| (pos, 4));
    let lf = text.find("\n\n").map(|pos| (pos, 2));
    let (pos, len) = match (crlf, lf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    Some((&text[..pos], &text[pos + len..]))
}

/// Join folded header lines: a line starting with a space or tab continues the previous one.
///
/// The line break and the leading whitespace are replaced by a single space.
/// Line endings are normalized to `\n`. Unfolding an unfolded block is a no-op.
pub fn unfold_header_block(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let is_continuation = line.starts_with(' ') || line.starts_with('\t');
        if is_continuation && !out.is_empty() && !out.ends_with('\n') {
            out.push(' ');
            out.push_str(line.trim_start());
        } else {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(line);
        }
    }
    out
}

/// Unfold headers and split them into `(lowercase_name, value)` pairs.
///
/// Lines without a colon that are not continuations are skipped.
pub fn unfold_headers(text: &str) -> Vec<(String, String)> {
    unfold_header_block(text)
        .lines()
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_lowercase(), value.trim().to_string()))
        })
        .collect()
}

/// Get the first value for a header name (case-insensitive).
pub fn get_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Read one `;`-separated parameter (e.g. `boundary`, `charset`) from a header value.
///
/// Parameter names match case-insensitively; surrounding double quotes are removed.
pub fn header_param(value: &str, name: &str) -> Option<String> {
    split_params(value).into_iter().skip(1).find_map(|segment| {
        let (key, raw) = segment.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case(name) {
            return None;
        }
        let raw = raw.trim();
        let unquoted = raw
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(raw);
        (!unquoted.is_empty()).then(|| unquoted.to_string())
    })
}

/// Split a header value on `;` outside double quotes.
fn split_params(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, ch) in value.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                parts.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

/// Heuristic check that a block of text is an RFC 5322 header block.
///
/// Every logical line must be `Name: value` with a token-only name.
pub fn looks_like_header_block(text: &str) -> bool {
    let unfolded = unfold_header_block(text);
    let mut seen = false;
    for line in unfolded.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((name, _)) = line.split_once(':') else {
            return false;
        };
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic()) {
            return false;
        }
        seen = true;
    }
    seen
}

/// Decode raw message bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
pub fn decode_raw_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Read the envelope fields from the header block of a raw message.
pub fn parse_envelope(raw: &str) -> Envelope {
    let header_block = split_header_body(raw).map(|(h, _)| h).unwrap_or(raw);
    let headers = unfold_headers(header_block);

    let date_raw = get_header(&headers, "date").unwrap_or_default().to_string();
    let date = parse_date(&date_raw);

    let from = EmailAddress::parse(&decode_encoded_words(
        get_header(&headers, "from").unwrap_or_default(),
    ));
    let to = EmailAddress::parse_list(&decode_encoded_words(
        get_header(&headers, "to").unwrap_or_default(),
    ));
    let subject = decode_encoded_words(get_header(&headers, "subject").unwrap_or_default());
    let message_id = get_header(&headers, "message-id")
        .map(extract_angle_bracket)
        .unwrap_or_default();

    Envelope {
        from,
        to,
        date,
        date_raw,
        subject,
        message_id,
    }
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// If decoding fails for any token, the original text is preserved.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // Whitespace between two encoded words is dropped (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];

        if let Some(decoded) = try_decode_one_word(after_start) {
            result.push_str(&decoded.text);
            remaining = &remaining[start + 2 + decoded.consumed..];
            last_was_encoded = true;
        } else {
            result.push_str("=?");
            remaining = after_start;
            last_was_encoded = false;
        }
    }

    result.push_str(remaining);
    result
}

struct DecodedWord {
    text: String,
    consumed: usize, // bytes consumed from the string *after* the initial "=?"
}

fn try_decode_one_word(s: &str) -> Option<DecodedWord> {
    // Format: charset?encoding?encoded_text?=
    let first_q = s.find('?')?;
    let charset = &s[..first_q];

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;
    let encoded_text = &rest2[..end];

    let total_consumed = first_q + 1 + second_q + 1 + end + 2;

    let bytes = match encoding.to_ascii_uppercase().as_str() {
        "B" => BASE64_LENIENT.decode(encoded_text.trim()).ok()?,
        "Q" => decode_q_encoding(encoded_text),
        _ => return None,
    };

    Some(DecodedWord {
        text: decode_charset_lossy(charset, &bytes),
        consumed: total_consumed,
    })
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                match hex_pair(bytes[i + 1], bytes[i + 2]) {
                    Some(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    None => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Combine two ASCII hex digits into a byte.
pub(crate) fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let hi = (hi as char).to_digit(16)?;
    let lo = (lo as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

/// Extract content between `<` and `>` (for Message-ID).
fn extract_angle_bracket(s: &str) -> String {
    let trimmed = s.trim();
    if let Some(start) = trimmed.find('<') {
        if let Some(end) = trimmed[start..].find('>') {
            return trimmed[start..start + end + 1].to_string();
        }
    }
    trimmed.to_string()
}
