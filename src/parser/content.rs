//! Body segment decoding: transfer encodings, charsets, and HTML-to-text conversion.

use std::sync::OnceLock;

use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{alphabet, Engine as _};
use encoding_rs::Encoding;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{QuoteChainError, Result};
use crate::model::message::DecodedBody;
use crate::model::mime_part::{ContentKind, TransferEncoding};
use crate::parser::header::hex_pair;

/// Standard-alphabet base64 that tolerates missing padding and stray trailing bits,
/// both of which real mailers produce.
pub(crate) const BASE64_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode one body segment into plain text.
///
/// - `SevenBit` bodies are returned trimmed (ASCII bodies in a stateful charset
///   such as ISO-2022-JP are still charset-decoded).
/// - `Base64` bodies that do not decode yield the decode-failure sentinel.
/// - `QuotedPrintable` bodies fall back to Latin-1 when the bytes are not valid
///   in the declared charset.
///
/// `text/html` content is converted with [`html_to_text`] after decoding.
pub fn decode_content(
    body: &str,
    encoding: TransferEncoding,
    kind: ContentKind,
    charset: Option<&str>,
) -> DecodedBody {
    let text = match encoding {
        TransferEncoding::SevenBit => {
            if body.is_ascii() && declares_foreign_charset(charset) {
                bytes_to_text(body.as_bytes(), charset).unwrap_or_else(|_| body.to_string())
            } else {
                body.to_string()
            }
        }
        TransferEncoding::Base64 => {
            match decode_base64(body).and_then(|bytes| bytes_to_text(&bytes, charset)) {
                Ok(text) => text,
                Err(e) => {
                    debug!(error = %e, "Base64 body could not be decoded");
                    return DecodedBody::failure();
                }
            }
        }
        TransferEncoding::QuotedPrintable => {
            let bytes = decode_quoted_printable(body);
            bytes_to_text(&bytes, charset).unwrap_or_else(|_| latin1(&bytes))
        }
    };

    let text = text.replace("\r\n", "\n");
    if kind == ContentKind::Html {
        DecodedBody::new(html_to_text(&text))
    } else {
        DecodedBody::new(text.trim())
    }
}

/// Decode a base64 body, ignoring all whitespace and line breaks.
pub fn decode_base64(body: &str) -> Result<Vec<u8>> {
    let cleaned: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(BASE64_LENIENT.decode(cleaned)?)
}

/// Decode a quoted-printable body into raw bytes.
///
/// Soft line breaks are removed first, then every `=XX` becomes one byte and
/// every other character contributes its own bytes. The caller decodes the
/// whole buffer at once, so multi-byte characters split across consecutive
/// escapes survive.
pub fn decode_quoted_printable(body: &str) -> Vec<u8> {
    let unwrapped = body.replace("=\r\n", "").replace("=\n", "");
    let bytes = unwrapped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'=' && i + 2 < bytes.len() {
            if let Some(byte) = hex_pair(bytes[i + 1], bytes[i + 2]) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

/// Interpret decoded bytes as text in the declared charset (UTF-8 when absent).
///
/// An unknown charset label is logged and treated as UTF-8.
fn bytes_to_text(bytes: &[u8], charset: Option<&str>) -> Result<String> {
    if let Some(label) = charset.filter(|_| declares_foreign_charset(charset)) {
        match lookup_charset(label) {
            Ok(encoding) => {
                let (text, _, _) = encoding.decode(bytes);
                return Ok(text.into_owned());
            }
            Err(e) => warn!(charset = label, error = %e, "Falling back to UTF-8"),
        }
    }
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Whether a charset is declared and is something other than UTF-8/ASCII.
fn declares_foreign_charset(charset: Option<&str>) -> bool {
    match charset.map(|c| c.trim().to_ascii_lowercase()) {
        None => false,
        Some(c) => !matches!(c.as_str(), "" | "utf-8" | "utf8" | "us-ascii" | "ascii"),
    }
}

/// Resolve a MIME charset label to an encoding.
pub(crate) fn lookup_charset(label: &str) -> Result<&'static Encoding> {
    let label = label.trim();
    let label = match label.to_ascii_lowercase().as_str() {
        // Common Microsoft aliases missing from the WHATWG label list
        "cp932" | "ms932" => "windows-31j",
        "ks_c_5601-1987" => "euc-kr",
        _ => label,
    };
    Encoding::for_label(label.as_bytes())
        .ok_or_else(|| QuoteChainError::UnsupportedEncoding(label.to_string()))
}

/// Decode bytes using a named charset, never failing.
pub(crate) fn decode_charset_lossy(charset: &str, bytes: &[u8]) -> String {
    if !declares_foreign_charset(Some(charset)) {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    match lookup_charset(charset) {
        Ok(encoding) => {
            let (decoded, _, _) = encoding.decode(bytes);
            decoded.into_owned()
        }
        Err(_) => {
            warn!(charset = charset, "Unknown charset, falling back to UTF-8 lossy");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Byte-by-byte Latin-1 mapping: every byte becomes the code point of the same value.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

// ── HTML ────────────────────────────────────────────────────────

fn style_block_re() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid style regex"))
}

fn script_block_re() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid script regex")
    })
}

fn comment_re() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"))
}

fn line_break_re() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)<br\b[^>]*>|</(?:p|div|tr|li|h[1-6])\s*>|<(?:p|div)(?:\s[^>]*)?>")
            .expect("valid line break regex")
    })
}

fn html_tag_re() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?s)<[^>]+>").expect("valid HTML tag regex"))
}

fn blank_run_re() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\n{3,}").expect("valid blank run regex"))
}

/// Convert HTML to plain text.
///
/// - Removes `<style>`/`<script>` blocks and comments before anything else
/// - `<br>`, `<p>`, `<div>` and the closing `</p>`, `</div>`, `</tr>`, `</li>` become line breaks
/// - Strips all remaining tags
/// - Decodes `&nbsp; &amp; &lt; &gt; &quot; &#39;`
/// - Collapses three or more consecutive newlines to two
pub fn html_to_text(html: &str) -> String {
    let text = style_block_re().replace_all(html, "");
    let text = script_block_re().replace_all(&text, "");
    let text = comment_re().replace_all(&text, "");
    let text = line_break_re().replace_all(&text, "\n");
    let text = html_tag_re().replace_all(&text, "");

    // `&amp;` last so that "&amp;lt;" stays "&lt;"
    let text = text
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    blank_run_re()
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}
