//! MIME part tree types.

/// The content type of a MIME part, reduced to what body selection cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    PlainText,
    Html,
    MultipartMixed,
    MultipartAlternative,
    MultipartOther,
    /// Any non-text leaf (images, PDFs, attachments).
    Other,
}

impl ContentKind {
    /// Classify a `Content-Type` header value (parameters are ignored).
    ///
    /// A missing or empty value is `text/plain` (RFC 2045 §5.2).
    pub fn from_header(value: &str) -> Self {
        let mime = value
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "" | "text/plain" => Self::PlainText,
            "text/html" => Self::Html,
            "multipart/mixed" => Self::MultipartMixed,
            "multipart/alternative" => Self::MultipartAlternative,
            m if m.starts_with("multipart/") => Self::MultipartOther,
            _ => Self::Other,
        }
    }

    pub fn is_multipart(self) -> bool {
        matches!(
            self,
            Self::MultipartMixed | Self::MultipartAlternative | Self::MultipartOther
        )
    }

    pub fn is_text(self) -> bool {
        matches!(self, Self::PlainText | Self::Html)
    }
}

/// `Content-Transfer-Encoding` of a part.
///
/// `7bit`, `8bit`, `binary` and unspecified all collapse into `SevenBit`:
/// the body is already text and needs no transfer decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    #[default]
    SevenBit,
    Base64,
    QuotedPrintable,
}

impl TransferEncoding {
    pub fn from_header(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            _ => Self::SevenBit,
        }
    }
}

/// One node of a parsed MIME tree.
///
/// Only multipart kinds carry `children`; leaves carry `raw_body`.
#[derive(Debug, Clone)]
pub struct MimePart {
    pub content_type: ContentKind,
    pub transfer_encoding: TransferEncoding,
    /// `charset` parameter of the `Content-Type` header, if any.
    pub charset: Option<String>,
    /// Unquoted `boundary` parameter (multipart parts only).
    pub boundary: Option<String>,
    /// `Content-Disposition: attachment`; such parts never supply the body text.
    pub is_attachment: bool,
    /// Undecoded body text of a leaf part (empty for multiparts).
    pub raw_body: String,
    pub children: Vec<MimePart>,
}
