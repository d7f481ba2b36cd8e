//! Decoded body and quoted-message types.

use serde::{Deserialize, Serialize};

/// Text returned when no part of a message could be decoded into readable text.
pub const DECODE_FAILURE_SENTINEL: &str = "(本文をデコードできませんでした)";

/// The chosen plain-text representation of a message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecodedBody(String);

impl DecodedBody {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The decode-failure sentinel.
    pub fn failure() -> Self {
        Self(DECODE_FAILURE_SENTINEL.to_string())
    }

    pub fn is_failure(&self) -> bool {
        self.0 == DECODE_FAILURE_SENTINEL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for DecodedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which attribution grammar recognized a quote header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteGrammar {
    /// `2026年2月19日(木) 15:47 名前 <a@b>:`
    Japanese,
    /// `On Thu, Feb 19, 2026 at 3:47 PM, Name <a@b> wrote:`
    EnglishProse,
    /// `On 2026/2/19 15:47, Name <a@b> wrote:`
    EnglishSlashDate,
    /// `On Thu, Feb 19, 2026 at 3:47 PM Name <a@b> wrote:` (no comma before the name)
    EnglishGmail,
}

/// Fields captured from one attribution line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteHeader {
    /// Unparsed, locale-specific date text.
    pub date_str: String,
    pub display_name: String,
    pub email_address: String,
    pub grammar: QuoteGrammar,
}

/// One message recovered from a reply chain.
///
/// The newest (unquoted) message has an empty `sender`, `email_address` and
/// `date_str`: those come from the outer envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedEmailMessage {
    pub sender: String,
    pub email_address: String,
    pub date_str: String,
    /// Signature-stripped body text.
    pub body: String,
}

impl ParsedEmailMessage {
    /// A message without attribution (the unquoted reply, or a quote with no header).
    pub fn unattributed(body: impl Into<String>) -> Self {
        Self {
            sender: String::new(),
            email_address: String::new(),
            date_str: String::new(),
            body: body.into(),
        }
    }

    pub fn from_header(header: &QuoteHeader, body: impl Into<String>) -> Self {
        Self {
            sender: header.display_name.clone(),
            email_address: header.email_address.clone(),
            date_str: header.date_str.clone(),
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_body_failure() {
        assert!(DecodedBody::failure().is_failure());
        assert!(!DecodedBody::new("hello").is_failure());
    }

    #[test]
    fn test_parsed_message_serializes_camel_case() {
        let msg = ParsedEmailMessage {
            sender: "田中太郎".into(),
            email_address: "tanaka@example.com".into(),
            date_str: "2026年2月19日(木) 15:47".into(),
            body: "Please confirm.".into(),
        };
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["emailAddress"], "tanaka@example.com");
        assert_eq!(json["dateStr"], "2026年2月19日(木) 15:47");
    }
}
