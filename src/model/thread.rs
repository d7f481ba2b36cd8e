//! Envelope and assembled thread types.

use chrono::{DateTime, Utc};

use super::address::EmailAddress;
use super::message::{DecodedBody, ParsedEmailMessage};

/// The outer headers of a raw message that the transport layer considers authoritative.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    /// Sender (first `From:` header, encoded-words decoded).
    pub from: EmailAddress,

    /// Primary recipients (`To:`).
    pub to: Vec<EmailAddress>,

    /// Parsed `Date:` header, if it could be parsed.
    pub date: Option<DateTime<Utc>>,

    /// The `Date:` header exactly as it appeared.
    pub date_raw: String,

    /// Decoded subject line (RFC 2047 encoded-words resolved).
    pub subject: String,

    /// The `Message-ID` header value.
    pub message_id: String,
}

/// One entry of an assembled thread, oldest first.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ThreadMessage {
    pub sender: String,
    pub email_address: String,
    /// Raw date text (the attribution date for quoted messages, the `Date:` header otherwise).
    pub date_str: String,

    /// Normalized timestamp. Quoted messages whose attribution date cannot be
    /// parsed inherit the envelope date.
    pub timestamp: Option<DateTime<Utc>>,

    pub body: String,

    /// True for the unquoted reply written by the envelope sender.
    pub is_latest: bool,
}

/// A decoded message together with its reconstructed quote history.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Thread {
    pub envelope: Envelope,

    /// The full decoded body the chain was parsed from.
    pub body: DecodedBody,

    /// Messages in chronological order: index 0 is the oldest quote.
    pub messages: Vec<ThreadMessage>,
}

impl ThreadMessage {
    /// Build a quoted (historical) entry.
    pub fn quoted(msg: ParsedEmailMessage, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            sender: msg.sender,
            email_address: msg.email_address,
            date_str: msg.date_str,
            timestamp,
            body: msg.body,
            is_latest: false,
        }
    }
}

impl Thread {
    /// The newest message, if the chain produced one.
    pub fn latest(&self) -> Option<&ThreadMessage> {
        self.messages.iter().rev().find(|m| m.is_latest)
    }
}
