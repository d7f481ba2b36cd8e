//! Thread assembly: envelope + decoded body + quote chain.

use tracing::debug;

use crate::config::Config;
use crate::model::thread::{Thread, ThreadMessage};
use crate::parser::date::normalize_quote_date;
use crate::parser::header::parse_envelope;
use crate::parser::mime::decode_mime_body_with;
use crate::parser::quote_chain::{split_quote_chain, QuoteChain};

/// Decode a raw message and reconstruct its reply chain.
///
/// The newest, unquoted message takes its sender and date from the envelope.
/// A body that is nothing but quoting has no such message: an unattributed
/// quote is never credited to the envelope sender. Quoted messages get a
/// timestamp from their attribution date, or the envelope date when that
/// cannot be parsed.
pub fn assemble_thread(raw: &str, config: &Config) -> Thread {
    let envelope = parse_envelope(raw);
    let body = decode_mime_body_with(raw, &config.decoder);

    let QuoteChain { newest, quoted } = if body.is_failure() {
        QuoteChain {
            newest: None,
            quoted: Vec::new(),
        }
    } else {
        split_quote_chain(body.as_str(), &config.quote)
    };

    let offset = config.quote.local_offset();
    let mut messages: Vec<ThreadMessage> = quoted
        .into_iter()
        .map(|msg| {
            let timestamp = normalize_quote_date(&msg.date_str, offset).or_else(|| {
                debug!(date = %msg.date_str, "Quoted date unknown, using envelope date");
                envelope.date
            });
            ThreadMessage::quoted(msg, timestamp)
        })
        .collect();

    if let Some(latest) = newest {
        messages.push(ThreadMessage {
            sender: envelope.from.label().to_string(),
            email_address: envelope.from.address.clone(),
            date_str: envelope.date_raw.clone(),
            timestamp: envelope.date,
            body: latest.body,
            is_latest: true,
        });
    }

    Thread {
        envelope,
        body,
        messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "From: \"Yamada Hanako\" <hanako@example.com>\r\n\
To: tanaka@example.com\r\n\
Subject: Re: schedule\r\n\
Date: Thu, 19 Feb 2026 18:00:00 +0900\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Confirmed.\r\n\
\r\n\
2026年2月19日(木) 15:47 田中太郎 <tanaka@example.com>:\r\n\
> Please confirm.\r\n";

    #[test]
    fn test_assemble_attaches_envelope_to_latest() {
        let thread = assemble_thread(RAW, &Config::default());
        assert_eq!(thread.messages.len(), 2);

        let latest = thread.latest().unwrap();
        assert_eq!(latest.sender, "Yamada Hanako");
        assert_eq!(latest.email_address, "hanako@example.com");
        assert_eq!(latest.body, "Confirmed.");
        assert_eq!(
            latest.timestamp.unwrap().to_rfc3339(),
            "2026-02-19T09:00:00+00:00"
        );

        let quoted = &thread.messages[0];
        assert!(!quoted.is_latest);
        assert_eq!(quoted.sender, "田中太郎");
        assert_eq!(
            quoted.timestamp.unwrap().to_rfc3339(),
            "2026-02-19T06:47:00+00:00"
        );
    }

    #[test]
    fn test_unparseable_quote_date_uses_envelope() {
        let raw = "From: a@example.com\nDate: Thu, 19 Feb 2026 18:00:00 +0900\n\nTop\nOn a sunny day, Bob <bob@example.com> wrote:\n> hi\n";
        let thread = assemble_thread(raw, &Config::default());
        assert_eq!(thread.messages.len(), 2);
        assert_eq!(thread.messages[0].sender, "Bob");
        assert_eq!(thread.messages[0].timestamp, thread.envelope.date);
    }

    #[test]
    fn test_quote_only_body_is_not_latest() {
        let raw = "From: Forwarder <fwd@example.com>\nDate: Thu, 19 Feb 2026 18:00:00 +0900\n\n> line one\n> line two\n> line three\n> line four\n";
        let thread = assemble_thread(raw, &Config::default());
        assert_eq!(thread.messages.len(), 1);
        let only = &thread.messages[0];
        assert!(!only.is_latest);
        assert_eq!(only.sender, "");
        assert!(thread.latest().is_none());
        assert_eq!(only.body, "line one\nline two\nline three\nline four");
    }

    #[test]
    fn test_undecodable_body_has_no_messages() {
        let raw = "Content-Type: text/plain\nContent-Transfer-Encoding: base64\n\n@@@@\n";
        let thread = assemble_thread(raw, &Config::default());
        assert!(thread.body.is_failure());
        assert!(thread.messages.is_empty());
    }
}
