//! `quotechain` — recover readable text and reply history from raw email.
//!
//! The library has two halves that can be used independently:
//!
//! - [`decode_mime_body`] turns a raw RFC 822 / MIME source into its best
//!   plain-text body, across multipart trees, transfer encodings and charsets.
//! - [`parse_quote_chain`] splits a plain-text body with Gmail-style `>`
//!   quoting into the messages it contains, oldest first.
//!
//! [`thread::assemble_thread`] combines both with the envelope headers, and
//! [`clean_chat_markup`] is a sibling utility for chat-service markup.
//!
//! Every entry point is pure and synchronous; decoding never fails, it only
//! recovers less structure.

pub mod batch;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod thread;

pub use model::message::{DecodedBody, ParsedEmailMessage};
pub use parser::chat::clean_chat_markup;
pub use parser::mime::decode_mime_body;
pub use parser::quote_chain::parse_quote_chain;
