//! Email parsing: MIME decoding, header handling, quote-chain reconstruction, and chat markup.

pub mod chat;
pub mod content;
pub mod date;
pub mod header;
pub mod mime;
pub mod multipart;
pub mod quote_chain;
pub mod quote_header;
pub mod signature;
