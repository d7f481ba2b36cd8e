//! Core data model types: addresses, MIME parts, quoted messages, and threads.

pub mod address;
pub mod message;
pub mod mime_part;
pub mod thread;
