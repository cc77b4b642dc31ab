//! Server-sent event framing for the chat relay.
//!
//! The completion provider streams newline-delimited `data:` records; the
//! browser receives one `data: {json}` record per relay event. This module
//! holds both directions: buffering and decoding upstream records, and
//! encoding downstream ones.

mod buffer;
mod decoder;
mod encoder;
mod types;

pub use buffer::FrameBuffer;
pub use decoder::decode_record;
pub use encoder::encode;
pub use types::*;
