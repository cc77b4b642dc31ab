//! Encoder for the browser-facing event stream.

use bytes::Bytes;
use serde::Serialize;

use super::types::RelayEvent;

/// JSON body of one downstream record.
#[derive(Serialize)]
#[serde(untagged)]
enum WireRecord<'a> {
    Chunk { chunk: &'a str },
    Done { done: bool },
    Error { error: &'a str },
}

impl<'a> From<&'a RelayEvent> for WireRecord<'a> {
    fn from(event: &'a RelayEvent) -> Self {
        match event {
            RelayEvent::Chunk { text } => Self::Chunk { chunk: text },
            RelayEvent::Done => Self::Done { done: true },
            RelayEvent::Error { message } => Self::Error { error: message },
        }
    }
}

/// Encode one event as exactly one `data: {json}\n\n` record.
pub fn encode(event: &RelayEvent) -> Bytes {
    // Serializing a struct of strings and bools cannot fail.
    let json = serde_json::to_string(&WireRecord::from(event)).unwrap_or_default();
    Bytes::from(format!("data: {json}\n\n"))
}
