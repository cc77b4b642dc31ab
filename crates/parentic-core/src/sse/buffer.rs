//! Accumulates raw upstream bytes and yields complete newline-delimited records.

const DELIMITER: u8 = b'\n';

/// Line buffer for the upstream byte stream.
///
/// Holds back any trailing partial record until a later chunk completes it.
/// Operates on bytes, so a multi-byte character split across two network
/// chunks is reassembled before it is decoded.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Append a raw chunk and return every record it completes, in arrival
    /// order, without the delimiter.
    ///
    /// After this call the buffer holds only bytes that do not yet form a
    /// complete record.
    pub fn append(&mut self, raw: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(raw);

        let Some(last) = self.pending.iter().rposition(|&b| b == DELIMITER) else {
            return Vec::new();
        };

        let remainder = self.pending.split_off(last + 1);
        let complete = std::mem::replace(&mut self.pending, remainder);

        complete[..complete.len() - 1]
            .split(|&b| b == DELIMITER)
            .map(|record| String::from_utf8_lossy(record).into_owned())
            .collect()
    }

    /// Bytes received after the last delimiter.
    pub fn remainder(&self) -> &[u8] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
