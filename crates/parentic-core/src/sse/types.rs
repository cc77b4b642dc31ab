//! Record and event types for the relay wire protocols.

/// A decoded upstream record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamRecord {
    /// A content fragment to forward to the client.
    Content { text: String },
    /// The provider's end-of-stream marker.
    Sentinel,
    /// A record that carries nothing to forward. Dropped without aborting.
    Unparsed { reason: UnparsedReason },
}

/// Why a record was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnparsedReason {
    /// Blank keep-alive line, comment, or a non-`data:` field.
    NoPayload,
    /// The `data:` payload was not valid JSON.
    Malformed,
    /// Valid JSON without a non-empty content fragment (e.g. a role-only delta).
    NoContent,
}

impl std::fmt::Display for UnparsedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPayload => write!(f, "no_payload"),
            Self::Malformed => write!(f, "malformed"),
            Self::NoContent => write!(f, "no_content"),
        }
    }
}

/// Canonical event written to the downstream client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Chunk { text: String },
    Done,
    Error { message: String },
}

impl RelayEvent {
    /// Whether this event ends the downstream stream.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}
