//! Per-request relay session.
//!
//! A session owns one upstream token stream and one downstream sink and moves
//! bytes from the former to the latter, re-framed as relay events, until the
//! first terminal event or until the client goes away.

mod relay;
mod sink;

#[cfg(test)]
mod tests;

pub use relay::{
    RelaySession, STREAM_ERROR_MESSAGE, SessionOutcome, SessionState, SessionSummary,
    UNREACHABLE_MESSAGE,
};
pub use sink::{BodyFrame, ChatStream, DownstreamSink, SinkClosed};
