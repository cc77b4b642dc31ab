//! Downstream half of a session: a bounded channel feeding the HTTP body.

use std::convert::Infallible;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use parentic_core::sse::{RelayEvent, encode};

/// One frame of the streaming response body.
pub type BodyFrame = Result<Bytes, Infallible>;

/// Receiving end handed to the HTTP layer as the response body.
pub type ChatStream = ReceiverStream<BodyFrame>;

/// The client has gone away; the body receiver was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("downstream client disconnected")]
pub struct SinkClosed;

/// Writes encoded relay events to the response body.
///
/// Backpressure comes from the bounded channel: `send` waits while the body
/// has not been drained by the client connection.
#[derive(Debug)]
pub struct DownstreamSink {
    tx: mpsc::Sender<BodyFrame>,
    written: usize,
}

impl DownstreamSink {
    /// Create a sink and the body stream it feeds.
    pub fn channel(capacity: usize) -> (Self, ChatStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, written: 0 }, ReceiverStream::new(rx))
    }

    /// Encode and write one event.
    pub async fn send(&mut self, event: &RelayEvent) -> Result<(), SinkClosed> {
        self.tx
            .send(Ok(encode(event)))
            .await
            .map_err(|_| SinkClosed)?;
        self.written += 1;
        Ok(())
    }

    /// Resolves once the client side has been dropped.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    /// Number of events accepted so far.
    pub const fn written(&self) -> usize {
        self.written
    }
}
