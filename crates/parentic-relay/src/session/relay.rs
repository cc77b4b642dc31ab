//! Relay session state machine.
//!
//! `Init -> Streaming -> {Done | Errored} -> Closed`, with a direct jump to
//! `Closed` whenever the client disconnects. Exactly one terminal event is
//! written per session unless the client left first.

use std::fmt;

use bytes::Bytes;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use parentic_core::sse::{FrameBuffer, RelayEvent, UnparsedReason, UpstreamRecord, decode_record};

use super::sink::{DownstreamSink, SinkClosed};
use crate::upstream::{UpstreamError, UpstreamReply};

/// Error text sent when the upstream stream fails mid-response.
pub const STREAM_ERROR_MESSAGE: &str = "Stream error occurred";

/// Error text sent when the provider could not be reached at all.
pub const UNREACHABLE_MESSAGE: &str = "Failed to reach completion provider";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Streaming,
    Done,
    Errored,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Streaming => "streaming",
            Self::Done => "done",
            Self::Errored => "errored",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The done event was delivered.
    Completed,
    /// An error event was delivered.
    Failed,
    /// The client went away before a terminal event could be delivered.
    Canceled,
}

/// What a session did, returned once both ends are released.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: Uuid,
    pub outcome: SessionOutcome,
    /// Concatenated text of every forwarded chunk.
    pub transcript: String,
    /// Chunk events delivered.
    pub chunks: usize,
    /// Upstream records dropped as unusable.
    pub dropped: usize,
    /// Subset of `dropped` whose payload was not valid JSON.
    pub malformed: usize,
}

enum Step {
    ClientGone,
    Upstream(Option<Result<Bytes, UpstreamError>>),
}

/// One relay session: one upstream stream, one downstream sink.
pub struct RelaySession {
    id: Uuid,
    sink: DownstreamSink,
    buffer: FrameBuffer,
    state: SessionState,
    canceled: bool,
    transcript: String,
    chunks: usize,
    dropped: usize,
    malformed: usize,
}

impl RelaySession {
    pub fn new(sink: DownstreamSink) -> Self {
        Self {
            id: Uuid::new_v4(),
            sink,
            buffer: FrameBuffer::new(),
            state: SessionState::Init,
            canceled: false,
            transcript: String::new(),
            chunks: 0,
            dropped: 0,
            malformed: 0,
        }
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Drive the session to completion.
    ///
    /// `open` issues the upstream request. It is raced against client
    /// disconnection, so a client that leaves before the provider answers
    /// drops the pending request. Both the upstream stream and the sink are
    /// dropped before this returns.
    pub async fn run<F, S>(mut self, open: F) -> SessionSummary
    where
        F: Future<Output = Result<UpstreamReply<S>, UpstreamError>>,
        S: Stream<Item = Result<Bytes, UpstreamError>> + Unpin,
    {
        let reply = tokio::select! {
            biased;
            () = self.sink.closed() => None,
            reply = open => Some(reply),
        };

        match reply {
            None => self.cancel(),
            Some(Ok(UpstreamReply::Accepted(mut upstream))) => {
                self.transition(SessionState::Streaming);
                self.pump(&mut upstream).await;
                // Upstream released here, before the sink.
                drop(upstream);
            }
            Some(Ok(UpstreamReply::Rejected { status, message })) => {
                warn!(session_id = %self.id, status, %message, "Completion provider rejected request");
                self.fail(message).await;
            }
            Some(Err(e)) => {
                warn!(session_id = %self.id, error = %e, "Failed to reach completion provider");
                self.fail(UNREACHABLE_MESSAGE.to_string()).await;
            }
        }
        self.close()
    }

    async fn pump<S>(&mut self, upstream: &mut S)
    where
        S: Stream<Item = Result<Bytes, UpstreamError>> + Unpin,
    {
        while self.state == SessionState::Streaming {
            let step = tokio::select! {
                biased;
                () = self.sink.closed() => Step::ClientGone,
                item = upstream.next() => Step::Upstream(item),
            };

            match step {
                Step::ClientGone => self.cancel(),
                Step::Upstream(Some(Ok(raw))) => self.ingest(&raw).await,
                Step::Upstream(Some(Err(e))) => {
                    warn!(session_id = %self.id, error = %e, "Upstream stream failed");
                    self.fail(STREAM_ERROR_MESSAGE.to_string()).await;
                }
                Step::Upstream(None) => {
                    if !self.buffer.is_empty() {
                        debug!(
                            session_id = %self.id,
                            pending = self.buffer.remainder().len(),
                            "Discarding unterminated trailing record"
                        );
                    }
                    self.finish().await;
                }
            }
        }
    }

    async fn ingest(&mut self, raw: &[u8]) {
        for record in self.buffer.append(raw) {
            // Anything after a terminal event or a disconnect is ignored.
            if self.state != SessionState::Streaming {
                break;
            }
            match decode_record(&record) {
                UpstreamRecord::Content { text } => {
                    self.transcript.push_str(&text);
                    if self.emit(RelayEvent::Chunk { text }).await {
                        self.chunks += 1;
                    }
                }
                UpstreamRecord::Sentinel => self.finish().await,
                UpstreamRecord::Unparsed { reason } => {
                    self.dropped += 1;
                    if reason == UnparsedReason::Malformed {
                        self.malformed += 1;
                        debug!(session_id = %self.id, %record, "Dropping malformed upstream record");
                    } else {
                        trace!(session_id = %self.id, %reason, "Skipping upstream record");
                    }
                }
            }
        }
    }

    /// Write an event; a closed sink cancels the session.
    async fn emit(&mut self, event: RelayEvent) -> bool {
        match self.sink.send(&event).await {
            Ok(()) => true,
            Err(SinkClosed) => {
                self.cancel();
                false
            }
        }
    }

    async fn finish(&mut self) {
        if self.emit(RelayEvent::Done).await {
            self.transition(SessionState::Done);
        }
    }

    async fn fail(&mut self, message: String) {
        if self.emit(RelayEvent::Error { message }).await {
            self.transition(SessionState::Errored);
        }
    }

    fn cancel(&mut self) {
        if !self.canceled {
            self.canceled = true;
            debug!(session_id = %self.id, state = %self.state, "Client disconnected");
        }
        self.transition(SessionState::Closed);
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(session_id = %self.id, from = %self.state, to = %next, "Session state change");
            self.state = next;
        }
    }

    fn close(mut self) -> SessionSummary {
        let outcome = match self.state {
            SessionState::Done if !self.canceled => SessionOutcome::Completed,
            SessionState::Errored if !self.canceled => SessionOutcome::Failed,
            _ => SessionOutcome::Canceled,
        };
        self.transition(SessionState::Closed);

        let Self {
            id,
            sink,
            transcript,
            chunks,
            dropped,
            malformed,
            ..
        } = self;
        let written = sink.written();
        drop(sink);

        info!(
            session_id = %id,
            outcome = ?outcome,
            chunks,
            written,
            dropped,
            malformed,
            "Relay session closed"
        );

        SessionSummary {
            id,
            outcome,
            transcript,
            chunks,
            dropped,
            malformed,
        }
    }
}
