#![allow(clippy::unwrap_used)]

use std::future::{pending, ready};
use std::time::Duration;

use bytes::Bytes;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use super::*;
use crate::upstream::{UpstreamError, UpstreamReply};

type Item = Result<Bytes, UpstreamError>;

fn content(text: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({"choices": [{"index": 0, "delta": {"content": text}}]})
    )
}

fn parse_record(frame: &[u8]) -> Value {
    let text = std::str::from_utf8(frame).unwrap();
    let json = text
        .strip_prefix("data: ")
        .and_then(|t| t.strip_suffix("\n\n"))
        .unwrap();
    serde_json::from_str(json).unwrap()
}

async fn drain(mut body: ChatStream) -> Vec<Value> {
    let mut records = Vec::new();
    while let Some(frame) = body.next().await {
        records.push(parse_record(&frame.unwrap()));
    }
    records
}

/// Run a session over a fixed sequence of upstream chunks.
async fn relay(chunks: Vec<String>) -> (Vec<Value>, SessionSummary) {
    let (sink, body) = DownstreamSink::channel(64);
    let upstream = tokio_stream::iter(
        chunks
            .into_iter()
            .map(|c| Ok::<_, UpstreamError>(Bytes::from(c)))
            .collect::<Vec<_>>(),
    );
    let summary = RelaySession::new(sink)
        .run(ready(Ok(UpstreamReply::Accepted(upstream))))
        .await;
    (drain(body).await, summary)
}

async fn relay_reply(
    reply: Result<UpstreamReply<tokio_stream::Empty<Item>>, UpstreamError>,
) -> (Vec<Value>, SessionSummary) {
    let (sink, body) = DownstreamSink::channel(8);
    let summary = RelaySession::new(sink).run(ready(reply)).await;
    (drain(body).await, summary)
}

#[tokio::test]
async fn chunks_then_done_in_order() {
    let (records, summary) = relay(vec![
        content("Hi"),
        content(" there"),
        "data: [DONE]\n\n".into(),
    ])
    .await;

    assert_eq!(
        records,
        vec![json!({"chunk": "Hi"}), json!({"chunk": " there"}), json!({"done": true})]
    );
    assert_eq!(summary.outcome, SessionOutcome::Completed);
    assert_eq!(summary.transcript, "Hi there");
    assert_eq!(summary.chunks, 2);
}

#[tokio::test]
async fn record_split_across_chunks_is_forwarded_once() {
    let record = content("Hello");
    let (first, second) = record.split_at(12);
    let (records, summary) = relay(vec![
        first.to_string(),
        second.to_string(),
        "data: [DONE]\n\n".into(),
    ])
    .await;

    assert_eq!(records, vec![json!({"chunk": "Hello"}), json!({"done": true})]);
    assert_eq!(summary.chunks, 1);
}

#[tokio::test]
async fn records_after_sentinel_are_ignored() {
    let tail = format!("data: [DONE]\n\n{}", content("ignored"));
    let (records, summary) = relay(vec![content("A"), tail, content("also ignored")]).await;

    assert_eq!(records, vec![json!({"chunk": "A"}), json!({"done": true})]);
    assert_eq!(summary.transcript, "A");
}

#[tokio::test]
async fn malformed_record_is_skipped_and_counted() {
    let (records, summary) = relay(vec![
        content("A"),
        "data: {\"choices\":[{\"delta\":\n\n".into(),
        ": keep-alive\n\n".into(),
        content("B"),
        "data: [DONE]\n\n".into(),
    ])
    .await;

    assert_eq!(
        records,
        vec![json!({"chunk": "A"}), json!({"chunk": "B"}), json!({"done": true})]
    );
    assert_eq!(summary.malformed, 1);
    assert!(summary.dropped > summary.malformed);
}

#[tokio::test]
async fn stream_end_without_sentinel_still_completes() {
    let (records, summary) = relay(vec![content("A"), "data: {\"choi".into()]).await;

    assert_eq!(records, vec![json!({"chunk": "A"}), json!({"done": true})]);
    assert_eq!(summary.outcome, SessionOutcome::Completed);
}

#[tokio::test]
async fn empty_upstream_sends_only_done() {
    let (records, summary) = relay(Vec::new()).await;
    assert_eq!(records, vec![json!({"done": true})]);
    assert!(summary.transcript.is_empty());
}

#[tokio::test]
async fn rejection_produces_single_error() {
    let (records, summary) = relay_reply(Ok(UpstreamReply::Rejected {
        status: 429,
        message: "Rate limit reached".into(),
    }))
    .await;

    assert_eq!(records, vec![json!({"error": "Rate limit reached"})]);
    assert_eq!(summary.outcome, SessionOutcome::Failed);
    assert_eq!(summary.chunks, 0);
}

#[tokio::test]
async fn unreachable_provider_produces_single_error() {
    let (records, summary) =
        relay_reply(Err(UpstreamError::Transport("connection refused".into()))).await;

    assert_eq!(records, vec![json!({"error": UNREACHABLE_MESSAGE})]);
    assert_eq!(summary.outcome, SessionOutcome::Failed);
}

#[tokio::test]
async fn transport_failure_mid_stream_ends_with_error() {
    let (sink, body) = DownstreamSink::channel(8);
    let upstream = tokio_stream::iter(vec![
        Ok(Bytes::from(content("partial"))),
        Err(UpstreamError::Transport("reset by peer".into())),
        Ok(Bytes::from(content("never"))),
    ]);
    let summary = RelaySession::new(sink)
        .run(ready(Ok(UpstreamReply::Accepted(upstream))))
        .await;

    assert_eq!(
        drain(body).await,
        vec![json!({"chunk": "partial"}), json!({"error": STREAM_ERROR_MESSAGE})]
    );
    assert_eq!(summary.outcome, SessionOutcome::Failed);
}

#[tokio::test]
async fn client_disconnect_releases_upstream() {
    let (sink, mut body) = DownstreamSink::channel(8);
    let (upstream_tx, upstream_rx) = mpsc::channel::<Item>(8);
    let session = tokio::spawn(
        RelaySession::new(sink).run(ready(Ok(UpstreamReply::Accepted(ReceiverStream::new(
            upstream_rx,
        ))))),
    );

    upstream_tx.send(Ok(Bytes::from(content("A")))).await.unwrap();
    let first = body.next().await.unwrap().unwrap();
    assert_eq!(parse_record(&first), json!({"chunk": "A"}));

    drop(body);

    // The session drops its upstream receiver once it sees the disconnect.
    tokio::time::timeout(Duration::from_secs(2), upstream_tx.closed())
        .await
        .unwrap();

    let summary = session.await.unwrap();
    assert_eq!(summary.outcome, SessionOutcome::Canceled);
    assert_eq!(summary.chunks, 1);
}

#[tokio::test]
async fn disconnect_while_upstream_silent_cancels() {
    let (sink, body) = DownstreamSink::channel(8);
    let (upstream_tx, upstream_rx) = mpsc::channel::<Item>(8);
    let session = tokio::spawn(
        RelaySession::new(sink).run(ready(Ok(UpstreamReply::Accepted(ReceiverStream::new(
            upstream_rx,
        ))))),
    );

    drop(body);

    tokio::time::timeout(Duration::from_secs(2), upstream_tx.closed())
        .await
        .unwrap();
    let summary = session.await.unwrap();
    assert_eq!(summary.outcome, SessionOutcome::Canceled);
    assert_eq!(summary.chunks, 0);
}

#[tokio::test]
async fn disconnect_while_request_pending_drops_the_request() {
    let (sink, body) = DownstreamSink::channel(8);
    let (guard, released) = oneshot::channel::<()>();
    // Never answers; holds `guard` until the future is dropped.
    let open = async move {
        let _guard = guard;
        pending::<Result<UpstreamReply<tokio_stream::Empty<Item>>, UpstreamError>>().await
    };
    let session = tokio::spawn(RelaySession::new(sink).run(open));

    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(body);

    // Sender dropped without sending: the pending request was released.
    let result = tokio::time::timeout(Duration::from_secs(2), released)
        .await
        .unwrap();
    assert!(result.is_err());

    let summary = session.await.unwrap();
    assert_eq!(summary.outcome, SessionOutcome::Canceled);
    assert_eq!(summary.chunks, 0);
}

#[tokio::test]
async fn closed_sink_before_rejection_writes_nothing() {
    let (sink, body) = DownstreamSink::channel(8);
    drop(body);
    let reply: Result<UpstreamReply<tokio_stream::Empty<Item>>, _> = Ok(UpstreamReply::Rejected {
        status: 500,
        message: "boom".into(),
    });
    let summary = RelaySession::new(sink).run(ready(reply)).await;
    assert_eq!(summary.outcome, SessionOutcome::Canceled);
}

#[tokio::test]
async fn sink_counts_written_events() {
    let (mut sink, body) = DownstreamSink::channel(4);
    sink.send(&parentic_core::sse::RelayEvent::Done).await.unwrap();
    assert_eq!(sink.written(), 1);

    drop(body);
    assert!(sink.send(&parentic_core::sse::RelayEvent::Done).await.is_err());
    assert_eq!(sink.written(), 1);
}

#[test]
fn state_names() {
    assert_eq!(SessionState::Streaming.to_string(), "streaming");
    assert_eq!(SessionState::Closed.to_string(), "closed");
}
