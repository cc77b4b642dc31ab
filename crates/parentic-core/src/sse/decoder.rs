//! Decoder for the completion provider's `data:` line protocol.
//!
//! Implements tolerant reader pattern: anything that is not a content
//! fragment or the end-of-stream marker is reported as `Unparsed` and never
//! treated as a protocol error.

use serde_json::Value;

use super::types::{UnparsedReason, UpstreamRecord};

/// Literal payload the provider sends as its last record.
const SENTINEL: &str = "[DONE]";

const DATA_FIELD: &str = "data:";

/// Decode one complete record (without its trailing newline).
pub fn decode_record(record: &str) -> UpstreamRecord {
    let record = record.strip_suffix('\r').unwrap_or(record);

    let Some(payload) = record.strip_prefix(DATA_FIELD) else {
        return unparsed(UnparsedReason::NoPayload);
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    if payload.trim() == SENTINEL {
        return UpstreamRecord::Sentinel;
    }

    let Ok(raw) = serde_json::from_str::<Value>(payload) else {
        return unparsed(UnparsedReason::Malformed);
    };

    match content_fragment(&raw) {
        Some(text) if !text.is_empty() => UpstreamRecord::Content {
            text: text.to_string(),
        },
        _ => unparsed(UnparsedReason::NoContent),
    }
}

/// Extract `choices[0].delta.content`.
fn content_fragment(raw: &Value) -> Option<&str> {
    raw.get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
}

const fn unparsed(reason: UnparsedReason) -> UpstreamRecord {
    UpstreamRecord::Unparsed { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(text: &str) -> UpstreamRecord {
        UpstreamRecord::Content {
            text: text.to_string(),
        }
    }

    #[test]
    fn content_delta_is_extracted() {
        let record = r#"data: {"id":"x","choices":[{"index":0,"delta":{"content":"Hi"}}]}"#;
        assert_eq!(decode_record(record), content("Hi"));
    }

    #[test]
    fn whitespace_content_is_forwarded_verbatim() {
        let record = r#"data: {"choices":[{"delta":{"content":" there"}}]}"#;
        assert_eq!(decode_record(record), content(" there"));
    }

    #[test]
    fn sentinel_is_recognised() {
        assert_eq!(decode_record("data: [DONE]"), UpstreamRecord::Sentinel);
        assert_eq!(decode_record("data:[DONE]"), UpstreamRecord::Sentinel);
        assert_eq!(decode_record("data: [DONE]\r"), UpstreamRecord::Sentinel);
    }

    #[test]
    fn crlf_record_decodes_like_lf() {
        let record = "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\r";
        assert_eq!(decode_record(record), content("ok"));
    }

    #[test]
    fn blank_and_comment_lines_have_no_payload() {
        for record in ["", "\r", ": keep-alive", "event: message", "id: 7", "data"] {
            assert_eq!(
                decode_record(record),
                unparsed(UnparsedReason::NoPayload),
                "record {record:?}"
            );
        }
    }

    #[test]
    fn malformed_json_is_unparsed() {
        assert_eq!(
            decode_record(r#"data: {"choices":[{"delta":"#),
            unparsed(UnparsedReason::Malformed)
        );
        assert_eq!(
            decode_record("data: not json"),
            unparsed(UnparsedReason::Malformed)
        );
    }

    #[test]
    fn missing_or_empty_content_is_unparsed() {
        for record in [
            r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"data: {"choices":[{"delta":{"content":""}}]}"#,
            r#"data: {"choices":[{"delta":{"content":null}}]}"#,
            r#"data: {"choices":[]}"#,
            r#"data: {"usage":{"total_tokens":12}}"#,
            r#"data: "just a string""#,
        ] {
            assert_eq!(
                decode_record(record),
                unparsed(UnparsedReason::NoContent),
                "record {record:?}"
            );
        }
    }

    #[test]
    fn sentinel_lookalike_inside_json_is_content() {
        let record = r#"data: {"choices":[{"delta":{"content":"[DONE]"}}]}"#;
        assert_eq!(decode_record(record), content("[DONE]"));
    }
}
