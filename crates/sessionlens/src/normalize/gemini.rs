use std::path::Path;

use anyhow::Result;
use serde_json::Value;

use crate::models::{AgentKind, TokenTotals};
use crate::utils::time::{extract_event_timestamp, resolve_raw_timestamp};

use super::codex::u64_member;
use super::resolve::resolve_prompt_text;
use super::{SessionBuilder, SessionNormalizeResult, TurnRole, read_lossy};

/// Parses one Gemini chat session file (a single whole-document JSON object).
pub fn parse_chat_session_file(path: &Path) -> Result<SessionNormalizeResult> {
    let text = read_lossy(path)?;
    Ok(parse_chat_session_json(path, &text))
}

/// The document carries session envelope fields (`sessionId`, `startTime`,
/// `lastUpdated`) plus a `messages` array; each message reports its own
/// `tokens` block and `toolCalls` list.
#[must_use]
pub fn parse_chat_session_json(path: &Path, text: &str) -> SessionNormalizeResult {
    let mut warnings = Vec::new();
    let document = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(error) => {
            warnings.push(format!("invalid JSON document ({error})"));
            return SessionNormalizeResult {
                record: None,
                warnings,
            };
        }
    };

    let mut builder = SessionBuilder::new(AgentKind::Gemini, path);
    builder.observe_identity(&document);
    for key in ["startTime", "lastUpdated"] {
        if let Some(raw) = document.get(key) {
            builder.observe_timestamp(resolve_raw_timestamp(raw));
        }
    }

    let messages = document
        .get("messages")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for message in messages {
        builder.note_parsed_event();
        let timestamp = extract_event_timestamp(message);
        builder.observe_timestamp(timestamp);
        builder.observe_identity(message);

        if let Some(tokens) = message.get("tokens") {
            builder.add_tokens(TokenTotals {
                input: u64_member(tokens, "input"),
                output: u64_member(tokens, "output"),
                cached: u64_member(tokens, "cached"),
                reasoning: u64_member(tokens, "thoughts"),
            });
        }

        if let Some(calls) = message.get("toolCalls").and_then(Value::as_array) {
            builder.count_tool_calls(calls.len() as u64);
        }

        match message_role(message) {
            Some("user") => {
                builder.count_message();
                builder.record_turn(TurnRole::User, timestamp);
                if let Some(text) = resolve_prompt_text(message) {
                    builder.observe_user_prompt(&text);
                }
            }
            Some("gemini" | "model") => {
                builder.count_message();
                builder.record_turn(TurnRole::Assistant, timestamp);
            }
            _ => {}
        }
    }

    SessionNormalizeResult {
        record: builder.finish(),
        warnings,
    }
}

fn message_role(message: &Value) -> Option<&str> {
    message
        .get("type")
        .and_then(Value::as_str)
        .or_else(|| message.get("role").and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::parse_chat_session_json;

    #[test]
    fn envelope_timestamps_bound_the_session() {
        let doc = r#"{
            "sessionId": "g-123",
            "startTime": "2026-02-05T07:00:00Z",
            "lastUpdated": "2026-02-05T07:30:00Z",
            "messages": [
                {"type": "user", "content": "summarize the diff", "timestamp": "2026-02-05T07:05:00Z", "tokens": {"input": 30, "output": 0}},
                {"type": "gemini", "content": "Summary...", "timestamp": "2026-02-05T07:05:20Z", "tokens": {"input": 0, "output": 90, "cached": 10, "thoughts": 5}, "toolCalls": [{"name": "read_file"}]}
            ]
        }"#;

        let result = parse_chat_session_json(Path::new("session-g.json"), doc);
        let record = result.record.expect("record");
        assert_eq!(record.session_id.as_deref(), Some("g-123"));
        assert_eq!(record.start_unix_ms, Some(1_770_274_800_000));
        assert_eq!(record.end_unix_ms, Some(1_770_276_600_000));
        assert!((record.duration_seconds - 1_800.0).abs() < f64::EPSILON);
        assert_eq!(record.tokens.input, 30);
        assert_eq!(record.tokens.output, 90);
        assert_eq!(record.tokens.cached, 10);
        assert_eq!(record.tokens.reasoning, 5);
        assert_eq!(record.message_count, 2);
        assert_eq!(record.tool_call_count, 1);
        assert_eq!(record.title, "summarize the diff");
        assert_eq!(record.avg_response_time_seconds, Some(20.0));
    }

    #[test]
    fn malformed_document_is_skipped_with_a_diagnostic() {
        let result = parse_chat_session_json(Path::new("session-g.json"), "{not json");
        assert!(result.record.is_none());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn document_without_messages_yields_no_record() {
        let result =
            parse_chat_session_json(Path::new("session-g.json"), r#"{"sessionId": "g-1"}"#);
        assert!(result.record.is_none());
    }
}
