use std::path::Path;

use anyhow::Result;
use serde_json::Value;

use crate::models::{AgentKind, TokenTotals};
use crate::utils::time::extract_event_timestamp;

use super::resolve::resolve_prompt_text;
use super::{
    SessionBuilder, SessionNormalizeResult, TurnRole, parse_jsonl_events, read_lossy,
};

/// Parses one Codex rollout file (line-delimited JSON events).
pub fn parse_rollout_file(path: &Path) -> Result<SessionNormalizeResult> {
    let text = read_lossy(path)?;
    Ok(parse_rollout_jsonl(path, &text))
}

/// Rollout events carry a top-level `type` plus a `payload` object.
/// `event_msg`/`token_count` events report usage; `response_item` events
/// carry the conversation turns.
#[must_use]
pub fn parse_rollout_jsonl(path: &Path, text: &str) -> SessionNormalizeResult {
    let mut warnings = Vec::new();
    let events = parse_jsonl_events(text, &mut warnings);

    let mut builder = SessionBuilder::new(AgentKind::Codex, path);
    for event in &events {
        builder.note_parsed_event();
        let timestamp = extract_event_timestamp(event);
        builder.observe_timestamp(timestamp);
        builder.observe_identity(event);

        let Some(payload) = event.get("payload") else {
            continue;
        };
        builder.observe_identity(payload);

        match event.get("type").and_then(Value::as_str) {
            Some("event_msg") => {
                if payload.get("type").and_then(Value::as_str) == Some("token_count")
                    && let Some(usage) = last_token_usage(payload)
                {
                    builder.add_tokens(usage);
                }
            }
            Some("response_item") => match payload.get("type").and_then(Value::as_str) {
                Some("message") => {
                    builder.count_message();
                    match payload.get("role").and_then(Value::as_str) {
                        Some("user") => {
                            builder.record_turn(TurnRole::User, timestamp);
                            if let Some(text) = resolve_prompt_text(payload) {
                                builder.observe_user_prompt(&text);
                            }
                        }
                        Some("assistant") => {
                            builder.record_turn(TurnRole::Assistant, timestamp);
                        }
                        _ => {}
                    }
                }
                Some("function_call") => builder.count_tool_calls(1),
                _ => {}
            },
            _ => {}
        }
    }

    SessionNormalizeResult {
        record: builder.finish(),
        warnings,
    }
}

fn last_token_usage(payload: &Value) -> Option<TokenTotals> {
    let usage = payload.get("info")?.get("last_token_usage")?;
    Some(TokenTotals {
        input: u64_member(usage, "input_tokens"),
        output: u64_member(usage, "output_tokens"),
        cached: u64_member(usage, "cached_input_tokens"),
        reasoning: u64_member(usage, "reasoning_output_tokens"),
    })
}

pub(crate) fn u64_member(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::parse_rollout_jsonl;

    #[test]
    fn accumulates_token_usage_across_count_events() {
        let log = concat!(
            r#"{"timestamp":"2026-02-05T07:00:00Z","type":"event_msg","payload":{"type":"token_count","info":{"last_token_usage":{"input_tokens":100,"output_tokens":40,"cached_input_tokens":25,"reasoning_output_tokens":10}}}}"#,
            "\n",
            r#"{"timestamp":"2026-02-05T07:01:00Z","type":"event_msg","payload":{"type":"token_count","info":{"last_token_usage":{"input_tokens":50,"output_tokens":10,"cached_input_tokens":5,"reasoning_output_tokens":2}}}}"#,
        );

        let result = parse_rollout_jsonl(Path::new("rollout.jsonl"), log);
        let record = result.record.expect("record");
        assert_eq!(record.tokens.input, 150);
        assert_eq!(record.tokens.output, 50);
        assert_eq!(record.tokens.cached, 30);
        assert_eq!(record.tokens.reasoning, 12);
        assert_eq!(record.message_count, 0);
    }

    #[test]
    fn counts_messages_and_function_calls() {
        let log = concat!(
            r#"{"timestamp":"2026-02-05T07:00:00Z","type":"response_item","payload":{"type":"message","role":"user","content":[{"type":"input_text","text":"rename the config module"}]}}"#,
            "\n",
            r#"{"timestamp":"2026-02-05T07:00:30Z","type":"response_item","payload":{"type":"function_call","name":"shell"}}"#,
            "\n",
            r#"{"timestamp":"2026-02-05T07:01:00Z","type":"response_item","payload":{"type":"message","role":"assistant","content":[{"type":"output_text","text":"done"}]}}"#,
        );

        let result = parse_rollout_jsonl(Path::new("rollout.jsonl"), log);
        let record = result.record.expect("record");
        assert_eq!(record.message_count, 2);
        assert_eq!(record.tool_call_count, 1);
        assert_eq!(record.title, "rename the config module");
        assert_eq!(record.avg_response_time_seconds, Some(60.0));
    }

    #[test]
    fn empty_input_yields_no_record() {
        let result = parse_rollout_jsonl(Path::new("rollout.jsonl"), "");
        assert!(result.record.is_none());
        assert!(result.warnings.is_empty());
    }
}
