use std::path::Path;

use anyhow::Result;
use serde_json::Value;

use crate::models::{AgentKind, TokenTotals};
use crate::utils::time::extract_event_timestamp;

use super::codex::u64_member;
use super::resolve::resolve_prompt_text;
use super::{
    SessionBuilder, SessionNormalizeResult, TurnRole, parse_jsonl_events, read_lossy,
};

/// Parses one Claude Code project session file (line-delimited JSON events).
pub fn parse_session_file(path: &Path) -> Result<SessionNormalizeResult> {
    let text = read_lossy(path)?;
    Ok(parse_session_jsonl(path, &text))
}

/// Claude events are flat: top-level `type` is the speaker role and the
/// `message` object carries content blocks plus, on assistant events, the
/// usage report. Events flagged `isMeta` never contribute a prompt title.
#[must_use]
pub fn parse_session_jsonl(path: &Path, text: &str) -> SessionNormalizeResult {
    let mut warnings = Vec::new();
    let events = parse_jsonl_events(text, &mut warnings);

    let mut builder = SessionBuilder::new(AgentKind::Claude, path);
    for event in &events {
        builder.note_parsed_event();
        let timestamp = extract_event_timestamp(event);
        builder.observe_timestamp(timestamp);
        builder.observe_identity(event);

        match event.get("type").and_then(Value::as_str) {
            Some("user") => {
                builder.count_message();
                builder.record_turn(TurnRole::User, timestamp);
                if !is_meta_event(event)
                    && let Some(text) = resolve_prompt_text(event)
                {
                    builder.observe_user_prompt(&text);
                }
            }
            Some("assistant") => {
                builder.count_message();
                builder.record_turn(TurnRole::Assistant, timestamp);
                if let Some(message) = event.get("message") {
                    if let Some(usage) = message_usage(message) {
                        builder.add_tokens(usage);
                    }
                    builder.count_tool_calls(tool_use_blocks(message));
                }
            }
            _ => {}
        }
    }

    SessionNormalizeResult {
        record: builder.finish(),
        warnings,
    }
}

fn is_meta_event(event: &Value) -> bool {
    event.get("isMeta").and_then(Value::as_bool).unwrap_or(false)
}

fn message_usage(message: &Value) -> Option<TokenTotals> {
    let usage = message.get("usage")?;
    Some(TokenTotals {
        input: u64_member(usage, "input_tokens"),
        output: u64_member(usage, "output_tokens"),
        cached: u64_member(usage, "cache_read_input_tokens"),
        reasoning: 0,
    })
}

fn tool_use_blocks(message: &Value) -> u64 {
    let Some(blocks) = message.get("content").and_then(Value::as_array) else {
        return 0;
    };
    blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("tool_use"))
        .count() as u64
}
