use serde_json::Value;

use crate::utils::content::{join_content_blocks, non_empty, normalize_whitespace, truncate_chars};

pub const MAX_TITLE_CHARS: usize = 200;

/// Prompt candidates containing any of these markers (case-insensitive) are
/// scaffolding or command wrappers, not something a human typed.
pub const BOILERPLATE_MARKERS: &[&str] = &[
    "you are an expert",
    "you are a helpful",
    "act as a",
    "<command-name>",
    "caveat:",
    "<local-command",
];

/// One named way of pulling a canonical field out of a raw event. Strategies
/// are pure; the resolver applies an ordered list and keeps the first
/// success, which makes each fallback chain inspectable and testable on its
/// own instead of being buried in ad-hoc lookups.
pub struct FieldStrategy<T: 'static> {
    pub name: &'static str,
    pub resolve: fn(&Value) -> Option<T>,
}

#[must_use]
pub fn resolve_first<T>(strategies: &[FieldStrategy<T>], event: &Value) -> Option<T> {
    strategies
        .iter()
        .find_map(|strategy| (strategy.resolve)(event))
}

pub const WORKING_DIR_STRATEGIES: &[FieldStrategy<String>] = &[
    FieldStrategy {
        name: "top_level_cwd",
        resolve: top_level_cwd,
    },
    FieldStrategy {
        name: "payload_cwd",
        resolve: payload_cwd,
    },
    FieldStrategy {
        name: "workspace_dir",
        resolve: workspace_dir,
    },
];

pub const PROMPT_TEXT_STRATEGIES: &[FieldStrategy<String>] = &[
    FieldStrategy {
        name: "nested_message_content",
        resolve: nested_message_content,
    },
    FieldStrategy {
        name: "direct_content",
        resolve: direct_content,
    },
    FieldStrategy {
        name: "direct_text",
        resolve: direct_text,
    },
];

pub const SESSION_ID_STRATEGIES: &[FieldStrategy<String>] = &[
    FieldStrategy {
        name: "snake_case_session_id",
        resolve: snake_case_session_id,
    },
    FieldStrategy {
        name: "camel_case_session_id",
        resolve: camel_case_session_id,
    },
    FieldStrategy {
        name: "payload_session_id",
        resolve: payload_session_id,
    },
];

pub const MODEL_STRATEGIES: &[FieldStrategy<String>] = &[
    FieldStrategy {
        name: "top_level_model",
        resolve: top_level_model,
    },
    FieldStrategy {
        name: "message_model",
        resolve: message_model,
    },
    FieldStrategy {
        name: "payload_model",
        resolve: payload_model,
    },
];

#[must_use]
pub fn resolve_working_dir(event: &Value) -> Option<String> {
    resolve_first(WORKING_DIR_STRATEGIES, event)
}

#[must_use]
pub fn resolve_prompt_text(event: &Value) -> Option<String> {
    resolve_first(PROMPT_TEXT_STRATEGIES, event)
}

#[must_use]
pub fn resolve_session_id(event: &Value) -> Option<String> {
    resolve_first(SESSION_ID_STRATEGIES, event)
}

#[must_use]
pub fn resolve_model(event: &Value) -> Option<String> {
    resolve_first(MODEL_STRATEGIES, event)
}

/// Final path component of a working-directory path, used as the project
/// name across all agent families.
#[must_use]
pub fn project_from_working_dir(working_dir: &str) -> Option<String> {
    let trimmed = working_dir.trim().trim_end_matches('/');
    let component = trimmed.rsplit('/').next()?;
    non_empty(component)
}

#[must_use]
pub fn is_boilerplate_prompt(text: &str) -> bool {
    let lowered = text.to_lowercase();
    BOILERPLATE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Cleans an accepted prompt candidate into a display title: whitespace
/// collapsed, truncated, boilerplate rejected.
#[must_use]
pub fn accept_prompt_title(candidate: &str) -> Option<String> {
    let normalized = normalize_whitespace(candidate);
    if normalized.is_empty() || is_boilerplate_prompt(&normalized) {
        return None;
    }
    Some(truncate_chars(&normalized, MAX_TITLE_CHARS))
}

fn text_from_shape(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => non_empty(text),
        Value::Array(blocks) => join_content_blocks(blocks),
        _ => None,
    }
}

fn top_level_cwd(event: &Value) -> Option<String> {
    string_member(event, "cwd")
}

fn payload_cwd(event: &Value) -> Option<String> {
    event
        .get("payload")
        .and_then(|payload| string_member(payload, "cwd"))
}

fn workspace_dir(event: &Value) -> Option<String> {
    string_member(event, "workspaceDir").or_else(|| string_member(event, "workspace_dir"))
}

fn nested_message_content(event: &Value) -> Option<String> {
    let message = event.get("message")?;
    message
        .get("content")
        .and_then(text_from_shape)
        .or_else(|| message.get("text").and_then(text_from_shape))
}

fn direct_content(event: &Value) -> Option<String> {
    event.get("content").and_then(text_from_shape)
}

fn direct_text(event: &Value) -> Option<String> {
    event.get("text").and_then(text_from_shape)
}

fn snake_case_session_id(event: &Value) -> Option<String> {
    string_member(event, "session_id")
}

fn camel_case_session_id(event: &Value) -> Option<String> {
    string_member(event, "sessionId")
}

fn payload_session_id(event: &Value) -> Option<String> {
    event
        .get("payload")
        .and_then(|payload| string_member(payload, "session_id").or_else(|| string_member(payload, "id")))
}

fn top_level_model(event: &Value) -> Option<String> {
    string_member(event, "model")
}

fn message_model(event: &Value) -> Option<String> {
    event
        .get("message")
        .and_then(|message| string_member(message, "model"))
}

fn payload_model(event: &Value) -> Option<String> {
    event
        .get("payload")
        .and_then(|payload| string_member(payload, "model"))
}

fn string_member(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).and_then(non_empty)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        accept_prompt_title, is_boilerplate_prompt, project_from_working_dir,
        resolve_prompt_text, resolve_working_dir,
    };

    #[test]
    fn working_dir_prefers_top_level_over_payload() {
        let event = json!({"cwd": "/work/outer", "payload": {"cwd": "/work/inner"}});
        assert_eq!(resolve_working_dir(&event), Some("/work/outer".to_string()));

        let payload_only = json!({"payload": {"cwd": "/work/inner"}});
        assert_eq!(
            resolve_working_dir(&payload_only),
            Some("/work/inner".to_string())
        );
    }

    #[test]
    fn project_is_final_path_component() {
        assert_eq!(
            project_from_working_dir("/home/dev/repoA"),
            Some("repoA".to_string())
        );
        assert_eq!(
            project_from_working_dir("/home/dev/repoA/"),
            Some("repoA".to_string())
        );
        assert_eq!(project_from_working_dir("   "), None);
    }

    #[test]
    fn prompt_text_walks_shapes_in_order() {
        let nested = json!({"message": {"content": "from message"}, "content": "direct"});
        assert_eq!(resolve_prompt_text(&nested), Some("from message".to_string()));

        let blocks = json!({"content": [{"type": "text", "text": "from"}, "blocks"]});
        assert_eq!(resolve_prompt_text(&blocks), Some("from blocks".to_string()));

        let plain = json!({"text": "plain text"});
        assert_eq!(resolve_prompt_text(&plain), Some("plain text".to_string()));
    }

    #[test]
    fn boilerplate_markers_match_case_insensitively() {
        assert!(is_boilerplate_prompt("You Are An Expert assistant..."));
        assert!(is_boilerplate_prompt("Caveat: the messages below"));
        assert!(!is_boilerplate_prompt("fix the bug in parser.py"));
    }

    #[test]
    fn accepted_titles_are_normalized_and_bounded() {
        assert_eq!(
            accept_prompt_title("  fix   the\nbug  "),
            Some("fix the bug".to_string())
        );
        assert_eq!(accept_prompt_title("You are an expert assistant..."), None);
        assert_eq!(accept_prompt_title("   "), None);

        let long = "x".repeat(300);
        let accepted = accept_prompt_title(&long).expect("long prompt accepted");
        assert_eq!(accepted.chars().count(), 203);
        assert!(accepted.ends_with("..."));
    }
}
