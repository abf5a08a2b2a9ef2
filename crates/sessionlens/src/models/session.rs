use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SCHEMA_VERSION: &str = "session.v1";

/// Sentinel title for sessions where no human prompt survived extraction.
/// Canonical output never carries a null title.
pub const NO_PROMPT_TITLE: &str = "No prompt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum SchemaVersion {
    #[serde(rename = "session.v1")]
    #[schemars(rename = "session.v1")]
    SessionV1,
}

/// The fixed set of agent CLI families whose on-disk logs are ingested.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Codex,
    Claude,
    Gemini,
}

impl AgentKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Codex => "codex",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
        }
    }
}

#[must_use]
pub const fn all_agent_kinds() -> [AgentKind; 3] {
    [AgentKind::Codex, AgentKind::Claude, AgentKind::Gemini]
}

/// Token usage accumulated across every usage-reporting event in a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TokenTotals {
    pub input: u64,
    pub output: u64,
    pub cached: u64,
    pub reasoning: u64,
}

impl TokenTotals {
    /// Input plus output tokens, the figure per-project totals report on.
    #[must_use]
    pub const fn conversation_total(self) -> u64 {
        self.input + self.output
    }
}

/// One session log file, normalized to the agent-agnostic shape consumed by
/// the aggregator.
///
/// Invariants: `duration_seconds >= 0`; when either timestamp is absent the
/// duration is `0.0` and `has_end_time` is false. Records are immutable once
/// built by a normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SessionRecord {
    pub schema_version: SchemaVersion,
    pub agent: AgentKind,
    pub source_path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_unix_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_unix_ms: Option<u64>,

    pub duration_seconds: f64,
    pub has_end_time: bool,
    pub tokens: TokenTotals,
    pub message_count: u64,
    pub tool_call_count: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_response_time_seconds: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_user_message_length: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_thinking_time_seconds: Option<f64>,
}

#[must_use]
pub fn json_schema() -> Value {
    let schema = schemars::schema_for!(SessionRecord);
    match serde_json::to_value(schema) {
        Ok(value) => value,
        Err(error) => {
            panic!("failed to serialize generated session schema: {error}");
        }
    }
}
