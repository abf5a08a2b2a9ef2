use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::discovery::SessionSource;
use crate::models::{
    AgentKind, NO_PROMPT_TITLE, SchemaVersion, SessionRecord, TokenTotals,
};

pub mod claude;
pub mod codex;
pub mod gemini;
pub mod resolve;

/// Outcome of normalizing one source file. `record` is `None` when the file
/// held zero parseable events; warnings carry per-line diagnostics either way.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionNormalizeResult {
    pub record: Option<SessionRecord>,
    pub warnings: Vec<String>,
}

/// Outcome of normalizing a discovered batch. Files that produced no session
/// are counted, not propagated as errors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizeBatchResult {
    pub records: Vec<SessionRecord>,
    pub skipped_files: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TurnRole {
    User,
    Assistant,
}

/// Incremental accumulator the per-agent parsers feed while walking a log.
/// First-wins fields (project, title, session id, model) stay at their first
/// accepted value; counters and timestamp bounds absorb every event.
pub(crate) struct SessionBuilder {
    agent: AgentKind,
    source_path: String,
    session_id: Option<String>,
    model: Option<String>,
    project: Option<String>,
    title: Option<String>,
    start_unix_ms: Option<u64>,
    end_unix_ms: Option<u64>,
    tokens: TokenTotals,
    message_count: u64,
    tool_call_count: u64,
    user_prompt_chars: Vec<usize>,
    turns: Vec<(TurnRole, u64)>,
    parsed_events: u64,
}

impl SessionBuilder {
    pub(crate) fn new(agent: AgentKind, source_path: &Path) -> Self {
        Self {
            agent,
            source_path: source_path.display().to_string(),
            session_id: None,
            model: None,
            project: None,
            title: None,
            start_unix_ms: None,
            end_unix_ms: None,
            tokens: TokenTotals::default(),
            message_count: 0,
            tool_call_count: 0,
            user_prompt_chars: Vec::new(),
            turns: Vec::new(),
            parsed_events: 0,
        }
    }

    pub(crate) fn note_parsed_event(&mut self) {
        self.parsed_events += 1;
    }

    pub(crate) fn observe_timestamp(&mut self, timestamp_unix_ms: Option<u64>) {
        let Some(timestamp) = timestamp_unix_ms else {
            return;
        };
        self.start_unix_ms = Some(match self.start_unix_ms {
            Some(start) => start.min(timestamp),
            None => timestamp,
        });
        self.end_unix_ms = Some(match self.end_unix_ms {
            Some(end) => end.max(timestamp),
            None => timestamp,
        });
    }

    pub(crate) fn add_tokens(&mut self, usage: TokenTotals) {
        self.tokens.input += usage.input;
        self.tokens.output += usage.output;
        self.tokens.cached += usage.cached;
        self.tokens.reasoning += usage.reasoning;
    }

    pub(crate) fn count_message(&mut self) {
        self.message_count += 1;
    }

    pub(crate) fn count_tool_calls(&mut self, calls: u64) {
        self.tool_call_count += calls;
    }

    pub(crate) fn observe_identity(&mut self, event: &Value) {
        if self.session_id.is_none() {
            self.session_id = resolve::resolve_session_id(event);
        }
        if self.model.is_none() {
            self.model = resolve::resolve_model(event);
        }
        if self.project.is_none()
            && let Some(working_dir) = resolve::resolve_working_dir(event)
        {
            self.project = resolve::project_from_working_dir(&working_dir);
        }
    }

    /// Records pacing data for one user-authored message and, until a title
    /// has been accepted, offers its text as the session title.
    pub(crate) fn observe_user_prompt(&mut self, text: &str) {
        self.user_prompt_chars.push(text.chars().count());
        if self.title.is_none() {
            self.title = resolve::accept_prompt_title(text);
        }
    }

    pub(crate) fn record_turn(&mut self, role: TurnRole, timestamp_unix_ms: Option<u64>) {
        if let Some(timestamp) = timestamp_unix_ms {
            self.turns.push((role, timestamp));
        }
    }

    pub(crate) fn finish(self) -> Option<SessionRecord> {
        if self.parsed_events == 0 {
            return None;
        }

        let has_end_time = self.start_unix_ms.is_some() && self.end_unix_ms.is_some();
        let duration_seconds = match (self.start_unix_ms, self.end_unix_ms) {
            (Some(start), Some(end)) => end.saturating_sub(start) as f64 / 1_000.0,
            _ => 0.0,
        };

        let avg_user_message_length = mean_of_counts(&self.user_prompt_chars);
        let avg_response_time_seconds =
            mean_turn_gap_seconds(&self.turns, TurnRole::User, TurnRole::Assistant);
        let avg_thinking_time_seconds =
            mean_turn_gap_seconds(&self.turns, TurnRole::Assistant, TurnRole::User);

        Some(SessionRecord {
            schema_version: SchemaVersion::SessionV1,
            agent: self.agent,
            source_path: self.source_path,
            session_id: self.session_id,
            model: self.model,
            project: self.project,
            title: self.title.unwrap_or_else(|| NO_PROMPT_TITLE.to_string()),
            start_unix_ms: self.start_unix_ms,
            end_unix_ms: self.end_unix_ms,
            duration_seconds,
            has_end_time,
            tokens: self.tokens,
            message_count: self.message_count,
            tool_call_count: self.tool_call_count,
            avg_response_time_seconds,
            avg_user_message_length,
            avg_thinking_time_seconds,
        })
    }
}

fn mean_of_counts(counts: &[usize]) -> Option<f64> {
    if counts.is_empty() {
        return None;
    }
    let total: usize = counts.iter().sum();
    Some(total as f64 / counts.len() as f64)
}

/// Mean gap, in seconds, between consecutive turns going `from` -> `to`.
/// Pairs where time appears to run backwards are discarded.
fn mean_turn_gap_seconds(turns: &[(TurnRole, u64)], from: TurnRole, to: TurnRole) -> Option<f64> {
    let gaps = turns
        .windows(2)
        .filter_map(|pair| {
            let (prev_role, prev_ts) = pair[0];
            let (next_role, next_ts) = pair[1];
            if prev_role == from && next_role == to && next_ts >= prev_ts {
                Some((next_ts - prev_ts) as f64 / 1_000.0)
            } else {
                None
            }
        })
        .collect::<Vec<_>>();

    if gaps.is_empty() {
        return None;
    }
    Some(gaps.iter().sum::<f64>() / gaps.len() as f64)
}

/// Reads a source file as UTF-8, replacing invalid byte sequences instead of
/// failing the read.
pub fn read_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read session log: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parses line-delimited JSON, skipping blank lines and collecting a warning
/// per malformed line.
pub fn parse_jsonl_events(text: &str, warnings: &mut Vec<String>) -> Vec<Value> {
    let mut events = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(event) => events.push(event),
            Err(error) => {
                warnings.push(format!("line {}: invalid JSON payload ({error})", index + 1));
            }
        }
    }
    events
}

/// Normalizes every discovered source in order. Unreadable files and files
/// with zero parseable events are skipped with a diagnostic; the batch never
/// fails.
#[must_use]
pub fn normalize_discovered_sources(sources: &[SessionSource]) -> NormalizeBatchResult {
    let mut batch = NormalizeBatchResult::default();

    for source in sources {
        let parsed = match source.agent {
            AgentKind::Codex => codex::parse_rollout_file(&source.path),
            AgentKind::Claude => claude::parse_session_file(&source.path),
            AgentKind::Gemini => gemini::parse_chat_session_file(&source.path),
        };

        match parsed {
            Ok(result) => {
                for warning in result.warnings {
                    batch
                        .warnings
                        .push(format!("{}: {warning}", source.path.display()));
                }
                match result.record {
                    Some(record) => batch.records.push(record),
                    None => {
                        batch.skipped_files += 1;
                        batch.warnings.push(format!(
                            "{}: no parseable session events, skipped",
                            source.path.display()
                        ));
                    }
                }
            }
            Err(error) => {
                batch.skipped_files += 1;
                batch
                    .warnings
                    .push(format!("{}: {error:#}", source.path.display()));
            }
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::models::AgentKind;

    use super::{SessionBuilder, TurnRole, mean_turn_gap_seconds, parse_jsonl_events};

    #[test]
    fn builder_without_events_yields_no_record() {
        let builder = SessionBuilder::new(AgentKind::Codex, Path::new("empty.jsonl"));
        assert!(builder.finish().is_none());
    }

    #[test]
    fn timestamps_track_min_and_max_regardless_of_order() {
        let mut builder = SessionBuilder::new(AgentKind::Claude, Path::new("s.jsonl"));
        builder.note_parsed_event();
        builder.observe_timestamp(Some(5_000));
        builder.observe_timestamp(Some(2_000));
        builder.observe_timestamp(Some(9_000));
        builder.observe_timestamp(None);

        let record = builder.finish().expect("record");
        assert_eq!(record.start_unix_ms, Some(2_000));
        assert_eq!(record.end_unix_ms, Some(9_000));
        assert!((record.duration_seconds - 7.0).abs() < f64::EPSILON);
        assert!(record.has_end_time);
    }

    #[test]
    fn missing_endpoint_means_zero_duration() {
        let mut builder = SessionBuilder::new(AgentKind::Gemini, Path::new("s.json"));
        builder.note_parsed_event();

        let record = builder.finish().expect("record");
        assert_eq!(record.duration_seconds, 0.0);
        assert!(!record.has_end_time);
        assert_eq!(record.title, "No prompt");
    }

    #[test]
    fn first_accepted_title_sticks() {
        let mut builder = SessionBuilder::new(AgentKind::Claude, Path::new("s.jsonl"));
        builder.note_parsed_event();
        builder.observe_user_prompt("You are an expert assistant in refactoring");
        builder.observe_user_prompt("fix the bug in parser.py");
        builder.observe_user_prompt("do more work");

        let record = builder.finish().expect("record");
        assert_eq!(record.title, "fix the bug in parser.py");
        // Prompt lengths 42, 24, 12 chars.
        assert_eq!(record.avg_user_message_length, Some(26.0));
    }

    #[test]
    fn turn_gaps_average_matching_transitions_only() {
        let turns = vec![
            (TurnRole::User, 1_000),
            (TurnRole::Assistant, 3_000),
            (TurnRole::User, 10_000),
            (TurnRole::Assistant, 14_000),
            (TurnRole::Assistant, 15_000),
        ];
        let response = mean_turn_gap_seconds(&turns, TurnRole::User, TurnRole::Assistant);
        assert_eq!(response, Some(3.0));

        let thinking = mean_turn_gap_seconds(&turns, TurnRole::Assistant, TurnRole::User);
        assert_eq!(thinking, Some(7.0));

        assert_eq!(mean_turn_gap_seconds(&[], TurnRole::User, TurnRole::Assistant), None);
    }

    #[test]
    fn malformed_jsonl_lines_are_skipped_with_diagnostics() {
        let mut warnings = Vec::new();
        let events = parse_jsonl_events("{\"a\":1}\n\nnot json\n{\"b\":2}", &mut warnings);
        assert_eq!(events.len(), 2);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("line 3:"));
    }
}
