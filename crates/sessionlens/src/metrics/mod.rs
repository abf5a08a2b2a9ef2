use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{AgentKind, SessionRecord, TokenTotals, all_agent_kinds};
use crate::utils::time::{format_unix_ms, hour_of_day, span_whole_days, weekday_name};

/// The four analytical views computed over one canonical record collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub global: GlobalTotals,
    pub projects: Vec<ProjectBreakdown>,
    pub agents: Vec<AgentComparison>,
    pub human: HumanPerformance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalTotals {
    pub total_sessions: usize,
    pub total_duration_hours: f64,
    pub tokens: TokenTotals,
    pub total_messages: u64,
    pub total_tool_calls: u64,
    pub avg_session_duration_minutes: f64,
    pub avg_messages_per_session: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
}

/// Span of start timestamps across the corpus, measured in whole days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub first_utc: String,
    pub last_utc: String,
    pub span_days: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectBreakdown {
    pub project: String,
    pub session_count: usize,
    pub agents: BTreeMap<String, usize>,
    pub total_duration_hours: f64,
    pub total_tokens: u64,
    pub avg_session_duration_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenEfficiency {
    pub avg_input_tokens_per_session: f64,
    pub avg_output_tokens_per_session: f64,
    pub output_to_input_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentComparison {
    pub agent: AgentKind,
    pub session_count: usize,
    pub avg_session_duration_minutes: f64,
    pub avg_messages_per_session: f64,
    pub avg_tool_calls_per_session: f64,
    pub token_efficiency: TokenEfficiency,
    pub avg_response_time_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayCount {
    pub day: String,
    pub sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HumanPerformance {
    pub completed_sessions: usize,
    pub completion_rate: f64,
    pub avg_user_message_length: Option<f64>,
    pub avg_thinking_time_seconds: Option<f64>,
    pub sessions_by_hour: BTreeMap<u8, usize>,
    pub sessions_by_weekday: Vec<WeekdayCount>,
    pub peak_hours: Vec<String>,
    pub peak_days: Vec<String>,
}

/// Computes all four views. Pure over its input; divisors are floored at 1 so
/// an empty corpus reads as zeros rather than failing.
#[must_use]
pub fn aggregate(records: &[SessionRecord]) -> AnalyticsReport {
    AnalyticsReport {
        global: global_totals(records),
        projects: project_breakdowns(records),
        agents: agent_comparisons(records),
        human: human_performance(records),
    }
}

fn global_totals(records: &[SessionRecord]) -> GlobalTotals {
    let divisor = records.len().max(1) as f64;
    let total_duration_seconds: f64 = records.iter().map(|r| r.duration_seconds).sum();
    let total_messages: u64 = records.iter().map(|r| r.message_count).sum();
    let total_tool_calls: u64 = records.iter().map(|r| r.tool_call_count).sum();

    let mut tokens = TokenTotals::default();
    for record in records {
        tokens.input += record.tokens.input;
        tokens.output += record.tokens.output;
        tokens.cached += record.tokens.cached;
        tokens.reasoning += record.tokens.reasoning;
    }

    let starts = records
        .iter()
        .filter_map(|r| r.start_unix_ms)
        .collect::<Vec<_>>();
    let time_range = match (starts.iter().min(), starts.iter().max()) {
        (Some(&first), Some(&last)) => Some(TimeRange {
            first_utc: format_unix_ms(first),
            last_utc: format_unix_ms(last),
            span_days: span_whole_days(first, last),
        }),
        _ => None,
    };

    GlobalTotals {
        total_sessions: records.len(),
        total_duration_hours: round_to(total_duration_seconds / 3_600.0, 2),
        tokens,
        total_messages,
        total_tool_calls,
        avg_session_duration_minutes: round_to(total_duration_seconds / 60.0 / divisor, 2),
        avg_messages_per_session: round_to(total_messages as f64 / divisor, 2),
        time_range,
    }
}

struct ProjectAccumulator {
    project: String,
    session_count: usize,
    agents: BTreeMap<String, usize>,
    duration_seconds: f64,
    tokens: u64,
}

fn project_breakdowns(records: &[SessionRecord]) -> Vec<ProjectBreakdown> {
    // First-seen order is the stable tie-break for equal session counts.
    let mut accumulators: Vec<ProjectAccumulator> = Vec::new();

    for record in records {
        let Some(project) = record.project.as_deref() else {
            continue;
        };

        let index = match accumulators.iter().position(|a| a.project == project) {
            Some(existing) => existing,
            None => {
                accumulators.push(ProjectAccumulator {
                    project: project.to_string(),
                    session_count: 0,
                    agents: BTreeMap::new(),
                    duration_seconds: 0.0,
                    tokens: 0,
                });
                accumulators.len() - 1
            }
        };
        let accumulator = &mut accumulators[index];

        accumulator.session_count += 1;
        *accumulator
            .agents
            .entry(record.agent.as_str().to_string())
            .or_insert(0) += 1;
        accumulator.duration_seconds += record.duration_seconds;
        accumulator.tokens += record.tokens.conversation_total();
    }

    accumulators.sort_by(|a, b| b.session_count.cmp(&a.session_count));

    accumulators
        .into_iter()
        .map(|a| {
            let divisor = a.session_count.max(1) as f64;
            ProjectBreakdown {
                project: a.project,
                session_count: a.session_count,
                agents: a.agents,
                total_duration_hours: round_to(a.duration_seconds / 3_600.0, 2),
                total_tokens: a.tokens,
                avg_session_duration_minutes: round_to(a.duration_seconds / 60.0 / divisor, 2),
            }
        })
        .collect()
}

fn agent_comparisons(records: &[SessionRecord]) -> Vec<AgentComparison> {
    let mut comparisons = Vec::new();

    for agent in all_agent_kinds() {
        let group = records
            .iter()
            .filter(|r| r.agent == agent)
            .collect::<Vec<_>>();
        if group.is_empty() {
            continue;
        }

        let divisor = group.len() as f64;
        let duration_seconds: f64 = group.iter().map(|r| r.duration_seconds).sum();
        let messages: u64 = group.iter().map(|r| r.message_count).sum();
        let tool_calls: u64 = group.iter().map(|r| r.tool_call_count).sum();
        let input_tokens: u64 = group.iter().map(|r| r.tokens.input).sum();
        let output_tokens: u64 = group.iter().map(|r| r.tokens.output).sum();

        let response_times = group
            .iter()
            .filter_map(|r| r.avg_response_time_seconds)
            .collect::<Vec<_>>();
        let avg_response_time_seconds = mean_of(&response_times).map(|mean| round_to(mean, 2));

        comparisons.push(AgentComparison {
            agent,
            session_count: group.len(),
            avg_session_duration_minutes: round_to(duration_seconds / 60.0 / divisor, 2),
            avg_messages_per_session: round_to(messages as f64 / divisor, 2),
            avg_tool_calls_per_session: round_to(tool_calls as f64 / divisor, 2),
            token_efficiency: TokenEfficiency {
                avg_input_tokens_per_session: round_to(input_tokens as f64 / divisor, 0),
                avg_output_tokens_per_session: round_to(output_tokens as f64 / divisor, 0),
                output_to_input_ratio: round_to(
                    output_tokens as f64 / input_tokens.max(1) as f64,
                    3,
                ),
            },
            avg_response_time_seconds,
        })
    }

    comparisons
}

fn human_performance(records: &[SessionRecord]) -> HumanPerformance {
    let completed_sessions = records.iter().filter(|r| r.has_end_time).count();
    let completion_rate = round_to(
        completed_sessions as f64 / records.len().max(1) as f64 * 100.0,
        1,
    );

    let prompt_lengths = records
        .iter()
        .filter_map(|r| r.avg_user_message_length)
        .collect::<Vec<_>>();
    let thinking_times = records
        .iter()
        .filter_map(|r| r.avg_thinking_time_seconds)
        .collect::<Vec<_>>();

    let mut sessions_by_hour: BTreeMap<u8, usize> = BTreeMap::new();
    let mut sessions_by_weekday: Vec<WeekdayCount> = Vec::new();
    for record in records {
        let Some(start) = record.start_unix_ms else {
            continue;
        };
        if let Some(hour) = hour_of_day(start) {
            *sessions_by_hour.entry(hour).or_insert(0) += 1;
        }
        if let Some(day) = weekday_name(start) {
            match sessions_by_weekday.iter_mut().find(|c| c.day == day) {
                Some(count) => count.sessions += 1,
                None => sessions_by_weekday.push(WeekdayCount {
                    day: day.to_string(),
                    sessions: 1,
                }),
            }
        }
    }

    // Top buckets by count; hour ties resolve ascending because the map
    // iterates in key order and the sort is stable. Day ties keep first-seen
    // order for the same reason.
    let mut hour_buckets = sessions_by_hour
        .iter()
        .map(|(&hour, &count)| (hour, count))
        .collect::<Vec<_>>();
    hour_buckets.sort_by(|a, b| b.1.cmp(&a.1));
    let peak_hours = hour_buckets
        .iter()
        .take(3)
        .map(|(hour, count)| format!("{hour:02}:00 ({count} sessions)"))
        .collect();

    let mut day_buckets = sessions_by_weekday.clone();
    day_buckets.sort_by(|a, b| b.sessions.cmp(&a.sessions));
    let peak_days = day_buckets
        .iter()
        .take(3)
        .map(|count| format!("{} ({} sessions)", count.day, count.sessions))
        .collect();

    HumanPerformance {
        completed_sessions,
        completion_rate,
        avg_user_message_length: mean_of(&prompt_lengths).map(|mean| round_to(mean, 0)),
        avg_thinking_time_seconds: mean_of(&thinking_times).map(|mean| round_to(mean, 2)),
        sessions_by_hour,
        sessions_by_weekday,
        peak_hours,
        peak_days,
    }
}

fn mean_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Envelope wrapped around the report when persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsArtifact {
    pub schema_version: String,
    pub generated_at_utc: String,
    pub report: AnalyticsReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsArtifactLayout {
    pub report_json: PathBuf,
    pub sessions_jsonl: PathBuf,
    pub session_schema_json: PathBuf,
}

#[must_use]
pub fn build_artifact_layout(out_dir: &Path) -> MetricsArtifactLayout {
    let metrics_dir = out_dir.join("metrics");
    MetricsArtifactLayout {
        report_json: metrics_dir.join("report.json"),
        sessions_jsonl: metrics_dir.join("sessions.jsonl"),
        session_schema_json: metrics_dir.join("session.v1.schema.json"),
    }
}

pub fn write_report_artifact(path: &Path, artifact: &MetricsArtifact) -> Result<()> {
    let encoded =
        serde_json::to_vec_pretty(artifact).context("failed to encode metrics report")?;
    write_artifact_bytes(path, &encoded)
}

pub fn write_session_records(path: &Path, records: &[SessionRecord]) -> Result<()> {
    let mut encoded = Vec::new();
    for record in records {
        let line = serde_json::to_string(record)
            .with_context(|| format!("failed to encode session record: {}", record.source_path))?;
        encoded.extend_from_slice(line.as_bytes());
        encoded.push(b'\n');
    }
    write_artifact_bytes(path, &encoded)
}

pub fn write_session_schema(path: &Path) -> Result<()> {
    let encoded = serde_json::to_vec_pretty(&crate::models::json_schema())
        .context("failed to encode session schema")?;
    write_artifact_bytes(path, &encoded)
}

fn write_artifact_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create metrics artifact directory: {}",
                parent.display()
            )
        })?;
    }
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write metrics artifact: {}", path.display()))
}
