use sessionlens::metrics::aggregate;
use sessionlens::models::{
    AgentKind, SchemaVersion, SessionRecord, TokenTotals,
};

// 2026-02-05T00:00:00Z, a Thursday.
const THURSDAY_MIDNIGHT_MS: u64 = 1_770_249_600_000;
const HOUR_MS: u64 = 3_600_000;
const DAY_MS: u64 = 86_400_000;

fn record(agent: AgentKind, duration_seconds: f64) -> SessionRecord {
    SessionRecord {
        schema_version: SchemaVersion::SessionV1,
        agent,
        source_path: "test.jsonl".to_string(),
        session_id: None,
        model: None,
        project: None,
        title: "No prompt".to_string(),
        start_unix_ms: None,
        end_unix_ms: None,
        duration_seconds,
        has_end_time: false,
        tokens: TokenTotals::default(),
        message_count: 0,
        tool_call_count: 0,
        avg_response_time_seconds: None,
        avg_user_message_length: None,
        avg_thinking_time_seconds: None,
    }
}

#[test]
fn computes_global_and_per_agent_views_for_a_small_corpus() {
    let mut first = record(AgentKind::Codex, 60.0);
    first.tokens = TokenTotals {
        input: 10,
        output: 5,
        cached: 0,
        reasoning: 0,
    };
    let mut second = record(AgentKind::Codex, 120.0);
    second.tokens = TokenTotals {
        input: 20,
        output: 15,
        cached: 0,
        reasoning: 0,
    };

    let report = aggregate(&[first, second]);

    assert_eq!(report.global.total_sessions, 2);
    assert_eq!(report.global.total_duration_hours, 0.05);
    assert_eq!(report.global.avg_session_duration_minutes, 1.5);
    assert_eq!(report.global.avg_messages_per_session, 0.0);
    assert_eq!(report.global.tokens.input, 30);
    assert!(report.global.time_range.is_none());

    assert_eq!(report.agents.len(), 1);
    let codex = &report.agents[0];
    assert_eq!(codex.agent, AgentKind::Codex);
    assert_eq!(codex.session_count, 2);
    assert_eq!(codex.avg_session_duration_minutes, 1.5);
    assert_eq!(codex.token_efficiency.avg_input_tokens_per_session, 15.0);
    assert_eq!(codex.token_efficiency.avg_output_tokens_per_session, 10.0);
    assert_eq!(codex.token_efficiency.output_to_input_ratio, 0.667);
    assert_eq!(codex.avg_response_time_seconds, None);
}

#[test]
fn empty_corpus_yields_a_zero_report_without_division_failures() {
    let report = aggregate(&[]);

    assert_eq!(report.global.total_sessions, 0);
    assert_eq!(report.global.total_duration_hours, 0.0);
    assert_eq!(report.global.avg_session_duration_minutes, 0.0);
    assert!(report.global.time_range.is_none());
    assert!(report.projects.is_empty());
    assert!(report.agents.is_empty());
    assert_eq!(report.human.completion_rate, 0.0);
    assert!(report.human.peak_hours.is_empty());
}

#[test]
fn records_without_a_project_are_excluded_from_the_project_view_only() {
    let mut with_project = record(AgentKind::Claude, 300.0);
    with_project.project = Some("repoA".to_string());
    with_project.tokens = TokenTotals {
        input: 100,
        output: 50,
        cached: 0,
        reasoning: 0,
    };
    let without_project = record(AgentKind::Claude, 60.0);

    let report = aggregate(&[with_project, without_project]);

    assert_eq!(report.projects.len(), 1);
    let project = &report.projects[0];
    assert_eq!(project.project, "repoA");
    assert_eq!(project.session_count, 1);
    assert_eq!(project.total_tokens, 150);
    assert_eq!(project.agents.get("claude"), Some(&1));
    assert_eq!(project.avg_session_duration_minutes, 5.0);

    // Both records still count globally.
    assert_eq!(report.global.total_sessions, 2);
}

#[test]
fn projects_order_by_descending_count_with_first_seen_tie_break() {
    let mut a1 = record(AgentKind::Codex, 60.0);
    a1.project = Some("alpha".to_string());
    let mut b1 = record(AgentKind::Codex, 60.0);
    b1.project = Some("beta".to_string());
    let mut b2 = record(AgentKind::Codex, 60.0);
    b2.project = Some("beta".to_string());
    let mut c1 = record(AgentKind::Codex, 60.0);
    c1.project = Some("gamma".to_string());

    let report = aggregate(&[a1, b1, b2, c1]);
    let names = report
        .projects
        .iter()
        .map(|p| p.project.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["beta", "alpha", "gamma"]);
}

#[test]
fn response_time_averages_only_over_records_that_expose_one() {
    let mut fast = record(AgentKind::Gemini, 60.0);
    fast.avg_response_time_seconds = Some(4.0);
    let mut slow = record(AgentKind::Gemini, 60.0);
    slow.avg_response_time_seconds = Some(10.0);
    let silent = record(AgentKind::Gemini, 60.0);

    let report = aggregate(&[fast, slow, silent]);
    assert_eq!(report.agents[0].avg_response_time_seconds, Some(7.0));
}

#[test]
fn peak_hours_break_ties_by_ascending_hour() {
    let at_hour = |hour: u64| {
        let mut r = record(AgentKind::Codex, 60.0);
        r.start_unix_ms = Some(THURSDAY_MIDNIGHT_MS + hour * HOUR_MS);
        r.has_end_time = true;
        r.end_unix_ms = r.start_unix_ms.map(|start| start + 60_000);
        r
    };

    let report = aggregate(&[at_hour(9), at_hour(9), at_hour(5), at_hour(5), at_hour(7)]);

    assert_eq!(
        report.human.peak_hours,
        vec![
            "05:00 (2 sessions)",
            "09:00 (2 sessions)",
            "07:00 (1 sessions)",
        ]
    );
    assert_eq!(report.human.completion_rate, 100.0);
    assert_eq!(report.human.sessions_by_hour.get(&9), Some(&2));
}

#[test]
fn peak_days_break_ties_by_first_seen_order() {
    let on_day = |offset_days: u64| {
        let mut r = record(AgentKind::Codex, 60.0);
        r.start_unix_ms = Some(THURSDAY_MIDNIGHT_MS + offset_days * DAY_MS);
        r
    };

    // Thursday and Friday each appear once; Thursday was seen first.
    let report = aggregate(&[on_day(0), on_day(1)]);
    assert_eq!(
        report.human.peak_days,
        vec!["Thursday (1 sessions)", "Friday (1 sessions)"]
    );

    let range = report.global.time_range.expect("range");
    assert_eq!(range.span_days, 1);
    assert_eq!(range.first_utc, "2026-02-05T00:00:00.000Z");
    assert_eq!(range.last_utc, "2026-02-06T00:00:00.000Z");
}
