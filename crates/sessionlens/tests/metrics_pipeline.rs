use std::path::PathBuf;

use sessionlens::config::resolve_source_roots;
use sessionlens::discovery::{DiscoveryLimits, discover_sources};
use sessionlens::metrics::{
    aggregate, build_artifact_layout, write_session_records,
};
use sessionlens::models::AgentKind;
use sessionlens::normalize::normalize_discovered_sources;

fn fixture_home() -> PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/home")
}

#[test]
fn discovers_normalizes_and_aggregates_the_fixture_corpus() {
    let roots = resolve_source_roots(&fixture_home(), None, None);
    let discovered = discover_sources(&roots, DiscoveryLimits::default());
    let batch = normalize_discovered_sources(&discovered.sources);

    assert_eq!(batch.records.len(), 3);
    assert_eq!(batch.skipped_files, 0);

    let report = aggregate(&batch.records);

    assert_eq!(report.global.total_sessions, 3);
    assert_eq!(report.global.tokens.input, 3_765);
    assert_eq!(report.global.tokens.output, 1_130);
    assert_eq!(report.human.completion_rate, 100.0);

    let range = report.global.time_range.expect("range");
    assert_eq!(range.first_utc, "2026-02-05T07:00:00.000Z");
    assert_eq!(range.last_utc, "2026-02-05T10:00:00.000Z");
    assert_eq!(range.span_days, 0);

    // The Gemini fixture exposes no working directory, so only the Codex and
    // Claude projects appear in the per-project view.
    let projects = report
        .projects
        .iter()
        .map(|p| p.project.as_str())
        .collect::<Vec<_>>();
    assert_eq!(projects, vec!["repoA", "repoB"]);

    let agents = report.agents.iter().map(|a| a.agent).collect::<Vec<_>>();
    assert_eq!(
        agents,
        vec![AgentKind::Codex, AgentKind::Claude, AgentKind::Gemini]
    );
}

#[test]
fn session_records_round_trip_through_the_jsonl_artifact() {
    let roots = resolve_source_roots(&fixture_home(), None, None);
    let discovered = discover_sources(&roots, DiscoveryLimits::default());
    let batch = normalize_discovered_sources(&discovered.sources);

    let out_dir = std::env::temp_dir().join(format!("sessionlens-pipeline-{}", std::process::id()));
    let layout = build_artifact_layout(&out_dir);
    write_session_records(&layout.sessions_jsonl, &batch.records).expect("artifact written");

    let encoded = std::fs::read_to_string(&layout.sessions_jsonl).expect("artifact readable");
    let decoded = encoded
        .lines()
        .map(|line| serde_json::from_str(line).expect("line decodes"))
        .collect::<Vec<sessionlens::models::SessionRecord>>();
    assert_eq!(decoded, batch.records);
    assert!(decoded.iter().all(|record| record.has_end_time));

    std::fs::remove_dir_all(&out_dir).expect("cleanup");
}
