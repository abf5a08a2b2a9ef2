use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::config::{RuntimePaths, resolve_source_roots};
use crate::discovery::{
    DEFAULT_FILES_PER_SOURCE, DiscoveryLimits, MAX_SOURCE_FILE_BYTES, discover_sources,
};
use crate::metrics::{
    MetricsArtifact, aggregate, build_artifact_layout, write_report_artifact,
    write_session_records, write_session_schema,
};
use crate::models::SCHEMA_VERSION;
use crate::normalize::normalize_discovered_sources;
use crate::utils::time::{format_unix_ms, unix_timestamp_seconds};

const REPORT_SCHEMA_VERSION: &str = "metrics_report.v1";

#[derive(Debug, Clone, Args)]
pub struct MetricsArgs {
    #[arg(long)]
    pub source_root: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_FILES_PER_SOURCE)]
    pub files_per_source: usize,
}

pub fn run(args: &MetricsArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let codex_home = std::env::var_os("CODEX_HOME").map(PathBuf::from);
    let roots = resolve_source_roots(
        &runtime_paths.home_dir,
        args.source_root.as_deref(),
        codex_home.as_deref(),
    );
    let limits = DiscoveryLimits {
        files_per_source: args.files_per_source,
        max_file_bytes: MAX_SOURCE_FILE_BYTES,
    };

    println!(
        "metrics: start files_per_source={} out_dir={}",
        limits.files_per_source,
        runtime_paths.out_dir.display()
    );

    let discovered = discover_sources(&roots, limits);
    let batch = normalize_discovered_sources(&discovered.sources);
    for warning in discovered.warnings.iter().chain(batch.warnings.iter()) {
        println!("metrics: warning {warning}");
    }

    if batch.records.is_empty() {
        println!("metrics: no parseable sessions found, writing empty report");
    }

    let report = aggregate(&batch.records);
    let artifact = MetricsArtifact {
        schema_version: REPORT_SCHEMA_VERSION.to_string(),
        generated_at_utc: format_unix_ms(unix_timestamp_seconds() * 1_000),
        report,
    };

    let layout = build_artifact_layout(&runtime_paths.out_dir);
    write_report_artifact(&layout.report_json, &artifact)?;
    write_session_records(&layout.sessions_jsonl, &batch.records)?;
    write_session_schema(&layout.session_schema_json)?;

    println!(
        "metrics: complete sessions={} skipped_files={} total_duration_hours={} warnings={}",
        artifact.report.global.total_sessions,
        batch.skipped_files,
        artifact.report.global.total_duration_hours,
        discovered.warnings.len() + batch.warnings.len()
    );
    println!(
        "metrics: artifacts report={} sessions={} schema={} ({SCHEMA_VERSION})",
        layout.report_json.display(),
        layout.sessions_jsonl.display(),
        layout.session_schema_json.display()
    );

    Ok(())
}
