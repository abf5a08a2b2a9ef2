use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::Value;

use crate::catalog::{
    CatalogArtifact, CatalogSourceSummary, FieldCatalog, build_artifact_layout,
    write_catalog_artifact,
};
use crate::config::{RuntimePaths, resolve_source_roots};
use crate::discovery::{
    DEFAULT_FILES_PER_SOURCE, DiscoveryLimits, MAX_SOURCE_FILE_BYTES, SessionSource,
    discover_sources,
};
use crate::models::AgentKind;
use crate::normalize::{parse_jsonl_events, read_lossy};
use crate::utils::time::{format_unix_ms, unix_timestamp_seconds};

const CATALOG_SCHEMA_VERSION: &str = "field_catalog.v1";

#[derive(Debug, Clone, Args)]
pub struct CatalogArgs {
    #[arg(long)]
    pub source_root: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_FILES_PER_SOURCE)]
    pub files_per_source: usize,
}

pub fn run(args: &CatalogArgs, runtime_paths: &RuntimePaths) -> Result<()> {
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
        "catalog: start files_per_source={} out_dir={}",
        limits.files_per_source,
        runtime_paths.out_dir.display()
    );

    let discovered = discover_sources(&roots, limits);
    let mut warnings = discovered.warnings.clone();

    let mut accumulators: BTreeMap<AgentKind, FieldCatalog> = BTreeMap::new();
    for source in &discovered.sources {
        if let Some(partial) = scan_source(source, &mut warnings) {
            accumulators
                .entry(source.agent)
                .or_insert_with(FieldCatalog::new)
                .merge(partial);
        }
    }

    for warning in &warnings {
        println!("catalog: warning {warning}");
    }

    let mut summary = BTreeMap::new();
    let mut catalogs = BTreeMap::new();
    for (agent, accumulator) in &accumulators {
        summary.insert(
            agent.as_str().to_string(),
            CatalogSourceSummary {
                sessions_scanned: accumulator.sessions_scanned(),
                unique_fields: accumulator.unique_fields(),
            },
        );
        catalogs.insert(agent.as_str().to_string(), accumulator.export());
    }

    let artifact = CatalogArtifact {
        schema_version: CATALOG_SCHEMA_VERSION.to_string(),
        generated_at_utc: format_unix_ms(unix_timestamp_seconds() * 1_000),
        summary,
        catalogs,
    };

    let layout = build_artifact_layout(&runtime_paths.out_dir);
    write_catalog_artifact(&layout.field_catalog_json, &artifact)?;

    for (agent, summary) in &artifact.summary {
        println!(
            "catalog: {agent} sessions_scanned={} unique_fields={}",
            summary.sessions_scanned, summary.unique_fields
        );
    }
    println!(
        "catalog: complete sources={} warnings={} artifact={}",
        discovered.sources.len(),
        warnings.len(),
        layout.field_catalog_json.display()
    );

    Ok(())
}

/// Scans one source file as one session unit. Codex and Claude logs are
/// line-delimited events; Gemini sessions are one whole document.
fn scan_source(source: &SessionSource, warnings: &mut Vec<String>) -> Option<FieldCatalog> {
    let text = match read_lossy(&source.path) {
        Ok(text) => text,
        Err(error) => {
            warnings.push(format!("{error:#}"));
            return None;
        }
    };

    let mut partial = FieldCatalog::new();
    match source.agent {
        AgentKind::Codex | AgentKind::Claude => {
            let mut line_warnings = Vec::new();
            let events = parse_jsonl_events(&text, &mut line_warnings);
            for warning in line_warnings {
                warnings.push(format!("{}: {warning}", source.path.display()));
            }
            if events.is_empty() {
                return None;
            }
            for event in &events {
                partial.scan(event);
            }
        }
        AgentKind::Gemini => match serde_json::from_str::<Value>(&text) {
            Ok(document) => partial.scan(&document),
            Err(error) => {
                warnings.push(format!(
                    "{}: invalid JSON document ({error})",
                    source.path.display()
                ));
                return None;
            }
        },
    }

    partial.mark_session_boundary();
    Some(partial)
}
