use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::config::{RuntimePaths, resolve_source_roots};
use crate::discovery::{
    DEFAULT_FILES_PER_SOURCE, DiscoveryLimits, MAX_SOURCE_FILE_BYTES, discover_sources,
};
use crate::models::SessionRecord;
use crate::normalize::normalize_discovered_sources;
use crate::utils::content::truncate_chars;
use crate::utils::time::format_unix_ms;

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub source_root: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_FILES_PER_SOURCE)]
    pub files_per_source: usize,
}

pub fn run(args: &ListArgs, runtime_paths: &RuntimePaths) -> Result<()> {
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

    let discovered = discover_sources(&roots, limits);
    let batch = normalize_discovered_sources(&discovered.sources);
    for warning in discovered.warnings.iter().chain(batch.warnings.iter()) {
        println!("list: warning {warning}");
    }

    let mut records = batch.records;
    records.sort_by(|a, b| last_activity(b).cmp(&last_activity(a)));

    println!(
        "{:<8} {:<24} {:<20} {:>6}  {:<20} TITLE",
        "AGENT", "MODIFIED", "PROJECT", "MSGS", "MODEL"
    );
    for record in &records {
        println!(
            "{:<8} {:<24} {:<20} {:>6}  {:<20} {}",
            record.agent.as_str(),
            last_activity(record).map_or_else(|| "-".to_string(), format_unix_ms),
            truncate_chars(record.project.as_deref().unwrap_or("-"), 18),
            record.message_count,
            truncate_chars(record.model.as_deref().unwrap_or("-"), 18),
            truncate_chars(&record.title, 60)
        );
    }
    println!("list: {} sessions", records.len());

    Ok(())
}

fn last_activity(record: &SessionRecord) -> Option<u64> {
    record.end_unix_ms.or(record.start_unix_ms)
}
