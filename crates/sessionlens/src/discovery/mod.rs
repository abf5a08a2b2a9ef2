use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::config::AgentSourceRoot;
use crate::models::AgentKind;

/// Sample cap per source family; keeps a huge backlog of old sessions from
/// dominating a scan.
pub const DEFAULT_FILES_PER_SOURCE: usize = 20;

/// Files above this size are excluded rather than read.
pub const MAX_SOURCE_FILE_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryLimits {
    pub files_per_source: usize,
    pub max_file_bytes: u64,
}

impl Default for DiscoveryLimits {
    fn default() -> Self {
        Self {
            files_per_source: DEFAULT_FILES_PER_SOURCE,
            max_file_bytes: MAX_SOURCE_FILE_BYTES,
        }
    }
}

/// One candidate session log file, tagged with the family that owns its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSource {
    pub agent: AgentKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoveryOutcome {
    pub sources: Vec<SessionSource>,
    pub skipped_oversize: usize,
    pub warnings: Vec<String>,
}

fn codex_filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^rollout-.*\.jsonl$").expect("codex filename pattern must compile")
    })
}

fn claude_filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\.(jsonl|ndjson)$").expect("claude filename pattern must compile")
    })
}

fn gemini_filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^session-.*\.json$").expect("gemini filename pattern must compile")
    })
}

fn filename_matches(agent: AgentKind, file_name: &str) -> bool {
    match agent {
        AgentKind::Codex => codex_filename_pattern().is_match(file_name),
        AgentKind::Claude => claude_filename_pattern().is_match(file_name),
        AgentKind::Gemini => gemini_filename_pattern().is_match(file_name),
    }
}

/// Walks every configured source root and returns the capped, size-filtered
/// candidate list. Missing or unreadable roots produce warnings, never
/// errors; within one family the walk order is deterministic (sorted).
#[must_use]
pub fn discover_sources(roots: &[AgentSourceRoot], limits: DiscoveryLimits) -> DiscoveryOutcome {
    let mut outcome = DiscoveryOutcome::default();

    for root in roots {
        if !root.root.is_dir() {
            outcome.warnings.push(format!(
                "{}: source root not found for {}, skipped",
                root.root.display(),
                root.agent.as_str()
            ));
            continue;
        }

        let mut files = Vec::new();
        collect_matching_files(root.agent, &root.root, &mut files, &mut outcome.warnings);
        files.sort();

        for path in files.into_iter().take(limits.files_per_source) {
            match std::fs::metadata(&path) {
                Ok(metadata) if metadata.len() > limits.max_file_bytes => {
                    outcome.skipped_oversize += 1;
                    outcome.warnings.push(format!(
                        "{}: exceeds size ceiling ({} bytes), skipped",
                        path.display(),
                        metadata.len()
                    ));
                }
                Ok(_) => outcome.sources.push(SessionSource {
                    agent: root.agent,
                    path,
                }),
                Err(error) => {
                    outcome
                        .warnings
                        .push(format!("{}: unreadable metadata ({error})", path.display()));
                }
            }
        }
    }

    outcome
}

fn collect_matching_files(
    agent: AgentKind,
    dir: &Path,
    files: &mut Vec<PathBuf>,
    warnings: &mut Vec<String>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            warnings.push(format!("{}: unreadable directory ({error})", dir.display()));
            return;
        }
    };

    for entry in entries {
        let Ok(entry) = entry else {
            continue;
        };
        let path = entry.path();
        if path.is_dir() {
            collect_matching_files(agent, &path, files, warnings);
        } else if let Some(file_name) = path.file_name().and_then(|name| name.to_str())
            && filename_matches(agent, file_name)
        {
            files.push(path);
        }
    }
}
