use std::path::{Component, Path, PathBuf};

use anyhow::{Result, bail};

use crate::models::{AgentKind, all_agent_kinds};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub home_dir: PathBuf,
    pub cwd: PathBuf,
    pub out_dir: PathBuf,
}

/// One agent family's on-disk session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSourceRoot {
    pub agent: AgentKind,
    pub root: PathBuf,
}

pub fn resolve_runtime_paths(
    home_dir: &Path,
    cwd: &Path,
    out_dir_override: Option<&Path>,
) -> Result<RuntimePaths> {
    if !home_dir.is_absolute() {
        bail!("home_dir must be absolute: {}", home_dir.display());
    }
    if !cwd.is_absolute() {
        bail!("cwd must be absolute: {}", cwd.display());
    }

    let home_dir = normalize_lexical(home_dir);
    let cwd = normalize_lexical(cwd);
    let out_dir = match out_dir_override {
        Some(path) => resolve_user_path(path, &home_dir, &cwd)?,
        None => home_dir.join(".sessionlens").join("output"),
    };

    Ok(RuntimePaths {
        home_dir,
        cwd,
        out_dir: normalize_lexical(&out_dir),
    })
}

/// Computes the session-store root for every agent family.
///
/// `source_root_override` re-roots all families under one directory (each
/// family keeps its default relative layout), which is how hermetic runs and
/// tests point discovery at a fixture tree. `codex_home` mirrors the
/// `CODEX_HOME` environment override honored by the Codex CLI itself and
/// applies only when no explicit override is given.
#[must_use]
pub fn resolve_source_roots(
    home_dir: &Path,
    source_root_override: Option<&Path>,
    codex_home: Option<&Path>,
) -> Vec<AgentSourceRoot> {
    let base = source_root_override.unwrap_or(home_dir);

    all_agent_kinds()
        .into_iter()
        .map(|agent| {
            let root = match agent {
                AgentKind::Codex => match (source_root_override, codex_home) {
                    (None, Some(codex_home)) => codex_home.join("sessions"),
                    _ => base.join(".codex").join("sessions"),
                },
                AgentKind::Claude => base.join(".claude").join("projects"),
                AgentKind::Gemini => base.join(".gemini").join("tmp"),
            };
            AgentSourceRoot {
                agent,
                root: normalize_lexical(&root),
            }
        })
        .collect()
}

fn resolve_user_path(path: &Path, home_dir: &Path, cwd: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path, home_dir)?;
    let resolved = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    Ok(normalize_lexical(&resolved))
}

fn expand_tilde(path: &Path, home_dir: &Path) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let mut expanded = home_dir.to_path_buf();
            for component in components {
                expanded.push(component.as_os_str());
            }
            Ok(expanded)
        }
        Some(Component::Normal(first))
            if first
                .to_str()
                .is_some_and(|segment| segment.starts_with('~')) =>
        {
            bail!(
                "unsupported home expansion syntax (only `~` and `~/...` are supported): {}",
                path.display()
            )
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            _ => normalized.push(component.as_os_str()),
        }
    }

    normalized
}
