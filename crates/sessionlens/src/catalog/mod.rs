use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::utils::content::truncate_chars;

pub const MAX_EXAMPLES_PER_FIELD: usize = 3;
pub const MAX_EXAMPLE_CHARS: usize = 200;

/// Lists are sampled, not exhausted: only the first elements are visited so
/// pathological fan-out cannot blow up the catalog.
pub const MAX_LIST_ELEMENTS_SCANNED: usize = 5;

/// The closed set of JSON value kinds the cataloger distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JsonKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    #[must_use]
    pub const fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// Everything observed about one field path across a scan run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRecord {
    pub kinds: BTreeSet<JsonKind>,
    pub count: usize,
    pub examples: Vec<String>,
    pub always_present: bool,
}

impl FieldRecord {
    fn new() -> Self {
        Self {
            kinds: BTreeSet::new(),
            count: 0,
            examples: Vec::new(),
            always_present: true,
        }
    }

    fn observe(&mut self, value: &Value) {
        self.count += 1;
        self.kinds.insert(JsonKind::of(value));

        if self.examples.len() < MAX_EXAMPLES_PER_FIELD {
            let example = render_example(value);
            if !self.examples.contains(&example) {
                self.examples.push(example);
            }
        }
    }
}

/// Accumulates field records across session units.
///
/// Lifecycle: `scan` every event of one session unit, then
/// `mark_session_boundary` once; independent per-file catalogs join an
/// accumulator through `merge`, and `export` finalizes the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCatalog {
    fields: BTreeMap<String, FieldRecord>,
    sessions_scanned: usize,
}

impl FieldCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recursively visits a JSON-like tree, recording a field record for
    /// every object key under its dotted path. List indices collapse to a
    /// single `[]` marker so siblings share one path.
    pub fn scan(&mut self, root: &Value) {
        self.scan_value("", root);
    }

    fn scan_value(&mut self, prefix: &str, value: &Value) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    self.fields
                        .entry(path.clone())
                        .or_insert_with(FieldRecord::new)
                        .observe(child);

                    if matches!(child, Value::Object(_) | Value::Array(_)) {
                        self.scan_value(&path, child);
                    }
                }
            }
            Value::Array(items) => {
                let item_path = format!("{prefix}[]");
                for item in items.iter().take(MAX_LIST_ELEMENTS_SCANNED) {
                    self.scan_value(&item_path, item);
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
        }
    }

    /// Closes one session unit. A path whose cumulative occurrence count does
    /// not match the boundary count loses `always_present` for good; one
    /// missed pass is never forgiven, which is what surfaces fields that are
    /// sometimes, not always, emitted.
    pub fn mark_session_boundary(&mut self) {
        self.sessions_scanned += 1;
        for record in self.fields.values_mut() {
            if record.count != self.sessions_scanned {
                record.always_present = false;
            }
        }
    }

    /// Joins an independently scanned partial catalog into this accumulator.
    /// Append-only and deterministic, so per-file partials can be built in
    /// isolation and merged at a barrier.
    pub fn merge(&mut self, partial: FieldCatalog) {
        self.sessions_scanned += partial.sessions_scanned;

        for (path, incoming) in partial.fields {
            let record = self
                .fields
                .entry(path)
                .or_insert_with(FieldRecord::new);
            record.count += incoming.count;
            record.kinds.extend(incoming.kinds);
            record.always_present &= incoming.always_present;
            for example in incoming.examples {
                if record.examples.len() >= MAX_EXAMPLES_PER_FIELD {
                    break;
                }
                if !record.examples.contains(&example) {
                    record.examples.push(example);
                }
            }
        }

        for record in self.fields.values_mut() {
            if record.count != self.sessions_scanned {
                record.always_present = false;
            }
        }
    }

    #[must_use]
    pub fn sessions_scanned(&self) -> usize {
        self.sessions_scanned
    }

    #[must_use]
    pub fn unique_fields(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn field(&self, path: &str) -> Option<&FieldRecord> {
        self.fields.get(path)
    }

    /// Deterministic path-sorted export of the catalog.
    #[must_use]
    pub fn export(&self) -> CatalogExport {
        let fields = self
            .fields
            .iter()
            .map(|(path, record)| {
                (
                    path.clone(),
                    CatalogFieldExport {
                        types: record.kinds.iter().map(|kind| kind.as_str().to_string()).collect(),
                        frequency: format!("{}/{} sessions", record.count, self.sessions_scanned),
                        always_present: record.always_present,
                        examples: record.examples.clone(),
                    },
                )
            })
            .collect();

        CatalogExport {
            sessions_scanned: self.sessions_scanned,
            unique_fields: self.fields.len(),
            fields,
        }
    }
}

fn render_example(value: &Value) -> String {
    let rendered = match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    truncate_chars(&rendered, MAX_EXAMPLE_CHARS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogFieldExport {
    pub types: Vec<String>,
    pub frequency: String,
    pub always_present: bool,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogExport {
    pub sessions_scanned: usize,
    pub unique_fields: usize,
    pub fields: BTreeMap<String, CatalogFieldExport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSourceSummary {
    pub sessions_scanned: usize,
    pub unique_fields: usize,
}

/// The corpus-level catalog document: per-family summary counts plus one
/// path-sorted export per source family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogArtifact {
    pub schema_version: String,
    pub generated_at_utc: String,
    pub summary: BTreeMap<String, CatalogSourceSummary>,
    pub catalogs: BTreeMap<String, CatalogExport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogArtifactLayout {
    pub field_catalog_json: PathBuf,
}

#[must_use]
pub fn build_artifact_layout(out_dir: &Path) -> CatalogArtifactLayout {
    CatalogArtifactLayout {
        field_catalog_json: out_dir.join("catalog").join("field_catalog.json"),
    }
}

pub fn write_catalog_artifact(path: &Path, artifact: &CatalogArtifact) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create catalog artifact directory: {}",
                parent.display()
            )
        })?;
    }

    let encoded =
        serde_json::to_vec_pretty(artifact).context("failed to encode field catalog artifact")?;
    std::fs::write(path, encoded)
        .with_context(|| format!("failed to write field catalog artifact: {}", path.display()))
}
