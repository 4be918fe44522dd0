//! Source note loading.

use crate::category::{CategoryPath, parse_categories};
use crate::error::Result;
use crate::parser::{parse_frontmatter_yaml, split_frontmatter};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A note parsed from the export. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceNote {
    /// Path relative to the source directory. Stable identifier and sort key.
    pub id: PathBuf,

    /// File name, reused unchanged at every destination.
    pub file_name: String,

    /// Title from frontmatter, falling back to the file stem.
    pub title: String,

    /// Category labels exactly as found in frontmatter.
    pub category_labels: Vec<String>,

    /// Parsed category paths (deduplicated, empty labels dropped).
    pub categories: Vec<CategoryPath>,

    /// Original frontmatter, key order preserved.
    pub frontmatter: Mapping,

    pub body: String,
}

impl SourceNote {
    /// Read and parse a note from disk.
    pub fn load(source_dir: &Path, relative_path: &Path, category_key: &str) -> Result<Self> {
        let content = std::fs::read_to_string(source_dir.join(relative_path))?;
        Self::parse(relative_path, &content, category_key)
    }

    /// Parse a note from its file content.
    pub fn parse(relative_path: &Path, content: &str, category_key: &str) -> Result<Self> {
        let split = split_frontmatter(content);
        let frontmatter = match split.yaml {
            Some(yaml) => parse_frontmatter_yaml(yaml, relative_path)?,
            None => Mapping::new(),
        };

        let stem = note_stem(relative_path);
        let title = match frontmatter.get("title") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => stem.clone(),
        };

        let category_labels = category_labels(&frontmatter, category_key, relative_path);
        let categories = parse_categories(&category_labels);

        Ok(Self {
            id: relative_path.to_path_buf(),
            file_name: relative_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("{}.md", stem)),
            title,
            category_labels,
            categories,
            frontmatter,
            body: split.body.to_string(),
        })
    }

    /// File name without the `.md` extension.
    pub fn stem(&self) -> String {
        note_stem(&self.id)
    }
}

/// File stem of a note path.
pub fn note_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read category labels under `key`: a string or a sequence of strings.
fn category_labels(frontmatter: &Mapping, key: &str, path: &Path) -> Vec<String> {
    match frontmatter.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                other => {
                    warn!(note = %path.display(), value = ?other, "Ignoring non-string category");
                    None
                }
            })
            .collect(),
        Some(other) => {
            warn!(note = %path.display(), key, value = ?other, "Ignoring unsupported category value");
            Vec::new()
        }
    }
}
