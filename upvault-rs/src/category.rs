//! Category label resolution into destination folders.
//!
//! A label such as `Work / Projects / Active` becomes the folder path
//! `Work/Projects/Active` below the base directory. Case and characters are
//! kept as written. A note with several labels fans out into one destination
//! per label; a note without labels lands at the base root.

use crate::types::ResolvedDestination;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Separator between hierarchy levels in a label.
pub const HIERARCHY_DELIMITER: char = '/';

/// An ordered sequence of folder segments parsed from one label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryPath(Vec<String>);

impl CategoryPath {
    /// Parse a label. Returns `None` when nothing usable remains.
    ///
    /// Segments are trimmed; empty, `.` and `..` segments are dropped since
    /// they cannot name a folder below the base directory.
    pub fn parse(label: &str) -> Option<Self> {
        let segments: Vec<String> = label
            .split(HIERARCHY_DELIMITER)
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .map(str::to_string)
            .collect();

        if segments.is_empty() {
            None
        } else {
            Some(Self(segments))
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

}

impl std::fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Parse every label, dropping unusable ones and collapsing exact duplicates.
///
/// Order of first appearance is kept.
pub fn parse_categories<S: AsRef<str>>(labels: &[S]) -> Vec<CategoryPath> {
    let mut paths: Vec<CategoryPath> = Vec::new();
    for label in labels {
        match CategoryPath::parse(label.as_ref()) {
            Some(path) if paths.contains(&path) => {
                debug!(category = %path, "Collapsing repeated category label");
            }
            Some(path) => paths.push(path),
            None => debug!(label = label.as_ref(), "Ignoring empty category label"),
        }
    }
    paths
}

/// Resolve destinations for a note.
///
/// Exactly one destination per category path, or a single base-root
/// destination when there are none.
pub fn resolve_destinations(
    categories: &[CategoryPath],
    base_dir: &Path,
    file_name: &str,
) -> Vec<ResolvedDestination> {
    if categories.is_empty() {
        return vec![destination(Vec::new(), base_dir, file_name)];
    }

    categories
        .iter()
        .map(|path| destination(path.segments().to_vec(), base_dir, file_name))
        .collect()
}

fn destination(segments: Vec<String>, base_dir: &Path, file_name: &str) -> ResolvedDestination {
    let folder = segments
        .iter()
        .fold(base_dir.to_path_buf(), |acc, seg| acc.join(seg));
    let file = folder.join(file_name);
    ResolvedDestination {
        segments,
        folder,
        file,
    }
}
