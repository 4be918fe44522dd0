//! Tag derivation from category paths.

use crate::category::CategoryPath;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Frontmatter key holding tags.
pub const TAGS_KEY: &str = "tags";

/// Turn one category segment into a tag: lowercase, whitespace runs become `-`.
pub fn segment_to_tag(segment: &str, prefix: &str) -> Option<String> {
    let slug = WHITESPACE_RUN
        .replace_all(segment.trim(), "-")
        .to_lowercase();
    if slug.is_empty() {
        None
    } else {
        Some(format!("{}{}", prefix, slug))
    }
}

/// Derive tags for every segment of every category, deduplicated in order.
pub fn derive_tags(categories: &[CategoryPath], prefix: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in categories
        .iter()
        .flat_map(|path| path.segments())
        .filter_map(|segment| segment_to_tag(segment, prefix))
    {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Merge tags into the frontmatter `tags` field, returning the tags added.
///
/// An existing scalar is promoted to a one-element sequence. Tags already
/// present (exact match) are skipped, so merging twice adds nothing.
pub fn merge_tags(frontmatter: &mut Mapping, tags: &[String]) -> Vec<String> {
    if tags.is_empty() {
        return Vec::new();
    }

    // Edit in place so the key keeps its position
    let field = frontmatter
        .entry(Value::String(TAGS_KEY.to_string()))
        .or_insert(Value::Null);

    let mut existing = match std::mem::replace(field, Value::Null) {
        Value::Null => Vec::new(),
        Value::Sequence(seq) => seq,
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        scalar => vec![scalar],
    };

    let mut added = Vec::new();
    for tag in tags {
        let value = Value::String(tag.clone());
        if !existing.contains(&value) {
            existing.push(value);
            added.push(tag.clone());
        }
    }

    *field = Value::Sequence(existing);
    added
}
