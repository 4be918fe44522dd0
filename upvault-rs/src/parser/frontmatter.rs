//! YAML frontmatter splitting, parsing, and rendering.

use crate::error::{MigrateError, Result};
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Result of splitting a file into frontmatter and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontmatterSplit<'a> {
    /// The raw YAML string (without delimiters).
    pub yaml: Option<&'a str>,
    /// Everything after the closing delimiter line.
    pub body: &'a str,
}

/// Split content into frontmatter and body.
///
/// Frontmatter must open with `---` on the very first line and close with a
/// `---` line. Anything else is treated as body-only content.
pub fn split_frontmatter(content: &str) -> FrontmatterSplit<'_> {
    let no_frontmatter = FrontmatterSplit {
        yaml: None,
        body: content,
    };

    let Some(after_open) = content.strip_prefix("---") else {
        return no_frontmatter;
    };

    let yaml_start = if after_open.starts_with('\n') {
        4
    } else if after_open.starts_with("\r\n") {
        5
    } else {
        return no_frontmatter;
    };

    let remaining = &content[yaml_start..];

    // Empty frontmatter block: the closing delimiter follows immediately
    if remaining.starts_with("---") {
        let rest = &remaining[3..];
        if rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n") {
            return FrontmatterSplit {
                yaml: Some(""),
                body: strip_line_break(rest),
            };
        }
    }

    let closing = remaining
        .find("\n---\n")
        .or_else(|| remaining.find("\n---\r\n"))
        .or_else(|| remaining.ends_with("\n---").then(|| remaining.len() - 4));

    match closing {
        Some(pos) => {
            let yaml_end = yaml_start + pos;
            let after_close = &content[yaml_end + 4..];
            FrontmatterSplit {
                yaml: Some(content[yaml_start..yaml_end].trim_end_matches('\r')),
                body: strip_line_break(after_close),
            }
        }
        None => no_frontmatter,
    }
}

fn strip_line_break(text: &str) -> &str {
    text.strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .unwrap_or(text)
}

/// Parse a raw YAML block into an ordered mapping.
///
/// An empty block yields an empty mapping; a block that is valid YAML but not
/// a mapping is rejected.
pub fn parse_frontmatter_yaml(yaml: &str, path: &Path) -> Result<Mapping> {
    if yaml.trim().is_empty() {
        return Ok(Mapping::new());
    }

    let value: Value =
        serde_yaml::from_str(yaml).map_err(|e| MigrateError::InvalidFrontmatter {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        other => Err(MigrateError::InvalidFrontmatter {
            path: path.to_path_buf(),
            message: format!("expected a mapping, found {}", value_kind(&other)),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Serialize a mapping back to a delimited frontmatter block.
pub fn serialize_frontmatter(map: &Mapping) -> Result<String> {
    let yaml = serde_yaml::to_string(map)?;
    Ok(format!("---\n{}---\n", yaml))
}

/// Render a full note file from optional frontmatter and a body.
///
/// An absent or empty mapping renders the body alone.
pub fn render_note(frontmatter: Option<&Mapping>, body: &str) -> Result<String> {
    match frontmatter {
        Some(map) if !map.is_empty() => Ok(format!("{}{}", serialize_frontmatter(map)?, body)),
        _ => Ok(body.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_no_frontmatter() {
        let split = split_frontmatter("Just some content");
        assert!(split.yaml.is_none());
        assert_eq!(split.body, "Just some content");
    }

    #[test]
    fn test_split_with_frontmatter() {
        let content = "---\ntitle: Test\ncategories: [Work]\n---\n\nContent here";
        let split = split_frontmatter(content);
        assert_eq!(split.yaml, Some("title: Test\ncategories: [Work]"));
        assert_eq!(split.body, "\nContent here");
    }

    #[test]
    fn test_split_frontmatter_at_eof() {
        let split = split_frontmatter("---\ntitle: Test\n---");
        assert_eq!(split.yaml, Some("title: Test"));
        assert_eq!(split.body, "");
    }

    #[test]
    fn test_split_empty_block() {
        let split = split_frontmatter("---\n---\nBody");
        assert_eq!(split.yaml, Some(""));
        assert_eq!(split.body, "Body");
    }

    #[test]
    fn test_split_crlf() {
        let split = split_frontmatter("---\r\ntitle: Test\r\n---\r\nBody");
        assert_eq!(split.yaml, Some("title: Test"));
        assert_eq!(split.body, "Body");
    }

    #[test]
    fn test_no_closing_delimiter() {
        let split = split_frontmatter("---\ntitle: Test\n\nContent without closing");
        assert!(split.yaml.is_none());
    }

    #[test]
    fn test_triple_dash_in_body() {
        let content = "---\ntitle: Test\n---\n\n---\n\nThis has triple dashes in content";
        let split = split_frontmatter(content);
        assert_eq!(split.yaml, Some("title: Test"));
        assert!(split.body.contains("---"));
    }

    #[test]
    fn test_parse_mapping_keeps_order() {
        let map = parse_frontmatter_yaml("zeta: 1\nalpha: 2\nmid: 3", Path::new("n.md")).unwrap();
        let keys: Vec<&str> = map.keys().filter_map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = parse_frontmatter_yaml("invalid: yaml: syntax:", Path::new("bad.md"));
        assert!(matches!(result, Err(MigrateError::InvalidFrontmatter { .. })));
    }

    #[test]
    fn test_parse_non_mapping_rejected() {
        let result = parse_frontmatter_yaml("- a\n- b", Path::new("list.md"));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("expected a mapping"));
    }

    #[test]
    fn test_render_round_trip() {
        let map = parse_frontmatter_yaml("title: Test\ncustom_key: [1, 2]", Path::new("n.md")).unwrap();
        let rendered = render_note(Some(&map), "Body\n").unwrap();
        assert!(rendered.starts_with("---\ntitle: Test\n"));
        assert!(rendered.ends_with("---\nBody\n"));

        let split = split_frontmatter(&rendered);
        let reparsed = parse_frontmatter_yaml(split.yaml.unwrap(), Path::new("n.md")).unwrap();
        assert_eq!(reparsed, map);
        assert_eq!(split.body, "Body\n");
    }

    #[test]
    fn test_render_without_frontmatter() {
        assert_eq!(render_note(None, "Body").unwrap(), "Body");
        assert_eq!(render_note(Some(&Mapping::new()), "Body").unwrap(), "Body");
    }
}
