//! Parsers for exported markdown: frontmatter, code fences, and links.

pub mod code_block;
pub mod frontmatter;
pub mod link;

pub use code_block::{FenceTracker, LineClass, ScannedLine, inline_code_ranges, scan_lines};
pub use frontmatter::{parse_frontmatter_yaml, render_note, serialize_frontmatter, split_frontmatter};
pub use link::{
    attachment_path, format_markdown_link, format_wikilink, is_external_target, parse_line_references,
    safe_link_target, unwrap_angle_brackets,
};
