//! Markdown link, image, and wikilink scanning.

use crate::parser::code_block::{inline_code_ranges, overlaps_any};
use crate::types::{LinkKind, LinkReference, LinkSyntax, Span};
use regex::Regex;
use std::sync::LazyLock;

// Wikilink pattern: [[target]] or [[target|alias]] or [[target#heading]] or [[target#^block]]
static WIKILINK: LazyLock<Regex> = LazyLock::new(|| {
    // (!?)                     - Optional ! for embeds (group 1)
    // ([^\]\|#]+)              - Target path (group 2)
    // (?:#\^([a-zA-Z0-9_-]+))? - Block reference (group 3)
    // (?:#([^\]\|]+))?         - Heading reference (group 4)
    // (?:\|([^\]]+))?          - Alias (group 5)
    Regex::new(r"(!?)\[\[([^\]\|#]+)(?:#\^([a-zA-Z0-9_-]+))?(?:#([^\]\|]+))?(?:\|([^\]]+))?\]\]")
        .unwrap()
});

// Markdown link or image: ![text](target "title") where target is <...> or has no spaces
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    // (!?)                     - Optional ! for images (group 1)
    // \[([^\[\]]*)\]           - Link text (group 2)
    // (<[^>\n]+>|(?:...)+)     - Target, bracket-wrapped or bare; bare targets
    //                            may hold balanced parentheses, one level deep (group 3)
    // (?:\s+"([^"]*)")?        - Optional title (group 4)
    Regex::new(r#"(!?)\[([^\[\]]*)\]\((<[^>\n]+>|(?:[^()\s]|\([^()\s]*\))+)(?:\s+"([^"]*)")?\)"#).unwrap()
});

static URL_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap());

/// Scan a single unfenced line. Results are ordered by start column.
///
/// Targets that are neither attachments under `files_dir` nor notes (external
/// URLs, anchors, other files) are not reported.
pub fn parse_line_references(line: &str, line_no: usize, files_dir: &str) -> Vec<LinkReference> {
    let code_ranges = inline_code_ranges(line);
    let mut refs = Vec::new();
    let mut taken = Vec::new();

    for cap in WIKILINK.captures_iter(line) {
        let full = cap.get(0).unwrap();
        let range = full.start()..full.end();
        if overlaps_any(&range, &code_ranges) {
            continue;
        }
        taken.push(range.clone());

        let embed = !cap[1].is_empty();
        let target = cap[2].trim().to_string();
        let fragment = cap
            .get(3)
            .map(|m| format!("^{}", m.as_str()))
            .or_else(|| cap.get(4).map(|m| m.as_str().to_string()));
        let alias = cap.get(5).map(|m| m.as_str().trim().to_string());

        let kind = if attachment_path(&target, files_dir).is_some() {
            if embed { LinkKind::Image } else { LinkKind::FileAttachment }
        } else if is_media_target(&target) {
            // Media outside the attachments folder is not ours to rewrite
            continue;
        } else {
            LinkKind::CrossNoteWikilink
        };

        refs.push(LinkReference {
            kind,
            syntax: LinkSyntax::Wikilink,
            raw: full.as_str().to_string(),
            span: Span {
                line: line_no,
                start_col: range.start,
                end_col: range.end,
            },
            target,
            alias,
            fragment,
            embed,
            title: None,
        });
    }

    for cap in MARKDOWN_LINK.captures_iter(line) {
        let full = cap.get(0).unwrap();
        let range = full.start()..full.end();
        if overlaps_any(&range, &code_ranges) || overlaps_any(&range, &taken) {
            continue;
        }

        let embed = !cap[1].is_empty();
        let text = cap[2].to_string();
        let target = unwrap_angle_brackets(&cap[3]);
        let title = cap.get(4).map(|m| m.as_str().to_string());

        if is_external_target(target) {
            continue;
        }

        let (kind, target, fragment) = if attachment_path(target, files_dir).is_some() {
            let kind = if embed { LinkKind::Image } else { LinkKind::FileAttachment };
            (kind, target.to_string(), None)
        } else {
            let (path, fragment) = match target.split_once('#') {
                Some((path, frag)) => (path, Some(frag.to_string())),
                None => (target, None),
            };
            if !path.to_lowercase().ends_with(".md") || embed {
                continue;
            }
            (LinkKind::CrossNoteMarkdown, path.to_string(), fragment)
        };

        refs.push(LinkReference {
            kind,
            syntax: LinkSyntax::Markdown,
            raw: full.as_str().to_string(),
            span: Span {
                line: line_no,
                start_col: range.start,
                end_col: range.end,
            },
            target,
            alias: Some(text),
            fragment,
            embed,
            title,
        });
    }

    refs.sort_by_key(|r| r.span.start_col);
    refs
}

/// Strip `<...>` wrapping from a markdown link destination.
pub fn unwrap_angle_brackets(target: &str) -> &str {
    target
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(target)
}

/// Whether a target points outside the export (URL, mail, in-page anchor).
pub fn is_external_target(target: &str) -> bool {
    target.starts_with('#') || target.starts_with("//") || URL_SCHEME.is_match(target)
}

/// Return the path below the attachments folder if the target lives there.
///
/// `./Files/a.png` and `Files/a.png` both yield `a.png`.
pub fn attachment_path<'a>(target: &'a str, files_dir: &str) -> Option<&'a str> {
    let target = target.strip_prefix("./").unwrap_or(target);
    target
        .strip_prefix(files_dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
}

/// Check if a target looks like a media file (image, audio, video, PDF).
pub fn is_media_target(target: &str) -> bool {
    let lower = target.to_lowercase();
    [
        ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".bmp", ".mp3", ".wav", ".ogg",
        ".mp4", ".webm", ".pdf",
    ]
    .iter()
    .any(|ext| lower.ends_with(ext))
}

/// Wrap a link destination in angle brackets if bare syntax would break on it.
pub fn safe_link_target(path: &str) -> String {
    if path.contains([' ', '(', ')', '<', '>']) || path.contains('\t') {
        format!("<{}>", path.replace('<', "%3C").replace('>', "%3E"))
    } else {
        path.to_string()
    }
}

/// Format a wikilink from its parts.
pub fn format_wikilink(target: &str, fragment: Option<&str>, alias: Option<&str>, embed: bool) -> String {
    let mut result = String::new();

    if embed {
        result.push('!');
    }

    result.push_str("[[");
    result.push_str(target);

    if let Some(fragment) = fragment {
        result.push('#');
        result.push_str(fragment);
    }

    if let Some(alias) = alias {
        result.push('|');
        result.push_str(alias);
    }

    result.push_str("]]");
    result
}

/// Format a markdown link (or image) from its parts. `destination` is used verbatim.
pub fn format_markdown_link(text: &str, destination: &str, title: Option<&str>, embed: bool) -> String {
    let bang = if embed { "!" } else { "" };
    match title {
        Some(title) => format!("{}[{}]({} \"{}\")", bang, text, destination, title),
        None => format!("{}[{}]({})", bang, text, destination),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(line: &str) -> Vec<LinkReference> {
        parse_line_references(line, 1, "Files")
    }

    #[test]
    fn test_simple_wikilink() {
        let found = refs("See [[My Note]] for details.");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, LinkKind::CrossNoteWikilink);
        assert_eq!(found[0].target, "My Note");
        assert!(found[0].alias.is_none());
        assert_eq!(found[0].span.start_col, 4);
        assert_eq!(found[0].span.end_col, 15);
    }

    #[test]
    fn test_wikilink_with_alias_and_heading() {
        let found = refs("[[Note#Section|alias]]");
        assert_eq!(found[0].target, "Note");
        assert_eq!(found[0].fragment.as_deref(), Some("Section"));
        assert_eq!(found[0].alias.as_deref(), Some("alias"));
    }

    #[test]
    fn test_wikilink_block_ref() {
        let found = refs("[[Note#^abc123]]");
        assert_eq!(found[0].fragment.as_deref(), Some("^abc123"));
    }

    #[test]
    fn test_wikilink_attachment_embed() {
        let found = refs("![[Files/photo.png]]");
        assert_eq!(found[0].kind, LinkKind::Image);
        assert_eq!(found[0].syntax, LinkSyntax::Wikilink);
    }

    #[test]
    fn test_media_wikilink_outside_files_ignored() {
        assert!(refs("![[elsewhere.png]]").is_empty());
    }

    #[test]
    fn test_markdown_image() {
        let found = refs("![img](Files/photo%201.png)");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, LinkKind::Image);
        assert_eq!(found[0].target, "Files/photo%201.png");
        assert_eq!(found[0].alias.as_deref(), Some("img"));
    }

    #[test]
    fn test_markdown_file_link_wrapped() {
        let found = refs("[doc](<Files/my report.pdf>)");
        assert_eq!(found[0].kind, LinkKind::FileAttachment);
        assert_eq!(found[0].target, "Files/my report.pdf");
    }

    #[test]
    fn test_markdown_link_with_title() {
        let found = refs(r#"[doc](Files/a.pdf "Quarterly")"#);
        assert_eq!(found[0].title.as_deref(), Some("Quarterly"));
    }

    #[test]
    fn test_cross_note_markdown_link() {
        let found = refs("[Other](Other%20Note.md#Intro)");
        assert_eq!(found[0].kind, LinkKind::CrossNoteMarkdown);
        assert_eq!(found[0].target, "Other%20Note.md");
        assert_eq!(found[0].fragment.as_deref(), Some("Intro"));
    }

    #[test]
    fn test_external_and_other_links_ignored() {
        assert!(refs("[site](https://example.com/a.md)").is_empty());
        assert!(refs("[mail](mailto:me@example.com)").is_empty());
        assert!(refs("[top](#heading)").is_empty());
        assert!(refs("[data](data.csv)").is_empty());
    }

    #[test]
    fn test_inline_code_skipped() {
        let found = refs("See [[real]] and `[[fake]]` and `![x](Files/y.png)`.");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].target, "real");
    }

    #[test]
    fn test_results_ordered_by_column() {
        let found = refs("[a](A.md) then [[B]] then ![c](Files/c.png)");
        let targets: Vec<&str> = found.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["A.md", "B", "Files/c.png"]);
    }

    #[test]
    fn test_bare_target_with_parentheses() {
        let found = refs("![x](Files/image(1).png) and [d](Files/photo%20(2).png \"t\")");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].target, "Files/image(1).png");
        assert_eq!(found[0].raw, "![x](Files/image(1).png)");
        assert_eq!(found[1].target, "Files/photo%20(2).png");
        assert_eq!(found[1].title.as_deref(), Some("t"));
    }

    #[test]
    fn test_unbalanced_parenthesis_ends_target() {
        let found = refs("(see [n](Note.md))");
        assert_eq!(found[0].target, "Note.md");
        assert_eq!(found[0].raw, "[n](Note.md)");
    }

    #[test]
    fn test_attachment_path() {
        assert_eq!(attachment_path("Files/a.png", "Files"), Some("a.png"));
        assert_eq!(attachment_path("./Files/sub/a.png", "Files"), Some("sub/a.png"));
        assert_eq!(attachment_path("FilesX/a.png", "Files"), None);
        assert_eq!(attachment_path("Files/", "Files"), None);
        assert_eq!(attachment_path("http://x/Files/a.png", "Files"), None);
    }

    #[test]
    fn test_safe_link_target() {
        assert_eq!(safe_link_target("image.png"), "image.png");
        assert_eq!(safe_link_target("my file.png"), "<my file.png>");
        assert_eq!(safe_link_target("file(1).png"), "<file(1).png>");
        assert_eq!(safe_link_target("_attachments/a b.png"), "<_attachments/a b.png>");
    }

    #[test]
    fn test_format_wikilink() {
        assert_eq!(format_wikilink("Note", Some("Section"), Some("alias"), false), "[[Note#Section|alias]]");
        assert_eq!(format_wikilink("image.png", None, None, true), "![[image.png]]");
    }

    #[test]
    fn test_format_markdown_link() {
        assert_eq!(format_markdown_link("Alias", "Note.md", None, false), "[Alias](Note.md)");
        assert_eq!(format_markdown_link("i", "a.png", Some("t"), true), "![i](a.png \"t\")");
    }
}
