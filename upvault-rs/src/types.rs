//! Shared types for upvault.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The kind of reference found in a note body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    /// `![alt](Files/photo.png)` or `![[Files/photo.png]]`.
    Image,
    /// `[doc](Files/report.pdf)` or `[[Files/report.pdf]]`.
    FileAttachment,
    /// `[Text](Other Note.md)`.
    CrossNoteMarkdown,
    /// `[[Other Note]]` or `[[Other Note|Alias]]`.
    CrossNoteWikilink,
}

/// Which link syntax a reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkSyntax {
    /// `[text](target)`
    Markdown,
    /// `[[target|alias]]`
    Wikilink,
}

/// Location of a reference inside a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: usize,

    /// Start byte offset within the line.
    pub start_col: usize,

    /// End byte offset within the line (exclusive).
    pub end_col: usize,
}

/// A link or image reference found in a note body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReference {
    pub kind: LinkKind,

    pub syntax: LinkSyntax,

    /// The original text of the whole reference, e.g. `![img](Files/a%20b.png)`.
    pub raw: String,

    pub span: Span,

    /// The target as written, without angle-bracket wrapping.
    pub target: String,

    /// Display text: markdown link text, or the wikilink alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Heading or block fragment after `#`, without the `#`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,

    /// Whether the reference is prefixed with `!`.
    pub embed: bool,

    /// Optional markdown link title (`[a](b "title")`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Where one copy of a note lands in the output tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResolvedDestination {
    /// Folder segments below the base directory, in order. Empty = base root.
    pub segments: Vec<String>,

    /// Output folder (base directory joined with the segments).
    pub folder: PathBuf,

    /// Output file path (folder joined with the note's file name).
    pub file: PathBuf,
}

impl ResolvedDestination {
    /// Folder path relative to the base directory, `/`-separated.
    pub fn relative_folder(&self) -> String {
        self.segments.join("/")
    }

    /// Display form of the folder for reports (`.` for the base root).
    pub fn display_folder(&self) -> String {
        if self.segments.is_empty() {
            ".".to_string()
        } else {
            self.relative_folder()
        }
    }
}

/// A link that was (or would be) changed in one output copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkChange {
    pub line: usize,
    pub old: String,
    pub new: String,
}

/// A rendered output note for one destination. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputNote {
    pub destination: ResolvedDestination,

    /// Frontmatter to emit, if any.
    pub frontmatter: Option<serde_yaml::Mapping>,

    pub rewritten_body: String,
}

/// Resolution result for one referenced attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Path relative to the attachments folder, decoded, `/`-separated.
    pub name: String,

    /// The file found on disk, or the best-effort guess when missing.
    pub source_path: PathBuf,

    pub found: bool,
}

/// A cross-note target that did not match any migrated note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedLink {
    pub line: usize,
    pub target: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_folder_root() {
        let dest = ResolvedDestination {
            segments: vec![],
            folder: PathBuf::from("Notes"),
            file: PathBuf::from("Notes/a.md"),
        };
        assert_eq!(dest.display_folder(), ".");

        let nested = ResolvedDestination {
            segments: vec!["Work".to_string(), "Projects".to_string()],
            folder: PathBuf::from("Notes/Work/Projects"),
            file: PathBuf::from("Notes/Work/Projects/a.md"),
        };
        assert_eq!(nested.display_folder(), "Work/Projects");
    }

    #[test]
    fn test_link_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&LinkKind::CrossNoteWikilink).unwrap();
        assert_eq!(json, "\"cross-note-wikilink\"");
    }
}
