//! Link rewriting for one destination copy of a note.
//!
//! The body is walked line by line through the fence state machine. Protected
//! lines are copied through untouched; every other line is scanned for
//! references, and each reference is rebuilt according to its kind and the
//! active [`LinkMode`]. Only the bytes of a changed reference are replaced, so
//! surrounding text (including inline code) is never altered.

use crate::attachment::{AttachmentResolver, attachment_link_target};
use crate::config::LinkMode;
use crate::parser::{
    attachment_path, format_markdown_link, format_wikilink, parse_line_references, safe_link_target, scan_lines,
};
use crate::types::{AttachmentRecord, LinkChange, LinkKind, LinkReference, LinkSyntax, ResolvedDestination, UnresolvedLink};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Number of changes kept as samples per destination.
pub const MAX_SAMPLES: usize = 5;

/// Lookup from note name to the destination other notes should link to.
///
/// The first destination inserted for a name wins, so callers insert notes in
/// their deterministic processing order.
#[derive(Debug, Default, Clone)]
pub struct NoteIndex {
    exact: BTreeMap<String, ResolvedDestination>,
    folded: BTreeMap<String, ResolvedDestination>,
}

impl NoteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a note stem with its primary destination.
    pub fn insert(&mut self, stem: &str, destination: &ResolvedDestination) {
        self.exact
            .entry(stem.to_string())
            .or_insert_with(|| destination.clone());
        self.folded
            .entry(stem.to_lowercase())
            .or_insert_with(|| destination.clone());
    }

    /// Resolve a note name: exact stem first, then case-insensitive.
    pub fn lookup(&self, name: &str) -> Option<&ResolvedDestination> {
        self.exact
            .get(name)
            .or_else(|| self.folded.get(&name.to_lowercase()))
    }
}

/// Settings shared by every rewrite in a run.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    pub mode: LinkMode,
    pub files_dir: &'a str,
    pub attachments_dir: &'a str,
    pub index: &'a NoteIndex,
}

/// Result of rewriting one destination copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewriteOutcome {
    pub body: String,

    /// Total references changed.
    pub links_rewritten: usize,

    /// First few changes, in body order.
    pub samples: Vec<LinkChange>,

    /// Cross-note targets with no migrated note behind them.
    pub unresolved: Vec<UnresolvedLink>,

    /// Attachments referenced by the body, deduplicated, in first-reference order.
    pub attachments: Vec<AttachmentRecord>,
}

/// Rewrite a note body for one destination.
pub fn rewrite_body(
    body: &str,
    destination: &ResolvedDestination,
    ctx: &RewriteContext<'_>,
    resolver: &mut AttachmentResolver,
) -> RewriteOutcome {
    let mut outcome = RewriteOutcome {
        body: String::with_capacity(body.len()),
        ..Default::default()
    };

    for line in scan_lines(body) {
        if line.class.is_protected() {
            outcome.body.push_str(line.text);
            continue;
        }

        let refs = parse_line_references(line.text, line.number, ctx.files_dir);
        if refs.is_empty() {
            outcome.body.push_str(line.text);
            continue;
        }

        let mut last = 0;
        for reference in &refs {
            let replacement = rewrite_reference(reference, destination, ctx, resolver, &mut outcome);

            outcome
                .body
                .push_str(&line.text[last..reference.span.start_col]);
            match replacement {
                Some(new) if new != reference.raw => {
                    outcome.links_rewritten += 1;
                    if outcome.samples.len() < MAX_SAMPLES {
                        outcome.samples.push(LinkChange {
                            line: line.number,
                            old: reference.raw.clone(),
                            new: new.clone(),
                        });
                    }
                    outcome.body.push_str(&new);
                }
                _ => outcome.body.push_str(&reference.raw),
            }
            last = reference.span.end_col;
        }
        outcome.body.push_str(&line.text[last..]);
    }

    outcome
}

/// Build the replacement text for one reference, or `None` to leave it as is.
fn rewrite_reference(
    reference: &LinkReference,
    destination: &ResolvedDestination,
    ctx: &RewriteContext<'_>,
    resolver: &mut AttachmentResolver,
    outcome: &mut RewriteOutcome,
) -> Option<String> {
    match reference.kind {
        LinkKind::Image | LinkKind::FileAttachment => {
            let written = attachment_path(&reference.target, ctx.files_dir)?;
            let record = resolver.resolve(written);
            let target = attachment_link_target(ctx.attachments_dir, &record.name);
            let name = record.name.clone();
            if !outcome.attachments.iter().any(|a| a.name == record.name) {
                outcome.attachments.push(record);
            }
            Some(rewrite_attachment(reference, &target, &name, ctx.mode))
        }
        LinkKind::CrossNoteMarkdown => {
            let decoded = decode(&reference.target);
            let stem = note_name(&decoded);
            let found = ctx.index.lookup(&stem);
            if found.is_none() {
                record_unresolved(reference, outcome);
            }
            rewrite_markdown_note_link(reference, &stem, found, destination, ctx.mode)
        }
        LinkKind::CrossNoteWikilink => {
            let name = note_name(&reference.target);
            let found = ctx.index.lookup(&name);
            if found.is_none() {
                record_unresolved(reference, outcome);
            }
            rewrite_wikilink_note_link(reference, found, destination, ctx.mode)
        }
    }
}

fn rewrite_attachment(reference: &LinkReference, target: &str, name: &str, mode: LinkMode) -> String {
    match (reference.syntax, mode) {
        (LinkSyntax::Wikilink, LinkMode::ToMarkdown) => {
            let text = reference
                .alias
                .as_deref()
                .unwrap_or_else(|| base_name(name));
            format_markdown_link(text, &safe_link_target(target), None, reference.embed)
        }
        (LinkSyntax::Wikilink, _) => format_wikilink(
            target,
            reference.fragment.as_deref(),
            reference.alias.as_deref(),
            reference.embed,
        ),
        (LinkSyntax::Markdown, _) => format_markdown_link(
            reference.alias.as_deref().unwrap_or(""),
            &safe_link_target(target),
            reference.title.as_deref(),
            reference.embed,
        ),
    }
}

fn rewrite_markdown_note_link(
    reference: &LinkReference,
    stem: &str,
    found: Option<&ResolvedDestination>,
    destination: &ResolvedDestination,
    mode: LinkMode,
) -> Option<String> {
    let text = reference.alias.as_deref().unwrap_or("");

    if mode == LinkMode::ToWikilink {
        let fragment = reference.fragment.as_deref().map(decode);
        // Case-sensitive: `[note](Note.md)` keeps `note` as the display text
        let alias = (text != stem && !text.is_empty()).then_some(text);
        return Some(format_wikilink(stem, fragment.as_deref(), alias, false));
    }

    let target = relative_note_path(destination, found?);
    let target = with_fragment(target, reference.fragment.as_deref());
    Some(format_markdown_link(
        text,
        &safe_link_target(&target),
        reference.title.as_deref(),
        false,
    ))
}

fn rewrite_wikilink_note_link(
    reference: &LinkReference,
    found: Option<&ResolvedDestination>,
    destination: &ResolvedDestination,
    mode: LinkMode,
) -> Option<String> {
    // Transclusions have no markdown-link equivalent
    if mode != LinkMode::ToMarkdown || reference.embed {
        return None;
    }

    let target = match found {
        Some(found) => relative_note_path(destination, found),
        None => format!("{}.md", reference.target),
    };
    let target = with_fragment(target, reference.fragment.as_deref());
    let text = reference.alias.as_deref().unwrap_or(&reference.target);
    Some(format_markdown_link(text, &safe_link_target(&target), None, false))
}

fn record_unresolved(reference: &LinkReference, outcome: &mut RewriteOutcome) {
    debug!(target = %reference.target, line = reference.span.line, "Unresolved cross-note link");
    outcome.unresolved.push(UnresolvedLink {
        line: reference.span.line,
        target: reference.target.clone(),
    });
}

/// Path from the folder of `from` to the file of `to`, `/`-separated.
///
/// Walks up with `..` past the shared folder prefix, then down into the
/// target's folders.
pub fn relative_note_path(from: &ResolvedDestination, to: &ResolvedDestination) -> String {
    let common = from
        .segments
        .iter()
        .zip(&to.segments)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    parts.extend(std::iter::repeat_n("..", from.segments.len() - common));
    parts.extend(to.segments[common..].iter().map(String::as_str));

    let file_name = to
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if parts.is_empty() {
        file_name
    } else {
        format!("{}/{}", parts.join("/"), file_name)
    }
}

/// Note name used for index lookups: last path segment without `.md`.
fn note_name(target: &str) -> String {
    let last = target.rsplit('/').next().unwrap_or(target).trim();
    let stem = Path::new(last)
        .extension()
        .filter(|ext| ext.eq_ignore_ascii_case("md"))
        .map(|_| &last[..last.len() - 3])
        .unwrap_or(last);
    stem.to_string()
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn with_fragment(target: String, fragment: Option<&str>) -> String {
    match fragment {
        Some(fragment) => format!("{}#{}", target, fragment),
        None => target,
    }
}

fn decode(text: &str) -> String {
    urlencoding::decode(text)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| text.to_string())
}
