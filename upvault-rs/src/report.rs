//! Migration report: accumulation, rendering, and redaction.

use crate::config::{AttachmentPolicy, LinkMode, MigrationConfig, ReportFormat};
use crate::error::Result;
use crate::types::{LinkChange, UnresolvedLink};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Placeholder for redacted free text.
pub const REDACTED: &str = "<redacted>";

/// Run settings echoed at the top of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportHeader {
    pub simulated: bool,
    pub source_dir: String,
    pub base_dir: String,
    pub attachments_dir: String,
    pub link_mode: LinkMode,
    pub keep_frontmatter: bool,
    pub skip_attachments: bool,
    pub attachment_policy: AttachmentPolicy,
    pub redacted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_utc: Option<String>,
}

impl ReportHeader {
    pub fn from_config(config: &MigrationConfig) -> Self {
        Self {
            simulated: config.dry_run,
            source_dir: config.source_dir.display().to_string(),
            base_dir: config.base_dir.display().to_string(),
            attachments_dir: config.attachments_dir.clone(),
            link_mode: config.link_mode,
            keep_frontmatter: config.keep_frontmatter,
            skip_attachments: config.skip_attachments,
            attachment_policy: config.attachment_policy,
            redacted: false,
            generated_utc: None,
        }
    }
}

/// Run-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub notes_processed: usize,
    pub notes_failed: usize,
    /// Destination files written, or planned in a dry run.
    pub notes_written: usize,
    /// Attachment copies performed, or planned in a dry run.
    pub attachments_copied: usize,
    /// Distinct attachments located.
    pub attachments_resolved: usize,
    /// Distinct attachments not located.
    pub attachments_missing: usize,
    pub links_rewritten: usize,
    pub unresolved_links: usize,
    pub tags_added: usize,
}

/// One output copy of a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationEntry {
    /// Folder relative to the base directory (`.` for the root).
    pub folder: String,
    pub file: String,
    pub links_rewritten: usize,
    pub samples: Vec<LinkChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentEntry {
    pub name: String,
    pub found: bool,
}

/// Everything recorded for one source note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEntry {
    /// Source file name.
    pub note: String,
    pub title: String,
    pub destinations: Vec<DestinationEntry>,
    pub attachments: Vec<AttachmentEntry>,
    pub unresolved_links: Vec<UnresolvedLink>,
    pub tags_added: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The finished report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub header: ReportHeader,
    pub summary: Summary,
    pub notes: Vec<NoteEntry>,
}

/// Append-only accumulator used while a run is in progress.
#[derive(Debug)]
pub struct ReportBuilder {
    header: ReportHeader,
    notes: Vec<NoteEntry>,
}

impl ReportBuilder {
    pub fn new(header: ReportHeader) -> Self {
        Self {
            header,
            notes: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: NoteEntry) {
        self.notes.push(entry);
    }

    /// Close the report, deriving per-note counters from the entries.
    ///
    /// Attachment counters are run-wide since attachments are shared.
    pub fn finish(self, attachments_copied: usize, attachments_resolved: usize, attachments_missing: usize) -> MigrationReport {
        let mut summary = Summary {
            notes_processed: self.notes.len(),
            attachments_copied,
            attachments_resolved,
            attachments_missing,
            ..Default::default()
        };

        for entry in &self.notes {
            if entry.error.is_some() {
                summary.notes_failed += 1;
            }
            summary.notes_written += entry.destinations.len();
            summary.links_rewritten += entry
                .destinations
                .iter()
                .map(|d| d.links_rewritten)
                .sum::<usize>();
            summary.unresolved_links += entry.unresolved_links.len();
            summary.tags_added += entry.tags_added.len();
        }

        MigrationReport {
            header: self.header,
            summary,
            notes: self.notes,
        }
    }
}

impl MigrationReport {
    /// Render in the requested format.
    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Json => self.to_json(),
            ReportFormat::Md => Ok(self.to_markdown()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Flat human-readable summary.
    pub fn to_markdown(&self) -> String {
        let h = &self.header;
        let s = &self.summary;
        let mut out = String::new();

        let mode = if h.simulated { "dry run" } else { "commit" };
        let _ = writeln!(out, "# Migration report ({})\n", mode);
        if let Some(generated) = &h.generated_utc {
            let _ = writeln!(out, "Generated: {}\n", generated);
        }

        let _ = writeln!(out, "- Source: `{}`", h.source_dir);
        let _ = writeln!(out, "- Destination: `{}`", h.base_dir);
        if !h.attachments_dir.is_empty() {
            let _ = writeln!(out, "- Attachments subfolder: `{}`", h.attachments_dir);
        }
        let _ = writeln!(out, "- Link mode: {}", h.link_mode);
        let _ = writeln!(out, "- Keep frontmatter: {}", h.keep_frontmatter);
        let _ = writeln!(out, "- Skip attachments: {}", h.skip_attachments);
        let _ = writeln!(out, "- Attachment policy: {:?}", h.attachment_policy);
        if h.redacted {
            let _ = writeln!(out, "- Redacted: true");
        }

        let _ = writeln!(out, "\n## Summary\n");
        let _ = writeln!(out, "| Metric | Count |");
        let _ = writeln!(out, "| --- | ---: |");
        for (label, value) in [
            ("Notes processed", s.notes_processed),
            ("Notes failed", s.notes_failed),
            ("Notes written", s.notes_written),
            ("Attachments copied", s.attachments_copied),
            ("Attachments resolved", s.attachments_resolved),
            ("Attachments missing", s.attachments_missing),
            ("Links rewritten", s.links_rewritten),
            ("Unresolved links", s.unresolved_links),
            ("Tags added", s.tags_added),
        ] {
            let _ = writeln!(out, "| {} | {} |", label, value);
        }

        let _ = writeln!(out, "\n## Notes\n");
        for entry in &self.notes {
            let _ = writeln!(out, "### {} ({})\n", entry.title, entry.note);
            if let Some(error) = &entry.error {
                let _ = writeln!(out, "- **Error:** {}\n", error);
                continue;
            }
            for dest in &entry.destinations {
                let _ = writeln!(
                    out,
                    "- `{}` in `{}`: {} link(s) rewritten",
                    dest.file, dest.folder, dest.links_rewritten
                );
                for sample in &dest.samples {
                    let _ = writeln!(out, "  - line {}: `{}` -> `{}`", sample.line, sample.old, sample.new);
                }
            }
            for attachment in &entry.attachments {
                let status = if attachment.found { "found" } else { "MISSING" };
                let _ = writeln!(out, "- Attachment `{}`: {}", attachment.name, status);
            }
            for link in &entry.unresolved_links {
                let _ = writeln!(out, "- Unresolved link on line {}: `{}`", link.line, link.target);
            }
            if !entry.tags_added.is_empty() {
                let _ = writeln!(out, "- Tags added: {}", entry.tags_added.join(", "));
            }
            out.push('\n');
        }

        out
    }

    /// A copy with identifying text replaced by stable opaque tokens.
    ///
    /// Counts, flags and nesting are unchanged.
    pub fn redacted(&self) -> MigrationReport {
        let mut redactor = Redactor::new();
        let mut report = self.clone();

        report.header.redacted = true;
        report.header.source_dir = REDACTED.to_string();
        report.header.base_dir = REDACTED.to_string();

        for entry in &mut report.notes {
            entry.note = redactor.token("note", &entry.note);
            entry.title = redactor.token("title", &entry.title);
            for dest in &mut entry.destinations {
                dest.folder = redactor.token("folder", &dest.folder);
                dest.file = entry.note.clone();
                for sample in &mut dest.samples {
                    sample.old = REDACTED.to_string();
                    sample.new = REDACTED.to_string();
                }
            }
            for attachment in &mut entry.attachments {
                attachment.name = redactor.token("attachment", &attachment.name);
            }
            for link in &mut entry.unresolved_links {
                link.target = redactor.token("link", &link.target);
            }
            for tag in &mut entry.tags_added {
                *tag = redactor.token("tag", tag);
            }
            if entry.error.is_some() {
                entry.error = Some(REDACTED.to_string());
            }
        }

        report
    }
}

/// Hands out `kind-N` tokens, the same token for the same value.
#[derive(Debug, Default)]
struct Redactor {
    tokens: BTreeMap<(String, String), String>,
    counters: BTreeMap<String, usize>,
}

impl Redactor {
    fn new() -> Self {
        Self::default()
    }

    fn token(&mut self, kind: &str, value: &str) -> String {
        let key = (kind.to_string(), value.to_string());
        if let Some(token) = self.tokens.get(&key) {
            return token.clone();
        }

        let counter = self.counters.entry(kind.to_string()).or_insert(0);
        *counter += 1;
        let token = format!("{}-{}", kind, counter);
        self.tokens.insert(key, token.clone());
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_report() -> MigrationReport {
        let mut builder = ReportBuilder::new(ReportHeader::from_config(&MigrationConfig::default()));
        builder.push(NoteEntry {
            note: "Secret Plan.md".to_string(),
            title: "Secret Plan".to_string(),
            destinations: vec![
                DestinationEntry {
                    folder: "Work/Projects".to_string(),
                    file: "Secret Plan.md".to_string(),
                    links_rewritten: 2,
                    samples: vec![LinkChange {
                        line: 3,
                        old: "![a](Files/x%201.png)".to_string(),
                        new: "![a](<x 1.png>)".to_string(),
                    }],
                },
                DestinationEntry {
                    folder: "Archive".to_string(),
                    file: "Secret Plan.md".to_string(),
                    links_rewritten: 2,
                    samples: vec![],
                },
            ],
            attachments: vec![
                AttachmentEntry { name: "x 1.png".to_string(), found: true },
                AttachmentEntry { name: "gone.pdf".to_string(), found: false },
            ],
            unresolved_links: vec![UnresolvedLink { line: 4, target: "Ghost".to_string() }],
            tags_added: vec!["work".to_string()],
            error: None,
        });
        builder.push(NoteEntry {
            note: "Broken.md".to_string(),
            title: "Broken".to_string(),
            error: Some("Invalid frontmatter".to_string()),
            ..Default::default()
        });
        builder.finish(2, 1, 1)
    }

    #[test]
    fn test_summary_counters() {
        let report = sample_report();
        assert_eq!(
            report.summary,
            Summary {
                notes_processed: 2,
                notes_failed: 1,
                notes_written: 2,
                attachments_copied: 2,
                attachments_resolved: 1,
                attachments_missing: 1,
                links_rewritten: 4,
                unresolved_links: 1,
                tags_added: 1,
            }
        );
    }

    #[test]
    fn test_json_round_trip() {
        let report = sample_report();
        let json = report.to_json().unwrap();
        let parsed: MigrationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["header"]["link_mode"], "preserve");
        assert!(value["header"].get("generated_utc").is_none());
        assert!(value["notes"][0].get("error").is_none());
    }

    #[test]
    fn test_markdown_rendering() {
        let md = sample_report().to_markdown();
        assert!(md.starts_with("# Migration report (commit)"));
        assert!(md.contains("| Notes processed | 2 |"));
        assert!(md.contains("### Secret Plan (Secret Plan.md)"));
        assert!(md.contains("Attachment `gone.pdf`: MISSING"));
        assert!(md.contains("**Error:** Invalid frontmatter"));
    }

    #[test]
    fn test_redaction_hides_content_keeps_shape() {
        let report = sample_report();
        let redacted = report.redacted();

        assert_eq!(redacted.summary, report.summary);
        assert!(redacted.header.redacted);
        assert_eq!(redacted.header.source_dir, REDACTED);

        let first = &redacted.notes[0];
        assert_eq!(first.note, "note-1");
        assert_eq!(first.title, "title-1");
        assert_eq!(first.destinations.len(), 2);
        assert_eq!(first.destinations[0].folder, "folder-1");
        assert_eq!(first.destinations[1].folder, "folder-2");
        assert_eq!(first.destinations[0].file, "note-1");
        assert_eq!(first.destinations[0].samples[0].old, REDACTED);
        assert_eq!(first.attachments[0].name, "attachment-1");
        assert_eq!(first.attachments[1].name, "attachment-2");
        assert!(!first.attachments[1].found);
        assert_eq!(first.unresolved_links[0].target, "link-1");
        assert_eq!(redacted.notes[1].note, "note-2");

        let json = redacted.to_json().unwrap();
        assert!(!json.contains("Secret"));
        assert!(!json.contains("gone.pdf"));
    }

    #[test]
    fn test_redactor_tokens_are_stable() {
        let mut redactor = Redactor::new();
        assert_eq!(redactor.token("folder", "Work"), "folder-1");
        assert_eq!(redactor.token("folder", "Home"), "folder-2");
        assert_eq!(redactor.token("folder", "Work"), "folder-1");
        assert_eq!(redactor.token("note", "Work"), "note-1");
    }
}
