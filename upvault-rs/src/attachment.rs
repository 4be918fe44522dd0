//! Attachment discovery and copy planning.
//!
//! Exports mix percent-encoded and literal file names, and files created on
//! one platform may carry a different Unicode normalization than the links
//! pointing at them. Lookups therefore try several spellings of the same
//! target and memoize the outcome for the rest of the run.

use crate::types::AttachmentRecord;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

/// One attachment copy to perform (or simulate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Run-scoped attachment resolver with memoized lookups.
#[derive(Debug)]
pub struct AttachmentResolver {
    files_root: PathBuf,
    cache: BTreeMap<String, AttachmentRecord>,
    planned: BTreeSet<PathBuf>,
}

impl AttachmentResolver {
    pub fn new(files_root: impl Into<PathBuf>) -> Self {
        Self {
            files_root: files_root.into(),
            cache: BTreeMap::new(),
            planned: BTreeSet::new(),
        }
    }

    /// Resolve a path relative to the attachments folder, as written in a link.
    ///
    /// The literal form is tried first, then the percent-decoded form, then its
    /// NFC and NFD variants. The record is named after the spelling that
    /// matched a file, so two links only share a record when they reach the
    /// same file. Results are memoized per written path.
    pub fn resolve(&mut self, written: &str) -> AttachmentRecord {
        if let Some(record) = self.cache.get(written) {
            return record.clone();
        }

        let decoded = decode_attachment_path(written);
        let record = match self.lookup(written, &decoded) {
            Some((name, source_path)) => {
                debug!(attachment = %name, path = %source_path.display(), "Resolved attachment");
                AttachmentRecord {
                    name,
                    source_path,
                    found: true,
                }
            }
            None => {
                warn!(attachment = %decoded, "Attachment not found");
                AttachmentRecord {
                    source_path: join_segments(&self.files_root, &decoded),
                    name: decoded,
                    found: false,
                }
            }
        };

        self.cache.insert(written.to_string(), record.clone());
        record
    }

    fn lookup(&self, written: &str, decoded: &str) -> Option<(String, PathBuf)> {
        let mut candidates: Vec<String> = vec![clean_segments(written), decoded.to_string()];
        candidates.push(decoded.nfc().collect());
        candidates.push(decoded.nfd().collect());
        candidates.dedup();

        candidates.into_iter().find_map(|candidate| {
            let path = join_segments(&self.files_root, &candidate);
            path.is_file().then_some((candidate, path))
        })
    }

    /// Plan a copy of `record` into a destination folder.
    ///
    /// Returns `None` for missing attachments and for destinations already
    /// planned earlier in the run.
    pub fn plan_copy(&mut self, record: &AttachmentRecord, note_folder: &Path, attachments_dir: &str) -> Option<PlannedCopy> {
        if !record.found {
            return None;
        }

        let destination = attachment_destination(note_folder, attachments_dir, &record.name);
        if !self.planned.insert(destination.clone()) {
            return None;
        }

        Some(PlannedCopy {
            source: record.source_path.clone(),
            destination,
        })
    }

    /// Distinct source files found so far.
    pub fn found_count(&self) -> usize {
        self.distinct(true)
    }

    /// Distinct attachment names that matched no file.
    pub fn missing_count(&self) -> usize {
        self.distinct(false)
    }

    fn distinct(&self, found: bool) -> usize {
        self.cache
            .values()
            .filter(|r| r.found == found)
            .map(|r| &r.source_path)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Percent-decode a relative attachment path and normalize its separators.
///
/// Empty, `.` and `..` segments are dropped so the result always stays below
/// the attachments folder.
pub fn decode_attachment_path(written: &str) -> String {
    let decoded = urlencoding::decode(written).unwrap_or(Cow::Borrowed(written));
    clean_segments(&decoded)
}

/// Normalize separators and drop empty, `.` and `..` segments.
fn clean_segments(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Link target of an attachment as seen from a note in the same destination folder.
pub fn attachment_link_target(attachments_dir: &str, name: &str) -> String {
    if attachments_dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", attachments_dir, name)
    }
}

/// Where an attachment lands for a note in `note_folder`.
pub fn attachment_destination(note_folder: &Path, attachments_dir: &str, name: &str) -> PathBuf {
    join_segments(&join_segments(note_folder, attachments_dir), name)
}

fn join_segments(base: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(base.to_path_buf(), |acc, seg| acc.join(seg))
}
