//! Migration orchestrator.
//!
//! A run moves through `Validating → Loading → Resolving → Rewriting →
//! (Writing | Simulating) → Reporting → Done`. Pre-flight problems end in
//! `Failed` before any note is touched; everything after that is recorded
//! per note and never aborts the run.
//!
//! Dry runs and real runs share every step. The only difference is the
//! [`OutputSink`] the planned operations are pushed through.

use crate::attachment::{AttachmentResolver, PlannedCopy};
use crate::category::resolve_destinations;
use crate::config::MigrationConfig;
use crate::error::{ExitCode, MigrateError, Result};
use crate::note::SourceNote;
use crate::parser::render_note;
use crate::report::{AttachmentEntry, DestinationEntry, MigrationReport, NoteEntry, ReportBuilder, ReportHeader};
use crate::rewrite::{NoteIndex, RewriteContext, rewrite_body};
use crate::tags::{derive_tags, merge_tags};
use crate::types::{OutputNote, ResolvedDestination};
use crate::vault::SourceExport;
use std::collections::BTreeSet;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Step of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Validating,
    Loading,
    Resolving,
    Rewriting,
    Writing,
    Simulating,
    Reporting,
    Done,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Validating => "validating",
            RunState::Loading => "loading",
            RunState::Resolving => "resolving",
            RunState::Rewriting => "rewriting",
            RunState::Writing => "writing",
            RunState::Simulating => "simulating",
            RunState::Reporting => "reporting",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Destination for planned filesystem operations.
pub trait OutputSink {
    fn ensure_dir(&mut self, path: &Path) -> Result<()>;
    fn write_note(&mut self, path: &Path, content: &str) -> Result<()>;
    fn copy_file(&mut self, from: &Path, to: &Path) -> Result<()>;
}

/// Writes to the real filesystem.
#[derive(Debug, Default)]
pub struct FsSink;

impl OutputSink for FsSink {
    fn ensure_dir(&mut self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)?;
        Ok(())
    }

    fn write_note(&mut self, path: &Path, content: &str) -> Result<()> {
        std::fs::write(path, content)?;
        Ok(())
    }

    fn copy_file(&mut self, from: &Path, to: &Path) -> Result<()> {
        std::fs::copy(from, to)?;
        Ok(())
    }
}

/// A recorded operation of a simulated run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOperation {
    EnsureDir(PathBuf),
    WriteNote { path: PathBuf, content: String },
    CopyFile { from: PathBuf, to: PathBuf },
}

/// Records operations instead of performing them.
#[derive(Debug, Default)]
pub struct DryRunSink {
    pub operations: Vec<SinkOperation>,
    dirs: BTreeSet<PathBuf>,
}

impl DryRunSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for DryRunSink {
    fn ensure_dir(&mut self, path: &Path) -> Result<()> {
        if self.dirs.insert(path.to_path_buf()) {
            self.operations.push(SinkOperation::EnsureDir(path.to_path_buf()));
        }
        Ok(())
    }

    fn write_note(&mut self, path: &Path, content: &str) -> Result<()> {
        debug!(path = %path.display(), "Would write note");
        self.operations.push(SinkOperation::WriteNote {
            path: path.to_path_buf(),
            content: content.to_string(),
        });
        Ok(())
    }

    fn copy_file(&mut self, from: &Path, to: &Path) -> Result<()> {
        debug!(from = %from.display(), to = %to.display(), "Would copy attachment");
        self.operations.push(SinkOperation::CopyFile {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
        Ok(())
    }
}

/// Receives a monotonically increasing completed count against a known total.
pub trait ProgressSink {
    fn start(&mut self, total: usize);
    fn advance(&mut self, completed: usize);
    fn finish(&mut self);
}

/// Discards progress.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&mut self, _total: usize) {}
    fn advance(&mut self, _completed: usize) {}
    fn finish(&mut self) {}
}

/// Prints a counter on stderr when stderr is a terminal.
#[derive(Debug)]
pub struct TerminalProgress {
    enabled: bool,
    total: usize,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            enabled: std::io::stderr().is_terminal(),
            total: 0,
        }
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalProgress {
    fn start(&mut self, total: usize) {
        self.total = total;
    }

    fn advance(&mut self, completed: usize) {
        if self.enabled {
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "\rMigrating notes {}/{}", completed, self.total);
            let _ = stderr.flush();
        }
    }

    fn finish(&mut self) {
        if self.enabled && self.total > 0 {
            eprintln!();
        }
    }
}

/// Result of pre-flight validation.
#[derive(Debug, Clone)]
pub struct Preflight {
    pub export: SourceExport,
    /// Notes to migrate, relative to the source directory, sorted.
    pub notes: Vec<PathBuf>,
    /// Non-fatal findings.
    pub warnings: Vec<String>,
}

/// Check that a run can start. Nothing is created or modified.
pub fn validate(config: &MigrationConfig) -> Result<Preflight> {
    let export = SourceExport::open(&config.source_dir, &config.files_dir)?;

    let notes = export.list_notes()?;
    if notes.is_empty() {
        return Err(MigrateError::NoNotes(export.root.clone()));
    }

    let mut warnings = Vec::new();
    let files_root = export.files_root();
    if files_root.exists() {
        if !files_root.is_dir() {
            return Err(MigrateError::AttachmentsNotDirectory(files_root));
        }
    } else if !config.skip_attachments {
        let message = format!(
            "Attachments folder not found: {}; attachment links will be reported as missing",
            files_root.display()
        );
        warn!("{}", message);
        warnings.push(message);
    }

    if !config.dry_run {
        check_writable(&config.base_dir)?;
    }

    info!(notes = notes.len(), source = %export.root.display(), "Pre-flight validation passed");
    Ok(Preflight {
        export,
        notes,
        warnings,
    })
}

/// Probe the destination (or its closest existing ancestor) with a scratch file.
fn check_writable(base_dir: &Path) -> Result<()> {
    let not_writable = |message: String| MigrateError::DestinationNotWritable {
        path: base_dir.to_path_buf(),
        message,
    };

    let mut probe_dir = base_dir;
    while !probe_dir.exists() {
        match probe_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => probe_dir = parent,
            _ => {
                probe_dir = Path::new(".");
                break;
            }
        }
    }

    if !probe_dir.is_dir() {
        return Err(not_writable(format!("{} is not a directory", probe_dir.display())));
    }

    let probe = probe_dir.join(format!(".upvault-write-probe-{}", std::process::id()));
    std::fs::write(&probe, b"").map_err(|e| not_writable(e.to_string()))?;
    let _ = std::fs::remove_file(&probe);
    Ok(())
}

/// Final result of a run that got past validation.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub report: MigrationReport,
    pub state: RunState,
    /// Strict attachment policy was active and something was missing.
    pub strict_failure: bool,
}

impl MigrationOutcome {
    pub fn exit_code(&self) -> ExitCode {
        if self.strict_failure {
            ExitCode::MissingAttachments
        } else {
            ExitCode::Success
        }
    }
}

/// One note after loading: parsed, or failed with the reason.
enum Loaded {
    Note(SourceNote),
    Failed { id: PathBuf, error: MigrateError },
}

/// Output of the rewriting step for one note.
struct PlannedNote {
    entry: NoteEntry,
    outputs: Vec<OutputNote>,
    copies: Vec<PlannedCopy>,
}

/// A configured migration run.
pub struct Migration {
    config: MigrationConfig,
    state: RunState,
}

impl Migration {
    /// Create a run. Derived config behavior is applied here.
    pub fn new(config: MigrationConfig) -> Self {
        Self {
            config: config.effective(),
            state: RunState::Validating,
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "Run state change");
        self.state = next;
    }

    /// Run with the default sink for the configured mode and no progress output.
    pub fn run(&mut self) -> Result<MigrationOutcome> {
        if self.config.dry_run {
            self.run_with(&mut DryRunSink::new(), &mut NoProgress)
        } else {
            self.run_with(&mut FsSink, &mut NoProgress)
        }
    }

    /// Run every step, pushing operations through `sink`.
    pub fn run_with(&mut self, sink: &mut dyn OutputSink, progress: &mut dyn ProgressSink) -> Result<MigrationOutcome> {
        self.transition(RunState::Validating);
        let preflight = match validate(&self.config) {
            Ok(preflight) => preflight,
            Err(e) => {
                error!(error = %e, "Pre-flight validation failed");
                self.transition(RunState::Failed);
                return Err(e);
            }
        };

        self.transition(RunState::Loading);
        let loaded = self.load(&preflight);

        self.transition(RunState::Resolving);
        let (resolved, index) = self.resolve(loaded);

        self.transition(RunState::Rewriting);
        let mut resolver = AttachmentResolver::new(preflight.export.files_root());
        let planned = self.rewrite(resolved, &index, &mut resolver);

        self.transition(if self.config.dry_run {
            RunState::Simulating
        } else {
            RunState::Writing
        });
        let mut report = ReportBuilder::new(ReportHeader::from_config(&self.config));
        let mut copies = 0;
        progress.start(planned.len());
        for (i, note) in planned.into_iter().enumerate() {
            copies += note.copies.len();
            report.push(emit(note, sink));
            progress.advance(i + 1);
        }
        progress.finish();

        self.transition(RunState::Reporting);
        let mut report = report.finish(copies, resolver.found_count(), resolver.missing_count());
        if self.config.report_redact {
            report = report.redacted();
        }

        let strict_failure = self.config.is_strict() && report.summary.attachments_missing > 0;
        if strict_failure {
            error!(
                missing = report.summary.attachments_missing,
                "Strict attachment policy: missing attachments"
            );
        }

        info!(
            notes = report.summary.notes_processed,
            failed = report.summary.notes_failed,
            written = report.summary.notes_written,
            copied = report.summary.attachments_copied,
            simulated = self.config.dry_run,
            "Migration finished"
        );

        self.transition(RunState::Done);
        Ok(MigrationOutcome {
            report,
            state: self.state,
            strict_failure,
        })
    }

    fn load(&self, preflight: &Preflight) -> Vec<Loaded> {
        preflight
            .notes
            .iter()
            .map(|id| {
                match SourceNote::load(&preflight.export.root, id, &self.config.category_key) {
                    Ok(note) => Loaded::Note(note),
                    Err(error) => {
                        warn!(note = %id.display(), error = %error, "Failed to load note");
                        Loaded::Failed {
                            id: id.clone(),
                            error,
                        }
                    }
                }
            })
            .collect()
    }

    /// Compute destinations per note and the cross-note index.
    fn resolve(&self, loaded: Vec<Loaded>) -> (Vec<(Loaded, Vec<ResolvedDestination>)>, NoteIndex) {
        let mut index = NoteIndex::new();
        let resolved = loaded
            .into_iter()
            .map(|item| {
                let destinations = match &item {
                    Loaded::Note(note) => {
                        let destinations = resolve_destinations(&note.categories, &self.config.base_dir, &note.file_name);
                        if let Some(primary) = destinations.first() {
                            index.insert(&note.stem(), primary);
                        }
                        debug!(note = %note.id.display(), copies = destinations.len(), "Resolved destinations");
                        destinations
                    }
                    Loaded::Failed { .. } => Vec::new(),
                };
                (item, destinations)
            })
            .collect();
        (resolved, index)
    }

    fn rewrite(
        &self,
        resolved: Vec<(Loaded, Vec<ResolvedDestination>)>,
        index: &NoteIndex,
        resolver: &mut AttachmentResolver,
    ) -> Vec<PlannedNote> {
        let ctx = RewriteContext {
            mode: self.config.link_mode,
            files_dir: &self.config.files_dir,
            attachments_dir: &self.config.attachments_dir,
            index,
        };

        resolved
            .into_iter()
            .map(|(item, destinations)| match item {
                Loaded::Note(note) => self.plan_note(&note, &destinations, &ctx, resolver),
                Loaded::Failed { id, error } => PlannedNote {
                    entry: NoteEntry {
                        note: display_name(&id),
                        title: crate::note::note_stem(&id),
                        error: Some(error.to_string()),
                        ..Default::default()
                    },
                    outputs: Vec::new(),
                    copies: Vec::new(),
                },
            })
            .collect()
    }

    fn plan_note(
        &self,
        note: &SourceNote,
        destinations: &[ResolvedDestination],
        ctx: &RewriteContext<'_>,
        resolver: &mut AttachmentResolver,
    ) -> PlannedNote {
        let mut entry = NoteEntry {
            note: note.file_name.clone(),
            title: note.title.clone(),
            ..Default::default()
        };

        let frontmatter = if self.config.keep_frontmatter {
            let mut frontmatter = note.frontmatter.clone();
            if self.config.convert_tags {
                let tags = derive_tags(&note.categories, &self.config.tag_prefix);
                entry.tags_added = merge_tags(&mut frontmatter, &tags);
            }
            Some(frontmatter)
        } else {
            None
        };

        let mut outputs = Vec::with_capacity(destinations.len());
        let mut copies = Vec::new();

        for (i, destination) in destinations.iter().enumerate() {
            let outcome = rewrite_body(&note.body, destination, ctx, resolver);

            // Attachments and unresolved links are the same for every copy
            if i == 0 {
                entry.attachments = outcome
                    .attachments
                    .iter()
                    .map(|a| AttachmentEntry {
                        name: a.name.clone(),
                        found: a.found,
                    })
                    .collect();
                entry.unresolved_links = outcome.unresolved.clone();
            }

            if !self.config.skip_attachments {
                copies.extend(
                    outcome
                        .attachments
                        .iter()
                        .filter_map(|record| resolver.plan_copy(record, &destination.folder, ctx.attachments_dir)),
                );
            }

            entry.destinations.push(DestinationEntry {
                folder: destination.display_folder(),
                file: note.file_name.clone(),
                links_rewritten: outcome.links_rewritten,
                samples: outcome.samples,
            });

            outputs.push(OutputNote {
                destination: destination.clone(),
                frontmatter: frontmatter.clone(),
                rewritten_body: outcome.body,
            });
        }

        PlannedNote {
            entry,
            outputs,
            copies,
        }
    }
}

/// Push one note's outputs and copies through the sink.
///
/// A failure is recorded on the note's entry; later notes still run.
fn emit(planned: PlannedNote, sink: &mut dyn OutputSink) -> NoteEntry {
    let PlannedNote {
        mut entry,
        outputs,
        copies,
    } = planned;

    let result = (|| -> Result<()> {
        for output in &outputs {
            sink.ensure_dir(&output.destination.folder)?;
            let content = render_note(output.frontmatter.as_ref(), &output.rewritten_body)?;
            sink.write_note(&output.destination.file, &content)?;
        }
        for copy in &copies {
            if let Some(parent) = copy.destination.parent() {
                sink.ensure_dir(parent)?;
            }
            sink.copy_file(&copy.source, &copy.destination)?;
        }
        Ok(())
    })();

    if let Err(e) = result {
        error!(note = %entry.note, error = %e, "Failed to write note");
        entry.error = Some(e.to_string());
    }

    entry
}

fn display_name(id: &Path) -> String {
    id.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.display().to_string())
}
