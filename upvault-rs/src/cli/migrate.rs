//! `migrate` and `validate` commands.

use crate::cli::output::Output;
use crate::config::{MigrationConfig, ReportFormat};
use crate::error::{ExitCode, Result};
use crate::migrate::{DryRunSink, FsSink, Migration, NoProgress, OutputSink, ProgressSink, TerminalProgress, validate};
use crate::report::{MigrationReport, Summary};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// What `migrate` prints on stdout.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub simulated: bool,
    pub report_path: PathBuf,
    pub strict_failure: bool,
    // Tables last so TOML output stays valid
    pub summary: Summary,
}

/// What `validate` prints on stdout.
#[derive(Debug, Serialize)]
pub struct ValidationSummary {
    pub valid: bool,
    pub source_dir: PathBuf,
    pub notes: usize,
    pub warnings: Vec<String>,
}

/// Run a migration, write the report, print the summary.
pub fn migrate(config: MigrationConfig, show_progress: bool, output: &Output) -> Result<ExitCode> {
    let mut migration = Migration::new(config);

    let mut fs_sink = FsSink;
    let mut dry_sink = DryRunSink::new();
    let sink: &mut dyn OutputSink = if migration.config().dry_run {
        &mut dry_sink
    } else {
        &mut fs_sink
    };

    let mut terminal = TerminalProgress::new();
    let mut silent = NoProgress;
    let progress: &mut dyn ProgressSink = if show_progress { &mut terminal } else { &mut silent };

    let outcome = migration.run_with(sink, progress)?;
    let config = migration.config();

    let mut report = outcome.report.clone();
    report.header.generated_utc = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
    write_report(&report, &config.report_path, config.report_format)?;
    info!(path = %config.report_path.display(), "Report written");

    if outcome.strict_failure {
        output.warn(&format!(
            "{} attachment(s) missing with strict policy",
            report.summary.attachments_missing
        ));
    }

    output.print(&RunSummary {
        simulated: report.header.simulated,
        report_path: config.report_path.clone(),
        strict_failure: outcome.strict_failure,
        summary: report.summary.clone(),
    })?;

    Ok(outcome.exit_code())
}

/// Run pre-flight checks only.
pub fn validate_only(config: MigrationConfig, output: &Output) -> Result<ExitCode> {
    let config = config.effective();
    let preflight = validate(&config)?;

    for warning in &preflight.warnings {
        output.warn(warning);
    }

    output.print(&ValidationSummary {
        valid: true,
        source_dir: preflight.export.root.clone(),
        notes: preflight.notes.len(),
        warnings: preflight.warnings.clone(),
    })?;

    Ok(ExitCode::Success)
}

/// Render and write the report file, creating its folder if needed.
pub fn write_report(report: &MigrationReport, path: &Path, format: ReportFormat) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, report.render(format)?)?;
    Ok(())
}
