//! CLI argument definitions using clap.

use crate::config::{AttachmentPolicy, LinkMode, MigrationConfig, ReportFormat};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "upvault")]
#[command(author, version, about = "Migrate an UpNote markdown export into a foldered Obsidian vault", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ~/.config/upvault/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the run summary as JSON (default)
    #[arg(long, global = true, conflicts_with_all = ["yaml", "toml"])]
    pub json: bool,

    /// Print the run summary as YAML
    #[arg(long, global = true, conflicts_with_all = ["json", "toml"])]
    pub yaml: bool,

    /// Print the run summary as TOML
    #[arg(long, global = true, conflicts_with_all = ["json", "yaml"])]
    pub toml: bool,

    /// Only log errors and suppress the summary
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Increase log verbosity (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Also write debug-level logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Disable the progress counter
    #[arg(long, global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.yaml {
            OutputFormat::Yaml
        } else if self.toml {
            OutputFormat::Toml
        } else {
            OutputFormat::Json
        }
    }

    /// Console log filter directive for the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Toml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate the export into the vault (or simulate with --dry-run)
    Migrate(MigrateArgs),

    /// Run pre-flight checks only
    Validate(MigrateArgs),
}

impl Commands {
    pub fn args(&self) -> &MigrateArgs {
        match self {
            Commands::Migrate(args) | Commands::Validate(args) => args,
        }
    }
}

#[derive(Args, Debug, Default, Clone)]
pub struct MigrateArgs {
    /// Folder containing the exported .md files
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Root folder of the vault to create
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Subfolder for attachments inside each destination folder
    #[arg(long)]
    pub attachments_dir: Option<String>,

    /// Keep the original frontmatter in migrated notes
    #[arg(long)]
    pub keep_frontmatter: bool,

    /// Plan everything and write only the report
    #[arg(long)]
    pub dry_run: bool,

    /// Do not copy attachments (links are still rewritten)
    #[arg(long)]
    pub skip_attachments: bool,

    /// Exit with an error if any attachment is missing
    #[arg(long)]
    pub fail_on_missing: bool,

    /// Report file path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report file format
    #[arg(long, value_enum)]
    pub report_format: Option<ReportFormat>,

    /// Replace note titles and file names in the report with placeholders
    #[arg(long)]
    pub report_redact: bool,

    /// How to translate link syntax
    #[arg(long, value_enum)]
    pub wikilink_mode: Option<LinkMode>,

    /// Derive tags from categories (implies --keep-frontmatter)
    #[arg(long)]
    pub convert_tags: bool,

    /// Prefix for derived tags, e.g. "upnote/"
    #[arg(long)]
    pub tag_prefix: Option<String>,

    /// Frontmatter key holding category labels
    #[arg(long)]
    pub category_key: Option<String>,
}

impl MigrateArgs {
    /// Layer these flags over a loaded config. Value options replace, switches turn on.
    pub fn apply(&self, mut config: MigrationConfig) -> MigrationConfig {
        if let Some(dir) = &self.source_dir {
            config.source_dir = dir.clone();
        }
        if let Some(dir) = &self.base_dir {
            config.base_dir = dir.clone();
        }
        if let Some(dir) = &self.attachments_dir {
            config.attachments_dir = dir.clone();
        }
        if let Some(path) = &self.report {
            config.report_path = path.clone();
        }
        if let Some(format) = self.report_format {
            config.report_format = format;
        }
        if let Some(mode) = self.wikilink_mode {
            config.link_mode = mode;
        }
        if let Some(prefix) = &self.tag_prefix {
            config.tag_prefix = prefix.clone();
        }
        if let Some(key) = &self.category_key {
            config.category_key = key.clone();
        }

        config.keep_frontmatter |= self.keep_frontmatter;
        config.dry_run |= self.dry_run;
        config.skip_attachments |= self.skip_attachments;
        config.report_redact |= self.report_redact;
        config.convert_tags |= self.convert_tags;
        if self.fail_on_missing {
            config.attachment_policy = AttachmentPolicy::Strict;
        }

        config
    }
}
