//! Run configuration: defaults, optional TOML file, and derived behavior.

use crate::error::{MigrateError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default name of the attachments folder inside an export.
pub const DEFAULT_FILES_DIR: &str = "Files";

/// Default frontmatter key holding category labels.
pub const DEFAULT_CATEGORY_KEY: &str = "categories";

/// How link syntax is translated during rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LinkMode {
    /// Only path components change; syntax is left as found.
    #[default]
    Preserve,
    /// `[[Target|Alias]]` becomes `[Alias](Target.md)`.
    ToMarkdown,
    /// `[Text](target.md)` becomes `[[target|Text]]`.
    ToWikilink,
}

impl std::fmt::Display for LinkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkMode::Preserve => write!(f, "preserve"),
            LinkMode::ToMarkdown => write!(f, "to-markdown"),
            LinkMode::ToWikilink => write!(f, "to-wikilink"),
        }
    }
}

/// What happens when a referenced attachment cannot be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttachmentPolicy {
    /// Record as missing, warn, keep going, succeed.
    #[default]
    Lenient,
    /// Record as missing, keep going, fail the run at the end.
    Strict,
}

/// Rendering of the report file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Structured JSON document.
    #[default]
    Json,
    /// Flat Markdown summary.
    Md,
}

/// Every option of a migration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub source_dir: PathBuf,
    pub base_dir: PathBuf,
    /// Subfolder for attachments inside each destination folder (empty = alongside the note).
    pub attachments_dir: String,
    pub keep_frontmatter: bool,
    pub dry_run: bool,
    pub skip_attachments: bool,
    pub attachment_policy: AttachmentPolicy,
    pub report_path: PathBuf,
    pub report_format: ReportFormat,
    pub report_redact: bool,
    pub link_mode: LinkMode,
    pub convert_tags: bool,
    pub tag_prefix: String,
    pub category_key: String,
    pub files_dir: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            base_dir: PathBuf::from("Notes"),
            attachments_dir: String::new(),
            keep_frontmatter: false,
            dry_run: false,
            skip_attachments: false,
            attachment_policy: AttachmentPolicy::Lenient,
            report_path: PathBuf::from("migration-report.json"),
            report_format: ReportFormat::Json,
            report_redact: false,
            link_mode: LinkMode::Preserve,
            convert_tags: false,
            tag_prefix: String::new(),
            category_key: DEFAULT_CATEGORY_KEY.to_string(),
            files_dir: DEFAULT_FILES_DIR.to_string(),
        }
    }
}

impl MigrationConfig {
    /// Default config file location (`~/.config/upvault/config.toml` on Linux).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("upvault").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default location is used
    /// when present, otherwise built-in defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(MigrateError::ConfigError(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(path)
            }
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Whether the strict missing-attachment policy is active.
    pub fn is_strict(&self) -> bool {
        self.attachment_policy == AttachmentPolicy::Strict
    }

    /// Apply derived behavior and normalize string options.
    ///
    /// Tag conversion forces frontmatter retention since tags live there.
    pub fn effective(mut self) -> Self {
        if self.convert_tags && !self.keep_frontmatter {
            warn!("Tag conversion requires frontmatter; enabling keep_frontmatter");
            self.keep_frontmatter = true;
        }
        self.attachments_dir = self
            .attachments_dir
            .trim()
            .trim_matches('/')
            .to_string();
        self.files_dir = self.files_dir.trim().trim_matches('/').to_string();
        if self.files_dir.is_empty() {
            self.files_dir = DEFAULT_FILES_DIR.to_string();
        }
        if self.category_key.trim().is_empty() {
            self.category_key = DEFAULT_CATEGORY_KEY.to_string();
        }
        self
    }
}
