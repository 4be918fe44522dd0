//! Error types and exit codes for upvault.

use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const VALIDATION_FAILED: i32 = 2;
    pub const MISSING_ATTACHMENTS: i32 = 3;
    pub const INVALID_FRONTMATTER: i32 = 5;
}

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Source is not a directory: {0}")]
    SourceNotDirectory(PathBuf),

    #[error("No .md files found in source directory: {0}")]
    NoNotes(PathBuf),

    #[error("Attachments folder exists but is not a directory: {0}")]
    AttachmentsNotDirectory(PathBuf),

    #[error("Cannot write to output directory {path}: {message}")]
    DestinationNotWritable { path: PathBuf, message: String },

    #[error("Invalid frontmatter in {path}: {message}")]
    InvalidFrontmatter { path: PathBuf, message: String },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),
}

impl MigrateError {
    /// Returns the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrateError::SourceNotFound(_)
            | MigrateError::SourceNotDirectory(_)
            | MigrateError::NoNotes(_)
            | MigrateError::AttachmentsNotDirectory(_)
            | MigrateError::DestinationNotWritable { .. } => exit_code::VALIDATION_FAILED,
            MigrateError::InvalidFrontmatter { .. } => exit_code::INVALID_FRONTMATTER,
            _ => exit_code::GENERAL_ERROR,
        }
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    MissingAttachments,
}

impl ExitCode {
    /// Convert to exit code integer.
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => exit_code::SUCCESS,
            ExitCode::MissingAttachments => exit_code::MISSING_ATTACHMENTS,
        }
    }
}
