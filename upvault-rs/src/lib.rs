//! upvault - migrate a flat UpNote markdown export into a foldered Obsidian vault.
//!
//! # Overview
//!
//! Each exported note carries category labels in its frontmatter. upvault:
//! - Rebuilds a folder hierarchy from those labels (one copy per category)
//! - Copies referenced attachments next to every copy and rewrites their links
//! - Rewrites cross-note links for the new layout, optionally converting
//!   between wikilinks and markdown links
//! - Optionally derives tags from categories
//! - Records everything in a report, identical for dry runs and real runs
//!
//! Fenced code blocks and inline code are never rewritten.
//!
//! # Example
//!
//! ```no_run
//! use upvault::{Migration, MigrationConfig};
//!
//! let config = MigrationConfig {
//!     source_dir: "export".into(),
//!     base_dir: "vault/Notes".into(),
//!     dry_run: true,
//!     ..Default::default()
//! };
//!
//! let outcome = Migration::new(config).run().unwrap();
//! println!("{}", outcome.report.to_markdown());
//! ```

pub mod attachment;
pub mod category;
pub mod cli;
pub mod config;
pub mod error;
pub mod migrate;
pub mod note;
pub mod parser;
pub mod report;
pub mod rewrite;
pub mod tags;
pub mod types;
pub mod vault;

// Re-export main types at crate root
pub use config::{AttachmentPolicy, LinkMode, MigrationConfig, ReportFormat};
pub use error::{MigrateError, Result};
pub use migrate::{Migration, MigrationOutcome, RunState};
pub use note::SourceNote;
pub use report::MigrationReport;
pub use types::*;
pub use vault::SourceExport;
