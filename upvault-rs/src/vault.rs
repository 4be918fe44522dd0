//! Source export representation.

use crate::error::{MigrateError, Result};
use glob::{Pattern, glob};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A flat UpNote-style markdown export: `*.md` files plus an attachments folder.
#[derive(Debug, Clone)]
pub struct SourceExport {
    /// Root path of the export.
    pub root: PathBuf,

    /// Name of the attachments folder inside the root.
    pub files_dir: String,
}

impl SourceExport {
    /// Open an export, checking that the root is a directory.
    pub fn open(root: impl Into<PathBuf>, files_dir: impl Into<String>) -> Result<Self> {
        let root = root.into();

        if !root.exists() {
            return Err(MigrateError::SourceNotFound(root));
        }
        if !root.is_dir() {
            return Err(MigrateError::SourceNotDirectory(root));
        }

        Ok(Self {
            root,
            files_dir: files_dir.into(),
        })
    }

    /// Full path of the attachments folder (may not exist).
    pub fn files_root(&self) -> PathBuf {
        self.root.join(&self.files_dir)
    }

    /// List the markdown notes directly inside the export, sorted by path.
    ///
    /// The `.md` extension matches in any case.
    pub fn list_notes(&self) -> Result<Vec<PathBuf>> {
        let root = Pattern::escape(&self.root.to_string_lossy());
        let pattern = Path::new(&root).join("*");
        let pattern_str = pattern.to_string_lossy();

        let mut notes = Vec::new();

        for entry in glob(&pattern_str)? {
            match entry {
                Ok(path) => {
                    if !path.is_file() || !is_markdown(&path) {
                        continue;
                    }
                    if let Ok(relative) = path.strip_prefix(&self.root) {
                        // Skip hidden files
                        if !relative.to_string_lossy().starts_with('.') {
                            notes.push(relative.to_path_buf());
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Glob error while listing notes");
                }
            }
        }

        notes.sort();

        Ok(notes)
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}
