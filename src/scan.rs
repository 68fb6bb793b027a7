// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Document discovery.
//!
//! Walk the documentation directory and collect every file whose name
//! matches one of the include globs. Gitignore rules are deliberately not
//! honored: a generated PDF is often ignored by version control yet still
//! published, so only the `.git` directory itself is skipped.

use glob::Pattern;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// File name matcher built from include globs.
#[derive(Debug, Clone)]
pub struct IncludeFilter {
    patterns: Vec<Pattern>,
}

impl IncludeFilter {
    /// Construct new include filter.
    ///
    /// # Errors
    ///
    /// - Return [`ScanError::Pattern`] if any glob is invalid.
    pub fn new(globs: impl IntoIterator<Item = impl AsRef<str>>) -> Result<Self> {
        let mut patterns = Vec::new();
        for glob in globs {
            let glob = glob.as_ref();
            let pattern = Pattern::new(glob).map_err(|source| ScanError::Pattern {
                source,
                glob: glob.to_string(),
            })?;
            patterns.push(pattern);
        }

        Ok(Self { patterns })
    }

    /// Check if file name matches any include glob.
    pub fn matches(&self, path: impl AsRef<Path>) -> bool {
        let Some(name) = path.as_ref().file_name() else {
            return false;
        };
        let name = name.to_string_lossy();
        self.patterns.iter().any(|pattern| pattern.matches(&name))
    }
}

/// Collect documents under root directory.
///
/// Returned paths are relative to `root` and sorted, so callers get a stable
/// discovery order. A missing root is not an error; it simply holds zero
/// documents.
///
/// # Errors
///
/// - Return [`ScanError::Walk`] if a directory entry cannot be read.
#[instrument(skip(root, filter), level = "debug")]
pub fn scan(root: impl AsRef<Path>, filter: &IncludeFilter) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.is_dir() {
        warn!("documentation directory {:?} does not exist", root.display());
        return Ok(Vec::new());
    }

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build();

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry?;
        let is_file = entry.file_type().is_some_and(|kind| kind.is_file());
        if !is_file || !filter.matches(entry.path()) {
            continue;
        }

        // INVARIANT: Every walked path lives under root.
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();
        debug!("found document {:?}", relative.display());
        found.push(relative);
    }

    found.sort();
    Ok(found)
}

/// Document discovery error types.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Include glob cannot be compiled.
    #[error("invalid include glob {glob:?}")]
    Pattern {
        #[source]
        source: glob::PatternError,
        glob: String,
    },

    /// Directory traversal fails.
    #[error(transparent)]
    Walk(#[from] ignore::Error),
}

/// Friendly result alias :3
pub type Result<T, E = ScanError> = std::result::Result<T, E>;
