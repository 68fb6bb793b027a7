// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Feed document storage.
//!
//! The feed lives in a single XML document on disk. A document goes through
//! three states:
//!
//! - __Absent__: nothing on disk yet. Loading yields an empty feed built from
//!   configured channel metadata, and the caller must write it out.
//! - __Loaded__: document parsed into memory, duplicate entries collapsed.
//! - __Persisted__: document serialized back to disk.
//!
//! # Atomic Replacement
//!
//! Persisting never overwrites the document in place. The new content is
//! written to a temporary file in the same directory, synced, and renamed
//! over the old document. An interrupted run therefore leaves either the old
//! document or the new one, never a truncated mix of both.

use crate::{
    config::{ChannelConfig, OnCorrupt},
    feed::{Feed, FeedError},
};

use std::{
    fs::{self, Permissions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

/// State a feed document was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// No document existed.
    Absent,

    /// Existing document parsed fine.
    Loaded,

    /// Existing document was unparseable and got discarded.
    Reset,
}

/// Feed loaded from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFeed {
    /// Feed content.
    pub feed: Feed,

    /// State document was found in.
    pub state: DocumentState,

    /// Number of duplicate entries collapsed while loading.
    pub collapsed: usize,
}

/// Handle to feed document on disk.
#[derive(Debug, Clone)]
pub struct FeedStore {
    path: PathBuf,
}

impl FeedStore {
    /// Construct new feed store handle.
    ///
    /// Does not touch the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to feed document.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Load feed document.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Read`] if document exists but cannot be read.
    /// - Return [`StoreError::Parse`] if document cannot be parsed, and
    ///   `on_corrupt` is [`OnCorrupt::Fail`].
    #[instrument(skip(self, channel), level = "debug")]
    pub fn load(&self, channel: &ChannelConfig, on_corrupt: OnCorrupt) -> Result<LoadedFeed> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!("no feed at {:?}, starting a new one", self.path.display());
                return Ok(LoadedFeed {
                    feed: Feed::empty(channel),
                    state: DocumentState::Absent,
                    collapsed: 0,
                });
            }
            Err(source) => {
                return Err(StoreError::Read {
                    source,
                    path: self.path.clone(),
                })
            }
        };

        let mut feed = match Feed::from_xml(&content) {
            Ok(feed) => feed,
            Err(source) => match on_corrupt {
                OnCorrupt::Fail => {
                    return Err(StoreError::Parse {
                        source,
                        path: self.path.clone(),
                    })
                }
                OnCorrupt::Reset => {
                    warn!(
                        "discarding unparseable feed at {:?}: {source}",
                        self.path.display()
                    );
                    return Ok(LoadedFeed {
                        feed: Feed::empty(channel),
                        state: DocumentState::Reset,
                        collapsed: 0,
                    });
                }
            },
        };

        let collapsed = feed.collapse_duplicates();
        if collapsed > 0 {
            warn!("collapsed {collapsed} duplicate feed entries");
        }
        debug!("loaded {} feed entries", feed.entries.len());

        Ok(LoadedFeed {
            feed,
            state: DocumentState::Loaded,
            collapsed,
        })
    }

    /// Persist feed document through atomic replacement.
    ///
    /// Creates missing parent directories. Keeps permissions of the document
    /// being replaced, or makes a new document world readable on Unix.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Render`] if feed cannot be serialized.
    /// - Return [`StoreError::Write`] if any filesystem step fails.
    #[instrument(skip(self, feed), level = "debug")]
    pub fn persist(&self, feed: &Feed) -> Result<()> {
        let content = feed.to_xml()?;
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        mkdirp::mkdirp(&parent).map_err(|source| self.write_error(source))?;
        let mut staged = NamedTempFile::new_in(&parent).map_err(|source| self.write_error(source))?;
        staged
            .write_all(content.as_bytes())
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|source| self.write_error(source))?;

        if let Some(permissions) = self.target_permissions() {
            staged
                .as_file()
                .set_permissions(permissions)
                .map_err(|source| self.write_error(source))?;
        }

        staged
            .persist(&self.path)
            .map_err(|error| self.write_error(error.error))?;
        info!("wrote {} entries to {:?}", feed.entries.len(), self.path.display());

        Ok(())
    }

    fn target_permissions(&self) -> Option<Permissions> {
        fs::metadata(&self.path)
            .ok()
            .map(|metadata| metadata.permissions())
            .or_else(default_permissions)
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            source,
            path: self.path.clone(),
        }
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

/// Feed storage error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Feed document cannot be read.
    #[error("failed to read feed at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Feed document cannot be parsed.
    #[error("failed to parse feed at {:?}", path.display())]
    Parse {
        #[source]
        source: FeedError,
        path: PathBuf,
    },

    /// Feed cannot be rendered.
    #[error(transparent)]
    Render(#[from] FeedError),

    /// Feed document cannot be written.
    #[error("failed to write feed at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
