// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Feed synchronization.
//!
//! Compose scanning, timestamp resolution, loading, merging, and persisting
//! into one run. Each stage lives in its own module and knows nothing about
//! the others; this module is the only place where they meet.

use crate::{
    config::FeedConfig,
    feed::{Channel, Feed},
    merge::{merge, Discovered, MergeOptions, MergeReport},
    path::{entry_link, entry_title, PathError},
    scan::{scan, IncludeFilter, ScanError},
    store::{DocumentState, FeedStore, StoreError},
    timestamp::{source_for, TimestampSource},
};

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// Per-run switches.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Write feed even if nothing changed.
    pub force: bool,

    /// Compute everything, but never write.
    pub dry_run: bool,
}

/// Outcome of one synchronization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Path of feed document.
    pub feed_path: PathBuf,

    /// State feed document was found in.
    pub state: DocumentState,

    /// Number of documents found by scan.
    pub discovered: usize,

    /// Duplicate entries collapsed while loading.
    pub collapsed: usize,

    /// Channel metadata differed from configuration.
    pub channel_refreshed: bool,

    /// Entry level changes.
    pub merge: MergeReport,

    /// Resulting feed, whether written or not.
    pub feed: Feed,

    /// Feed document was written.
    pub written: bool,
}

impl SyncReport {
    /// Check if run found anything that differs from the stored feed.
    pub fn changed(&self) -> bool {
        self.merge.changed()
            || self.collapsed > 0
            || self.channel_refreshed
            || self.state != DocumentState::Loaded
    }
}

/// Synchronize feed document with documentation directory.
pub struct Synchronizer<S = Box<dyn TimestampSource>>
where
    S: TimestampSource,
{
    config: FeedConfig,
    source: S,
}

impl Synchronizer {
    /// Construct new synchronizer using configured timestamp source.
    pub fn from_config(config: FeedConfig) -> Self {
        let source = source_for(config.timestamps, &config.docs_dir);
        Self::new(config, source)
    }
}

impl<S> Synchronizer<S>
where
    S: TimestampSource,
{
    /// Construct new synchronizer with explicit timestamp source.
    pub fn new(config: FeedConfig, source: S) -> Self {
        Self { config, source }
    }

    /// Configuration in use.
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Scan documentation directory, and derive entry data for each document.
    ///
    /// Documents whose instant cannot be resolved are still returned, just
    /// without an instant.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Scan`] if scanning fails.
    /// - Return [`SyncError::Path`] if channel link is not a usable URL.
    #[instrument(skip(self), level = "debug")]
    pub fn discover(&self) -> Result<Vec<Discovered>> {
        let root = &self.config.docs_dir;
        let filter = IncludeFilter::new(&self.config.include)?;

        let mut discovered = Vec::new();
        for relative in scan(root, &filter)? {
            let link = entry_link(&self.config.channel.link, &relative)?;
            let title = entry_title(&relative, self.config.title_case);
            let resolved = match self.source.resolve(root, &relative) {
                Ok(instant) => Some(instant),
                Err(error) => {
                    warn!("cannot date {:?}: {error}", relative.display());
                    None
                }
            };
            debug!("{:?} -> {link} ({resolved:?})", relative.display());

            discovered.push(Discovered {
                relative,
                title,
                link,
                resolved,
            });
        }

        Ok(discovered)
    }

    /// Run one synchronization at instant `now`.
    ///
    /// The feed is written when the merge changed something, when the
    /// document was absent, reset, or held duplicates, when channel metadata
    /// drifted from configuration, or when forced. Dry runs never write.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Scan`] or [`SyncError::Path`] if discovery
    ///   fails.
    /// - Return [`SyncError::Store`] if feed cannot be loaded or written.
    #[instrument(skip(self, now), level = "debug")]
    pub fn run(&self, options: SyncOptions, now: DateTime<Utc>) -> Result<SyncReport> {
        let discovered = self.discover()?;
        info!(
            "found {} documents in {:?}",
            discovered.len(),
            self.config.docs_dir.display()
        );

        let store = FeedStore::new(self.config.feed_path());
        let loaded = store.load(&self.config.channel, self.config.on_corrupt)?;
        let mut feed = loaded.feed;

        let channel_refreshed = !feed.channel.matches(&self.config.channel);
        if channel_refreshed {
            info!("refreshing channel metadata");
            feed.channel = Channel {
                last_build_date: feed.channel.last_build_date.take(),
                ..Channel::from(&self.config.channel)
            };
        }

        let merge_options = MergeOptions {
            stale: self.config.stale,
            new_entries: self.config.new_entries,
        };
        let outcome = merge(feed.entries, &discovered, merge_options, now);
        feed.entries = outcome.entries;
        log_changes(&outcome.report);

        let mut report = SyncReport {
            feed_path: store.path().to_path_buf(),
            state: loaded.state,
            discovered: discovered.len(),
            collapsed: loaded.collapsed,
            channel_refreshed,
            merge: outcome.report,
            feed,
            written: false,
        };

        if !(report.changed() || options.force) {
            info!("feed is up to date");
            return Ok(report);
        }

        if options.dry_run {
            info!("dry run, not writing {:?}", report.feed_path.display());
            return Ok(report);
        }

        report.feed.channel.last_build_date = Some(now.into());
        store.persist(&report.feed)?;
        report.written = true;

        Ok(report)
    }
}

fn log_changes(report: &MergeReport) {
    for link in &report.added {
        info!("new: {link}");
    }
    for link in &report.updated {
        info!("updated: {link}");
    }
    for link in &report.retitled {
        info!("retitled: {link}");
    }
    for link in &report.removed {
        info!("removed: {link}");
    }
}

/// Synchronization error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Documentation directory cannot be scanned.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Entry link cannot be derived.
    #[error(transparent)]
    Path(#[from] PathError),

    /// Feed document cannot be loaded or written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Friendly result alias :3
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
