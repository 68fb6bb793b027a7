// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Reconcile discovered documents with existing feed entries.
//!
//! Merging is a pure function over the entries of the existing feed and the
//! documents found by the current scan. Entries are matched by link:
//!
//! - Known document, newer instant: publication date replaced in place.
//! - Known document, same or older instant: untouched, date kept verbatim.
//! - Unknown document: new entry appended.
//! - Entry without document: pruned or kept according to [`StalePolicy`].
//!
//! The merged listing is then stably sorted newest first.

use crate::{
    config::{NewEntryDate, StalePolicy},
    feed::{collapse_entries, Entry},
};

use chrono::{DateTime, SubsecRound, Utc};
use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
};

/// Document found by the current scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    /// Path relative to documentation directory.
    pub relative: PathBuf,

    /// Derived entry title.
    pub title: String,

    /// Derived entry link.
    pub link: String,

    /// Instant reported by timestamp resolver, if any.
    pub resolved: Option<DateTime<Utc>>,
}

/// Merge behavior knobs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    pub stale: StalePolicy,
    pub new_entries: NewEntryDate,
}

/// Links touched by a merge, grouped by kind of change.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub retitled: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: usize,
}

impl MergeReport {
    /// Check if merge modified the entry listing.
    pub fn changed(&self) -> bool {
        !(self.added.is_empty()
            && self.updated.is_empty()
            && self.retitled.is_empty()
            && self.removed.is_empty())
    }
}

/// Result of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Merged entries, newest first.
    pub entries: Vec<Entry>,

    /// What changed.
    pub report: MergeReport,
}

/// Merge discovered documents into existing entries.
///
/// `now` is the instant of the current run. It dates new entries, and any
/// document whose instant could not be resolved.
pub fn merge(
    mut existing: Vec<Entry>,
    discovered: &[Discovered],
    options: MergeOptions,
    now: DateTime<Utc>,
) -> MergeOutcome {
    // INVARIANT: Instants are compared at the whole second precision feeds store.
    let now = now.trunc_subsecs(0);
    let by_link: HashMap<&str, &Discovered> = discovered
        .iter()
        .map(|found| (found.link.as_str(), found))
        .collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut report = MergeReport::default();

    // INVARIANT: At most one entry per link, the newest one.
    report.removed = collapse_entries(&mut existing);
    let mut entries = Vec::with_capacity(existing.len().max(discovered.len()));

    for mut entry in existing {
        let Some(found) = by_link.get(entry.key()) else {
            match options.stale {
                StalePolicy::Prune => report.removed.push(entry.key().to_string()),
                StalePolicy::Keep => {
                    seen.insert(entry.key().to_string());
                    entries.push(entry);
                }
            }
            continue;
        };
        seen.insert(entry.key().to_string());

        let mut touched = false;
        let current = entry.pub_date.sort_key();
        let resolved = found.resolved.map(|instant| instant.trunc_subsecs(0));
        if let Some(instant) = resolved.filter(|instant| Some(*instant) > current) {
            entry.pub_date = instant.into();
            report.updated.push(found.link.clone());
            touched = true;
        }

        if entry.title != found.title {
            entry.title = found.title.clone();
            report.retitled.push(found.link.clone());
            touched = true;
        }

        if !touched {
            report.unchanged += 1;
        }
        entries.push(entry);
    }

    for found in discovered {
        if !seen.insert(found.link.clone()) {
            continue;
        }

        let pub_date = match options.new_entries {
            NewEntryDate::Now => now,
            NewEntryDate::Resolved => found
                .resolved
                .map(|instant| instant.trunc_subsecs(0))
                .unwrap_or(now),
        };
        entries.push(Entry::new(found.title.clone(), found.link.clone(), pub_date));
        report.added.push(found.link.clone());
    }

    sort_entries(&mut entries);
    MergeOutcome { entries, report }
}

/// Sort entries newest first.
///
/// Sorting is stable, so entries sharing an instant keep their relative
/// order. Malformed dates sink to the bottom.
pub fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.pub_date.sort_key().cmp(&a.pub_date.sort_key()));
}
