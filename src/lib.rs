// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Keep an RSS feed in sync with a folder of published documents.
//!
//! Docfeed scans a documentation directory for documents (PDF files by
//! default), dates each one through version control history or filesystem
//! metadata, and merges the result into an RSS 2.0 feed document. Dates of
//! unchanged documents are carried forward untouched, so readers are only
//! notified about documents that are actually new or updated.
//!
//! # Pipeline
//!
//! 1. [`scan`] lists documents under the documentation directory.
//! 2. [`timestamp`] resolves a publication instant for each document.
//! 3. [`store`] loads the existing feed document, if any.
//! 4. [`merge`] reconciles documents with existing entries by link.
//! 5. [`store`] atomically writes the feed back if anything changed.
//!
//! [`sync::Synchronizer`] composes all of these into one run.

pub mod config;
pub mod feed;
pub mod merge;
pub mod path;
pub mod scan;
pub mod store;
pub mod sync;
pub mod timestamp;

pub use config::FeedConfig;
pub use feed::{Entry, Feed, PubDate};
pub use sync::{SyncOptions, SyncReport, Synchronizer};
