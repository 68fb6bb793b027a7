// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{git_available, RepoFixture};

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use docfeed::{
    config::{ChannelConfig, NewEntryDate, TimestampKind},
    timestamp::{FileModified, Fallback, Git2History, GitLog, TimestampSource},
    Feed, FeedConfig, PubDate, SyncOptions, Synchronizer,
};
use pretty_assertions::assert_eq;
use std::{
    fs::{self, File},
    path::Path,
    time::{Duration, SystemTime},
};

const T1: i64 = 1_600_000_000;
const T2: i64 = 1_650_000_000;
const T3: i64 = 1_700_000_000;

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).unwrap()
}

fn tutorial_repo() -> Result<RepoFixture> {
    let fixture = RepoFixture::new()?;
    fixture.commit_file_at("docs/a.pdf", "first draft", T1)?;
    fixture.commit_file_at("docs/b.pdf", "only draft", T2)?;
    fixture.commit_file_at("docs/a.pdf", "second draft", T3)?;
    fixture.commit_file_at("README.md", "unrelated", T3 + 100)?;
    Ok(fixture)
}

fn config_for(fixture: &RepoFixture, timestamps: TimestampKind) -> FeedConfig {
    FeedConfig {
        docs_dir: fixture.workdir().join("docs"),
        timestamps,
        new_entries: NewEntryDate::Resolved,
        channel: ChannelConfig {
            title: "Tutorials".into(),
            link: "https://example.org/docs".into(),
            description: "Latest articles".into(),
        },
        ..FeedConfig::default()
    }
}

fn read_feed(config: &FeedConfig) -> Result<Feed> {
    Ok(fs::read_to_string(config.feed_path())?.parse()?)
}

#[test]
fn libgit2_history_reports_last_touching_commit() -> Result<()> {
    let fixture = tutorial_repo()?;
    let docs = fixture.workdir().join("docs");
    let history = Git2History::discover(&docs)?;

    assert_eq!(history.resolve(&docs, Path::new("a.pdf"))?, at(T3));
    assert_eq!(history.resolve(&docs, Path::new("b.pdf"))?, at(T2));

    Ok(())
}

#[test]
fn untracked_document_falls_back_to_mtime() -> Result<()> {
    let fixture = tutorial_repo()?;
    let docs = fixture.workdir().join("docs");
    fixture.write_file("docs/draft.pdf", "not committed")?;
    File::options()
        .write(true)
        .open(docs.join("draft.pdf"))?
        .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(T2 as u64 + 7))?;

    let history = Git2History::discover(&docs)?;
    assert!(history.resolve(&docs, Path::new("draft.pdf")).is_err());

    let source = Fallback::new(history, FileModified);
    assert_eq!(source.resolve(&docs, Path::new("draft.pdf"))?, at(T2 + 7));

    Ok(())
}

#[test]
fn git_log_reports_last_touching_commit() -> Result<()> {
    if !git_available() {
        return Ok(());
    }

    let fixture = tutorial_repo()?;
    let docs = fixture.workdir().join("docs");
    let source = GitLog::new();

    assert_eq!(source.resolve(&docs, Path::new("a.pdf"))?, at(T3));
    assert_eq!(source.resolve(&docs, Path::new("b.pdf"))?, at(T2));

    Ok(())
}

#[test]
fn sync_dates_entries_by_commit_time() -> Result<()> {
    let fixture = tutorial_repo()?;
    let config = config_for(&fixture, TimestampKind::Libgit2);

    let report = Synchronizer::from_config(config.clone()).run(SyncOptions::default(), at(T3 + 500))?;
    assert!(report.written);

    let feed = read_feed(&config)?;
    let entries: Vec<_> = feed
        .entries
        .iter()
        .map(|entry| (entry.link.as_str(), entry.pub_date.clone()))
        .collect();
    assert_eq!(
        entries,
        vec![
            ("https://example.org/docs/a.pdf", PubDate::from(at(T3))),
            ("https://example.org/docs/b.pdf", PubDate::from(at(T2))),
        ]
    );

    Ok(())
}

#[test]
fn sync_detects_new_commit_and_stays_idempotent() -> Result<()> {
    let fixture = tutorial_repo()?;
    let config = config_for(&fixture, TimestampKind::Libgit2);

    Synchronizer::from_config(config.clone()).run(SyncOptions::default(), at(T3 + 500))?;
    let first = fs::read_to_string(config.feed_path())?;

    let again = Synchronizer::from_config(config.clone()).run(SyncOptions::default(), at(T3 + 600))?;
    assert!(!again.written);
    assert_eq!(fs::read_to_string(config.feed_path())?, first);

    fixture.commit_file_at("docs/b.pdf", "revised", T3 + 1_000)?;
    let updated = Synchronizer::from_config(config.clone()).run(SyncOptions::default(), at(T3 + 2_000))?;
    assert!(updated.written);
    assert_eq!(updated.merge.updated, vec!["https://example.org/docs/b.pdf".to_string()]);

    let feed = read_feed(&config)?;
    assert_eq!(feed.entries[0].link, "https://example.org/docs/b.pdf");
    assert_eq!(feed.entries[0].pub_date, PubDate::from(at(T3 + 1_000)));
    assert_eq!(feed.entries[1].pub_date, PubDate::from(at(T3)));

    Ok(())
}

#[test]
fn feed_written_by_legacy_script_is_adopted() -> Result<()> {
    let fixture = tutorial_repo()?;
    let config = config_for(&fixture, TimestampKind::Filesystem);
    fs::write(
        config.feed_path(),
        format!(
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n",
                "<rss version=\"2.0\">\n<channel>\n",
                "  <title>Tutorials</title>\n",
                "  <link>https://example.org/docs/</link>\n",
                "  <description>Latest articles</description>\n",
                "  <lastBuildDate>Mon, 01 Jan 2024 00:00:00 +0000</lastBuildDate>\n",
                "  <item>\n",
                "    <title>A</title>\n",
                "    <link>https://example.org/docs/a.pdf</link>\n",
                "    <guid>https://example.org/docs/a.pdf</guid>\n",
                "    <pubDate>{}</pubDate>\n",
                "  </item>\n",
                "</channel>\n</rss>\n"
            ),
            at(4_000_000_000).format("%a, %d %b %Y %H:%M:%S +0000")
        ),
    )?;

    let report = Synchronizer::from_config(config.clone()).run(SyncOptions::default(), at(T3 + 500))?;
    assert_eq!(report.merge.retitled, vec!["https://example.org/docs/a.pdf".to_string()]);
    assert!(report.merge.updated.is_empty());

    let feed = read_feed(&config)?;
    let a = feed
        .entries
        .iter()
        .find(|entry| entry.link.ends_with("/a.pdf"))
        .unwrap();
    assert_eq!(a.title, "a");
    assert_eq!(a.pub_date, PubDate::from(at(4_000_000_000)));

    Ok(())
}
