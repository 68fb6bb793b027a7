// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Feed document model.
//!
//! A __feed__ is an RSS 2.0 document holding one channel. The channel carries
//! fixed metadata (title, link, description, last build date) followed by an
//! ordered listing of __entries__, one per published document.
//!
//! # Publication Dates
//!
//! Internally every publication date is a UTC instant. Text only exists at
//! the XML boundary, where dates are written in the RFC 822 style RSS expects,
//! e.g., `Thu, 01 Jan 1970 00:00:00 GMT`. Any RFC 2822 date is accepted when
//! reading, so documents produced with numeric `+0000` offsets load fine.
//!
//! An existing document may carry a date that cannot be parsed at all. Such a
//! date is kept verbatim as [`PubDate::Malformed`], and always orders below
//! every valid instant. Thus, a broken entry sinks to the bottom of the feed
//! instead of aborting the run.
//!
//! # See Also
//!
//! - [RSS 2.0 Specification](https://www.rssboard.org/rss-specification)

use crate::config::ChannelConfig;

use chrono::{DateTime, SubsecRound, Utc};
use quick_xml::se::Serializer;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    str::FromStr,
};
use tracing::warn;

const RSS_VERSION: &str = "2.0";
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Publication date of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PubDate {
    /// Well formed instant.
    Instant(DateTime<Utc>),

    /// Raw text that could not be parsed as a date.
    Malformed(String),
}

impl PubDate {
    /// Parse publication date, keeping unparseable text as-is.
    pub fn parse(text: impl AsRef<str>) -> Self {
        let text = text.as_ref().trim();
        match DateTime::parse_from_rfc2822(text) {
            Ok(instant) => Self::Instant(instant.with_timezone(&Utc)),
            Err(_) => Self::Malformed(text.to_string()),
        }
    }

    /// Get instant if well formed.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Instant(instant) => Some(*instant),
            Self::Malformed(_) => None,
        }
    }

    /// Key for descending sort.
    ///
    /// Malformed dates map to `None`, which orders below every instant.
    pub fn sort_key(&self) -> Option<DateTime<Utc>> {
        self.instant()
    }
}

impl From<DateTime<Utc>> for PubDate {
    // INVARIANT: Keep only whole seconds, the precision that gets written.
    fn from(instant: DateTime<Utc>) -> Self {
        Self::Instant(instant.trunc_subsecs(0))
    }
}

impl Display for PubDate {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Instant(instant) => write!(fmt, "{}", instant.format(PUB_DATE_FORMAT)),
            Self::Malformed(raw) => fmt.write_str(raw),
        }
    }
}

/// Feed channel metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub last_build_date: Option<PubDate>,
}

impl Channel {
    /// Check if title, link, and description match configured metadata.
    pub fn matches(&self, config: &ChannelConfig) -> bool {
        self.title == config.title
            && self.link == channel_link(&config.link)
            && self.description == config.description
    }
}

impl From<&ChannelConfig> for Channel {
    fn from(config: &ChannelConfig) -> Self {
        Self {
            title: config.title.clone(),
            link: channel_link(&config.link),
            description: config.description.clone(),
            last_build_date: None,
        }
    }
}

fn channel_link(base_url: &str) -> String {
    format!("{}/", base_url.trim_end_matches('/'))
}

/// One published document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub title: String,
    pub link: String,
    pub guid: String,
    pub pub_date: PubDate,
}

impl Entry {
    /// Construct new entry whose GUID is its link.
    pub fn new(title: impl Into<String>, link: impl Into<String>, pub_date: impl Into<PubDate>) -> Self {
        let link = link.into();
        Self {
            title: title.into(),
            guid: link.clone(),
            link,
            pub_date: pub_date.into(),
        }
    }

    /// Unique key of entry.
    ///
    /// Entries are keyed by link. Foreign documents sometimes only carry a
    /// GUID, so that is used when the link is missing.
    pub fn key(&self) -> &str {
        if self.link.is_empty() {
            &self.guid
        } else {
            &self.link
        }
    }
}

/// Collapse entries sharing a key.
///
/// Keeps the position of the first occurrence, but the content of the
/// occurrence with the newest publication date. Returns keys of the entries
/// dropped, one per dropped entry.
pub fn collapse_entries(entries: &mut Vec<Entry>) -> Vec<String> {
    let mut kept: Vec<Entry> = Vec::with_capacity(entries.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut dropped = Vec::new();

    for entry in entries.drain(..) {
        match positions.get(entry.key()) {
            Some(&index) => {
                dropped.push(entry.key().to_string());
                if entry.pub_date.sort_key() > kept[index].pub_date.sort_key() {
                    kept[index] = entry;
                }
            }
            None => {
                positions.insert(entry.key().to_string(), kept.len());
                kept.push(entry);
            }
        }
    }

    *entries = kept;
    dropped
}

/// RSS feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub channel: Channel,
    pub entries: Vec<Entry>,
}

impl Feed {
    /// Construct new feed without entries.
    pub fn empty(channel: impl Into<Channel>) -> Self {
        Self {
            channel: channel.into(),
            entries: Vec::new(),
        }
    }

    /// Collapse entries sharing a key through [`collapse_entries`].
    ///
    /// Returns number of entries removed.
    pub fn collapse_duplicates(&mut self) -> usize {
        collapse_entries(&mut self.entries).len()
    }

    /// Render feed as XML document.
    ///
    /// # Errors
    ///
    /// - Return [`FeedError::Serialize`] if serialization fails.
    pub fn to_xml(&self) -> Result<String> {
        let document = RssDocument::from(self);
        let mut body = String::new();
        let mut serializer = Serializer::with_root(&mut body, Some("rss"))?;
        serializer.indent(' ', 2);
        document.serialize(serializer)?;

        Ok(format!("{XML_DECLARATION}\n{body}\n"))
    }

    /// Parse feed from XML document.
    ///
    /// # Errors
    ///
    /// - Return [`FeedError::Deserialize`] if document is not RSS shaped.
    /// - Return [`FeedError::Version`] if document is not RSS 2.0.
    pub fn from_xml(data: &str) -> Result<Self> {
        let document: RssDocument = quick_xml::de::from_str(data)?;
        if document.version.trim() != RSS_VERSION {
            return Err(FeedError::Version(document.version));
        }

        Ok(document.into())
    }
}

impl FromStr for Feed {
    type Err = FeedError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Self::from_xml(data)
    }
}

impl Display for Feed {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.to_xml()?.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct RssDocument {
    #[serde(rename = "@version")]
    version: String,
    channel: RssChannel,
}

#[derive(Debug, Deserialize, Serialize)]
struct RssChannel {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "lastBuildDate", default, skip_serializing_if = "Option::is_none")]
    last_build_date: Option<String>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize, Serialize)]
struct RssItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    guid: Option<RssGuid>,
    #[serde(rename = "pubDate", default, skip_serializing_if = "Option::is_none")]
    pub_date: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct RssGuid {
    #[serde(rename = "@isPermaLink", default, skip_serializing_if = "Option::is_none")]
    is_perma_link: Option<String>,
    #[serde(rename = "$text", default)]
    value: String,
}

impl From<&Feed> for RssDocument {
    fn from(feed: &Feed) -> Self {
        Self {
            version: RSS_VERSION.into(),
            channel: RssChannel {
                title: feed.channel.title.clone(),
                link: feed.channel.link.clone(),
                description: feed.channel.description.clone(),
                last_build_date: feed.channel.last_build_date.as_ref().map(ToString::to_string),
                items: feed
                    .entries
                    .iter()
                    .map(|entry| RssItem {
                        title: entry.title.clone(),
                        link: entry.link.clone(),
                        guid: Some(RssGuid {
                            is_perma_link: None,
                            value: entry.guid.clone(),
                        }),
                        pub_date: Some(entry.pub_date.to_string()),
                    })
                    .collect(),
            },
        }
    }
}

impl From<RssDocument> for Feed {
    fn from(document: RssDocument) -> Self {
        let channel = document.channel;
        Self {
            channel: Channel {
                title: channel.title,
                link: channel.link,
                description: channel.description,
                last_build_date: channel.last_build_date.map(PubDate::parse),
            },
            entries: channel
                .items
                .into_iter()
                .filter_map(|item| {
                    let guid = item
                        .guid
                        .map(|guid| guid.value)
                        .filter(|guid| !guid.is_empty())
                        .unwrap_or_else(|| item.link.clone());

                    // INVARIANT: Every entry has a non-empty key.
                    if guid.is_empty() {
                        warn!("skipping feed item {:?} without link or guid", item.title);
                        return None;
                    }

                    Some(Entry {
                        title: item.title,
                        link: item.link,
                        guid,
                        pub_date: PubDate::parse(item.pub_date.unwrap_or_default()),
                    })
                })
                .collect(),
        }
    }
}

/// Feed document error types.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Document is not a well formed RSS document.
    #[error(transparent)]
    Deserialize(#[from] quick_xml::DeError),

    /// Feed cannot be rendered as XML.
    #[error(transparent)]
    Serialize(#[from] quick_xml::SeError),

    /// Document is RSS, but not version 2.0.
    #[error("unsupported rss version {0:?}")]
    Version(String),
}

impl From<FeedError> for FmtError {
    fn from(_: FeedError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
pub type Result<T, E = FeedError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    fn instant(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    #[test]
    fn pub_date_renders_gmt() {
        assert_eq!(
            PubDate::from(instant(0)).to_string(),
            "Thu, 01 Jan 1970 00:00:00 GMT"
        );
    }

    #[test_case("Thu, 01 Jan 1970 00:00:00 GMT", 0; "gmt zone")]
    #[test_case("Thu, 01 Jan 1970 00:00:00 +0000", 0; "numeric offset")]
    #[test_case("Thu, 01 Jan 1970 02:00:00 +0200", 0; "non utc offset")]
    #[test_case("  Sat, 02 Mar 2024 10:30:00 GMT\n", 1_709_375_400; "surrounding whitespace")]
    #[test]
    fn pub_date_parses_rfc2822(text: &str, seconds: i64) {
        pretty_assertions::assert_eq!(PubDate::parse(text), PubDate::Instant(instant(seconds)));
    }

    #[test]
    fn malformed_pub_date_sorts_lowest() {
        let broken = PubDate::parse("yesterday-ish");
        assert_eq!(broken, PubDate::Malformed("yesterday-ish".into()));
        assert_eq!(broken.to_string(), "yesterday-ish");
        assert!(broken.sort_key() < PubDate::from(instant(0)).sort_key());
    }

    #[test]
    fn parse_feed_document() -> anyhow::Result<()> {
        let result: Feed = indoc! {r#"
            <?xml version="1.0" encoding="UTF-8" ?>
            <rss version="2.0">
            <channel>
              <title>Modern C++ Tutorials</title>
              <link>https://example.org/docs/</link>
              <description>Latest articles</description>
              <language>en</language>
              <item>
                <title>Intro To Templates</title>
                <link>https://example.org/docs/intro_to_templates.pdf</link>
                <guid isPermaLink="true">https://example.org/docs/intro_to_templates.pdf</guid>
                <pubDate>Thu, 01 Jan 1970 00:00:00 +0000</pubDate>
              </item>
              <item>
                <title>Broken</title>
                <link>https://example.org/docs/broken.pdf</link>
                <pubDate>not a date</pubDate>
              </item>
            </channel>
            </rss>
        "#}
        .parse()?;

        let expect = Feed {
            channel: Channel {
                title: "Modern C++ Tutorials".into(),
                link: "https://example.org/docs/".into(),
                description: "Latest articles".into(),
                last_build_date: None,
            },
            entries: vec![
                Entry::new(
                    "Intro To Templates",
                    "https://example.org/docs/intro_to_templates.pdf",
                    instant(0),
                ),
                Entry::new(
                    "Broken",
                    "https://example.org/docs/broken.pdf",
                    PubDate::Malformed("not a date".into()),
                ),
            ],
        };
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn parse_feed_skips_items_without_key() -> anyhow::Result<()> {
        let result: Feed = indoc! {r#"
            <rss version="2.0">
              <channel>
                <title>t</title>
                <link>https://example.org/</link>
                <description>d</description>
                <item>
                  <title>Nowhere</title>
                  <pubDate>Thu, 01 Jan 1970 00:00:00 GMT</pubDate>
                </item>
                <item>
                  <title>Also nowhere</title>
                  <guid></guid>
                </item>
                <item>
                  <title>Only guid</title>
                  <guid>urn:doc:1</guid>
                </item>
              </channel>
            </rss>
        "#}
        .parse()?;

        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].title, "Only guid");
        assert_eq!(result.entries[0].key(), "urn:doc:1");

        Ok(())
    }

    #[test]
    fn pub_date_keeps_whole_seconds() {
        let fractional = instant(60) + chrono::TimeDelta::milliseconds(750);
        assert_eq!(PubDate::from(fractional), PubDate::Instant(instant(60)));
    }

    #[test]
    fn parse_feed_without_items() -> anyhow::Result<()> {
        let result: Feed = indoc! {r#"
            <rss version="2.0">
              <channel>
                <title>t</title>
                <link>l</link>
                <description>d</description>
              </channel>
            </rss>
        "#}
        .parse()?;
        assert!(result.entries.is_empty());

        Ok(())
    }

    #[test]
    fn reject_garbage_and_foreign_versions() {
        assert!(matches!(
            "this is not xml at all".parse::<Feed>(),
            Err(FeedError::Deserialize(_))
        ));
        assert!(matches!(
            r#"<rss version="0.91"><channel><title>t</title></channel></rss>"#.parse::<Feed>(),
            Err(FeedError::Version(_))
        ));
    }

    #[test]
    fn render_feed_document() -> anyhow::Result<()> {
        let mut feed = Feed::empty(&ChannelConfig {
            title: "Tutorials & Notes".into(),
            link: "https://example.org/docs".into(),
            description: "Latest articles".into(),
        });
        feed.channel.last_build_date = Some(instant(86_400).into());
        feed.entries.push(Entry::new(
            "intro to templates",
            "https://example.org/docs/intro_to_templates.pdf",
            instant(0),
        ));

        let xml = feed.to_xml()?;
        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.contains(r#"<rss version="2.0">"#));
        assert!(xml.contains("<title>Tutorials &amp; Notes</title>"));
        assert!(xml.contains("<link>https://example.org/docs/</link>"));
        assert!(xml.contains("<lastBuildDate>Fri, 02 Jan 1970 00:00:00 GMT</lastBuildDate>"));
        assert!(xml.contains("<guid>https://example.org/docs/intro_to_templates.pdf</guid>"));
        assert!(xml.contains("<pubDate>Thu, 01 Jan 1970 00:00:00 GMT</pubDate>"));

        // Whatever we write, we must be able to read back.
        assert_eq!(xml.parse::<Feed>()?, feed);

        Ok(())
    }

    #[test]
    fn collapse_duplicates_keeps_newest() {
        let mut feed = Feed::empty(&ChannelConfig::default());
        feed.entries = vec![
            Entry::new("a", "https://x/a.pdf", instant(10)),
            Entry::new("b", "https://x/b.pdf", instant(5)),
            Entry::new("a again", "https://x/a.pdf", instant(20)),
            Entry::new("a older", "https://x/a.pdf", instant(1)),
        ];

        assert_eq!(feed.collapse_duplicates(), 2);
        assert_eq!(
            feed.entries,
            vec![
                Entry::new("a again", "https://x/a.pdf", instant(20)),
                Entry::new("b", "https://x/b.pdf", instant(5)),
            ]
        );
    }
}
