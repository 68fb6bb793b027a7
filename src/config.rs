// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the `docfeed.toml` configuration file to simplify
//! the process of serialization and deserialization. Every field carries a
//! default, so an empty file (or no file at all) describes the stock setup:
//! scan `docs/` for PDF files and maintain `docs/rss.xml`. File I/O is left to
//! the caller to figure out.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Default name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "docfeed.toml";

/// Default name of the feed document inside the documentation directory.
pub const FEED_FILE_NAME: &str = "rss.xml";

/// Feed generation settings.
///
/// # General Layout
///
/// Top-level keys select what to scan and how to reconcile discovered files
/// with the existing feed. The `[channel]` table holds the metadata written
/// into the header of the feed document.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Root directory to scan for documents.
    pub docs_dir: PathBuf,

    /// Path of the feed document. Defaults to `<docs_dir>/rss.xml`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_file: Option<PathBuf>,

    /// File name globs selecting which files become feed entries.
    pub include: Vec<String>,

    /// Where publication instants come from.
    pub timestamps: TimestampKind,

    /// Publication instant given to newly discovered files.
    pub new_entries: NewEntryDate,

    /// What happens to entries whose file disappeared.
    pub stale: StalePolicy,

    /// What happens when the existing feed document cannot be parsed.
    pub on_corrupt: OnCorrupt,

    /// Capitalize each word of derived entry titles.
    pub title_case: bool,

    /// Channel metadata.
    pub channel: ChannelConfig,
}

impl FeedConfig {
    /// Resolve path of feed document.
    pub fn feed_path(&self) -> PathBuf {
        match &self.feed_file {
            Some(path) => path.clone(),
            None => self.docs_dir.join(FEED_FILE_NAME),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("docs"),
            feed_file: None,
            include: vec!["*.pdf".into()],
            timestamps: TimestampKind::default(),
            new_entries: NewEntryDate::default(),
            stale: StalePolicy::default(),
            on_corrupt: OnCorrupt::default(),
            title_case: false,
            channel: ChannelConfig::default(),
        }
    }
}

impl FromStr for FeedConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: FeedConfig = toml::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        config.docs_dir = expand_path(&config.docs_dir)?;
        config.feed_file = match config.feed_file {
            Some(path) => Some(expand_path(&path)?),
            None => None,
        };

        Ok(config)
    }
}

impl Display for FeedConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Channel metadata of the feed document.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Human readable feed title.
    pub title: String,

    /// Base address every entry link is derived from.
    pub link: String,

    /// One sentence describing the feed.
    pub description: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            title: "Modern C++ Tutorials".into(),
            link: "https://damirlj.github.io/modern_cpp_tutorials/docs".into(),
            description: "Latest articles in Modern C++ Tutorials".into(),
        }
    }
}

/// Source of publication instants.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimestampKind {
    /// Last commit time through the git executable, else modification time.
    #[default]
    Git,

    /// Last commit time through libgit2, else modification time.
    Libgit2,

    /// Filesystem modification time only.
    Filesystem,
}

/// Publication instant of newly discovered files.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NewEntryDate {
    /// Instant of the current run.
    #[default]
    Now,

    /// Instant reported by the timestamp resolver.
    Resolved,
}

/// Treatment of entries whose file no longer exists.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StalePolicy {
    /// Drop them, so the feed mirrors the current file list.
    #[default]
    Prune,

    /// Leave them untouched.
    Keep,
}

/// Treatment of an existing feed document that cannot be parsed.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OnCorrupt {
    /// Abort the run.
    #[default]
    Fail,

    /// Discard the document and start from an empty feed.
    Reset,
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("DOCS", "/srv/tutorials/docs")])]
    fn deserialize_feed_config() -> anyhow::Result<()> {
        let result: FeedConfig = r#"
            docs_dir = "$DOCS"
            feed_file = "${DOCS}/feed.xml"
            include = ["*.pdf", "*.epub"]
            timestamps = "libgit2"
            new_entries = "resolved"
            stale = "keep"
            on_corrupt = "reset"
            title_case = true

            [channel]
            title = "Tutorials"
            link = "https://example.org/docs"
            description = "Every tutorial"
        "#
        .parse()?;

        let expect = FeedConfig {
            docs_dir: PathBuf::from("/srv/tutorials/docs"),
            feed_file: Some(PathBuf::from("/srv/tutorials/docs/feed.xml")),
            include: vec!["*.pdf".into(), "*.epub".into()],
            timestamps: TimestampKind::Libgit2,
            new_entries: NewEntryDate::Resolved,
            stale: StalePolicy::Keep,
            on_corrupt: OnCorrupt::Reset,
            title_case: true,
            channel: ChannelConfig {
                title: "Tutorials".into(),
                link: "https://example.org/docs".into(),
                description: "Every tutorial".into(),
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn empty_config_uses_defaults() -> anyhow::Result<()> {
        let result: FeedConfig = "".parse()?;
        assert_eq!(result, FeedConfig::default());
        assert_eq!(result.feed_path(), PathBuf::from("docs").join("rss.xml"));

        Ok(())
    }

    #[test]
    fn partial_channel_keeps_remaining_defaults() -> anyhow::Result<()> {
        let result: FeedConfig = indoc! {r#"
            [channel]
            title = "Notes"
        "#}
        .parse()?;

        assert_eq!(result.channel.title, "Notes");
        assert_eq!(result.channel.link, ChannelConfig::default().link);
        assert_eq!(result.include, vec!["*.pdf".to_string()]);

        Ok(())
    }

    #[test]
    fn reject_unknown_policy() {
        let result = "stale = \"forget\"".parse::<FeedConfig>();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn serialize_feed_config() -> anyhow::Result<()> {
        let config = FeedConfig {
            feed_file: Some(PathBuf::from("public/feed.xml")),
            stale: StalePolicy::Keep,
            ..FeedConfig::default()
        };
        let text = config.to_string();

        assert!(text.contains("stale = \"keep\""));
        assert!(text.contains("[channel]"));
        assert_eq!(text.parse::<FeedConfig>()?, config);

        Ok(())
    }
}
