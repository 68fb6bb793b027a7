// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Derive the public facing information of a feed entry from the relative
//! path of the document it describes. Both derivations are deterministic, so
//! the same file always maps to the same link across runs.

use std::path::{Component, Path};
use url::Url;

/// Derive entry link from base address and relative document path.
///
/// Each path component is pushed as its own URL segment, so spaces and other
/// reserved characters get percent-encoded while directory nesting is kept.
///
/// # Errors
///
/// - Return [`PathError::BaseUrl`] if base address is not a valid URL.
/// - Return [`PathError::CannotBeABase`] if base address cannot hold a path.
pub fn entry_link(base_url: &str, relative: impl AsRef<Path>) -> Result<String> {
    let mut url = Url::parse(base_url).map_err(|source| PathError::BaseUrl {
        source,
        base_url: base_url.to_string(),
    })?;

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| PathError::CannotBeABase(base_url.to_string()))?;
        segments.pop_if_empty();
        for component in relative.as_ref().components() {
            if let Component::Normal(segment) = component {
                segments.push(segment.to_string_lossy().as_ref());
            }
        }
    }

    Ok(url.into())
}

/// Derive human readable entry title from relative document path.
///
/// Drops the extension of the file, turns underscores into spaces, and joins
/// directory components with " / ". Words get capitalized when `title_case`
/// is set.
pub fn entry_title(relative: impl AsRef<Path>, title_case: bool) -> String {
    let relative = relative.as_ref();
    let mut parts = Vec::new();

    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            if let Component::Normal(segment) = component {
                parts.push(humanize(segment.to_string_lossy().as_ref()));
            }
        }
    }

    if let Some(stem) = relative.file_stem() {
        parts.push(humanize(stem.to_string_lossy().as_ref()));
    }

    let title = parts.join(" / ");
    if title_case {
        capitalize_words(&title)
    } else {
        title
    }
}

fn humanize(segment: &str) -> String {
    segment
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = !ch.is_alphanumeric();
        }
    }

    out
}

/// Path derivation error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PathError {
    /// Base address of channel is not a URL.
    #[error("invalid base url {base_url:?}")]
    BaseUrl {
        #[source]
        source: url::ParseError,
        base_url: String,
    },

    /// Base address of channel cannot carry path segments, e.g., "mailto:".
    #[error("base url {0:?} cannot hold document paths")]
    CannotBeABase(String),
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;
