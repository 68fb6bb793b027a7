// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Publication instant resolution.
//!
//! Every discovered document needs an instant describing when it was last
//! changed. Version control history is the preferred source, because
//! filesystem modification times get reset by fresh clones and CI checkouts.
//! The filesystem is only consulted when history is unavailable.
//!
//! Sources are modeled through the [`TimestampSource`] trait, and chained
//! together with [`Fallback`]. A failing preferred source never aborts a run;
//! it merely hands the lookup over to the next source.

use crate::config::TimestampKind;

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use git2::{Oid, Repository, Sort, Tree};
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, instrument};

/// Source of publication instants.
pub trait TimestampSource {
    /// Resolve instant of document at `relative` path under `root`.
    fn resolve(&self, root: &Path, relative: &Path) -> Result<DateTime<Utc>>;
}

impl<T> TimestampSource for Box<T>
where
    T: TimestampSource + ?Sized,
{
    fn resolve(&self, root: &Path, relative: &Path) -> Result<DateTime<Utc>> {
        (**self).resolve(root, relative)
    }
}

/// Construct timestamp source for configured kind.
///
/// Version control sources always fall back to filesystem modification time.
/// If libgit2 cannot find a repository around `root`, then only the
/// filesystem is used.
pub fn source_for(kind: TimestampKind, root: impl AsRef<Path>) -> Box<dyn TimestampSource> {
    match kind {
        TimestampKind::Git => Box::new(Fallback::new(GitLog::new(), FileModified)),
        TimestampKind::Libgit2 => match Git2History::discover(root.as_ref()) {
            Ok(history) => Box::new(Fallback::new(history, FileModified)),
            Err(error) => {
                debug!("no repository around {:?}: {error}", root.as_ref().display());
                Box::new(FileModified)
            }
        },
        TimestampKind::Filesystem => Box::new(FileModified),
    }
}

/// Try preferred source first, and degrade to fallback source on failure.
#[derive(Debug, Clone)]
pub struct Fallback<P, F = FileModified>
where
    P: TimestampSource,
    F: TimestampSource,
{
    preferred: P,
    fallback: F,
}

impl<P, F> Fallback<P, F>
where
    P: TimestampSource,
    F: TimestampSource,
{
    /// Construct new fallback chain.
    pub fn new(preferred: P, fallback: F) -> Self {
        Self {
            preferred,
            fallback,
        }
    }
}

impl<P, F> TimestampSource for Fallback<P, F>
where
    P: TimestampSource,
    F: TimestampSource,
{
    fn resolve(&self, root: &Path, relative: &Path) -> Result<DateTime<Utc>> {
        match self.preferred.resolve(root, relative) {
            Ok(instant) => Ok(instant),
            Err(error) => {
                debug!("falling back for {:?}: {error}", relative.display());
                self.fallback.resolve(root, relative)
            }
        }
    }
}

/// Filesystem last-modified time.
///
/// Truncated to whole seconds, the precision feed documents store.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileModified;

impl TimestampSource for FileModified {
    fn resolve(&self, root: &Path, relative: &Path) -> Result<DateTime<Utc>> {
        let path = root.join(relative);
        let modified = fs::metadata(&path)
            .and_then(|metadata| metadata.modified())
            .map_err(|source| TimestampError::Metadata { source, path })?;

        Ok(DateTime::<Utc>::from(modified).trunc_subsecs(0))
    }
}

/// Last commit time through the git executable.
///
/// Equivalent to `git log -1 --format=%ct -- <path>` ran from the
/// documentation directory.
#[derive(Debug, Clone)]
pub struct GitLog {
    program: PathBuf,
}

impl GitLog {
    /// Construct new git log source using `git` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Construct new git log source using specific git binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GitLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TimestampSource for GitLog {
    #[instrument(skip(self, root), level = "debug")]
    fn resolve(&self, root: &Path, relative: &Path) -> Result<DateTime<Utc>> {
        let args: [&OsStr; 6] = [
            "-C".as_ref(),
            root.as_os_str(),
            "log".as_ref(),
            "-1".as_ref(),
            "--format=%ct".as_ref(),
            "--".as_ref(),
        ];
        let output = syscall_non_interactive(
            &self.program,
            args.into_iter().chain([relative.as_os_str()]),
        )?;

        // INVARIANT: Untracked files produce empty output with success status.
        if output.is_empty() {
            return Err(TimestampError::NoHistory(relative.to_path_buf()));
        }

        let seconds = output
            .parse::<i64>()
            .map_err(|source| TimestampError::ParseEpoch { source, output })?;
        from_epoch(seconds)
    }
}

/// Last commit time through libgit2.
///
/// Walks history from `HEAD` newest first, and picks the first commit whose
/// blob at the target path differs from the blob of every parent.
pub struct Git2History {
    repository: Repository,
}

impl Git2History {
    /// Construct new history source from existing repository.
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Discover repository containing `path`.
    ///
    /// # Errors
    ///
    /// - Return [`TimestampError::Git2`] if no repository can be found.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Repository::discover(path.as_ref())?))
    }

    fn repository_path(&self, absolute: &Path) -> Result<PathBuf> {
        let workdir = self
            .repository
            .workdir()
            .ok_or_else(|| TimestampError::OutsideRepository(absolute.to_path_buf()))?;
        let workdir = workdir.canonicalize().map_err(|source| TimestampError::Metadata {
            source,
            path: workdir.to_path_buf(),
        })?;
        let absolute = absolute.canonicalize().map_err(|source| TimestampError::Metadata {
            source,
            path: absolute.to_path_buf(),
        })?;

        absolute
            .strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .map_err(|_| TimestampError::OutsideRepository(absolute.clone()))
    }
}

impl TimestampSource for Git2History {
    #[instrument(skip(self, root), level = "debug")]
    fn resolve(&self, root: &Path, relative: &Path) -> Result<DateTime<Utc>> {
        let tracked = self.repository_path(&root.join(relative))?;

        let mut revwalk = self.repository.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(Sort::TIME)?;

        for oid in revwalk {
            let commit = self.repository.find_commit(oid?)?;
            let Some(current) = blob_id(&commit.tree()?, &tracked) else {
                continue;
            };

            // INVARIANT: Root commits introduce every path they contain.
            let mut changed = true;
            for parent in commit.parents() {
                if blob_id(&parent.tree()?, &tracked) == Some(current) {
                    changed = false;
                    break;
                }
            }

            if changed {
                return from_epoch(commit.time().seconds());
            }
        }

        Err(TimestampError::NoHistory(relative.to_path_buf()))
    }
}

fn blob_id(tree: &Tree<'_>, path: &Path) -> Option<Oid> {
    tree.get_path(path).ok().map(|entry| entry.id())
}

fn from_epoch(seconds: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or(TimestampError::Epoch(seconds))
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new(cmd.as_ref()).args(args).output()?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).trim().to_string();

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(output.stderr.as_slice());
        return Err(TimestampError::Syscall(std::io::Error::other(format!(
            "command {:?} failed: {}",
            cmd.as_ref(),
            stderr.trim()
        ))));
    }

    Ok(stdout)
}

/// Timestamp resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum TimestampError {
    /// File metadata cannot be read.
    #[error("failed to read metadata of {:?}", path.display())]
    Metadata {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// External command cannot be run or reports failure.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// File has never been committed.
    #[error("no commit history for {:?}", .0.display())]
    NoHistory(PathBuf),

    /// File is not inside the work tree of the repository.
    #[error("{:?} is outside of repository work tree", .0.display())]
    OutsideRepository(PathBuf),

    /// Command output is not a Unix epoch.
    #[error("expected unix epoch, got {output:?}")]
    ParseEpoch {
        #[source]
        source: std::num::ParseIntError,
        output: String,
    },

    /// Unix epoch is out of range.
    #[error("unix epoch {0} is out of range")]
    Epoch(i64),
}

/// Friendly result alias :3
pub type Result<T, E = TimestampError> = std::result::Result<T, E>;
