//! Sources of changed paths fed to [`changed_modules`](crate::selection::changed_modules)
//!
//! The engine never talks to version control on its own; a [`ChangeSource`]
//! hands it plain path strings and [`top_level_dirs`] reduces them to the first
//! path segment.

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

pub const DEFAULT_REFERENCE: &str = "HEAD";

/// Supplies changed paths relative to some repository root.
pub trait ChangeSource {
    fn changed_items(&self) -> Result<Vec<String>>;
}

/// A fixed list of changed paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticChanges {
    items: Vec<String>,
}

impl StaticChanges {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

impl ChangeSource for StaticChanges {
    fn changed_items(&self) -> Result<Vec<String>> {
        Ok(self.items.clone())
    }
}

/// Runs `git diff-index --name-only <reference>` in a local checkout.
///
/// Only local refs are consulted. Fetching the reference beforehand is up to
/// the caller.
#[derive(Debug, Clone)]
pub struct GitDiffIndex {
    repo: PathBuf,
    reference: String,
}

impl GitDiffIndex {
    pub fn new(repo: impl Into<PathBuf>, reference: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            reference: reference.into(),
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }
}

impl ChangeSource for GitDiffIndex {
    fn changed_items(&self) -> Result<Vec<String>> {
        debug!(repo = %self.repo.display(), reference = %self.reference, "Listing changed files");

        let output = git_cmd()
            .arg("-C")
            .arg(&self.repo)
            .args(["diff-index", "--name-only"])
            .arg(&self.reference)
            .arg("--")
            .output()
            .context("Failed to run git")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "git diff-index against {} failed: {}",
                self.reference,
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// `GIT_DIR` and `GIT_WORK_TREE` would override the explicit `-C` path.
fn git_cmd() -> Command {
    let mut cmd = Command::new("git");
    cmd.env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
    cmd
}

/// First path segment of every item nested below a directory.
///
/// Items without a `/` are files at the repository root and never name a
/// module.
pub fn top_level_dirs<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .filter_map(|item| {
            item.as_ref()
                .split_once('/')
                .map(|(first, _)| first.to_string())
        })
        .filter(|first| !first.is_empty())
        .collect()
}
