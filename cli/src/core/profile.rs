//! # tmns Repository Profile
//!
//! File: cli/src/core/profile.rs
//!
//! ## Overview
//!
//! A profile is the declaration-ordered repository table held by the resolved
//! [`Config`]. This module defines the table entry (`RepoEntry`) and the
//! selection logic used by `tmns build`, `tmns plan` and `tmns repos` to pick a
//! subset of the table.
//!
//! ## Selection Rules
//!
//! - `all` selects every entry.
//! - `tags` selects entries whose tag set intersects the requested tags.
//! - `names` selects entries by name. Asking for a name that is not in the
//!   table fails with `TmnsError::UnknownRepository` before anything is
//!   returned.
//! - Filters combine by intersection, never by union.
//! - With no filter at all, the whole table is selected.
//!
//! The result always follows table declaration order, regardless of the order
//! names or tags were given in. Build order is declaration order; there is no
//! dependency-graph sorting here.
//!
use crate::core::config::Config;
use crate::core::error::TmnsError;
use crate::core::plan::BuildType;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One repository of the Terminus stack, as declared in a `[[repositories]]` block.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RepoEntry {
    /// Unique key within the table. Also the default checkout directory name.
    pub name: String,
    /// Git remote of the repository.
    #[serde(default)]
    pub url: String,
    /// Free-form tags used for selection (`tmns build -t cpp`).
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Branch expected to be checked out.
    #[serde(default)]
    pub branch: Option<String>,
    /// `false` keeps the repository in the profile but out of every build plan.
    #[serde(default = "default_build")]
    pub build: bool,
    /// Checkout directory relative to the source root, when it differs from `name`.
    #[serde(default)]
    pub path: Option<String>,
    /// Build types for this repository when none are given on the command line
    /// or in the environment.
    #[serde(default, alias = "build_modes")]
    pub build_types: Vec<BuildType>,
    /// Clean flag for this repository, same precedence as `build_types`.
    #[serde(default, alias = "clean_repo")]
    pub clean: Option<bool>,
}

fn default_build() -> bool {
    true
}

impl RepoEntry {
    /// Creates a buildable entry with only a name and URL set.
    #[cfg(test)]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            tags: BTreeSet::new(),
            branch: None,
            build: true,
            path: None,
            build_types: Vec::new(),
            clean: None,
        }
    }

    /// Builder-style helper for attaching tags.
    #[cfg(test)]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Directory holding this repository's checkout under `source_root`.
    pub fn checkout_dir(&self, source_root: &Path) -> PathBuf {
        source_root.join(self.path.as_deref().unwrap_or(&self.name))
    }
}

impl fmt::Display for RepoEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        write!(f, "{} [{}]", self.name, tags.join(", "))?;
        if let Some(branch) = &self.branch {
            write!(f, " @ {}", branch)?;
        }
        if !self.build {
            write!(f, " (not built)")?;
        }
        Ok(())
    }
}

/// Selection criteria over the repository table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoFilter {
    pub tags: BTreeSet<String>,
    pub names: BTreeSet<String>,
    pub all: bool,
}

impl RepoFilter {
    /// Filter selecting every entry.
    pub fn all() -> Self {
        Self {
            all: true,
            ..Default::default()
        }
    }

    fn is_unconstrained(&self) -> bool {
        self.tags.is_empty() && self.names.is_empty()
    }

    fn matches(&self, repo: &RepoEntry) -> bool {
        let tag_ok = self.tags.is_empty() || !self.tags.is_disjoint(&repo.tags);
        let name_ok = self.names.is_empty() || self.names.contains(&repo.name);
        tag_ok && name_ok
    }
}

/// Selects repositories from the resolved configuration.
///
/// Returns entries in declaration order. Fails with
/// `TmnsError::UnknownRepository` (and returns nothing) when `filter.names`
/// mentions a repository the table does not declare.
pub fn resolve(config: &Config, filter: &RepoFilter) -> Result<Vec<RepoEntry>, TmnsError> {
    let table = config.repositories();

    // Unknown names are checked up front so no partial selection escapes.
    if let Some(missing) = filter
        .names
        .iter()
        .find(|name| !table.iter().any(|repo| &repo.name == *name))
    {
        return Err(TmnsError::UnknownRepository {
            name: missing.clone(),
        });
    }

    if filter.all && filter.is_unconstrained() {
        return Ok(table.to_vec());
    }

    let selected: Vec<RepoEntry> = table
        .iter()
        .filter(|repo| filter.matches(repo))
        .cloned()
        .collect();
    debug!(
        "Resolved {} of {} repositories (filter: {:?})",
        selected.len(),
        table.len(),
        filter
    );
    Ok(selected)
}

/// Every distinct tag declared in the table, sorted.
pub fn known_tags(repos: &[RepoEntry]) -> BTreeSet<String> {
    repos.iter().flat_map(|repo| repo.tags.iter().cloned()).collect()
}
