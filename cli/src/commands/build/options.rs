//! # tmns Build Command Options
//!
//! File: cli/src/commands/build/options.rs
//!
//! ## Overview
//!
//! Argument groups shared by `tmns build`, `tmns plan` and `tmns repos`, and
//! their translation into the command-line configuration layer.
//!
//! Flags never write settings directly. Each flag that is present becomes an
//! assignment in a `Cli` [`ConfigLayer`], so a flag and the equivalent
//! `--set key=value` behave identically and `tmns config show` can report
//! where a value came from. Flags that are absent contribute nothing, which
//! leaves lower layers in charge.
//!
use crate::core::config::{ConfigLayer, LayerSource, LayerValue, REPOSITORIES_KEY};
use crate::core::error::{Result, TmnsError};
use crate::core::profile::RepoFilter;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use tracing::debug;

/// Which repositories to act on.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Select every repository in the profile (the default when no filter is given)
    #[arg(long)]
    pub all: bool,

    /// Select repositories carrying this tag (repeatable)
    #[arg(short = 't', long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Select a repository by name (repeatable)
    #[arg(short = 'n', long = "repo", value_name = "NAME")]
    pub repos: Vec<String>,

    /// Replace the repository table with the `[[repositories]]` of this TOML file
    #[arg(long, value_name = "PATH")]
    pub repos_file: Option<PathBuf>,
}

impl SelectionArgs {
    pub fn filter(&self) -> RepoFilter {
        if self.tags.is_empty() && self.repos.is_empty() {
            return RepoFilter::all();
        }
        RepoFilter {
            tags: self.tags.iter().cloned().collect(),
            names: self.repos.iter().cloned().collect(),
            all: self.all,
        }
    }

    /// Assignments contributed by the selection flags.
    pub fn config_layer(&self) -> Result<ConfigLayer> {
        let mut layer = ConfigLayer::new(LayerSource::Cli);
        if let Some(path) = &self.repos_file {
            let file = ConfigLayer::from_file(LayerSource::Cli, path)?;
            let table = file
                .entries
                .into_iter()
                .find_map(|entry| match entry.value {
                    Some(LayerValue::Repositories(repos)) => Some(repos),
                    _ => None,
                })
                .ok_or_else(|| {
                    TmnsError::config(
                        REPOSITORIES_KEY,
                        format!("{} declares no [[repositories]]", path.display()),
                    )
                })
                .with_context(|| format!("Failed to load repositories from {}", path.display()))?;
            debug!("Loaded {} repositories from {}", table.len(), path.display());
            layer.push_repositories(table);
        }
        Ok(layer)
    }
}

/// How to build the selected repositories.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildOptionArgs {
    /// Build type(s), comma separated (Debug, Release, RelWithDebInfo)
    #[arg(long = "build-type", value_name = "TYPE", value_delimiter = ',')]
    pub build_types: Vec<String>,

    /// Build in Release mode (combines with --debug)
    #[arg(short = 'r', long)]
    pub release: bool,

    /// Build in Debug mode (combines with --release)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Delete each build folder before building
    #[arg(short = 'c', long)]
    pub clean: bool,

    /// Clean without asking for confirmation
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Let Conan build dependencies that have no prebuilt binary
    #[arg(long)]
    pub build_missing: bool,

    /// Skip the deploy stage
    #[arg(long)]
    pub no_deploy: bool,

    /// Conan package option as key=value (repeatable)
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    /// Conan user/channel for exported packages
    #[arg(long, value_name = "USER/CHANNEL")]
    pub channel: Option<String>,

    /// Package reference to deploy with the full deployer
    #[arg(long, value_name = "REF")]
    pub reference: Option<String>,

    /// Directory containing the repository checkouts
    #[arg(long, value_name = "DIR")]
    pub source_root: Option<String>,

    /// Build folder, relative to each checkout unless absolute
    #[arg(long, value_name = "DIR")]
    pub build_dir: Option<String>,

    /// Keep building the remaining repositories when one fails
    #[arg(short = 'x', long)]
    pub continue_on_error: bool,
}

impl BuildOptionArgs {
    /// Build types requested on the command line: `--build-type` first, then
    /// `-r`, then `-d`.
    pub fn requested_build_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .build_types
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if self.release {
            types.push("Release".to_string());
        }
        if self.debug {
            types.push("Debug".to_string());
        }
        types
    }

    /// Assignments contributed by the build flags.
    pub fn config_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::new(LayerSource::Cli);

        let types = self.requested_build_types();
        if !types.is_empty() {
            layer.push_scalar("build_type", types.join(","));
        }

        for (key, set) in [
            ("clean", self.clean),
            ("force", self.force),
            ("build_missing", self.build_missing),
            ("continue_on_error", self.continue_on_error),
        ] {
            if set {
                layer.push_scalar(key, "true");
            }
        }
        if self.no_deploy {
            layer.push_scalar("deploy", "false");
        }

        for raw in &self.options {
            match raw.split_once('=') {
                Some((key, value)) => layer.push_scalar(format!("options.{}", key.trim()), value.trim()),
                None => layer.push_missing(format!("options.{}", raw.trim())),
            }
        }

        for (key, value) in [
            ("channel", &self.channel),
            ("reference", &self.reference),
            ("source_root", &self.source_root),
            ("build_dir", &self.build_dir),
        ] {
            if let Some(value) = value {
                layer.push_scalar(key, value.as_str());
            }
        }
        layer
    }
}

/// Full argument set of `tmns build` and `tmns plan`.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
    #[command(flatten)]
    pub options: BuildOptionArgs,
}

impl BuildArgs {
    /// The complete command-line layer for these arguments.
    pub fn config_layer(&self) -> Result<ConfigLayer> {
        let mut layer = self.selection.config_layer()?;
        layer.extend(self.options.config_layer());
        Ok(layer)
    }
}
