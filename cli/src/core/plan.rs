//! # tmns Build Plan Builder
//!
//! File: cli/src/core/plan.rs
//!
//! ## Overview
//!
//! Turns a resolved list of repositories into an ordered list of `BuildStep`s.
//! Planning is pure: it never touches the filesystem or the package manager.
//!
//! - Steps follow the input order (repository declaration order). Callers that
//!   need dependency-aware ordering must sort the profile themselves.
//! - One step per repository and requested build type, repository-major.
//! - A repository may declare its own `build_types` and `clean`. They apply
//!   unless the environment or the command line set `build_type` / `clean`.
//! - Requesting more than one build type for a repository forces `clean` on
//!   each of its steps, since a single build folder cannot hold two
//!   configurations.
//! - The deploy strategy is left `Unresolved` for the executor to decide after
//!   it has looked at the recipe, or set to `None` when deployment is disabled.
//!
use crate::core::config::{Config, LayerSource};
use crate::core::error::TmnsError;
use crate::core::profile::RepoEntry;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// CMake/Conan build configuration.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(try_from = "String")]
pub enum BuildType {
    Debug,
    Release,
    RelWithDebInfo,
}

impl BuildType {
    /// Name as passed to `-s build_type=...`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
            BuildType::RelWithDebInfo => "RelWithDebInfo",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = TmnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            "relwithdebinfo" => Ok(BuildType::RelWithDebInfo),
            other => Err(TmnsError::config(
                "build_type",
                format!(
                    "unknown build type '{}' (expected Debug, Release or RelWithDebInfo)",
                    other
                ),
            )),
        }
    }
}

impl TryFrom<String> for BuildType {
    type Error = TmnsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Which deployer copies the package and its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployer {
    /// Package plus its entire dependency graph (`full_deploy`).
    Full,
    /// Only what is needed at runtime (`runtime_deploy`).
    Runtime,
}

impl Deployer {
    /// Name of the built-in Conan deployer.
    pub fn conan_name(&self) -> &'static str {
        match self {
            Deployer::Full => "full_deploy",
            Deployer::Runtime => "runtime_deploy",
        }
    }
}

/// How (and whether) a step deploys its package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStrategy {
    /// Not decided yet; the executor resolves it from the recipe.
    Unresolved,
    /// Deployment disabled or nothing to deploy.
    None,
    /// The recipe defines its own `deploy()` method.
    RecipeDefined,
    /// Copy the dependency graph with one of Conan's deployers.
    DependencyGraphCopy(Deployer),
}

impl fmt::Display for DeployStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployStrategy::Unresolved => f.write_str("decided at build time"),
            DeployStrategy::None => f.write_str("none"),
            DeployStrategy::RecipeDefined => f.write_str("recipe-defined"),
            DeployStrategy::DependencyGraphCopy(d) => write!(f, "dependency graph ({})", d.conan_name()),
        }
    }
}

/// Knobs applied to every planned step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    pub build_types: Vec<BuildType>,
    pub clean: bool,
    pub build_missing: bool,
    pub deploy: bool,
    /// `build_types` came from the environment or command line and beats
    /// per-repository build types.
    pub build_types_pinned: bool,
    /// Same for `clean`.
    pub clean_pinned: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            build_types: vec![BuildType::Debug],
            clean: false,
            build_missing: false,
            deploy: true,
            build_types_pinned: false,
            clean_pinned: false,
        }
    }
}

impl PlanOptions {
    /// Reads `build_type`, `clean`, `build_missing` and `deploy` from the config.
    pub fn from_config(config: &Config) -> Result<Self, TmnsError> {
        let mut build_types = Vec::new();
        for raw in config.get_list("build_type") {
            let parsed: BuildType = raw.parse()?;
            if !build_types.contains(&parsed) {
                build_types.push(parsed);
            }
        }
        if build_types.is_empty() {
            build_types.push(BuildType::Debug);
        }
        let pinned = |key: &str| {
            config
                .source_of(key)
                .is_some_and(|source| source >= LayerSource::Environment)
        };
        Ok(Self {
            build_types,
            clean: config.get_bool("clean", false)?,
            build_missing: config.get_bool("build_missing", false)?,
            deploy: config.get_bool("deploy", true)?,
            build_types_pinned: pinned("build_type"),
            clean_pinned: pinned("clean"),
        })
    }

    /// Build types for `repo`, without duplicates.
    pub fn build_types_for(&self, repo: &RepoEntry) -> Vec<BuildType> {
        let requested = if self.build_types_pinned || repo.build_types.is_empty() {
            &self.build_types
        } else {
            &repo.build_types
        };
        let mut types = Vec::with_capacity(requested.len());
        for build_type in requested {
            if !types.contains(build_type) {
                types.push(*build_type);
            }
        }
        types
    }

    /// Clean flag for `repo` before the multiple-build-type rule.
    pub fn clean_for(&self, repo: &RepoEntry) -> bool {
        match repo.clean {
            Some(clean) if !self.clean_pinned => clean,
            _ => self.clean,
        }
    }
}

/// One unit of work for the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    pub repo: RepoEntry,
    pub build_type: BuildType,
    pub clean: bool,
    pub build_missing: bool,
    pub deploy_strategy: DeployStrategy,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}){}{}, deploy: {}",
            self.repo.name,
            self.build_type,
            if self.clean { ", clean" } else { "" },
            if self.build_missing { ", build missing" } else { "" },
            self.deploy_strategy
        )
    }
}

/// Builds the ordered step list for `repos`.
pub fn plan(repos: &[RepoEntry], options: &PlanOptions) -> Vec<BuildStep> {
    let deploy_strategy = if options.deploy {
        DeployStrategy::Unresolved
    } else {
        DeployStrategy::None
    };

    repos
        .iter()
        .flat_map(|repo| {
            let build_types = options.build_types_for(repo);
            let clean = options.clean_for(repo) || build_types.len() > 1;
            build_types.into_iter().map(move |build_type| BuildStep {
                repo: repo.clone(),
                build_type,
                clean,
                build_missing: options.build_missing,
                deploy_strategy,
            })
        })
        .collect()
}
