//! # tmns Conan CLI Adapter (`common::conan`)
//!
//! File: cli/src/common/conan/mod.rs
//!
//! ## Overview
//!
//! Translates build-step intents into Conan 2 command lines and interprets the
//! little Conan output tmns needs (the local cache listing). Nothing here runs
//! a process; invocations are handed to a [`CommandRunner`].
//!
//! ## Commands Produced
//!
//! | Step            | Command                                                              |
//! |-----------------|----------------------------------------------------------------------|
//! | Install deps    | `conan install . --output-folder=<build> -s build_type=<T> ...`      |
//! | Compile         | `conan build . --output-folder=<build> -s build_type=<T> ...`        |
//! | Package         | `conan export-pkg . --output-folder=<build> -s build_type=<T> ...`   |
//! | Recipe deploy   | `conan install . --deployer-package=<pkg>/* --deployer-folder=<d>`   |
//! | Graph deploy    | `conan install --requires=<ref> --deployer=<full|runtime>_deploy ...` |
//! | Cache lookup    | `conan list <pkg>/*[@user/channel] --format=json`                    |
//!
//! Package options (`options.<name>` settings, `--option name=value`) become
//! `-o name=value`; `build_missing` adds `--build=missing`; a channel
//! (`user/channel`) adds `--user`/`--channel` to packaging and narrows cache
//! lookups.
//!
use crate::common::process::{CommandRunner, ToolInvocation};
use crate::core::config::Config;
use crate::core::error::TmnsError;
use crate::core::plan::{BuildType, Deployer};
use std::path::Path;
use tracing::{debug, warn};

/// `user/channel` qualifier appended to package references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub user: String,
    pub channel: String,
}

impl std::str::FromStr for Channel {
    type Err = TmnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((user, channel)) if !user.is_empty() && !channel.is_empty() && !channel.contains('/') => {
                Ok(Channel {
                    user: user.to_string(),
                    channel: channel.to_string(),
                })
            }
            _ => Err(TmnsError::config(
                "channel",
                format!("expected 'user/channel', found '{}'", s),
            )),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user, self.channel)
    }
}

/// Builds Conan command lines for one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConanCli {
    program: String,
    options: Vec<(String, String)>,
    channel: Option<Channel>,
}

impl ConanCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            options: Vec::new(),
            channel: None,
        }
    }

    pub fn with_options(mut self, options: Vec<(String, String)>) -> Self {
        self.options = options;
        self
    }

    pub fn with_channel(mut self, channel: Option<Channel>) -> Self {
        self.channel = channel;
        self
    }

    /// Reads `conan`, `options.*` and `channel` from the configuration.
    pub fn from_config(config: &Config) -> Result<Self, TmnsError> {
        let channel = config
            .get_opt("channel")
            .map(str::parse::<Channel>)
            .transpose()?;
        Ok(Self::new(config.get("conan", "conan"))
            .with_options(config.section("options"))
            .with_channel(channel))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn base(&self, subcommand: &str, cwd: &Path) -> ToolInvocation {
        ToolInvocation::new(&self.program)
            .arg(subcommand)
            .current_dir(cwd)
    }

    fn settings_args(&self, build_type: BuildType, build_missing: bool) -> Vec<String> {
        let mut args = vec!["-s".to_string(), format!("build_type={}", build_type)];
        for (name, value) in &self.options {
            args.push("-o".to_string());
            args.push(format!("{}={}", name, value));
        }
        if build_missing {
            args.push("--build=missing".to_string());
        }
        args
    }

    fn channel_args(&self) -> Vec<String> {
        match &self.channel {
            Some(ch) => vec![
                "--user".to_string(),
                ch.user.clone(),
                "--channel".to_string(),
                ch.channel.clone(),
            ],
            None => Vec::new(),
        }
    }

    /// `conan install` for the recipe in `repo_dir`, generating into `build_root`.
    pub fn install(&self, repo_dir: &Path, build_root: &Path, build_type: BuildType, build_missing: bool) -> ToolInvocation {
        self.base("install", repo_dir)
            .arg(".")
            .arg(format!("--output-folder={}", build_root.display()))
            .args(self.settings_args(build_type, build_missing))
    }

    /// `conan build` for the recipe in `repo_dir`.
    pub fn build(&self, repo_dir: &Path, build_root: &Path, build_type: BuildType, build_missing: bool) -> ToolInvocation {
        self.base("build", repo_dir)
            .arg(".")
            .arg(format!("--output-folder={}", build_root.display()))
            .args(self.settings_args(build_type, build_missing))
    }

    /// `conan export-pkg`, putting the freshly built package into the local cache.
    pub fn export_pkg(&self, repo_dir: &Path, build_root: &Path, build_type: BuildType) -> ToolInvocation {
        self.base("export-pkg", repo_dir)
            .arg(".")
            .arg(format!("--output-folder={}", build_root.display()))
            .args(self.settings_args(build_type, false))
            .args(self.channel_args())
    }

    /// Deploy through the recipe's own `deploy()` method.
    pub fn deploy_with_recipe(
        &self,
        repo_dir: &Path,
        package: &str,
        build_type: BuildType,
        deploy_dir: &Path,
    ) -> ToolInvocation {
        self.base("install", repo_dir)
            .arg(".")
            .args(self.settings_args(build_type, false))
            .arg(format!("--deployer-package={}/*", package))
            .arg(format!("--deployer-folder={}", deploy_dir.display()))
    }

    /// Deploy `reference` and its dependency graph with a built-in deployer.
    pub fn deploy_graph(
        &self,
        repo_dir: &Path,
        reference: &str,
        deployer: Deployer,
        build_type: BuildType,
        deploy_dir: &Path,
    ) -> ToolInvocation {
        self.base("install", repo_dir)
            .arg(format!("--requires={}", reference))
            .args(self.settings_args(build_type, false))
            .arg(format!("--deployer={}", deployer.conan_name()))
            .arg(format!("--deployer-folder={}", deploy_dir.display()))
    }

    /// Pattern matching every cached version of `package` (on our channel, if any).
    pub fn list_pattern(&self, package: &str) -> String {
        match &self.channel {
            Some(ch) => format!("{}/*@{}", package, ch),
            None => format!("{}/*", package),
        }
    }

    /// `conan list` over the local cache, as JSON.
    pub fn list_local(&self, repo_dir: &Path, package: &str) -> ToolInvocation {
        self.base("list", repo_dir)
            .arg(self.list_pattern(package))
            .arg("--format=json")
    }

    /// Looks `package` up in the local cache and returns the newest reference.
    ///
    /// Any failure (tool error, unparseable output, nothing cached) is `None`:
    /// the caller then has no resolved reference to deploy.
    pub fn resolve_local_reference(
        &self,
        runner: &dyn CommandRunner,
        repo_dir: &Path,
        package: &str,
    ) -> Option<String> {
        let invocation = self.list_local(repo_dir, package);
        match runner.run(&invocation) {
            Ok(output) if output.success() => parse_list_output(&output.stdout, package),
            Ok(output) => {
                debug!("'{}' failed ({}); no cached reference", invocation, output.status_label());
                None
            }
            Err(e) => {
                warn!("Could not query the local package cache: {}", e);
                None
            }
        }
    }
}

/// Picks the newest `package/...` reference out of `conan list --format=json`.
///
/// Output shape: `{"Local Cache": {"pkg/1.0.0": {...}, "pkg/1.1.0@u/c": {...}}}`.
/// "Newest" is the greatest reference in version-aware order.
pub fn parse_list_output(stdout: &str, package: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(stdout).ok()?;
    let prefix = format!("{}/", package);
    json.as_object()?
        .values()
        .filter_map(|remote| remote.as_object())
        .flat_map(|refs| refs.keys())
        .filter(|reference| reference.starts_with(&prefix))
        .max_by(|a, b| version_key(a).cmp(&version_key(b)))
        .cloned()
}

/// Splits the version part of a reference into numeric/text components so
/// that `1.10.0` sorts after `1.9.0`.
fn version_key(reference: &str) -> Vec<(u64, String)> {
    let version = reference
        .split_once('/')
        .map(|(_, rest)| rest)
        .unwrap_or(reference);
    let version = version.split(['@', '#']).next().unwrap_or(version);
    version
        .split(['.', '-', '+'])
        .map(|part| match part.parse::<u64>() {
            Ok(n) => (n, String::new()),
            Err(_) => (0, part.to_string()),
        })
        .collect()
}
