//! # tmns Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! This module implements the layered configuration store. A `Config` holds
//! named scalar settings plus one named collection, the repository table
//! (`repositories`). It is folded once per invocation from four layers and is
//! immutable afterwards; handlers receive it by reference.
//!
//! ## Architecture
//!
//! Configuration sources (lowest to highest precedence):
//! 1. The default file (`--defaults <path>`, or the defaults embedded in the binary)
//! 2. The user file (`<config dir>/tmns/config.toml`)
//! 3. `TMNS_*` environment variables
//! 4. The command line: a profile file (`--profile`, or `tmns-profile.toml` in the
//!    working directory), then `--set key=value`, then dedicated flags
//!
//! Key rules:
//! - The store records which layer set each value. A layer only overwrites a
//!   value set by a layer of equal or lower precedence, so the outcome does not
//!   depend on the order layers are applied in.
//! - `repositories` is replaced wholesale, never merged entry by entry.
//! - An entry without a value aborts resolution with `TmnsError::Config`.
//! - Unknown keys are kept as opaque settings. Nested TOML tables are flattened
//!   to dotted keys (`[options] shared = true` becomes `options.shared`).
//!
//! ## Examples
//!
//! ```rust
//! let cfg = config::load_config(&load_opts, cli_layer)?;
//! let build_type = cfg.get("build_type", "Debug");
//! let clean = cfg.get_bool("clean", false)?;
//! ```
//!
use crate::core::error::{Result, TmnsError};
use crate::core::profile::RepoEntry;
use anyhow::{bail, Context};
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Reserved key holding the repository table.
pub const REPOSITORIES_KEY: &str = "repositories";
/// Prefix marking environment variables as configuration overrides.
pub const ENV_PREFIX: &str = "TMNS_";
/// Profile file picked up from the working directory when `--profile` is not given.
pub const PROFILE_FILENAME: &str = "tmns-profile.toml";
/// Name of the user configuration file inside the tmns config directory.
const USER_CONFIG_FILENAME: &str = "config.toml";
/// Defaults shipped with the tool.
pub const DEFAULT_CONFIG: &str = include_str!("../../resources/default-config.toml");

/// Origin of a configuration layer. Ordered by precedence, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerSource {
    DefaultFile,
    UserFile,
    Environment,
    Cli,
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LayerSource::DefaultFile => "default",
            LayerSource::UserFile => "user",
            LayerSource::Environment => "env",
            LayerSource::Cli => "cli",
        };
        f.write_str(label)
    }
}

/// Value carried by a layer entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerValue {
    Scalar(String),
    /// Full replacement of the repository table.
    Repositories(Vec<RepoEntry>),
    /// A value that was given but could not be read; holds the reason.
    Invalid(String),
}

/// One assignment in a layer. `value` is `None` for entries without a value
/// (`--set key`, `TMNS_KEY=`). Both `None` and `Invalid` fail when the layer
/// is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEntry {
    pub key: String,
    pub value: Option<LayerValue>,
}

/// An ordered set of assignments from a single source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    pub source: LayerSource,
    pub entries: Vec<LayerEntry>,
}

impl ConfigLayer {
    pub fn new(source: LayerSource) -> Self {
        Self {
            source,
            entries: Vec::new(),
        }
    }

    pub fn push_scalar(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        // Blank values count as missing.
        let value = if value.trim().is_empty() {
            None
        } else {
            Some(LayerValue::Scalar(value))
        };
        self.entries.push(LayerEntry { key, value });
    }

    pub fn push_missing(&mut self, key: impl Into<String>) {
        self.entries.push(LayerEntry {
            key: key.into(),
            value: None,
        });
    }

    pub fn push_invalid(&mut self, key: impl Into<String>, reason: impl Into<String>) {
        self.entries.push(LayerEntry {
            key: key.into(),
            value: Some(LayerValue::Invalid(reason.into())),
        });
    }

    pub fn push_repositories(&mut self, repos: Vec<RepoEntry>) {
        self.entries.push(LayerEntry {
            key: REPOSITORIES_KEY.to_string(),
            value: Some(LayerValue::Repositories(repos)),
        });
    }

    /// Parses a `key=value` assignment as given to `--set`.
    /// A missing `=` records a malformed entry for `key`.
    pub fn push_assignment(&mut self, raw: &str) {
        match raw.split_once('=') {
            Some((key, value)) => {
                let key = key.trim();
                if key == REPOSITORIES_KEY {
                    match parse_inline_repositories(value) {
                        Ok(repos) => self.push_repositories(repos),
                        Err(e) => self.push_invalid(key, invalid_reason(e)),
                    }
                } else {
                    self.push_scalar(key, value.trim());
                }
            }
            None => self.push_missing(raw.trim()),
        }
    }

    /// Appends every entry of `other` after this layer's own entries.
    pub fn extend(&mut self, other: ConfigLayer) {
        self.entries.extend(other.entries);
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a layer from TOML text. `origin` names the text in error messages.
    pub fn from_toml_str(source: LayerSource, text: &str, origin: &str) -> std::result::Result<Self, TmnsError> {
        let table: toml::Table = toml::from_str(text)
            .map_err(|e| TmnsError::config(origin, format!("invalid TOML: {}", e)))?;
        let mut layer = ConfigLayer::new(source);
        flatten_table(&mut layer, "", &table)?;
        Ok(layer)
    }

    /// Builds a layer from a TOML file on disk.
    pub fn from_file(source: LayerSource, path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        let layer = Self::from_toml_str(source, &text, &path.display().to_string())
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;
        Ok(layer)
    }

    /// Builds the environment layer from `(name, value)` pairs.
    ///
    /// Only names starting with `TMNS_` are used. The key is the rest of the
    /// name lower-cased, with `__` standing for a dot
    /// (`TMNS_OPTIONS__SHARED` sets `options.shared`). Names that are not
    /// UTF-8 are skipped; a `TMNS_*` value that is not UTF-8 is an invalid entry.
    pub fn from_env_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let mut layer = ConfigLayer::new(LayerSource::Environment);
        let mut vars: Vec<(String, OsString)> = vars
            .into_iter()
            .filter_map(|(name, value)| {
                let name = name.into().into_string().ok()?;
                (name.starts_with(ENV_PREFIX) && name.len() > ENV_PREFIX.len())
                    .then(|| (name, value.into()))
            })
            .collect();
        // Environment iteration order is unspecified; sort for reproducible layers.
        vars.sort();
        for (name, value) in vars {
            let key = name[ENV_PREFIX.len()..].to_lowercase().replace("__", ".");
            debug!("Environment override {} -> {}", name, key);
            let value = match value.into_string() {
                Ok(value) => value,
                Err(raw) => {
                    warn!("{} is not valid UTF-8: {:?}", name, raw);
                    layer.push_invalid(key, format!("{} is not valid UTF-8", name));
                    continue;
                }
            };
            if key == REPOSITORIES_KEY {
                match parse_inline_repositories(&value) {
                    Ok(repos) => layer.push_repositories(repos),
                    Err(e) => layer.push_invalid(key, invalid_reason(e)),
                }
            } else {
                layer.push_scalar(key, value);
            }
        }
        layer
    }
}

/// The message of a config error without its key prefix.
fn invalid_reason(err: TmnsError) -> String {
    match err {
        TmnsError::Config { message, .. } => message,
        other => other.to_string(),
    }
}

/// Parses an inline TOML array of tables into a repository table.
fn parse_inline_repositories(text: &str) -> std::result::Result<Vec<RepoEntry>, TmnsError> {
    let wrapped = format!("{} = {}", REPOSITORIES_KEY, text.trim());
    let table: toml::Table = toml::from_str(&wrapped)
        .map_err(|e| TmnsError::config(REPOSITORIES_KEY, format!("invalid repository table: {}", e)))?;
    match table.get(REPOSITORIES_KEY) {
        Some(value) => repositories_from_value(value),
        None => Err(TmnsError::config(REPOSITORIES_KEY, "missing value")),
    }
}

fn repositories_from_value(value: &toml::Value) -> std::result::Result<Vec<RepoEntry>, TmnsError> {
    value
        .clone()
        .try_into::<Vec<RepoEntry>>()
        .map_err(|e| TmnsError::config(REPOSITORIES_KEY, format!("invalid repository table: {}", e)))
}

fn flatten_table(
    layer: &mut ConfigLayer,
    prefix: &str,
    table: &toml::Table,
) -> std::result::Result<(), TmnsError> {
    for (name, value) in table {
        let key = format!("{}{}", prefix, name);
        if prefix.is_empty() && name == REPOSITORIES_KEY {
            layer.push_repositories(repositories_from_value(value)?);
            continue;
        }
        match value {
            toml::Value::Table(inner) => flatten_table(layer, &format!("{}.", key), inner)?,
            toml::Value::String(s) => layer.push_scalar(key, s.as_str()),
            toml::Value::Array(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    match scalar_to_string(item) {
                        Some(part) => parts.push(part),
                        None => {
                            return Err(TmnsError::config(
                                key,
                                "arrays may only contain scalar values",
                            ))
                        }
                    }
                }
                layer.push_scalar(key, parts.join(","));
            }
            other => match scalar_to_string(other) {
                Some(s) => layer.push_scalar(key, s),
                None => layer.push_missing(key),
            },
        }
    }
    Ok(())
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Setting {
    value: String,
    source: LayerSource,
}

/// The resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    settings: BTreeMap<String, Setting>,
    repositories: Vec<RepoEntry>,
    repositories_source: Option<LayerSource>,
}

impl Config {
    /// Loads the default layer from `default_path`.
    pub fn load(default_path: &Path) -> Result<Config> {
        info!("Loading defaults from: {}", default_path.display());
        let layer = ConfigLayer::from_file(LayerSource::DefaultFile, default_path)?;
        Ok(Config::default().apply_layer(&layer)?)
    }

    /// Loads the defaults embedded in the binary.
    pub fn load_builtin() -> std::result::Result<Config, TmnsError> {
        let layer = ConfigLayer::from_toml_str(LayerSource::DefaultFile, DEFAULT_CONFIG, "built-in defaults")?;
        Config::default().apply_layer(&layer)
    }

    /// Returns a new `Config` with `layer` folded in. `self` is left untouched.
    ///
    /// Fails on the first entry without a value; no partially applied config
    /// is returned in that case.
    pub fn apply_layer(&self, layer: &ConfigLayer) -> std::result::Result<Config, TmnsError> {
        for entry in &layer.entries {
            match &entry.value {
                None => {
                    return Err(TmnsError::config(
                        entry.key.clone(),
                        format!("missing value in {} layer", layer.source),
                    ))
                }
                Some(LayerValue::Invalid(reason)) => {
                    return Err(TmnsError::config(
                        entry.key.clone(),
                        format!("{} ({} layer)", reason, layer.source),
                    ))
                }
                Some(_) => {}
            }
        }

        let mut next = self.clone();
        for entry in &layer.entries {
            match &entry.value {
                Some(LayerValue::Scalar(value)) => {
                    let outranked = next
                        .settings
                        .get(&entry.key)
                        .is_some_and(|existing| existing.source > layer.source);
                    if outranked {
                        debug!(
                            "Ignoring {} layer value for '{}': set by a higher layer",
                            layer.source, entry.key
                        );
                        continue;
                    }
                    next.settings.insert(
                        entry.key.clone(),
                        Setting {
                            value: value.clone(),
                            source: layer.source,
                        },
                    );
                }
                Some(LayerValue::Repositories(repos)) => {
                    if next
                        .repositories_source
                        .is_some_and(|existing| existing > layer.source)
                    {
                        debug!(
                            "Ignoring {} layer repository table: set by a higher layer",
                            layer.source
                        );
                        continue;
                    }
                    next.repositories = dedupe_by_name(repos);
                    next.repositories_source = Some(layer.source);
                }
                None | Some(LayerValue::Invalid(_)) => {
                    unreachable!("entries without values are rejected above")
                }
            }
        }
        Ok(next)
    }

    /// Value of `key`, or `fallback` when unset. Never fails.
    pub fn get(&self, key: &str, fallback: &str) -> String {
        self.get_opt(key).unwrap_or(fallback).to_string()
    }

    pub fn get_opt(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(|s| s.value.as_str())
    }

    /// Layer that supplied the current value of `key`.
    pub fn source_of(&self, key: &str) -> Option<LayerSource> {
        self.settings.get(key).map(|s| s.source)
    }

    /// Boolean value of `key`. Accepts true/false, yes/no, on/off and 1/0.
    pub fn get_bool(&self, key: &str, fallback: bool) -> std::result::Result<bool, TmnsError> {
        match self.get_opt(key) {
            None => Ok(fallback),
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" => Ok(false),
                _ => Err(TmnsError::config(
                    key,
                    format!("expected a boolean, found '{}'", raw),
                )),
            },
        }
    }

    /// Comma-separated list value of `key`, trimmed, empty items dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get_opt(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Path value of `key` with a leading `~` expanded.
    pub fn get_path(&self, key: &str, fallback: &str) -> PathBuf {
        let raw = self.get(key, fallback);
        PathBuf::from(shellexpand::tilde(&raw).into_owned())
    }

    /// Settings under `prefix.`, with the prefix stripped (`options.shared` -> `shared`).
    pub fn section(&self, prefix: &str) -> Vec<(String, String)> {
        let dotted = format!("{}.", prefix);
        self.settings
            .iter()
            .filter_map(|(key, setting)| {
                key.strip_prefix(&dotted)
                    .map(|rest| (rest.to_string(), setting.value.clone()))
            })
            .collect()
    }

    /// All scalar settings with the layer that set them, sorted by key.
    pub fn settings(&self) -> impl Iterator<Item = (&str, &str, LayerSource)> {
        self.settings
            .iter()
            .map(|(k, s)| (k.as_str(), s.value.as_str(), s.source))
    }

    pub fn repositories(&self) -> &[RepoEntry] {
        &self.repositories
    }

    pub fn repositories_source(&self) -> Option<LayerSource> {
        self.repositories_source
    }
}

/// Later declarations of a name replace earlier ones in place.
fn dedupe_by_name(repos: &[RepoEntry]) -> Vec<RepoEntry> {
    let mut table: Vec<RepoEntry> = Vec::with_capacity(repos.len());
    for repo in repos {
        match table.iter_mut().find(|existing| existing.name == repo.name) {
            Some(existing) => {
                warn!("Repository '{}' declared twice; keeping the later declaration", repo.name);
                *existing = repo.clone();
            }
            None => table.push(repo.clone()),
        }
    }
    table
}

/// Inputs for [`load_config`] gathered from the global command-line flags.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Replaces the built-in defaults.
    pub defaults_path: Option<PathBuf>,
    /// Explicit profile file. Must exist when given.
    pub profile_path: Option<PathBuf>,
    /// Skip picking up `tmns-profile.toml` from the working directory.
    pub ignore_profiles: bool,
    /// Raw `--set key=value` assignments.
    pub overrides: Vec<String>,
    /// Overrides the user file location (tests); `None` uses the platform path.
    pub user_config_path: Option<PathBuf>,
}

/// Location of the user configuration file, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "Terminus", "tmns")
        .map(|dirs| dirs.config_dir().join(USER_CONFIG_FILENAME))
}

/// Resolves the full configuration for one invocation.
///
/// `flags` holds the assignments derived from command-specific flags; they
/// take precedence over `--set` and the profile file inside the CLI layer.
pub fn load_config(opts: &LoadOptions, flags: ConfigLayer) -> Result<Config> {
    let mut config = match &opts.defaults_path {
        Some(path) => Config::load(path)?,
        None => Config::load_builtin().context("Built-in defaults are invalid")?,
    };

    if let Some(user_path) = opts.user_config_path.clone().or_else(user_config_path) {
        if user_path.is_file() {
            info!("Loading user configuration from: {}", user_path.display());
            let layer = ConfigLayer::from_file(LayerSource::UserFile, &user_path)?;
            config = config.apply_layer(&layer)?;
        } else {
            debug!("User configuration file not found at {}", user_path.display());
        }
    } else {
        warn!("Could not determine user config directory.");
    }

    let env_layer = ConfigLayer::from_env_vars(std::env::vars_os());
    config = config.apply_layer(&env_layer)?;

    let mut cli = ConfigLayer::new(LayerSource::Cli);
    if let Some(profile) = find_profile(opts)? {
        info!("Loading profile: {}", profile.display());
        cli.extend(ConfigLayer::from_file(LayerSource::Cli, &profile)?);
    }
    for raw in &opts.overrides {
        cli.push_assignment(raw);
    }
    cli.extend(flags);
    config = config.apply_layer(&cli)?;

    debug!("Final resolved configuration: {:?}", config);
    Ok(config)
}

fn find_profile(opts: &LoadOptions) -> Result<Option<PathBuf>> {
    if let Some(path) = &opts.profile_path {
        if !path.is_file() {
            bail!(TmnsError::config(
                "profile",
                format!("profile file {} does not exist", path.display())
            ));
        }
        return Ok(Some(path.clone()));
    }
    if opts.ignore_profiles {
        debug!("Ignoring working-directory profiles.");
        return Ok(None);
    }
    let candidate = std::env::current_dir()
        .context("Failed to get current directory")?
        .join(PROFILE_FILENAME);
    Ok(candidate.is_file().then_some(candidate))
}
