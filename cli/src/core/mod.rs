//! # tmns Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! The domain layer of tmns. Command handlers glue these together; none of
//! them knows about clap or the terminal.
//!
//! ## Architecture
//!
//! - `config`: layered configuration (built-in defaults, user file, environment,
//!   command line) with per-key precedence
//! - `error`: the `TmnsError` taxonomy
//! - `profile`: repository catalogue and tag/name selection
//! - `plan`: turns selected repositories and build options into ordered steps
//! - `recipe`: capability queries on a repository's `conanfile.py`
//! - `executor`: runs steps through the build state machine
//!
//! ## Usage
//!
//! ```rust
//! use crate::core::config::{load_config, LoadOptions};
//! use crate::core::profile::{resolve, RepoFilter};
//! use crate::core::plan::{plan, PlanOptions};
//! ```
//!
pub mod config;
pub mod error;
pub mod executor;
pub mod plan;
pub mod profile;
pub mod recipe;
