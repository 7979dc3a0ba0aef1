//! # tmns Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! Aggregates the command groups of the tmns CLI. Each group defines its own
//! clap arguments and an async `handle_*` function called from `main.rs`.
//!
//! ## Command Groups
//!
//! - `build`: plan and execute builds of the selected repositories
//! - `plan`: print the build plan without executing it
//! - `repos`: list repositories of the resolved profile
//! - `config`: show, initialise and locate configuration
//!

/// Build the selected repositories. Also owns the argument groups shared with `plan` and `repos`.
pub mod build;
/// Inspect and initialise configuration.
pub mod config;
/// Dry-run of `build`.
pub mod plan;
/// Repository listing.
pub mod repos;
