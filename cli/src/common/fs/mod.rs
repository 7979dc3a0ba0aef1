//! # tmns Filesystem Utilities (`common::fs`)
//!
//! File: cli/src/common/fs/mod.rs
//!
//! ## Overview
//!
//! Filesystem helpers shared by the commands and the build executor. Everything
//! currently lives in the `io` submodule; import from it directly
//! (`crate::common::fs::io::same_location`).
//!

/// Directory creation, file writing, build-root removal and path comparison.
pub mod io;
