//! # tmns Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! Shared utilities used by the command handlers and the build executor. They
//! wrap the outside world: the filesystem, external processes, the Conan CLI and
//! the terminal. Command-specific logic lives in `commands::`, the configuration
//! and planning core in `core::`.
//!
//! - **`conan`**: Builds Conan command lines and reads `conan list` output.
//! - **`fs`**: Directory creation, file writing, build-root removal, path comparison.
//! - **`process`**: The `CommandRunner` seam and its `std::process` implementation.
//! - **`ui`**: The `Prompter` seam and its `dialoguer` implementation.
//!

/// Conan command-line construction and output parsing.
pub mod conan;
/// Filesystem operations.
pub mod fs;
/// External process execution.
pub mod process;
/// Interactive prompts.
pub mod ui;
