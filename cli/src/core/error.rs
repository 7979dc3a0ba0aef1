//! # tmns Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error types used throughout tmns. Every failure the
//! build orchestration can hit falls into one of a small set of categories, and
//! each category is terminal for the step (or the command) that produced it.
//! Nothing is retried automatically.
//!
//! ## Architecture
//!
//! The error system consists of two main components:
//! - `TmnsError`: A custom error enum using `thiserror` for the domain failures
//! - `Result<T>`: A type alias for `anyhow::Result<T>` used by command handlers
//!
//! The error types cover:
//! - Configuration errors (bad layer entries, unparseable values)
//! - Unknown repositories requested by a filter
//! - Missing build recipes
//! - External tool failures (non-zero exit from Conan)
//! - Clean-build safety refusals
//!
//! `TmnsError` only carries owned strings so it can be cloned into per-step
//! results (`core::executor::StepStatus::Failed`) and compared in tests.
//!
//! ## Examples
//!
//! ```rust
//! // Return a specific error type
//! return Err(TmnsError::UnknownRepository { name: "terminus-foo".into() }.into());
//!
//! // Pattern match on a step failure
//! if let StepStatus::Failed(TmnsError::SafetyAbort(reason)) = &result.status {
//!     eprintln!("Refused to clean: {}", reason);
//! }
//! ```
//!
use thiserror::Error;

/// Custom error type for the tmns application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TmnsError {
    #[error("Configuration error for key '{key}': {message}")]
    Config { key: String, message: String },

    #[error("Unknown repository '{name}' (not present in the repository table)")]
    UnknownRepository { name: String },

    #[error("No build recipe found at {path}")]
    MissingRecipe { path: String },

    #[error("External command failed: {cmd}, Status: {status}, Output:\n{output}")]
    ExternalCommand {
        cmd: String,
        status: String,
        output: String,
    },

    #[error("Refusing to clean: {0}")]
    SafetyAbort(String),

    #[error("Filesystem error: {0}")]
    FileSystem(String),
}

impl TmnsError {
    /// Shorthand for building a `Config` error.
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        TmnsError::Config {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;
