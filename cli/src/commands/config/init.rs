//! # tmns Config Init Command
//!
//! File: cli/src/commands/config/init.rs
//!
//! Seeds the user config file with the built-in defaults so they can be
//! edited. An existing file is left alone unless `--force` is given.
//!
use super::target_path;
use crate::common::fs::io as fsio;
use crate::core::config::{LoadOptions, DEFAULT_CONFIG};
use crate::core::error::Result;
use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug, Default)]
pub struct InitArgs {
    /// Overwrite an existing user config file
    #[arg(short, long)]
    force: bool,
}

pub async fn handle_init(args: InitArgs, load: &LoadOptions) -> Result<()> {
    info!("Handling config init command...");
    let path = target_path(load)?;
    debug!("User config target: {}", path.display());

    if path.exists() && !args.force {
        bail!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        );
    }

    fsio::write_string_to_file(&path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write user config {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
