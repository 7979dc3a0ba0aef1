//! # tmns Plan Command
//!
//! File: cli/src/commands/plan/mod.rs
//!
//! ## Overview
//!
//! `tmns plan` takes exactly the arguments of `tmns build` and prints the
//! steps that build would run, without touching the filesystem or invoking
//! Conan. Deploy strategies show as "decided at build time" because they
//! depend on the recipe and the package cache.
//!
//! ```bash
//! tmns plan -t core -r -d
//! ```
//!
use crate::commands::build::{prepare, BuildArgs};
use crate::core::config::LoadOptions;
use crate::core::error::Result;
use tracing::{debug, info};

/// Handler for `tmns plan`.
pub async fn handle_plan(args: BuildArgs, load: &LoadOptions) -> Result<()> {
    info!("Handling plan command...");
    debug!("Plan args: {:?}", args);

    let prepared = prepare(&args, load)?;
    if prepared.steps.is_empty() {
        println!("Nothing to build.");
        return Ok(());
    }

    let source_root = prepared.config.get_path("source_root", ".");
    for (idx, step) in prepared.steps.iter().enumerate() {
        println!("{:>3}. {}", idx + 1, step);
        debug!("     in {}", step.repo.checkout_dir(&source_root).display());
    }
    println!(
        "\n{} steps for {} repositories",
        prepared.steps.len(),
        prepared.repos.len()
    );
    Ok(())
}
