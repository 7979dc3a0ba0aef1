//! # tmns Repos Command
//!
//! File: cli/src/commands/repos/mod.rs
//!
//! ## Overview
//!
//! Lists the repositories of the resolved profile that match the selection
//! flags, in declaration order, with their tags. Entries marked
//! `build = false` are listed too, flagged as not built.
//!
//! ```bash
//! tmns repos              # whole profile
//! tmns repos -t python    # by tag
//! tmns repos --tags       # just the known tags
//! ```
//!
use crate::commands::build::options::SelectionArgs;
use crate::core::config::{load_config, LoadOptions};
use crate::core::error::Result;
use crate::core::profile::{known_tags, resolve};
use anyhow::Context;
use clap::Args;
use tracing::{debug, info};

/// Arguments of `tmns repos`.
#[derive(Args, Debug, Clone, Default)]
pub struct ReposArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Print the distinct tags of the profile instead of repositories
    #[arg(long = "tags")]
    pub list_tags: bool,

    /// Include each repository's URL
    #[arg(short = 'u', long)]
    pub urls: bool,
}

/// Handler for `tmns repos`.
pub async fn handle_repos(args: ReposArgs, load: &LoadOptions) -> Result<()> {
    info!("Handling repos command...");
    debug!("Repos args: {:?}", args);

    let flags = args.selection.config_layer()?;
    let config = load_config(load, flags).context("Failed to load tmns configuration")?;

    if args.list_tags {
        for tag in known_tags(config.repositories()) {
            println!("{}", tag);
        }
        return Ok(());
    }

    let repos = resolve(&config, &args.selection.filter())?;
    if repos.is_empty() {
        println!("No repositories matched.");
        return Ok(());
    }
    for repo in &repos {
        if args.urls {
            println!("{}  {}", repo, repo.url);
        } else {
            println!("{}", repo);
        }
    }
    Ok(())
}
