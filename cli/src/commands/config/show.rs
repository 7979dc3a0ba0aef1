//! # tmns Config Show Command
//!
//! File: cli/src/commands/config/show.rs
//!
//! Prints the configuration exactly as `tmns build` would resolve it (minus
//! build flags), one `key = value` per line, tagged with its layer.
//!
use crate::core::config::{load_config, ConfigLayer, LayerSource, LoadOptions};
use crate::core::error::Result;
use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug, Default)]
pub struct ShowArgs {
    /// Also list the repository table
    #[arg(short = 'r', long)]
    repos: bool,
}

pub async fn handle_show(args: ShowArgs, load: &LoadOptions) -> Result<()> {
    info!("Handling config show command...");
    let config = load_config(load, ConfigLayer::new(LayerSource::Cli))
        .context("Failed to load tmns configuration")?;

    let width = config.settings().map(|(key, _, _)| key.len()).max().unwrap_or(0);
    for (key, value, source) in config.settings() {
        println!("{:<width$} = {:<24} # {}", key, value, source, width = width);
    }

    let source = config
        .repositories_source()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unset".to_string());
    println!(
        "{:<width$} = {} entries # {}",
        "repositories",
        config.repositories().len(),
        source,
        width = width
    );
    if args.repos {
        for repo in config.repositories() {
            println!("  {}", repo);
        }
    }
    Ok(())
}
