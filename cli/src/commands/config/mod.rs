//! # tmns Config Command Group
//!
//! File: cli/src/commands/config/mod.rs
//!
//! ## Overview
//!
//! Inspects and initialises tmns configuration:
//!
//! - `tmns config show`: every resolved setting with the layer that set it
//! - `tmns config init [--force]`: writes the built-in defaults to the user file
//! - `tmns config path`: prints where the user file lives
//!
//! `show` is the default when no subcommand is given.
//!
use crate::core::config::{user_config_path, LoadOptions};
use crate::core::error::Result;
use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod init;
mod show;

/// Top-level arguments for the 'config' command group.
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the resolved configuration and where each value came from
    Show(show::ShowArgs),
    /// Write the default configuration to the user config file
    Init(init::InitArgs),
    /// Print the location of the user config file
    Path,
}

/// Main handler for the 'config' command group.
pub async fn handle_config(args: ConfigArgs, load: &LoadOptions) -> Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show(show::ShowArgs::default())) {
        ConfigCommand::Show(args) => show::handle_show(args, load).await?,
        ConfigCommand::Init(args) => init::handle_init(args, load).await?,
        ConfigCommand::Path => println!("{}", target_path(load)?.display()),
    }
    Ok(())
}

/// User config file honoured by this invocation.
fn target_path(load: &LoadOptions) -> Result<PathBuf> {
    match load.user_config_path.clone().or_else(user_config_path) {
        Some(path) => Ok(path),
        None => bail!("Could not determine standard user config directory."),
    }
}
