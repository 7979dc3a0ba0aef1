//! # tmns Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! This file serves as the main entry point for the tmns CLI, the build
//! orchestrator of the Terminus workspace. It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Routing execution to the command handlers
//!
//! ## Architecture
//!
//! - Each top-level command is a variant of the `Commands` enum
//! - Configuration flags (`--defaults`, `--profile`, `--set`, ...) are global and
//!   collected into a `LoadOptions` passed to every handler
//! - All errors are propagated to this level for consistent handling
//!
//! ## Examples
//!
//! ```bash
//! # Build the whole profile in Debug
//! tmns build
//!
//! # Show what a Release build of the core libraries would do
//! tmns -v plan -t core -r
//!
//! # Override a setting for one run and log to a file
//! tmns --set source_root=~/src/terminus --log-file build.log build -x
//! ```
//!
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

mod commands; // Command handlers (build, plan, repos, config)
mod common; // Shared utilities (process, conan, fs, ui)
mod core; // Domain layer (config, profile, plan, recipe, executor)

use crate::core::config::LoadOptions;

/// Defines the top-level command-line arguments structure using Clap's derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "tmns",
    about = "tmns: build orchestrator for the Terminus workspace",
    long_about = "Selects Terminus repositories from a layered profile and builds, packages\n\
                  and deploys them with Conan, one after another.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    /// Use this file instead of the built-in defaults
    #[arg(long, value_name = "PATH", global = true)]
    defaults: Option<PathBuf>,

    /// Profile file (defaults to ./tmns-profile.toml when present)
    #[arg(short = 'p', long, value_name = "PATH", global = true)]
    profile: Option<PathBuf>,

    /// Do not pick up ./tmns-profile.toml
    #[arg(long, global = true)]
    ignore_profiles: bool,

    /// Override a setting for this run (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    overrides: Vec<String>,
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            defaults_path: self.defaults.clone(),
            profile_path: self.profile.clone(),
            ignore_profiles: self.ignore_profiles,
            overrides: self.overrides.clone(),
            user_config_path: None,
        }
    }
}

/// Enum defining all available top-level commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build, package and deploy the selected repositories
    #[command(alias = "b")]
    Build(commands::build::BuildArgs),
    /// Print the build plan without running it
    Plan(commands::build::BuildArgs),
    /// List repositories of the resolved profile
    #[command(alias = "r")]
    Repos(commands::repos::ReposArgs),
    /// Show or initialise configuration
    Config(commands::config::ConfigArgs),
}

fn init_logging(verbose: u8, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact();

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_ref()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let load = cli.load_options();
    let command_result = match cli.command {
        Commands::Build(args) => commands::build::handle_build(args, &load).await,
        Commands::Plan(args) => commands::plan::handle_plan(args, &load).await,
        Commands::Repos(args) => commands::repos::handle_repos(args, &load).await,
        Commands::Config(args) => commands::config::handle_config(args, &load).await,
    };

    if let Err(e) = command_result {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
