//! # tmns Build Command
//!
//! File: cli/src/commands/build/mod.rs
//!
//! ## Overview
//!
//! Implements `tmns build`: resolve the configuration, select repositories,
//! plan the steps and run them through the executor, one at a time.
//!
//! ## Workflow
//!
//! 1. Fold defaults, user file, environment and command line into one `Config`.
//! 2. Select repositories (`--all`, `-t`, `-n`), dropping `build = false` entries.
//! 3. Plan one step per repository and build type.
//! 4. Execute the plan. A failure halts it unless `-x/--continue-on-error`;
//!    a declined clean confirmation always halts it.
//! 5. Print a summary. The command fails only when the plan was halted by a
//!    failed step.
//!
//! ## Examples
//!
//! ```bash
//! # Debug build of the whole profile
//! tmns build
//!
//! # Clean Release + Debug builds of everything tagged `core`, keep going on failure
//! tmns build -t core -r -d -x
//!
//! # Build one repository with a Conan option and no deployment
//! tmns build -n terminus-log -o shared=True --no-deploy
//! ```
//!
pub mod options;

use crate::common::conan::ConanCli;
use crate::common::process::ProcessRunner;
use crate::common::ui::TerminalPrompter;
use crate::core::config::{load_config, Config, LoadOptions};
use crate::core::error::Result;
use crate::core::executor::{run_plan, Executor, ExecutorSettings, PlanReport, StepStatus};
use crate::core::plan::{plan, BuildStep, PlanOptions};
use crate::core::profile::{resolve, RepoEntry};
use anyhow::{bail, Context};
pub use options::BuildArgs;
use std::env;
use tracing::{debug, info};

/// Configuration and steps shared by `tmns build` and `tmns plan`.
pub struct PreparedPlan {
    pub config: Config,
    pub repos: Vec<RepoEntry>,
    pub steps: Vec<BuildStep>,
    pub options: PlanOptions,
}

/// Resolves configuration, selection and plan without running anything.
pub fn prepare(args: &BuildArgs, load: &LoadOptions) -> Result<PreparedPlan> {
    let flags = args.config_layer()?;
    let config = load_config(load, flags).context("Failed to load tmns configuration")?;

    let mut repos = resolve(&config, &args.selection.filter())?;
    repos.retain(|repo| {
        if !repo.build {
            info!("Skipping {}: marked build = false", repo.name);
        }
        repo.build
    });

    let options = PlanOptions::from_config(&config)?;
    if let Some(source) = config.source_of("build_type") {
        debug!("build_type set by the {} layer", source);
    }
    if options.build_types.len() > 1 && !options.clean {
        info!("Multiple build types requested; every step will clean first");
    }
    let steps = plan(&repos, &options);
    debug!("Planned {} steps for {} repositories", steps.len(), repos.len());

    Ok(PreparedPlan {
        config,
        repos,
        steps,
        options,
    })
}

/// Handler for `tmns build`.
pub async fn handle_build(args: BuildArgs, load: &LoadOptions) -> Result<()> {
    info!("Handling build command...");
    debug!("Build args: {:?}", args);

    let prepared = prepare(&args, load)?;
    if prepared.steps.is_empty() {
        println!("Nothing to build.");
        return Ok(());
    }

    let config = &prepared.config;
    let types: Vec<String> = prepared
        .options
        .build_types
        .iter()
        .map(ToString::to_string)
        .collect();
    info!("Build Modes: {}", types.join(", "));

    let conan = ConanCli::from_config(config)?;
    info!("Using Conan executable: {}", conan.program());
    let working_dir = env::current_dir().context("Failed to get current directory")?;
    let settings = ExecutorSettings::from_config(config, dirs::home_dir(), working_dir)?;
    let continue_on_error = config.get_bool("continue_on_error", false)?;

    let runner = ProcessRunner;
    let prompter = TerminalPrompter;
    let executor = Executor::new(&conan, &runner, &prompter, &settings);
    let report = run_plan(&executor, &prepared.steps, continue_on_error);

    print_report(&report);

    if report.halted {
        if let Some(failed) = report.failures().last() {
            bail!(
                "Build halted: {} ({}) failed",
                failed.repo,
                failed.build_type
            );
        }
    }
    Ok(())
}

fn print_report(report: &PlanReport) {
    for result in &report.results {
        let marker = match &result.status {
            StepStatus::Success => "ok",
            StepStatus::Failed(_) => "FAILED",
            StepStatus::Stopped => "stopped",
            StepStatus::Skipped => "skipped",
        };
        println!(
            "{:<8} {} ({}), deploy: {}",
            marker, result.repo, result.build_type, result.deploy_strategy
        );
        if let StepStatus::Failed(err) = &result.status {
            eprintln!("--- {} ({}): {} ---", result.repo, result.build_type, err);
            eprintln!("{}", result.log.trim_end());
        }
    }

    let ok = report.count(|s| *s == StepStatus::Success);
    let failed = report.failures().count();
    let skipped = report.count(|s| *s == StepStatus::Skipped);
    println!(
        "\n{} succeeded, {} failed, {} skipped, {} not run",
        ok, failed, skipped, report.not_run
    );
    if report.halted && failed == 0 {
        println!("Build stopped before completion.");
    }
}
