//! # tmns Build Executor
//!
//! File: cli/src/core/executor.rs
//!
//! ## Overview
//!
//! Runs planned `BuildStep`s one at a time against a repository checkout.
//! Every step goes through the same state machine:
//!
//! ```text
//! Pending -> Cleaning? -> InstallingDeps -> Compiling -> Packaging
//!         -> DeployDeciding -> Deploying? -> Done
//! ```
//!
//! Any state can end in `Failed`. `Cleaning` can also end in `Stopped` when the
//! user declines a confirmation. A step whose checkout directory does not exist
//! is `Skipped` before it starts.
//!
//! ## Rules
//!
//! - **Cleaning** runs only when requested. A build root that is or contains
//!   the home directory is never deleted (`SafetyAbort`, even with `force`). A
//!   build root that is or contains the invocation's working directory or the
//!   repository checkout needs an interactive "yes" unless `force` is set; "no"
//!   stops the step without marking it failed.
//! - **InstallingDeps / Compiling / Packaging** run Conan. A non-zero exit fails
//!   the step with the tool's captured output. Nothing is retried.
//! - **DeployDeciding** picks one strategy, in this order:
//!   1. the recipe defines `deploy()`: `RecipeDefined`
//!   2. an explicit `reference` was configured: `DependencyGraphCopy(Full)`
//!   3. the package resolves from the local cache: `DependencyGraphCopy(Runtime)`
//!   4. otherwise `None`
//! - **Deploying** is skipped when the strategy is `None`, including when the
//!   plan disabled deployment.
//!
//! [`run_plan`] applies the continuation policy: a failure halts the plan unless
//! `continue_on_error`; a stop always halts it.
//!
use crate::common::conan::ConanCli;
use crate::common::fs::io::{contains_location, remove_dir_if_exists, same_location};
use crate::common::process::{run_checked, CommandRunner, ToolInvocation};
use crate::common::ui::Prompter;
use crate::core::config::Config;
use crate::core::error::TmnsError;
use crate::core::plan::{BuildStep, BuildType, DeployStrategy, Deployer};
use crate::core::recipe::{ConanRecipe, Recipe};
use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Position of a step in the executor state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Cleaning,
    InstallingDeps,
    Compiling,
    Packaging,
    DeployDeciding,
    Deploying,
    Done,
    Failed,
    Stopped,
    Skipped,
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepState::Pending => "pending",
            StepState::Cleaning => "cleaning",
            StepState::InstallingDeps => "installing dependencies",
            StepState::Compiling => "compiling",
            StepState::Packaging => "packaging",
            StepState::DeployDeciding => "choosing deploy strategy",
            StepState::Deploying => "deploying",
            StepState::Done => "done",
            StepState::Failed => "failed",
            StepState::Stopped => "stopped",
            StepState::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// Terminal outcome of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Success,
    Failed(TmnsError),
    /// Deliberate stop (confirmation declined). Not a failure, but halts the plan.
    Stopped,
    /// Checkout not present; nothing was attempted.
    Skipped,
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub repo: String,
    pub build_type: BuildType,
    pub status: StepStatus,
    pub log: String,
    pub deploy_strategy: DeployStrategy,
    pub final_state: StepState,
}

impl StepResult {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, StepStatus::Failed(_))
    }
}

/// Filesystem and policy inputs of the executor, resolved from the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Directory containing the repository checkouts. Absolute.
    pub source_root: PathBuf,
    /// Build folder, relative to each checkout unless absolute.
    pub build_dir: PathBuf,
    /// Deploy folder, relative to the build root unless absolute.
    pub deploy_folder: PathBuf,
    /// Never cleaned. `None` when the home directory is unknown.
    pub home_dir: Option<PathBuf>,
    /// Directory tmns was invoked from.
    pub working_dir: PathBuf,
    /// Skip cleaning confirmations.
    pub force: bool,
    /// Package reference given explicitly by the caller.
    pub reference: Option<String>,
}

impl ExecutorSettings {
    pub fn from_config(
        config: &Config,
        home_dir: Option<PathBuf>,
        working_dir: PathBuf,
    ) -> Result<Self, TmnsError> {
        // Conan runs inside each checkout, so every path handed to it must be absolute.
        let source_root = working_dir.join(config.get_path("source_root", "."));
        Ok(Self {
            source_root,
            build_dir: config.get_path("build_dir", "build"),
            deploy_folder: config.get_path("deploy_folder", "deploy"),
            home_dir,
            working_dir,
            force: config.get_bool("force", false)?,
            reference: config.get_opt("reference").map(str::to_string),
        })
    }

    pub fn build_root(&self, repo_dir: &Path) -> PathBuf {
        repo_dir.join(&self.build_dir)
    }

    pub fn deploy_dir(&self, build_root: &Path) -> PathBuf {
        build_root.join(&self.deploy_folder)
    }
}

/// Verdict of the clean-safety checks for one build root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanCheck {
    Proceed,
    NeedsConfirmation(String),
    Refuse(String),
}

/// Applies the clean-safety rules to `build_root`.
pub fn check_clean_target(build_root: &Path, repo_dir: &Path, settings: &ExecutorSettings) -> CleanCheck {
    let describe = |what: &str, location: &Path| {
        let relation = if same_location(build_root, location) {
            "is"
        } else {
            "contains"
        };
        format!("build root {} {} {}", build_root.display(), relation, what)
    };

    if let Some(home) = &settings.home_dir {
        if contains_location(build_root, home) {
            return CleanCheck::Refuse(describe("the home directory", home));
        }
    }
    if contains_location(build_root, &settings.working_dir) {
        return CleanCheck::NeedsConfirmation(describe(
            "the current working directory",
            &settings.working_dir,
        ));
    }
    if contains_location(build_root, repo_dir) {
        return CleanCheck::NeedsConfirmation(describe("the repository checkout", repo_dir));
    }
    CleanCheck::Proceed
}

/// Runs one step to completion.
pub trait StepExecutor {
    fn execute(&self, step: &BuildStep) -> StepResult;
}

/// Executes steps by driving Conan through a [`CommandRunner`].
pub struct Executor<'a> {
    conan: &'a ConanCli,
    runner: &'a dyn CommandRunner,
    prompter: &'a dyn Prompter,
    settings: &'a ExecutorSettings,
}

enum Outcome {
    Done,
    Stopped,
    Skipped,
}

/// Mutable bookkeeping for the step being executed.
struct StepRun {
    state: StepState,
    log: String,
    deploy_strategy: DeployStrategy,
    label: String,
}

impl StepRun {
    fn enter(&mut self, state: StepState) {
        debug!("{}: {} -> {}", self.label, self.state, state);
        self.state = state;
        let _ = writeln!(self.log, "== {} ==", state);
    }

    fn note(&mut self, line: impl AsRef<str>) {
        let _ = writeln!(self.log, "{}", line.as_ref());
    }
}

impl<'a> Executor<'a> {
    pub fn new(
        conan: &'a ConanCli,
        runner: &'a dyn CommandRunner,
        prompter: &'a dyn Prompter,
        settings: &'a ExecutorSettings,
    ) -> Self {
        Self {
            conan,
            runner,
            prompter,
            settings,
        }
    }

    fn drive(&self, step: &BuildStep, run: &mut StepRun) -> Result<Outcome, TmnsError> {
        let repo_dir = step.repo.checkout_dir(&self.settings.source_root);
        if !repo_dir.is_dir() {
            info!("    {} not found at {}. Skipping", step.repo.name, repo_dir.display());
            run.note(format!("{} not found. Skipping", repo_dir.display()));
            return Ok(Outcome::Skipped);
        }

        let recipe = ConanRecipe::locate(&repo_dir)?;
        debug!("{}: using recipe {}", run.label, recipe.path().display());
        let package = recipe
            .package_name()
            .unwrap_or_else(|| step.repo.name.clone());
        let build_root = self.settings.build_root(&repo_dir);

        if step.clean {
            run.enter(StepState::Cleaning);
            if !self.clean(&build_root, &repo_dir, run)? {
                return Ok(Outcome::Stopped);
            }
        }

        run.enter(StepState::InstallingDeps);
        self.run_tool(
            run,
            self.conan
                .install(&repo_dir, &build_root, step.build_type, step.build_missing),
        )?;

        run.enter(StepState::Compiling);
        self.run_tool(
            run,
            self.conan
                .build(&repo_dir, &build_root, step.build_type, step.build_missing),
        )?;

        run.enter(StepState::Packaging);
        self.run_tool(
            run,
            self.conan.export_pkg(&repo_dir, &build_root, step.build_type),
        )?;

        run.enter(StepState::DeployDeciding);
        let (strategy, reference) = self.decide_deploy(step, &recipe, &repo_dir, &package);
        run.deploy_strategy = strategy;
        run.note(format!("deploy strategy: {}", strategy));

        let deploy_dir = self.settings.deploy_dir(&build_root);
        let deploy = match (strategy, reference) {
            (DeployStrategy::RecipeDefined, _) => Some(self.conan.deploy_with_recipe(
                &repo_dir,
                &package,
                step.build_type,
                &deploy_dir,
            )),
            (DeployStrategy::DependencyGraphCopy(deployer), Some(reference)) => {
                Some(self.conan.deploy_graph(
                    &repo_dir,
                    &reference,
                    deployer,
                    step.build_type,
                    &deploy_dir,
                ))
            }
            _ => None,
        };
        if let Some(invocation) = deploy {
            run.enter(StepState::Deploying);
            self.run_tool(run, invocation)?;
        }

        run.enter(StepState::Done);
        Ok(Outcome::Done)
    }

    /// Returns `Ok(false)` when the user declined the clean.
    fn clean(&self, build_root: &Path, repo_dir: &Path, run: &mut StepRun) -> Result<bool, TmnsError> {
        match check_clean_target(build_root, repo_dir, self.settings) {
            CleanCheck::Refuse(reason) => {
                error!("Refusing to clean: {}", reason);
                return Err(TmnsError::SafetyAbort(reason));
            }
            CleanCheck::NeedsConfirmation(reason) if !self.settings.force => {
                let question = format!("{}. Delete it anyway?", reason);
                let confirmed = self.prompter.confirm(&question).unwrap_or_else(|e| {
                    warn!("Confirmation failed ({}); not cleaning", e);
                    false
                });
                if !confirmed {
                    warn!("Clean of {} declined; halting", build_root.display());
                    run.note(format!("clean of {} declined", build_root.display()));
                    return Ok(false);
                }
            }
            CleanCheck::NeedsConfirmation(reason) => {
                debug!("{}; proceeding because of --force", reason);
            }
            CleanCheck::Proceed => {}
        }
        if remove_dir_if_exists(build_root)? {
            run.note(format!("removed {}", build_root.display()));
        }
        Ok(true)
    }

    fn decide_deploy(
        &self,
        step: &BuildStep,
        recipe: &dyn Recipe,
        repo_dir: &Path,
        package: &str,
    ) -> (DeployStrategy, Option<String>) {
        if step.deploy_strategy == DeployStrategy::None {
            debug!("{}: deployment disabled", step.repo.name);
            return (DeployStrategy::None, None);
        }
        if recipe.has_deploy_method() {
            return (DeployStrategy::RecipeDefined, None);
        }
        if let Some(reference) = &self.settings.reference {
            return (
                DeployStrategy::DependencyGraphCopy(Deployer::Full),
                Some(reference.clone()),
            );
        }
        match self
            .conan
            .resolve_local_reference(self.runner, repo_dir, package)
        {
            Some(reference) => (
                DeployStrategy::DependencyGraphCopy(Deployer::Runtime),
                Some(reference),
            ),
            None => {
                warn!(
                    "{}: no deploy method, no reference and nothing cached for '{}'; not deploying",
                    step.repo.name, package
                );
                (DeployStrategy::None, None)
            }
        }
    }

    fn run_tool(&self, run: &mut StepRun, invocation: ToolInvocation) -> Result<(), TmnsError> {
        debug!("Build command: {}", invocation);
        run.note(format!("$ {}", invocation));
        match run_checked(self.runner, &invocation) {
            Ok(output) => {
                let text = output.combined();
                if !text.is_empty() {
                    run.note(text);
                }
                Ok(())
            }
            Err(err) => {
                if let TmnsError::ExternalCommand { output, status, .. } = &err {
                    run.note(output);
                    run.note(format!("({})", status));
                }
                Err(err)
            }
        }
    }
}

impl StepExecutor for Executor<'_> {
    fn execute(&self, step: &BuildStep) -> StepResult {
        let mut run = StepRun {
            state: StepState::Pending,
            log: String::new(),
            deploy_strategy: step.deploy_strategy,
            label: format!("{} ({})", step.repo.name, step.build_type),
        };
        let (status, final_state) = match self.drive(step, &mut run) {
            Ok(Outcome::Done) => (StepStatus::Success, StepState::Done),
            Ok(Outcome::Stopped) => (StepStatus::Stopped, StepState::Stopped),
            Ok(Outcome::Skipped) => (StepStatus::Skipped, StepState::Skipped),
            Err(err) => {
                error!("{} failed while {}: {}", run.label, run.state, err);
                (StepStatus::Failed(err), StepState::Failed)
            }
        };
        StepResult {
            repo: step.repo.name.clone(),
            build_type: step.build_type,
            status,
            log: run.log,
            deploy_strategy: run.deploy_strategy,
            final_state,
        }
    }
}

/// Results of running a whole plan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanReport {
    pub results: Vec<StepResult>,
    /// Steps never attempted because the plan halted.
    pub not_run: usize,
    pub halted: bool,
}

impl PlanReport {
    pub fn failures(&self) -> impl Iterator<Item = &StepResult> {
        self.results.iter().filter(|r| r.is_failure())
    }

    pub fn count(&self, pred: impl Fn(&StepStatus) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.status)).count()
    }
}

/// Executes `steps` in order, applying the continuation policy.
pub fn run_plan(executor: &dyn StepExecutor, steps: &[BuildStep], continue_on_error: bool) -> PlanReport {
    let mut report = PlanReport::default();
    for (idx, step) in steps.iter().enumerate() {
        info!("    Building: {} ({})", step.repo.name, step.build_type);
        let result = executor.execute(step);
        debug!("{} ({}) ended {}", result.repo, result.build_type, result.final_state);
        let halt = match &result.status {
            StepStatus::Failed(_) if !continue_on_error => {
                error!("Halting Build");
                true
            }
            StepStatus::Failed(_) => {
                warn!("{} failed; continuing with remaining steps", step.repo.name);
                false
            }
            StepStatus::Stopped => true,
            StepStatus::Success | StepStatus::Skipped => false,
        };
        report.results.push(result);
        if halt {
            report.halted = true;
            report.not_run = steps.len() - idx - 1;
            break;
        }
    }
    report
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::process::ToolOutput;
    use crate::common::ui::ScriptedPrompter;
    use crate::core::plan::{plan, PlanOptions};
    use crate::core::profile::RepoEntry;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    /// Runner that succeeds unless the subcommand matches `fail_on`.
    struct ScriptedRunner {
        fail_on: Option<&'static str>,
        list_stdout: String,
        calls: RefCell<Vec<ToolInvocation>>,
    }

    impl ScriptedRunner {
        fn new() -> Self {
            Self {
                fail_on: None,
                list_stdout: String::new(),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing_on(subcommand: &'static str) -> Self {
            Self {
                fail_on: Some(subcommand),
                ..Self::new()
            }
        }

        fn with_cached(reference: &str) -> Self {
            Self {
                list_stdout: format!(r#"{{"Local Cache": {{"{}": {{}}}}}}"#, reference),
                ..Self::new()
            }
        }

        fn lines(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|c| c.to_string()).collect()
        }

        fn subcommands(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .map(|c| c.subcommand().unwrap_or_default().to_string())
                .collect()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, TmnsError> {
            self.calls.borrow_mut().push(invocation.clone());
            let sub = invocation.subcommand().unwrap_or_default();
            if Some(sub) == self.fail_on {
                return Ok(ToolOutput {
                    code: Some(1),
                    stdout: String::new(),
                    stderr: format!("ERROR: {} exploded", sub),
                });
            }
            let stdout = if sub == "list" {
                self.list_stdout.clone()
            } else {
                format!("{} ok", sub)
            };
            Ok(ToolOutput {
                code: Some(0),
                stdout,
                stderr: String::new(),
            })
        }
    }

    const PLAIN_RECIPE: &str = "class Log(ConanFile):\n    name = \"terminus_log\"\n";
    const DEPLOY_RECIPE: &str =
        "class Log(ConanFile):\n    name = \"terminus_log\"\n\n    def deploy(self):\n        pass\n";

    struct Workspace {
        dir: TempDir,
        settings: ExecutorSettings,
    }

    fn workspace(recipe: Option<&str>) -> Workspace {
        let dir = tempdir().unwrap();
        let repo = dir.path().join("terminus-log");
        fs::create_dir_all(&repo).unwrap();
        if let Some(text) = recipe {
            fs::write(repo.join("conanfile.py"), text).unwrap();
        }
        let home = dir.path().join("home");
        let cwd = dir.path().join("cwd");
        fs::create_dir_all(&home).unwrap();
        fs::create_dir_all(&cwd).unwrap();
        let settings = ExecutorSettings {
            source_root: dir.path().to_path_buf(),
            build_dir: PathBuf::from("build"),
            deploy_folder: PathBuf::from("deploy"),
            home_dir: Some(home),
            working_dir: cwd,
            force: false,
            reference: None,
        };
        Workspace { dir, settings }
    }

    fn step(clean: bool, deploy: bool) -> BuildStep {
        let options = PlanOptions {
            clean,
            deploy,
            ..Default::default()
        };
        plan(&[RepoEntry::new("terminus-log", "")], &options).remove(0)
    }

    fn execute(ws: &Workspace, runner: &ScriptedRunner, prompter: &ScriptedPrompter, step: &BuildStep) -> StepResult {
        let conan = ConanCli::new("conan");
        Executor::new(&conan, runner, prompter, &ws.settings).execute(step)
    }

    #[test]
    fn test_successful_step_runs_every_stage_and_deploys_runtime() {
        let ws = workspace(Some(PLAIN_RECIPE));
        let runner = ScriptedRunner::with_cached("terminus_log/1.2.0");
        let prompter = ScriptedPrompter::answering(false);
        let result = execute(&ws, &runner, &prompter, &step(false, true));

        assert_eq!(result.status, StepStatus::Success);
        assert_eq!(result.final_state, StepState::Done);
        assert_eq!(
            result.deploy_strategy,
            DeployStrategy::DependencyGraphCopy(Deployer::Runtime)
        );
        assert_eq!(
            runner.subcommands(),
            vec!["install", "build", "export-pkg", "list", "install"]
        );
        let last = runner.lines().pop().unwrap();
        assert!(last.contains("--requires=terminus_log/1.2.0"));
        assert!(last.contains("--deployer=runtime_deploy"));
        assert!(result.log.contains("== compiling =="));
        assert!(prompter.asked.borrow().is_empty());
    }

    #[test]
    fn test_recipe_deploy_wins_even_with_explicit_reference() {
        let mut ws = workspace(Some(DEPLOY_RECIPE));
        ws.settings.reference = Some("terminus_log/9.9.9".into());
        let runner = ScriptedRunner::new();
        let prompter = ScriptedPrompter::answering(false);
        let result = execute(&ws, &runner, &prompter, &step(false, true));

        assert_eq!(result.deploy_strategy, DeployStrategy::RecipeDefined);
        let last = runner.lines().pop().unwrap();
        assert!(last.contains("--deployer-package=terminus_log/*"));
        assert!(!runner.subcommands().contains(&"list".to_string()));
    }

    #[test]
    fn test_explicit_reference_uses_full_deployer() {
        let mut ws = workspace(Some(PLAIN_RECIPE));
        ws.settings.reference = Some("terminus_log/1.0.0@terminus/stable".into());
        let runner = ScriptedRunner::new();
        let prompter = ScriptedPrompter::answering(false);
        let result = execute(&ws, &runner, &prompter, &step(false, true));

        assert_eq!(
            result.deploy_strategy,
            DeployStrategy::DependencyGraphCopy(Deployer::Full)
        );
        let last = runner.lines().pop().unwrap();
        assert!(last.contains("--requires=terminus_log/1.0.0@terminus/stable"));
        assert!(last.contains("--deployer=full_deploy"));
    }

    #[test]
    fn test_nothing_to_deploy_skips_deploying() {
        let ws = workspace(Some(PLAIN_RECIPE));
        let runner = ScriptedRunner::new();
        let prompter = ScriptedPrompter::answering(false);
        let result = execute(&ws, &runner, &prompter, &step(false, true));

        assert_eq!(result.status, StepStatus::Success);
        assert_eq!(result.deploy_strategy, DeployStrategy::None);
        assert_eq!(runner.subcommands(), vec!["install", "build", "export-pkg", "list"]);
        assert!(!result.log.contains("== deploying =="));
    }

    #[test]
    fn test_deploy_disabled_never_inspects_cache() {
        let ws = workspace(Some(DEPLOY_RECIPE));
        let runner = ScriptedRunner::with_cached("terminus_log/1.2.0");
        let prompter = ScriptedPrompter::answering(false);
        let result = execute(&ws, &runner, &prompter, &step(false, false));

        assert_eq!(result.deploy_strategy, DeployStrategy::None);
        assert_eq!(runner.subcommands(), vec!["install", "build", "export-pkg"]);
    }

    #[test]
    fn test_tool_failure_fails_step_with_captured_output() {
        let ws = workspace(Some(PLAIN_RECIPE));
        let runner = ScriptedRunner::failing_on("install");
        let prompter = ScriptedPrompter::answering(false);
        let result = execute(&ws, &runner, &prompter, &step(false, true));

        match &result.status {
            StepStatus::Failed(TmnsError::ExternalCommand { output, .. }) => {
                assert!(output.contains("install exploded"))
            }
            other => panic!("unexpected status {:?}", other),
        }
        assert_eq!(result.final_state, StepState::Failed);
        assert!(result.log.contains("install exploded"));
        // No retry, nothing after the failing stage.
        assert_eq!(runner.subcommands(), vec!["install"]);
    }

    #[test]
    fn test_missing_checkout_is_skipped() {
        let ws = workspace(Some(PLAIN_RECIPE));
        fs::remove_dir_all(ws.dir.path().join("terminus-log")).unwrap();
        let runner = ScriptedRunner::new();
        let prompter = ScriptedPrompter::answering(false);
        let result = execute(&ws, &runner, &prompter, &step(false, true));
        assert_eq!(result.status, StepStatus::Skipped);
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_missing_recipe_fails() {
        let ws = workspace(None);
        let runner = ScriptedRunner::new();
        let prompter = ScriptedPrompter::answering(false);
        let result = execute(&ws, &runner, &prompter, &step(false, true));
        assert!(matches!(
            result.status,
            StepStatus::Failed(TmnsError::MissingRecipe { .. })
        ));
    }

    #[test]
    fn test_clean_removes_build_root_without_prompt() {
        let ws = workspace(Some(PLAIN_RECIPE));
        let build = ws.dir.path().join("terminus-log/build");
        fs::create_dir_all(&build).unwrap();
        fs::write(build.join("CMakeCache.txt"), "stale").unwrap();
        let runner = ScriptedRunner::new();
        let prompter = ScriptedPrompter::answering(false);
        let result = execute(&ws, &runner, &prompter, &step(true, false));

        assert_eq!(result.status, StepStatus::Success);
        assert!(!build.join("CMakeCache.txt").exists());
        assert!(prompter.asked.borrow().is_empty());
    }

    #[test]
    fn test_clean_of_home_directory_always_aborts() {
        for force in [false, true] {
            let mut ws = workspace(Some(PLAIN_RECIPE));
            ws.settings.force = force;
            ws.settings.build_dir = ws.settings.home_dir.clone().unwrap();
            let runner = ScriptedRunner::new();
            let prompter = ScriptedPrompter::answering(true);
            let result = execute(&ws, &runner, &prompter, &step(true, true));

            assert!(
                matches!(result.status, StepStatus::Failed(TmnsError::SafetyAbort(_))),
                "force={}",
                force
            );
            assert!(ws.settings.home_dir.as_ref().unwrap().exists());
            assert!(runner.calls.borrow().is_empty());
        }
    }

    #[test]
    fn test_clean_of_working_directory_declined_stops_without_failure() {
        let mut ws = workspace(Some(PLAIN_RECIPE));
        ws.settings.build_dir = ws.settings.working_dir.clone();
        let runner = ScriptedRunner::new();
        let prompter = ScriptedPrompter::answering(false);
        let result = execute(&ws, &runner, &prompter, &step(true, true));

        assert_eq!(result.status, StepStatus::Stopped);
        assert!(!result.is_failure());
        assert_eq!(prompter.asked.borrow().len(), 1);
        assert!(ws.settings.working_dir.exists());
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_clean_of_working_directory_confirmed_proceeds() {
        let mut ws = workspace(Some(PLAIN_RECIPE));
        ws.settings.build_dir = ws.settings.working_dir.clone();
        let runner = ScriptedRunner::new();
        let prompter = ScriptedPrompter::answering(true);
        let result = execute(&ws, &runner, &prompter, &step(true, false));

        assert_eq!(result.status, StepStatus::Success);
        assert!(!ws.settings.working_dir.exists());
    }

    #[test]
    fn test_force_skips_confirmation() {
        let mut ws = workspace(Some(PLAIN_RECIPE));
        ws.settings.build_dir = ws.settings.working_dir.clone();
        ws.settings.force = true;
        let runner = ScriptedRunner::new();
        let prompter = ScriptedPrompter::answering(false);
        let result = execute(&ws, &runner, &prompter, &step(true, false));

        assert_eq!(result.status, StepStatus::Success);
        assert!(prompter.asked.borrow().is_empty());
    }

    #[test]
    fn test_check_clean_target_flags_checkout_itself() {
        let ws = workspace(Some(PLAIN_RECIPE));
        let repo = ws.dir.path().join("terminus-log");
        assert!(matches!(
            check_clean_target(&repo.join("."), &repo, &ws.settings),
            CleanCheck::NeedsConfirmation(_)
        ));
        assert_eq!(
            check_clean_target(&repo.join("build"), &repo, &ws.settings),
            CleanCheck::Proceed
        );
    }

    #[test]
    fn test_check_clean_target_refuses_ancestor_of_home() {
        let mut ws = workspace(Some(PLAIN_RECIPE));
        ws.settings.force = true;
        let repo = ws.dir.path().join("terminus-log");
        for root in [ws.dir.path().to_path_buf(), PathBuf::from("/")] {
            match check_clean_target(&root, &repo, &ws.settings) {
                CleanCheck::Refuse(reason) => assert!(reason.contains("contains the home directory")),
                other => panic!("{} was not refused: {:?}", root.display(), other),
            }
        }
    }

    #[test]
    fn test_check_clean_target_confirms_ancestor_of_working_directory() {
        let mut ws = workspace(Some(PLAIN_RECIPE));
        let repo = ws.dir.path().join("terminus-log");
        let nested = ws.settings.working_dir.join("sub/dir");
        fs::create_dir_all(&nested).unwrap();
        let root = ws.settings.working_dir.clone();
        ws.settings.working_dir = nested;
        match check_clean_target(&root, &repo, &ws.settings) {
            CleanCheck::NeedsConfirmation(reason) => {
                assert!(reason.contains("contains the current working directory"), "{}", reason)
            }
            other => panic!("unexpected verdict {:?}", other),
        }
        // Parent of the checkout.
        assert!(matches!(
            check_clean_target(&repo.join(".."), &repo, &ws.settings),
            CleanCheck::Refuse(_) | CleanCheck::NeedsConfirmation(_)
        ));
    }

    #[test]
    fn test_clean_of_home_parent_deletes_nothing() {
        let mut ws = workspace(Some(PLAIN_RECIPE));
        ws.settings.build_dir = PathBuf::from("..");
        let runner = ScriptedRunner::new();
        let prompter = ScriptedPrompter::answering(true);
        let result = execute(&ws, &runner, &prompter, &step(true, false));

        assert!(matches!(result.status, StepStatus::Failed(TmnsError::SafetyAbort(_))));
        assert!(ws.settings.home_dir.as_ref().unwrap().exists());
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_settings_from_config_anchor_relative_paths() {
        use crate::core::config::{ConfigLayer, LayerSource};
        let mut layer = ConfigLayer::new(LayerSource::Cli);
        layer.push_scalar("source_root", "src");
        layer.push_scalar("force", "yes");
        layer.push_scalar("reference", "terminus_log/1.0.0");
        let config = Config::default().apply_layer(&layer).unwrap();
        let settings = ExecutorSettings::from_config(&config, None, PathBuf::from("/work")).unwrap();

        assert_eq!(settings.source_root, PathBuf::from("/work/src"));
        let root = settings.build_root(Path::new("/work/src/terminus-log"));
        assert_eq!(root, PathBuf::from("/work/src/terminus-log/build"));
        assert_eq!(settings.deploy_dir(&root), root.join("deploy"));
        assert!(settings.force);
        assert_eq!(settings.reference.as_deref(), Some("terminus_log/1.0.0"));
    }

    /// Step executor returning canned statuses in order.
    struct CannedExecutor {
        statuses: RefCell<Vec<StepStatus>>,
    }

    impl StepExecutor for CannedExecutor {
        fn execute(&self, step: &BuildStep) -> StepResult {
            let status = self.statuses.borrow_mut().remove(0);
            StepResult {
                repo: step.repo.name.clone(),
                build_type: step.build_type,
                status,
                log: String::new(),
                deploy_strategy: step.deploy_strategy,
                final_state: StepState::Done,
            }
        }
    }

    fn three_steps() -> Vec<BuildStep> {
        let repos = vec![
            RepoEntry::new("a", ""),
            RepoEntry::new("b", ""),
            RepoEntry::new("c", ""),
        ];
        plan(&repos, &PlanOptions::default())
    }

    fn failure() -> StepStatus {
        StepStatus::Failed(TmnsError::ExternalCommand {
            cmd: "conan build .".into(),
            status: "exit code 1".into(),
            output: String::new(),
        })
    }

    #[test]
    fn test_run_plan_stops_on_first_failure_by_default() {
        let executor = CannedExecutor {
            statuses: RefCell::new(vec![StepStatus::Success, failure(), StepStatus::Success]),
        };
        let report = run_plan(&executor, &three_steps(), false);
        assert_eq!(report.results.len(), 2);
        assert!(report.halted);
        assert_eq!(report.not_run, 1);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_run_plan_continue_on_error() {
        let executor = CannedExecutor {
            statuses: RefCell::new(vec![failure(), StepStatus::Skipped, StepStatus::Success]),
        };
        let report = run_plan(&executor, &three_steps(), true);
        assert_eq!(report.results.len(), 3);
        assert!(!report.halted);
        assert_eq!(report.count(|s| *s == StepStatus::Success), 1);
    }

    #[test]
    fn test_run_plan_stop_always_halts() {
        let executor = CannedExecutor {
            statuses: RefCell::new(vec![StepStatus::Stopped, StepStatus::Success, StepStatus::Success]),
        };
        let report = run_plan(&executor, &three_steps(), true);
        assert_eq!(report.results.len(), 1);
        assert!(report.halted);
        assert_eq!(report.failures().count(), 0);
    }
}
