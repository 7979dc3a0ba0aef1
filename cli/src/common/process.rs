//! # tmns Process Execution Utilities (`common::process`)
//!
//! File: cli/src/common/process.rs
//!
//! ## Overview
//!
//! Executes external commands (the Conan CLI) and captures their output.
//! Callers describe a command as a [`ToolInvocation`] and hand it to a
//! [`CommandRunner`]; the runner is a trait so the executor can be driven by a
//! scripted fake in tests instead of a real package manager.
//!
//! ## Architecture
//!
//! - **`ToolInvocation`**: program, arguments and working directory. Displays as
//!   a shell-like command line for logs and error messages.
//! - **`ToolOutput`**: exit code plus captured stdout/stderr.
//! - **`CommandRunner`**: the execution seam.
//! - **`ProcessRunner`**: the real implementation on `std::process::Command`.
//!   Calls block until the tool exits; the tool may parallelise internally.
//!
//! Spawning failures (tool not installed, permission denied) are reported as
//! `TmnsError::ExternalCommand` with the OS error as output, so a missing
//! `conan` fails the step the same way a failing `conan` does.
//!
use crate::core::error::TmnsError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, error};

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// The first argument, usually the tool's subcommand.
    #[cfg(test)]
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Result of a finished external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout followed by stderr, as shown in step logs.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, false) => self.stderr.trim_end().to_string(),
            (true, true) => String::new(),
        }
    }

    pub fn status_label(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs external commands to completion.
pub trait CommandRunner {
    /// Runs `invocation` and returns its captured output, whatever the exit code.
    ///
    /// An `Err` means the process could not be started at all.
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, TmnsError>;
}

/// Runs commands as child processes of tmns.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, TmnsError> {
        debug!("Running: {}", invocation);
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|e| {
            error!("Failed to start '{}': {}", invocation.program, e);
            TmnsError::ExternalCommand {
                cmd: invocation.to_string(),
                status: "not started".to_string(),
                output: e.to_string(),
            }
        })?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("'{}' finished with {}", invocation, result.status_label());
        Ok(result)
    }
}

/// Runs `invocation` and turns a non-zero exit into `TmnsError::ExternalCommand`.
pub fn run_checked(runner: &dyn CommandRunner, invocation: &ToolInvocation) -> Result<ToolOutput, TmnsError> {
    let output = runner.run(invocation)?;
    if output.success() {
        Ok(output)
    } else {
        Err(TmnsError::ExternalCommand {
            cmd: invocation.to_string(),
            status: output.status_label(),
            output: output.combined(),
        })
    }
}
