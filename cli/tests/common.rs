//! # tmns CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Every test runs
//! the compiled `tmns` binary inside a [`Sandbox`]: a temporary directory used
//! as working directory, `HOME` and `XDG_CONFIG_HOME`, so neither the
//! developer's user config nor a `tmns-profile.toml` lying around can leak
//! into a test.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Recipe without a `deploy()` method.
pub const PLAIN_RECIPE: &str = r#"from conan import ConanFile

class Component(ConanFile):
    name = "component"
    version = "0.1.0"
"#;

/// Creates an `assert_cmd::Command` for the compiled `tmns` binary.
pub fn tmns_cmd() -> Command {
    Command::cargo_bin("tmns").expect("Failed to find tmns binary for testing")
}

/// An isolated working directory, home and config directory.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create sandbox");
        fs::create_dir_all(dir.path().join("home")).unwrap();
        fs::create_dir_all(dir.path().join("work")).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn home(&self) -> PathBuf {
        self.path().join("home")
    }

    /// Working directory of every command.
    pub fn work(&self) -> PathBuf {
        self.path().join("work")
    }

    pub fn xdg_config(&self) -> PathBuf {
        self.home().join(".config")
    }

    /// Where `tmns config init` writes on Linux.
    pub fn user_config(&self) -> PathBuf {
        self.xdg_config().join("tmns").join("config.toml")
    }

    /// `tmns` running in the sandbox.
    pub fn cmd(&self) -> Command {
        let mut cmd = tmns_cmd();
        cmd.current_dir(self.work())
            .env("HOME", self.home())
            .env("XDG_CONFIG_HOME", self.xdg_config())
            .env_remove("RUST_LOG");
        cmd
    }

    /// Writes `content` to `rel` (relative to the sandbox root) and returns the path.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Creates a checkout `src/<name>` holding `recipe` (no recipe when `None`).
    pub fn add_checkout(&self, name: &str, recipe: Option<&str>) -> PathBuf {
        let dir = self.path().join("src").join(name);
        fs::create_dir_all(&dir).unwrap();
        if let Some(text) = recipe {
            fs::write(dir.join("conanfile.py"), text).unwrap();
        }
        dir
    }

    pub fn source_root(&self) -> PathBuf {
        self.path().join("src")
    }

    /// Writes a repository table declaring `names` and returns its path.
    pub fn repos_file(&self, names: &[&str]) -> PathBuf {
        let mut text = String::new();
        for name in names {
            text.push_str(&format!(
                "[[repositories]]\nname = \"{0}\"\nurl = \"git@example.com:{0}.git\"\ntags = [\"test\"]\n\n",
                name
            ));
        }
        self.write("repos.toml", &text)
    }
}
