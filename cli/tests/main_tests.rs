//! # tmns CLI Main Integration Tests
//!
//! File: cli/tests/main_tests.rs
//!
//! ## Overview
//!
//! Top-level behaviour of the `tmns` binary: standard flags, subcommand
//! listing and failures that happen before any command runs.
//!
mod common;
use common::{tmns_cmd, Sandbox};
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    tmns_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("repos"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_build_help_lists_flags() {
    tmns_cmd()
        .args(["build", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--continue-on-error"))
        .stdout(predicate::str::contains("--build-missing"));
}

#[test]
fn test_unknown_subcommand_fails() {
    tmns_cmd().arg("frobnicate").assert().failure();
}

#[test]
fn test_set_without_value_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["--set", "build_dir", "plan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("build_dir"))
        .stderr(predicate::str::contains("missing value"));
}

#[test]
fn test_blank_env_value_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .env("TMNS_CHANNEL", "")
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("channel"));
}

#[test]
fn test_missing_explicit_profile_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["--profile", "nope.toml", "repos"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_log_file_receives_logs() {
    let sandbox = Sandbox::new();
    let log = sandbox.path().join("tmns.log");
    sandbox
        .cmd()
        .args(["-v", "--log-file"])
        .arg(&log)
        .arg("repos")
        .assert()
        .success();
    let text = std::fs::read_to_string(&log).unwrap();
    assert!(text.contains("Handling repos command"));
}
