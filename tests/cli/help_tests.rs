use crate::common::cmd;
use predicates::prelude::*;

#[test]
fn test_help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("joule-trace"))
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_subcommand_help() {
    cmd()
        .args(["analyze", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rebuild the call forest"))
        .stdout(predicate::str::contains("--allow-partial"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_command_prints_help_and_fails() {
    cmd()
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_quiet_conflicts_with_verbose() {
    cmd()
        .args(["--quiet", "--verbose", "inspect", "x.wasm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_completions_for_bash() {
    cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("joule-trace"));
}
