//! CLI integration tests for the doorstep binary.
//!
//! These exercise argument parsing and help output only; commands that
//! reach the live services are covered by the engine's own tests.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("doorstep")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("resolve")
                .and(predicate::str::contains("suggest"))
                .and(predicate::str::contains("entrances")),
        );
}

#[test]
fn test_version_flag() {
    Command::cargo_bin("doorstep")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("doorstep"));
}

#[test]
fn test_resolve_requires_query() {
    Command::cargo_bin("doorstep")
        .unwrap()
        .arg("resolve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("QUERY"));
}

#[test]
fn test_resolve_help_mentions_near_bias() {
    Command::cargo_bin("doorstep")
        .unwrap()
        .args(["resolve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("LAT,LON"));
}

#[test]
fn test_unknown_subcommand_fails() {
    Command::cargo_bin("doorstep")
        .unwrap()
        .arg("teleport")
        .assert()
        .failure();
}
