//! Scenario: CLI argument handling and error exit codes.
//!
//! # Invariants under test
//!
//! 1. `--version` and `--help` succeed with exit code 0.
//! 2. Every error path exits with code 1 and a diagnostic: missing config
//!    argument, unreadable config, parse failure (with line number),
//!    unknown provider, missing API token.
//!
//! None of these paths reach the network: provider selection happens before
//! any quote request.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn folio() -> Command {
    Command::cargo_bin("folio").expect("binary builds")
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn version_and_help_succeed() {
    folio()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("folio"));

    folio()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn missing_config_argument_fails() {
    folio()
        .assert()
        .code(1)
        .stdout(predicate::str::contains("config file was not specified"));
}

#[test]
fn unreadable_config_fails() {
    folio()
        .arg("/nonexistent/allocation.ini")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("failed to load config"));
}

#[test]
fn parse_failure_reports_the_line() {
    let config = config_file("[have]\nspy = 1\n[cash]\nbalance = 3\n");
    folio()
        .arg(config.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("line 4"));
}

#[test]
fn unknown_provider_fails() {
    let config = config_file("[want]\nspy = 100%\n[options]\nprovider = bloomberg\n");
    folio()
        .arg(config.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("unknown provider: bloomberg"));
}

#[test]
fn token_required_for_iex() {
    let config = config_file("[want]\nspy = 100%\n[options]\nprovider = iex trading\n");
    folio()
        .arg(config.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("API token was not specified"));
}
