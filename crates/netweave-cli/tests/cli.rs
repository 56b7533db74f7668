//! End-to-end tests for the `netweave` binary.
//!
//! No real weaver module library ships with the test suite, so these tests
//! cover the surface before module loading plus the failure paths the binary
//! reports when a module or input is missing.

use std::fs;

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn netweave() -> Result<Command> {
    Ok(Command::cargo_bin("netweave")?)
}

#[test]
fn help_describes_the_version_flags() -> Result<()> {
    netweave()?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--netsync-version"))
        .stdout(predicate::str::contains("--native-collections"));
    Ok(())
}

#[test]
fn missing_input_argument_fails_with_usage() -> Result<()> {
    netweave()?
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
    Ok(())
}

#[test]
fn unsupported_configuration_names_the_tuple() -> Result<()> {
    let modules = TempDir::new()?;
    let plugins = TempDir::new()?;
    fs::write(plugins.path().join("PluginA.dll"), b"bytecode")?;

    netweave()?
        .arg(plugins.path())
        .arg("--modules-dir")
        .arg(modules.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported configuration"))
        .stderr(predicate::str::contains("netsync v1.5.2"));
    Ok(())
}

#[test]
fn malformed_version_flag_is_rejected_before_any_work() -> Result<()> {
    netweave()?
        .args(["plugins", "--netsync-version", "not-a-version"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid version"));
    Ok(())
}
