//! Integration tests for the arteval binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn setup_bundle(yaml: &str) -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bundle.yml");
    fs::write(&path, yaml).unwrap();
    (temp, path)
}

const PASSING_BUNDLE: &str = r#"
name: smoke
phases:
  env_setup:
    - name: home
      kind: path
      path: .
      expect: directory
  experiment_runs:
    - name: latencies
      kind: elementwise_threshold
      observed: [1.0, 2.0]
      reference: [1.0, 2.0]
      threshold: 1.0
"#;

const FAILING_BUNDLE: &str = r#"
name: smoke
phases:
  env_setup:
    - name: home
      kind: path
      path: .
      expect: directory
  experiment_runs:
    - name: counts
      kind: elementwise_threshold
      observed: [0.5]
      reference: [1.0]
      threshold: 0.9
"#;

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("arteval"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Artifact evaluation harness"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("arteval"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn cli_requires_subcommand() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("arteval"));
    cmd.assert().failure();
    Ok(())
}

#[test]
fn run_passing_bundle_scores_every_phase() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp, bundle) = setup_bundle(PASSING_BUNDLE);
    let mut cmd = Command::new(cargo_bin("arteval"));
    cmd.args(["--no-color", "run"]).arg(&bundle);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("EnvironmentSetup"))
        .stdout(predicate::str::contains("ExperimentRuns"))
        .stdout(predicate::str::contains("4/4"));
    Ok(())
}

#[test]
fn run_failing_bundle_exits_nonzero() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp, bundle) = setup_bundle(FAILING_BUNDLE);
    let mut cmd = Command::new(cargo_bin("arteval"));
    cmd.args(["--no-color", "run"]).arg(&bundle);
    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL (1 errors, 0 warnings)"))
        .stdout(predicate::str::contains("3/4"))
        .stderr(predicate::str::contains("counts"));
    Ok(())
}

#[test]
fn run_selected_phase_only() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp, bundle) = setup_bundle(FAILING_BUNDLE);
    let mut cmd = Command::new(cargo_bin("arteval"));
    cmd.args(["--no-color", "run", "--phase", "env_setup"])
        .arg(&bundle);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("EnvironmentSetup"))
        .stdout(predicate::str::contains("ExperimentRuns").not())
        .stdout(predicate::str::contains("1/1"));
    Ok(())
}

#[test]
fn run_json_prints_scorecard() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp, bundle) = setup_bundle(FAILING_BUNDLE);
    let mut cmd = Command::new(cargo_bin("arteval"));
    cmd.args(["run", "--json"]).arg(&bundle);
    let output = cmd.output()?;
    assert_eq!(output.status.code(), Some(1));

    let card: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(card["bundle"], "smoke");
    let phases = card["phases"].as_array().ok_or("phases must be an array")?;
    assert_eq!(phases.len(), 4);
    assert_eq!(phases[0]["phase"], "env_setup");
    assert_eq!(phases[0]["score"], 1);
    assert_eq!(phases[3]["phase"], "experiment_runs");
    assert_eq!(phases[3]["score"], 0);
    assert_eq!(phases[3]["errors"], 1);
    Ok(())
}

#[test]
fn run_missing_bundle_exits_two() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let mut cmd = Command::new(cargo_bin("arteval"));
    cmd.arg("run").arg(temp.path().join("absent.yml"));
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("Bundle not found"));
    Ok(())
}

#[test]
fn run_rejects_unknown_phase() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp, bundle) = setup_bundle(PASSING_BUNDLE);
    let mut cmd = Command::new(cargo_bin("arteval"));
    cmd.args(["run", "--phase", "teardown"]).arg(&bundle);
    cmd.assert().failure();
    Ok(())
}

#[cfg(unix)]
#[test]
fn run_version_requirement_against_real_command() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp, bundle) = setup_bundle(
        r#"
name: tools
phases:
  env_setup:
    - name: go
      kind: version
      command: {shell: "printf 'go version go1.22.3 linux/amd64\n'"}
      required: "1.22.0"
      compare: geq
      version_regex: 'go(\d+\.\d+(?:\.\d+)?)'
"#,
    );
    let mut cmd = Command::new(cargo_bin("arteval"));
    cmd.args(["--no-color", "run", "--phase", "env_setup"])
        .arg(&bundle);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("PASS"));
    Ok(())
}

#[test]
fn validate_accepts_good_bundle() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp, bundle) = setup_bundle(PASSING_BUNDLE);
    let mut cmd = Command::new(cargo_bin("arteval"));
    cmd.args(["--no-color", "validate"]).arg(&bundle);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("is valid (2 requirements)"));
    Ok(())
}

#[test]
fn validate_reports_every_problem() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp, bundle) = setup_bundle(
        r#"
name: broken
phases:
  env_setup:
    - {name: dup, kind: fail, message: one}
    - {name: dup, kind: fail, message: two}
  artifact_build:
    - name: build
      kind: build
      command: [make]
      timeout_secs: 0
"#,
    );
    let mut cmd = Command::new(cargo_bin("arteval"));
    cmd.args(["--no-color", "validate"]).arg(&bundle);
    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("[duplicate-requirement]"))
        .stdout(predicate::str::contains("[invalid-requirement]"))
        .stdout(predicate::str::contains("timeout_secs must be > 0"));
    Ok(())
}

#[test]
fn completions_generates_bash() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("arteval"));
    cmd.args(["completions", "bash"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("arteval"));
    Ok(())
}
