// ABOUTME: Integration tests for the fleetup CLI commands.
// ABOUTME: Validates --help output, init, and plan/apply against a fleet on disk.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn fleetup_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("fleetup"))
}

const FLEET: &str = r#"
providers:
  - kind: CoreProvider
    name: cluster-api
    namespace: capi-system
    version: v0.4.2
units:
  - namespace: capi-system
    name: cluster-api-controller-manager
    labels:
      fleetup.managed: "true"
      fleetup.provider: cluster-api
    desired_replicas: 1
    observed_replicas: 1
namespaces:
  - capi-webhook-system
"#;

const METADATA: &str = r#"
versions: [v0.4.2, v0.4.5, v0.5.0]
releaseSeries:
  - {major: 0, minor: 4, contract: v1alpha4}
  - {major: 0, minor: 5, contract: v1alpha5}
"#;

const COMPONENTS: &str = "units:\n  - name: cluster-api-controller-manager\n    replicas: 1\n";

/// A directory holding config, fleet state and published releases.
fn fleet_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_fleet(dir.path());
    dir
}

fn write_fleet(root: &Path) {
    fs::write(root.join("fleetup.yml"), "state: fleet.yml\nreleases: releases\n").unwrap();
    fs::write(root.join("fleet.yml"), FLEET).unwrap();
    let core = root.join("releases").join("cluster-api");
    fs::create_dir_all(core.join("v0.4.5")).unwrap();
    fs::write(core.join("metadata.yaml"), METADATA).unwrap();
    fs::write(core.join("v0.4.5").join("components.yaml"), COMPONENTS).unwrap();
}

#[test]
fn help_shows_commands() {
    fleetup_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("apply"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("fleetup.yml");

    fleetup_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .success();

    assert!(config_path.exists(), "fleetup.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("supported: v1alpha4"));
    assert!(content.contains("scale_to_zero:"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("fleetup.yml"), "{}").unwrap();

    fleetup_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn plan_without_config_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    fleetup_cmd()
        .current_dir(temp_dir.path())
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn plan_lists_one_plan_per_contract() {
    let dir = fleet_dir();

    fleetup_cmd()
        .current_dir(dir.path())
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("v1alpha4 contract (current)"))
        .stdout(predicate::str::contains(
            "capi-system/cluster-api v0.4.2 -> v0.4.5",
        ))
        .stdout(predicate::str::contains("fleetup apply --contract v1alpha4"))
        .stdout(predicate::str::contains("cannot upgrade to the v1alpha5"));
}

#[test]
fn apply_contract_updates_fleet_state() {
    let dir = fleet_dir();

    fleetup_cmd()
        .current_dir(dir.path())
        .args(["apply", "--contract", "v1alpha4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Upgraded 1 provider(s)"));

    let state = fs::read_to_string(dir.path().join("fleet.yml")).unwrap();
    assert!(state.contains("version: v0.4.5"));
    assert!(state.contains("contract: v1alpha4"));
    assert!(!state.contains("capi-webhook-system"));
}

#[test]
fn apply_json_reports_replaced_components() {
    let dir = fleet_dir();

    fleetup_cmd()
        .current_dir(dir.path())
        .args(["--json", "apply", "--core", "capi-system/cluster-api:v0.4.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""event":"report""#))
        .stdout(predicate::str::contains(r#""to":"v0.4.5""#));
}

#[test]
fn apply_rejects_unsupported_contract() {
    let dir = fleet_dir();

    fleetup_cmd()
        .current_dir(dir.path())
        .args(["apply", "--contract", "v1alpha5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("can only upgrade to the v1alpha4"));

    let state = fs::read_to_string(dir.path().join("fleet.yml")).unwrap();
    assert!(state.contains("version: v0.4.2"));
}

#[test]
fn apply_without_target_fails() {
    let dir = fleet_dir();

    fleetup_cmd()
        .current_dir(dir.path())
        .arg("apply")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to upgrade"));
}

#[test]
fn apply_rejects_malformed_provider_argument() {
    let dir = fleet_dir();

    fleetup_cmd()
        .current_dir(dir.path())
        .args(["apply", "--infrastructure", "docker"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--infrastructure"));
}
