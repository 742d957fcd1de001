//! CLI argument validation tests.
//!
//! These tests verify that the CLI properly validates arguments and provides
//! helpful error messages.

use predicates::prelude::*;

use super::helpers::{emissions_cmd, emissions_cmd_with_fixtures, fixture_path, EPOCH_START, NOW};

#[test]
fn test_help_output() {
    emissions_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("emissions"))
        .stdout(predicate::str::contains("propose"))
        .stdout(predicate::str::contains("report"))
        .stdout(predicate::str::contains("epoch"));
}

#[test]
fn test_propose_help() {
    emissions_cmd()
        .args(["propose", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--snapshot"))
        .stdout(predicate::str::contains("--network"))
        .stdout(predicate::str::contains("EMISSIONS_CONFIG"));
}

#[test]
fn test_invalid_command() {
    emissions_cmd()
        .arg("invalid_command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_propose_missing_config() {
    emissions_cmd()
        .args(["propose", "--snapshot", &fixture_path("snapshot.json")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_invalid_network_value() {
    emissions_cmd_with_fixtures("propose")
        .args(["--network", "ethereum"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown network"));
}

#[test]
fn test_invalid_output_format() {
    emissions_cmd_with_fixtures("propose")
        .args(["--format", "invalid_format"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_config_file() {
    emissions_cmd()
        .args([
            "propose",
            "--config",
            "/nonexistent/emissions.toml",
            "--snapshot",
            &fixture_path("snapshot.json"),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config"));
}

#[test]
fn test_missing_snapshot_file() {
    emissions_cmd()
        .args([
            "propose",
            "--config",
            &fixture_path("config.toml"),
            "--snapshot",
            "/nonexistent/snapshot.json",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read snapshot"));
}

#[test]
fn test_inputs_from_env() {
    emissions_cmd()
        .env("EMISSIONS_CONFIG", fixture_path("config.toml"))
        .env("EMISSIONS_SNAPSHOT", fixture_path("snapshot.json"))
        .args(["propose", "--format", "json", "--now", NOW])
        .assert()
        .success()
        .stdout(predicate::str::contains(EPOCH_START));
}

#[test]
fn test_engine_errors_fail_the_command() {
    // Snapshot for a single chain while the config lists three
    let dir = std::env::temp_dir().join(format!("emissions-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let snapshot = dir.join("partial.json");
    let full: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(fixture_path("snapshot.json")).unwrap()).unwrap();
    let partial = serde_json::json!({ "chains": { "10": full["chains"]["10"] } });
    std::fs::write(&snapshot, partial.to_string()).unwrap();

    emissions_cmd()
        .args([
            "propose",
            "--config",
            &fixture_path("config.toml"),
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--now",
            NOW,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Snapshot is missing chain"));
}
