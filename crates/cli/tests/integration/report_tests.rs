//! Allocation report and epoch window tests.

use predicates::prelude::*;

use super::helpers::{emissions_cmd, emissions_cmd_with_fixtures, fixture_path, EPOCH_START, NOW};

#[test]
fn test_report_table_output() {
    emissions_cmd_with_fixtures("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("MOONWELL_WETH"))
        .stdout(predicate::str::contains("Safety module"))
        .stdout(predicate::str::contains("Reserve sales"))
        .stdout(predicate::str::contains("(disabled)"));
}

#[test]
fn test_report_json_output() {
    let output = emissions_cmd_with_fixtures("report")
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let chains = report["chains"].as_array().unwrap();
    assert_eq!(chains.len(), 3);
    assert!(chains.iter().all(|c| c["safetyModule"]["cappedSecondary"].is_string()));
}

#[test]
fn test_report_markdown_output() {
    emissions_cmd_with_fixtures("report")
        .args(["--format", "markdown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## "))
        .stdout(predicate::str::contains("| Market"));
}

#[test]
fn test_report_network_filter() {
    emissions_cmd_with_fixtures("report")
        .args(["--network", "optimism"])
        .assert()
        .success()
        .stdout(predicate::str::contains("MOONWELL_USDC"))
        .stdout(predicate::str::contains("MOONWELL_WETH").not());
}

#[test]
fn test_epoch_json_output() {
    emissions_cmd()
        .args([
            "epoch",
            "--config",
            &fixture_path("config.toml"),
            "--now",
            NOW,
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(EPOCH_START))
        .stdout(predicate::str::contains("1704838400"));
}

#[test]
fn test_epoch_table_output() {
    emissions_cmd()
        .args(["epoch", "--config", &fixture_path("config.toml"), "--now", NOW])
        .assert()
        .success()
        .stdout(predicate::str::contains("Upcoming epoch"))
        .stdout(predicate::str::contains("2419200 seconds"));
}
