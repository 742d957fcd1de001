//! Proposal payload tests.

use predicates::prelude::*;

use super::helpers::{emissions_cmd_with_fixtures, EPOCH_START};

fn propose_json(extra: &[&str]) -> serde_json::Value {
    let output = emissions_cmd_with_fixtures("propose")
        .args(["--format", "json"])
        .args(extra)
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_propose_json_payload() {
    let payload = propose_json(&[]);

    assert_eq!(payload["startTimeStamp"], 1702419200);
    assert_eq!(payload["endTimeSTamp"], 1704838400);
    for network in ["1284", "8453", "10"] {
        assert!(payload[network]["actions"].is_array(), "missing {network}");
    }
}

#[test]
fn test_propose_json_home_chain_starts_with_bridges() {
    let payload = propose_json(&[]);
    let actions = payload["1284"]["actions"].as_array().unwrap();

    assert_eq!(actions[0]["type"], "bridge");
    assert_eq!(actions[0]["network"], 10);
    assert_eq!(actions[1]["type"], "bridge");
    assert_eq!(actions[1]["network"], 8453);
    assert_eq!(actions[2]["type"], "transfer");
}

#[test]
fn test_propose_json_remote_speeds_are_strings() {
    let payload = propose_json(&[]);
    let actions = payload["8453"]["actions"].as_array().unwrap();

    let speeds: Vec<&serde_json::Value> = actions
        .iter()
        .filter(|a| a["type"] == "setMrdSpeed")
        .collect();
    assert!(!speeds.is_empty());
    for speed in speeds {
        assert!(speed["supplySpeed"].is_string());
        assert!(speed["borrowSpeed"].is_string());
    }
    assert!(actions.iter().any(|a| a["type"] == "merkleCampaign"));
}

#[test]
fn test_propose_network_filter() {
    let payload = propose_json(&["--network", "base"]);

    assert!(payload.get("8453").is_some());
    assert!(payload.get("1284").is_none());
    assert!(payload.get("10").is_none());
}

#[test]
fn test_propose_network_filter_by_id() {
    let payload = propose_json(&["--network", "10"]);

    assert!(payload.get("10").is_some());
    assert!(payload.get("8453").is_none());
}

#[test]
fn test_propose_table_output() {
    emissions_cmd_with_fixtures("propose")
        .assert()
        .success()
        .stdout(predicate::str::contains("bridge"))
        .stdout(predicate::str::contains("MOONWELL_USDC"))
        .stdout(predicate::str::contains(EPOCH_START));
}

#[test]
fn test_propose_markdown_output() {
    emissions_cmd_with_fixtures("propose")
        .args(["--format", "markdown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("| Network"))
        .stdout(predicate::str::contains("|---"));
}

#[test]
fn test_propose_is_deterministic() {
    let first = emissions_cmd_with_fixtures("propose")
        .args(["--format", "json"])
        .output()
        .unwrap();
    let second = emissions_cmd_with_fixtures("propose")
        .args(["--format", "json"])
        .output()
        .unwrap();

    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}
