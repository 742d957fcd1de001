//! Test helper utilities for CLI integration tests.

#![allow(deprecated)] // Command::cargo_bin deprecation

use assert_cmd::Command;

/// Planning time inside the first fixture epoch.
pub const NOW: &str = "1700000100";

/// Start of the epoch planned from `NOW`.
pub const EPOCH_START: &str = "1702419200";

/// Path of a fixture file.
pub fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// Create a CLI command with no inherited input paths or log filter.
pub fn emissions_cmd() -> Command {
    let mut cmd = Command::cargo_bin("emissions").unwrap();
    cmd.env_remove("EMISSIONS_CONFIG")
        .env_remove("EMISSIONS_SNAPSHOT")
        .env_remove("RUST_LOG");
    cmd
}

/// Create a CLI command for `subcommand` wired to the fixture inputs.
pub fn emissions_cmd_with_fixtures(subcommand: &str) -> Command {
    let mut cmd = emissions_cmd();
    cmd.args([
        subcommand,
        "--config",
        &fixture_path("config.toml"),
        "--snapshot",
        &fixture_path("snapshot.json"),
        "--now",
        NOW,
    ]);
    cmd
}
