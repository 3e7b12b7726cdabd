//! CLI tests for the pilot binary.
//!
//! Spawns the binary against profiles written to a temp directory and
//! verifies exit codes and output for valid, invalid, and unroutable inputs.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use pilot::exit_codes;

const PROFILE: &str = r#"{
  "name": "demo",
  "states": [
    {
      "name": "home",
      "condition": "home_marker",
      "type": "normal",
      "actions": [
        { "name": "open_shop", "method": "click", "condition": "shop_button", "successor": "shop" }
      ]
    },
    {
      "name": "shop",
      "condition": "shop_marker",
      "type": "normal",
      "actions": []
    },
    {
      "name": "island",
      "condition": "island_marker",
      "type": "normal",
      "actions": []
    }
  ]
}"#;

fn write_profile(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("profile.json");
    fs::write(&path, contents).expect("write profile");
    path
}

fn pilot() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pilot"))
}

#[test]
fn validate_accepts_a_well_formed_profile() {
    let temp = tempfile::tempdir().expect("tempdir");
    let profile = write_profile(&temp, PROFILE);

    let output = pilot()
        .arg("validate")
        .arg(&profile)
        .output()
        .expect("pilot validate");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("demo"));
}

#[test]
fn validate_rejects_a_profile_missing_required_fields() {
    let temp = tempfile::tempdir().expect("tempdir");
    let profile = write_profile(&temp, r#"{ "states": [] }"#);

    let output = pilot()
        .arg("validate")
        .arg(&profile)
        .output()
        .expect("pilot validate");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(!stderr.is_empty());
}

#[test]
fn states_lists_every_state_with_its_kind() {
    let temp = tempfile::tempdir().expect("tempdir");
    let profile = write_profile(&temp, PROFILE);

    let output = pilot()
        .arg("states")
        .arg(&profile)
        .output()
        .expect("pilot states");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(stdout.lines().count(), 3);
    assert!(stdout.contains("home\tnormal"));
}

#[test]
fn plan_prints_the_route() {
    let temp = tempfile::tempdir().expect("tempdir");
    let profile = write_profile(&temp, PROFILE);

    let output = pilot()
        .args(["plan", "--from", "home", "--to", "shop"])
        .arg(&profile)
        .output()
        .expect("pilot plan");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("home -> shop (open_shop)"));
}

#[test]
fn plan_reports_no_path_with_its_own_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let profile = write_profile(&temp, PROFILE);

    let output = pilot()
        .args(["plan", "--from", "home", "--to", "island"])
        .arg(&profile)
        .output()
        .expect("pilot plan");

    assert_eq!(output.status.code(), Some(exit_codes::NO_PATH));
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("island"));
}
