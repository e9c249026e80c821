//! CLI command tests against temporary deployment directories.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn lexguard(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lexguard").unwrap();
    cmd.arg("--project-dir")
        .arg(dir.path())
        .arg("--no-user-config")
        .env_remove("LEXGUARD_SETTINGS__AI_CONFIDENCE_THRESHOLD");
    cmd
}

#[test]
fn config_prints_defaults() {
    let dir = TempDir::new().unwrap();
    lexguard(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("ai_confidence_threshold = 70"));
}

#[test]
fn check_config_reports_deployment_values() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("lexguard.toml"),
        "[settings]\nauto_publish_above_threshold = true\nai_confidence_threshold = 90\n",
    )
    .unwrap();

    lexguard(&dir)
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Auto-publish: on (threshold 90)"));
}

#[test]
fn check_config_rejects_out_of_range_threshold() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("lexguard.toml"),
        "[settings]\nai_confidence_threshold = 150\n",
    )
    .unwrap();

    lexguard(&dir)
        .arg("check-config")
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid"));
}

#[test]
fn check_rule_rejects_unbalanced_regex() {
    let dir = TempDir::new().unwrap();
    lexguard(&dir)
        .args(["check-rule", "--pattern", "(unclosed", "--regex"])
        .assert()
        .failure();
}

#[test]
fn check_rule_accepts_keyword() {
    let dir = TempDir::new().unwrap();
    lexguard(&dir)
        .args(["check-rule", "--pattern", "(unclosed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("keyword"));
}

#[test]
fn triage_uses_configured_thresholds() {
    let dir = TempDir::new().unwrap();
    lexguard(&dir)
        .args(["triage", "--score", "45"])
        .assert()
        .success()
        .stdout(predicate::str::contains("low_confidence"));

    std::fs::write(
        dir.path().join("lexguard.toml"),
        "[triage]\nlow_confidence_below = 40\nrequires_attention_below = 60\n",
    )
    .unwrap();
    lexguard(&dir)
        .args(["triage", "--score", "45"])
        .assert()
        .success()
        .stdout(predicate::str::contains("requires_attention"));
}

#[test]
fn triage_rejects_out_of_range_score() {
    let dir = TempDir::new().unwrap();
    lexguard(&dir)
        .args(["triage", "--score", "101"])
        .assert()
        .failure();
}
