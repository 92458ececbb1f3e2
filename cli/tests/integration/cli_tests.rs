//! Integration tests for the ec2-k3s binary
//!
//! Every case here fails or finishes before the first AWS call, so no cloud
//! credentials are needed. `HOME` points at a scratch directory so no real
//! config, state, or key is picked up.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ec2_k3s(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ec2-k3s"));
    cmd.env("NO_COLOR", "1")
        .env("HOME", home.path())
        .env_remove("AWS_REGION")
        .env_remove("EC2_K3S_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn scratch() -> TempDir {
    TempDir::new().expect("tempdir")
}

// --- Help and version ---

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    let home = scratch();
    ec2_k3s(&home)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Single-node k3s clusters on EC2"));
}

#[test]
fn test_cli_help_lists_commands() {
    let home = scratch();
    ec2_k3s(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("up"))
        .stdout(predicate::str::contains("down"))
        .stdout(predicate::str::contains("connect"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_cli_version_flag_shows_name() {
    let home = scratch();
    ec2_k3s(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ec2-k3s"));
}

#[test]
fn test_unknown_command_exits_with_error() {
    let home = scratch();
    ec2_k3s(&home)
        .arg("nonexistent")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

// --- Argument validation ---

#[test]
fn test_connect_requires_command() {
    let home = scratch();
    ec2_k3s(&home)
        .arg("connect")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--command"));
}

#[test]
fn test_up_rejects_malformed_region() {
    let home = scratch();
    ec2_k3s(&home)
        .args(["up", "--region", "Mars"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid region: Mars"));
}

#[test]
fn test_up_rejects_malformed_instance_type() {
    let home = scratch();
    ec2_k3s(&home)
        .args(["up", "--region", "us-east-1", "--instance-type", "huge"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid instance type: huge"));
}

#[test]
fn test_up_without_region_explains_sources() {
    let home = scratch();
    ec2_k3s(&home)
        .arg("up")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No region configured"))
        .stderr(predicate::str::contains("AWS_REGION"));
}

#[test]
fn test_up_region_from_env_reaches_key_loading() {
    // Region resolves from AWS_REGION; the missing key then stops the run.
    let home = scratch();
    ec2_k3s(&home)
        .env("AWS_REGION", "eu-west-1")
        .arg("up")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("loading SSH key"))
        .stderr(predicate::str::contains("id_rsa"));
}

// --- Missing cluster ---

#[test]
fn test_down_without_cluster_fails_cleanly() {
    let home = scratch();
    ec2_k3s(&home)
        .arg("down")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No cluster found"));
}

#[test]
fn test_connect_without_cluster_fails_cleanly() {
    let home = scratch();
    ec2_k3s(&home)
        .args(["connect", "--command", "uptime"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No cluster found"));
}

// --- Config file ---

#[test]
fn test_explicit_missing_config_is_an_error() {
    let home = scratch();
    let missing = home.path().join("nope.yaml");
    ec2_k3s(&home)
        .args(["--config", missing.to_str().expect("utf-8 path"), "down"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_config_file_with_bad_region_is_rejected() {
    let home = scratch();
    let path = home.path().join("config.yaml");
    std::fs::write(&path, "region: nowhere\n").expect("write config");
    ec2_k3s(&home)
        .env("EC2_K3S_CONFIG", &path)
        .arg("down")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid region: nowhere"));
}

#[test]
fn test_config_file_region_and_key_path_are_used() {
    let home = scratch();
    let path = home.path().join("config.yaml");
    std::fs::write(&path, "region: ap-south-1\nsshKeyPath: /nonexistent/ec2-k3s-key\n")
        .expect("write config");
    ec2_k3s(&home)
        .args(["--config", path.to_str().expect("utf-8 path"), "up"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("/nonexistent/ec2-k3s-key"));
}
