//! Command-line behaviour of the `catalog-loadtest` binary.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

/// Binary invocation isolated from the caller's environment and any
/// `.loadtest/` directory above the temp dir.
fn cmd(dir: &std::path::Path) -> Command {
    let mut cmd = cargo_bin_cmd!("catalog-loadtest");
    cmd.current_dir(dir).env_remove("LOCUST_HOST").env("NO_COLOR", "1");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("probe"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn run_help_mentions_locust_host() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("LOCUST_HOST"));
}

#[test]
fn init_writes_config_and_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path()).args(["init", "catalog"]).assert().success();

    let path = dir.path().join(".loadtest").join("catalog.toml");
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("[catalog.ids]"));

    cmd(dir.path())
        .args(["init", "catalog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    cmd(dir.path())
        .args(["init", "catalog", "--force"])
        .assert()
        .success();
}

#[test]
fn unknown_scenario_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["run", "checkout"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn missing_config_file_fails_before_running() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["run", "search", "--config", "nope.toml", "--skip-preflight"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn zero_users_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args([
            "run",
            "catalog",
            "--users",
            "0",
            "--skip-preflight",
            "--host",
            "http://127.0.0.1:1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("virtual_users"));
}

#[test]
fn invalid_discovered_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join(".loadtest");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("search.toml"), "[search]\nlimit = 50\n").unwrap();

    cmd(dir.path())
        .args(["run", "search", "--skip-preflight", "--host", "http://127.0.0.1:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1..=20"));
}

#[test]
fn failed_preflight_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["run", "catalog", "--host", "http://127.0.0.1:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Health check failed"));
}

#[test]
fn probe_against_unreachable_host_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["probe", "search", "--host", "http://127.0.0.1:1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("FAIL"))
        .stderr(predicate::str::contains("1 of 1 cases failed"));
}

#[test]
fn run_with_failing_requests_still_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args([
            "run",
            "search",
            "--host",
            "http://127.0.0.1:1",
            "--skip-preflight",
            "--users",
            "1",
            "--iterations",
            "3",
            "--no-report",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("http_req_failed"))
        .stdout(predicate::str::contains("failures:"));
}

#[test]
fn run_writes_report_under_loadtest_dir() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args([
            "run",
            "catalog",
            "--host",
            "http://127.0.0.1:1",
            "--skip-preflight",
            "--users",
            "1",
            "--iterations",
            "2",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("Report written to"));

    let reports: Vec<_> = std::fs::read_dir(dir.path().join(".loadtest").join("reports"))
        .unwrap()
        .collect();
    assert_eq!(reports.len(), 1);
}

#[test]
fn locust_host_env_sets_target() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .env("LOCUST_HOST", "http://127.0.0.1:1")
        .args(["probe", "search"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("against http://127.0.0.1:1"));
}

#[test]
fn host_flag_overrides_locust_host_env() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .env("LOCUST_HOST", "http://127.0.0.1:2")
        .args(["probe", "search", "--host", "http://127.0.0.1:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("against http://127.0.0.1:1"))
        .stderr(predicate::str::contains("127.0.0.1:2").not());
}
