use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn runver() -> assert_cmd::Command {
    cargo_bin_cmd!("runver")
}

// ── Help / Version ──

#[test]
fn shows_help() {
    runver()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deploy a versioned Next.js app"))
        .stdout(predicate::str::contains("<VERSION>"))
        .stdout(predicate::str::contains("--log-level"));
}

#[test]
fn shows_version() {
    runver()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("runver"));
}

// ── Arguments ──

#[test]
fn version_argument_is_required() {
    runver()
        .assert()
        .failure()
        .stderr(predicate::str::contains("<VERSION>"));
}

#[test]
fn rejects_unknown_log_level() {
    runver()
        .args(["feature-x", "--log-level", "loud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

// ── Version validation ──

#[test]
fn rejects_version_starting_with_digit_before_any_work() {
    let tmp = TempDir::new().unwrap();

    runver()
        .current_dir(tmp.path())
        .arg("1-bad")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must start with a letter"));

    assert!(!tmp.path().join("cloudbuild.yaml").exists());
    assert!(!tmp.path().join("workspace").exists());
}

#[test]
fn rejects_overlong_version() {
    let tmp = TempDir::new().unwrap();

    runver()
        .current_dir(tmp.path())
        .arg("a".repeat(21))
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 20 characters"));
}

// ── Configuration ──

#[test]
fn invalid_config_fails_before_gcloud() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("runver.toml"), "[project\nregion = ").unwrap();

    runver()
        .current_dir(tmp.path())
        .arg("feature-x")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config"));
}
