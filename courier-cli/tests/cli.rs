//! Command-line surface tests. None of these reach a live backend.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn courier(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("courier").unwrap();
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("courier")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("history"));
}

#[test]
fn status_without_session() {
    let dir = tempdir().unwrap();
    courier(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("NOT LOGGED IN"));
}

#[test]
fn logout_without_session_is_harmless() {
    let dir = tempdir().unwrap();
    courier(dir.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

#[test]
fn history_requires_login() {
    let dir = tempdir().unwrap();
    courier(dir.path())
        .args(["history", "bob"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn send_requires_content() {
    let dir = tempdir().unwrap();
    courier(dir.path())
        .args(["send", "bob"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Must specify a message or --photo"));
}

#[test]
fn unsupported_backend_scheme_is_rejected() {
    let dir = tempdir().unwrap();
    courier(dir.path())
        .args(["--backend", "ftp://example.com", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported scheme"));
}

#[test]
fn login_to_unreachable_backend_fails() {
    let dir = tempdir().unwrap();
    courier(dir.path())
        .args([
            "--backend",
            "http://127.0.0.1:1",
            "login",
            "alice",
            "--password",
            "pw",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unreachable"));

    assert!(!dir.path().join("session.json").exists());
}
