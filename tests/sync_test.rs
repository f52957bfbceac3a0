use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn isolated_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("issue-mirror");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("MIRROR_HOME", home)
        .env("MIRROR_CONFIG_PATH", home.join("absent.toml"))
        .env_remove("MIRROR_DEST")
        .env_remove("MIRROR_TOKEN_FILE")
        .env_remove("MIRROR_API_BASE");
    cmd
}

#[test]
fn sync_without_destination_is_reported() {
    let tmp = tempdir().expect("tempdir");

    isolated_cmd(tmp.path())
        .arg("sync")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("no destination"));
}

#[test]
fn sync_rejects_malformed_token_file() {
    let tmp = tempdir().expect("tempdir");
    let token = tmp.path().join("token");
    fs::write(&token, "only-a-token\n").expect("write token");

    isolated_cmd(tmp.path())
        .env("MIRROR_TOKEN_FILE", &token)
        .arg("sync")
        .arg("--dest")
        .arg(tmp.path().join("mirror"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("<username>:<token>"));
}

#[test]
fn sync_reads_default_token_file_under_home() {
    let tmp = tempdir().expect("tempdir");

    isolated_cmd(tmp.path())
        .arg("sync")
        .arg("--dest")
        .arg(tmp.path().join("mirror"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("keys/github-mirror-go-issues"));
}

#[test]
fn sync_aborts_when_remote_is_unreachable() {
    let tmp = tempdir().expect("tempdir");
    let token = tmp.path().join("token");
    fs::write(&token, "gopher:secret\n").expect("write token");
    let mirror = tmp.path().join("mirror");

    isolated_cmd(tmp.path())
        .env("MIRROR_TOKEN_FILE", &token)
        .env("MIRROR_API_BASE", "http://127.0.0.1:9")
        .env("MIRROR_TIMEOUT_SECS", "5")
        .arg("sync")
        .arg("--dest")
        .arg(&mirror)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to list issues page 1"));

    assert!(!mirror.join("issues").exists());
}

#[test]
fn invalid_page_size_is_rejected_before_any_request() {
    let tmp = tempdir().expect("tempdir");

    isolated_cmd(tmp.path())
        .env("MIRROR_PAGE_SIZE", "500")
        .arg("sync")
        .arg("--dest")
        .arg(tmp.path().join("mirror"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid sync page size"));
}
