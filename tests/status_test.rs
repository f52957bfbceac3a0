use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_stored(path: &Path, record: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    let body =
        format!("{{\n\t\"version\": \"2016-07-01T00:00:00Z\",\n\t\"record\": {record}\n}}\n");
    fs::write(path, body).expect("write record");
}

fn isolated_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("issue-mirror");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("MIRROR_HOME", home)
        .env("MIRROR_CONFIG_PATH", home.join("absent.toml"))
        .env_remove("MIRROR_DEST");
    cmd
}

#[test]
fn status_counts_issues_and_comments() {
    let tmp = tempdir().expect("tempdir");
    let mirror = tmp.path().join("mirror");
    write_stored(
        &mirror.join("issues/042/42.json"),
        "{\"number\": 42, \"comments\": 1}",
    );
    write_stored(&mirror.join("issues/042/42.comments/comment-7.json"), "{\"id\": 7}");
    write_stored(
        &mirror.join("issues/042/1042.json"),
        "{\"number\": 1042, \"comments\": 0}",
    );

    isolated_cmd(tmp.path())
        .arg("status")
        .arg("--dest")
        .arg(&mirror)
        .assert()
        .success()
        .stdout(predicate::str::contains("issues=2"))
        .stdout(predicate::str::contains("comments=1"))
        .stdout(predicate::str::contains("comment_count_mismatches=0"));
}

#[test]
fn status_reports_foreign_directories_as_failure() {
    let tmp = tempdir().expect("tempdir");
    let mirror = tmp.path().join("mirror");
    write_stored(&mirror.join("issues/005/5.json"), "{\"number\": 5}");
    fs::create_dir_all(mirror.join("issues/005/attachments")).expect("mkdir");

    isolated_cmd(tmp.path())
        .arg("status")
        .arg("--dest")
        .arg(&mirror)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("store structure invalid"))
        .stdout(predicate::str::contains("attachments"));
}

#[test]
fn status_json_output_is_machine_readable() {
    let tmp = tempdir().expect("tempdir");
    let mirror = tmp.path().join("mirror");
    fs::create_dir_all(&mirror).expect("mkdir");

    let out = isolated_cmd(tmp.path())
        .env("MIRROR_DEST", &mirror)
        .args(["--json", "status"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&out).expect("json report");
    assert_eq!(report["command"], "status");
    assert_eq!(report["ok"], true);
    assert!(
        report["details"]
            .as_array()
            .expect("details")
            .iter()
            .any(|d| d == "issues=0")
    );
}

#[test]
fn status_ignores_leftover_temp_files() {
    let tmp = tempdir().expect("tempdir");
    let mirror = tmp.path().join("mirror");
    write_stored(
        &mirror.join("issues/003/3.json"),
        "{\"number\": 3, \"comments\": 1}",
    );
    write_stored(&mirror.join("issues/003/3.comments/comment-9.json"), "{\"id\": 9}");
    fs::write(mirror.join("issues/003/3.comments/.x7Yq2B.tmp"), "{").expect("write temp");

    isolated_cmd(tmp.path())
        .arg("status")
        .arg("--dest")
        .arg(&mirror)
        .assert()
        .success()
        .stdout(predicate::str::contains("comments=1"))
        .stdout(predicate::str::contains("comment_count_mismatches=0"));
}
