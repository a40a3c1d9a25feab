//! `check` request validation. Every case but the last fails before any
//! store is contacted; the last dials the closed port below on purpose.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn zonecheck(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("zonecheck").unwrap();
    cmd.current_dir(dir.path())
        .env_clear()
        .env("S3_ACCESS_KEY", "test-access")
        .env("S3_SECRET_KEY", "test-secret")
        .env("S3_ZONES", "zone1=http://127.0.0.1:9,zone2=http://127.0.0.1:9");
    cmd
}

#[test]
fn check_unknown_current_zone_fails() {
    let dir = tempfile::tempdir().unwrap();
    zonecheck(&dir)
        .env("BUCKET", "data")
        .args(["check", "--key", "a.txt", "--current-zone", "zone9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Zone 'zone9' not found"));
}

#[test]
fn check_without_any_bucket_fails() {
    let dir = tempfile::tempdir().unwrap();
    zonecheck(&dir)
        .args(["check", "--key", "a.txt", "--current-zone", "zone1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Missing 'bucket' and no BUCKET default set.",
        ));
}

#[test]
fn check_empty_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    zonecheck(&dir)
        .args(["check", "--key", "", "--current-zone", "zone1", "--bucket", "data"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing 'key'"));
}

#[test]
fn check_missing_credentials_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("zonecheck")
        .unwrap()
        .current_dir(dir.path())
        .env_clear()
        .env("S3_ZONES", "zone1=http://127.0.0.1:9")
        .env("BUCKET", "data")
        .args(["check", "--key", "a.txt", "--current-zone", "zone1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SECRETS_MISSING"));
}

#[test]
fn check_with_unreachable_zones_reports_unknown_and_warns() {
    let dir = tempfile::tempdir().unwrap();
    zonecheck(&dir)
        .env("BUCKET", "data")
        .env("ZC_FETCH_TIMEOUT_SECS", "2")
        .args(["check", "--key", "a.txt", "--current-zone", "zone1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Unknown\""))
        .stderr(predicate::str::contains("zone unreachable"))
        .stderr(predicate::str::contains("zone2"));
}
