//! End-to-end CLI tests for the ecotaxa-export binary.

#![allow(deprecated)]

mod support;

use assert_cmd::Command;
use assert_cmd::assert::{Assert, OutputAssertExt};
use predicates::prelude::*;
use support::{FakeEcotaxa, PASSWORD, USER, export_zip};
use tempfile::TempDir;

fn export_cmd() -> Command {
    let mut cmd = Command::cargo_bin("ecotaxa-export").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("ECOTAXA_BASE_URL")
        .env("ECOTAXA_PASSWORD", PASSWORD);
    cmd
}

/// Runs the binary off the async runtime so the mock server keeps serving.
async fn run(mut cmd: Command) -> Assert {
    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .expect("command thread")
        .expect("binary runs");
    output.assert()
}

fn run_folders(root: &std::path::Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("export_"))
        })
        .collect()
}

#[test]
fn test_binary_help_displays_usage() {
    export_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Batch export of EcoTaxa"));
}

#[test]
fn test_binary_version_displays_version() {
    export_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ecotaxa-export"));
}

#[test]
fn test_binary_missing_user_is_usage_error() {
    export_cmd()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--user"));
}

#[test]
fn test_binary_invalid_path_exits_before_network() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing");
    export_cmd()
        .args(["-u", USER, "--base-url", "http://127.0.0.1:9"])
        .arg("-p")
        .arg(&missing)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("does not exist"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_rejected_login_exits_with_auth_code() {
    let fake = FakeEcotaxa::start().await;
    fake.with_login(false).await;
    let temp = TempDir::new().unwrap();

    let mut cmd = export_cmd();
    cmd.args(["-u", USER, "--base-url", &fake.uri()])
        .arg("-p")
        .arg(temp.path());
    run(cmd)
        .await
        .code(4)
        .stderr(predicate::str::contains("[AUTH]"));
    assert!(run_folders(temp.path()).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_no_matching_project_exits_with_code_5() {
    let fake = FakeEcotaxa::start().await;
    fake.with_login(true).await;
    fake.with_projects(&[5, 7, 12]).await;
    let temp = TempDir::new().unwrap();

    let mut cmd = export_cmd();
    cmd.args(["-u", USER, "--base-url", &fake.uri()])
        .arg("-p")
        .arg(temp.path())
        .args(["-i", "98", "99"]);
    run(cmd)
        .await
        .code(5)
        .stderr(predicate::str::contains("No matching project"));
    assert!(run_folders(temp.path()).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_reads_piped_password_from_stdin() {
    let fake = FakeEcotaxa::start().await;
    fake.with_login(true).await;
    fake.with_projects(&[5]).await;
    let temp = TempDir::new().unwrap();

    let mut cmd = export_cmd();
    cmd.env_remove("ECOTAXA_PASSWORD")
        .args(["-u", USER, "--base-url", &fake.uri()])
        .arg("-p")
        .arg(temp.path())
        .args(["-i", "99"])
        .write_stdin(format!("{PASSWORD}\n"));
    run(cmd)
        .await
        .code(5)
        .stderr(predicate::str::contains("No matching project"))
        .stderr(predicate::str::contains("No password provided").not());
}

#[test]
fn test_binary_empty_piped_password_is_rejected() {
    let temp = TempDir::new().unwrap();
    export_cmd()
        .env_remove("ECOTAXA_PASSWORD")
        .args(["-u", USER, "--base-url", "http://127.0.0.1:9"])
        .arg("-p")
        .arg(temp.path())
        .write_stdin("\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No password provided"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_rejected_submission_exits_with_code_6() {
    let fake = FakeEcotaxa::start().await;
    fake.with_login(true).await;
    fake.with_projects(&[5]).await;
    fake.with_rejected_submission(5).await;
    let temp = TempDir::new().unwrap();

    let mut cmd = export_cmd();
    cmd.args(["-u", USER, "--base-url", &fake.uri()])
        .arg("-p")
        .arg(temp.path());
    run(cmd)
        .await
        .code(6)
        .stderr(predicate::str::contains("not acknowledged"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_exports_selected_projects_as_json() {
    let fake = FakeEcotaxa::start().await;
    fake.with_login(true).await;
    fake.with_projects(&[5, 7, 12]).await;
    fake.with_submission(5, 101).await;
    fake.with_task_list(&[101], &[]).await;
    fake.with_task_page(101, 5, "Plankton2023", "export_5.zip")
        .await;
    fake.with_artifact(101, "export_5.zip", export_zip(5), 1).await;
    fake.with_clean(101, 1).await;
    let temp = TempDir::new().unwrap();

    let mut cmd = export_cmd();
    cmd.args(["-u", USER, "--base-url", &fake.uri(), "--json"])
        .args(["--timeout", "600", "-v"])
        .arg("-p")
        .arg(temp.path())
        .args(["-i", "5", "99"]);
    let assert = run(cmd)
        .await
        .success()
        .stderr(predicate::str::contains("Orchestrator configured"));

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["dropped"][0], 99);
    assert_eq!(report["fetched"][0]["dataset"], 5);
    assert_eq!(report["fetched"][0]["job"], 101);

    let folders = run_folders(temp.path());
    assert_eq!(folders.len(), 1);
    assert!(
        folders[0]
            .join("Plankton2023")
            .join("ecotaxa_export_5.tsv")
            .exists()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_partial_run_exits_with_code_7() {
    let fake = FakeEcotaxa::start().await;
    fake.with_login(true).await;
    fake.with_projects(&[5, 7]).await;
    fake.with_submission(5, 101).await;
    fake.with_submission(7, 102).await;
    fake.with_task_list(&[101], &[102]).await;
    fake.with_task_page(101, 5, "Plankton2023", "export_5.zip")
        .await;
    fake.with_artifact(101, "export_5.zip", export_zip(5), 1).await;
    fake.with_clean(101, 1).await;
    let temp = TempDir::new().unwrap();

    let mut cmd = export_cmd();
    cmd.args(["-u", USER, "--base-url", &fake.uri()])
        .arg("-p")
        .arg(temp.path())
        .args(["-i", "0"]);
    run(cmd)
        .await
        .code(7)
        .stdout(predicate::str::contains("Fetched 1 of 2 project(s)"))
        .stdout(predicate::str::contains(
            "7 (task 102): server reported the task as failed",
        ));
}
