//! CLI tests for `monodeploy deploy`, `affected` and `list`.
//!
//! Spawns the binary against throwaway repositories and checks exit codes and
//! printed output.

use std::process::{Command, Output};

use monodeploy::exit_codes;
use monodeploy::test_support::TestRepo;

fn monodeploy(repo: &TestRepo, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_monodeploy"))
        .args(args)
        .arg("-d")
        .arg(repo.path())
        .output()
        .expect("spawn monodeploy")
}

fn repo_with_change(build_web: &str) -> TestRepo {
    let repo = TestRepo::new().expect("repo");
    repo.write("apps/web/action.toml", build_web).expect("write");
    repo.write("apps/web/page.txt", "v1").expect("write");
    repo.write("apps/api/action.toml", "build = [\"true\"]\n")
        .expect("write");
    repo.write("apps/api/main.txt", "v1").expect("write");
    repo.commit_all("initial").expect("commit");
    repo.write("apps/web/page.txt", "v2").expect("write");
    repo.commit_all("change web").expect("commit");
    repo
}

#[test]
fn successful_build_only_run_exits_ok() {
    let repo = repo_with_change("build = [\"true\"]\n");
    let output = monodeploy(&repo, &["deploy", "-s"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(exit_codes::OK), "{stdout}");
    assert!(stdout.contains("selected web (changed: apps/web/page.txt)"));
    assert!(stdout.contains("skipping deploy of web"));
    assert!(!stdout.contains("building api"));
    assert!(repo.path().join("build/web").is_dir());
}

#[test]
fn failed_action_exits_with_failed_code_and_writes_report() {
    let repo = repo_with_change("build = [\"false\"]\n");
    let report_path = repo.path().join("out/report.json");
    let output = monodeploy(
        &repo,
        &["deploy", "-s", "--report", report_path.to_str().expect("utf8")],
    );
    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    assert!(String::from_utf8_lossy(&output.stdout).contains("completed with errors"));

    let raw = std::fs::read_to_string(&report_path).expect("report");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(json["status"], "failure");
    assert_eq!(json["actions"][0]["name"], "api");
    assert_eq!(json["actions"][0]["outcome"], "not_selected");
    assert_eq!(json["actions"][1]["outcome"], "build_failed");
}

#[test]
fn deploy_without_remote_fails_only_that_action() {
    let repo = repo_with_change("build = [\"true\"]\n");
    let output = monodeploy(&repo, &["deploy"]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    assert!(String::from_utf8_lossy(&output.stdout).contains("no deploy remote configured"));
}

#[test]
fn outside_a_git_repository_is_fatal() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = Command::new(env!("CARGO_BIN_EXE_monodeploy"))
        .args(["deploy", "-s", "-d"])
        .arg(temp.path())
        .output()
        .expect("spawn monodeploy");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("collect changed files"));
}

#[test]
fn invalid_config_is_fatal() {
    let repo = repo_with_change("build = [\"true\"]\n");
    repo.write(".monodeploy.toml", "[build]\njobs = 0\n")
        .expect("write");
    let output = monodeploy(&repo, &["deploy", "-s"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("build.jobs"));
}

#[test]
fn affected_prints_name_and_first_match() {
    let repo = repo_with_change("build = [\"true\"]\n");
    let output = monodeploy(&repo, &["affected"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "web\tapps/web/page.txt\n"
    );
    assert!(!repo.path().join("build").exists());
}

#[test]
fn list_prints_every_action_with_rules() {
    let repo = repo_with_change("build = [\"true\"]\npaths = [\"shared/**\"]\n");
    let output = monodeploy(&repo, &["list"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "api\tapps/api/**\nweb\tapps/web/** shared/**\n"
    );
}
