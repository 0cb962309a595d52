//! CLI executor against a scripted stand-in binary

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use harness::runtime::cli::NO_EXIT_CODE;
use harness::{CliExecutor, HarnessConfig};

const SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  --version) echo "wanaku 0.0.9-test" ;;
  tools)
    shift
    echo "tools $*"
    ;;
  fail)
    echo "bad input" >&2
    exit 2
    ;;
  hang) sleep 30 ;;
  *) echo "unknown command: $1" >&2; exit 1 ;;
esac
"#;

fn write_cli(dir: &Path) -> PathBuf {
    let path = dir.join("wanaku");
    std::fs::write(&path, SCRIPT).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn test_scripted_cli_is_available() {
    let dir = tempfile::tempdir().unwrap();
    let cli = CliExecutor::new(write_cli(dir.path()));

    assert!(cli.is_available().await);
    let version = cli.execute(&["--version"]).await;
    assert!(version.is_success());
    assert_eq!(version.stdout, "wanaku 0.0.9-test");
}

#[tokio::test]
async fn test_arguments_pass_through() {
    let dir = tempfile::tempdir().unwrap();
    let cli = CliExecutor::new(write_cli(dir.path()));

    let result = cli
        .execute(&["tools", "add", "--name", "weather", "--uri", "https://example.com"])
        .await;
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, "tools add --name weather --uri https://example.com");
    assert!(result.stderr.is_empty());
}

#[tokio::test]
async fn test_failure_keeps_exit_code_and_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let cli = CliExecutor::new(write_cli(dir.path()));

    let result = cli.execute(&["fail"]).await;
    assert_eq!(result.exit_code, 2);
    assert_eq!(result.stderr, "bad input");
    assert_eq!(result.combined_output(), "\nbad input");
    assert!(!result.is_success());
}

#[tokio::test]
async fn test_hanging_command_is_killed() {
    let dir = tempfile::tempdir().unwrap();
    let cli = CliExecutor::new(write_cli(dir.path())).with_timeout(Duration::from_millis(500));

    let result = cli.execute(&["hang"]).await;
    assert_eq!(result.exit_code, NO_EXIT_CODE);
    assert!(result.stderr.contains("timed out"));
    assert!(result.duration < Duration::from_secs(5));
}

#[tokio::test]
async fn test_executor_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cli(dir.path());
    let config = HarnessConfig::builder().cli_path(&path).build();

    let cli = CliExecutor::from_config(&config);
    assert_eq!(cli.cli_path(), path.as_path());
    assert!(cli.execute(&["--version"]).await.is_success());
}
