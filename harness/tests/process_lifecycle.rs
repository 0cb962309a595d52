//! Process handle lifecycle against a real child process

use assert_matches::assert_matches;
use std::time::Duration;
use tokio::time::Instant;

use harness::runtime::{check_http, ProcessHandle, ProcessState};
use harness::{HarnessError, PortAllocator};

mod common;
use common::fake_router_spec;

/// Allocate two ports, run a service on one, stop it, and its port goes quiet
#[tokio::test]
async fn test_start_probe_stop_end_to_end() {
    let logs = tempfile::tempdir().unwrap();
    shared::logging::init_test_tracing();

    let ports = PortAllocator::new().allocate_many(2).unwrap();
    let (p1, p2) = (ports[0], ports[1]);
    assert_ne!(p1, p2);

    let mut handle = ProcessHandle::new(fake_router_spec(p1, &logs));
    handle.start().await.unwrap();
    assert_eq!(handle.state(), ProcessState::Running);
    assert!(handle.is_running());

    let url = format!("http://localhost:{p1}/health");
    assert!(check_http(&url).await);

    handle.stop().await;
    assert_eq!(handle.state(), ProcessState::Stopped);

    let start = Instant::now();
    assert!(!check_http(&url).await);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_sigterm_ignoring_process_is_killed() {
    let logs = tempfile::tempdir().unwrap();
    let port = PortAllocator::new().allocate().unwrap();

    let mut spec = fake_router_spec(port, &logs);
    spec.env.insert("FAKE_IGNORE_SIGTERM".to_string(), "1".to_string());
    spec.grace_period = Duration::from_millis(500);

    let mut handle = ProcessHandle::new(spec);
    handle.start().await.unwrap();

    let start = Instant::now();
    handle.stop().await;
    let elapsed = start.elapsed();

    assert_eq!(handle.state(), ProcessState::Stopped);
    assert!(elapsed >= Duration::from_millis(500), "should wait out the grace period");
    assert!(elapsed < Duration::from_secs(5), "should escalate to kill");
    assert!(!check_http(&format!("http://localhost:{port}/health")).await);
}

/// A port that is already taken makes the service exit; the health check
/// never passes and the failure points at the log
#[tokio::test]
async fn test_startup_failure_reports_log_file() {
    let logs = tempfile::tempdir().unwrap();
    let occupied = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let mut spec = fake_router_spec(port, &logs);
    spec.startup_timeout = Duration::from_secs(2);
    // a probe on another port: the fake never binds successfully anyway
    let probe_port = PortAllocator::new().allocate().unwrap();
    spec.health_check = std::sync::Arc::new(harness::runtime::HttpHealthCheck::new(format!(
        "http://localhost:{probe_port}/health"
    )));

    let mut handle = ProcessHandle::new(spec);
    let err = handle.start().await.unwrap_err();

    assert_eq!(handle.state(), ProcessState::Stopped);
    let log_file = err.log_file().cloned();
    assert_matches!(err, HarnessError::StartupFailure { .. });

    let log_file = log_file.expect("startup failure should carry the log path");
    assert!(log_file.starts_with(logs.path()));
    let contents = std::fs::read_to_string(&log_file).unwrap();
    assert!(contents.contains("failed to bind"), "log was: {contents}");
}
