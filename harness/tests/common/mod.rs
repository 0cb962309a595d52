//! Common test utilities
//!
//! Every managed role is played by the `fake-service` binary, so these
//! tests exercise real processes, ports and signals without Java.

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

use harness::runtime::health::poll_until;
use harness::runtime::{HttpHealthCheck, LaunchSpec, LogNaming};
use harness::{HarnessConfig, HarnessConfigBuilder};

pub fn fake_service() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_fake-service"))
}

/// Suite configuration with fake router and capability, no auth provider
pub fn fake_config(logs: &TempDir) -> HarnessConfigBuilder {
    shared::logging::init_test_tracing();

    HarnessConfig::builder()
        .router_artifact(fake_service())
        .router_args(["router"])
        .capability_artifact(fake_service())
        .capability_args(["capability"])
        .default_timeout(Duration::from_secs(15))
        .grace_period(Duration::from_secs(2))
        .capability_settle(Duration::from_millis(300))
        .log_dir(logs.path())
}

/// Fake auth provider on top of [`fake_config`]
pub fn fake_config_with_auth(logs: &TempDir) -> HarnessConfigBuilder {
    fake_config(logs).auth_artifact(fake_service()).auth_args(["auth"])
}

/// Launch spec for a fake router on a given port, ready on `/health`
pub fn fake_router_spec(port: u16, logs: &TempDir) -> LaunchSpec {
    LaunchSpec::builder("router", fake_service())
        .arg("router")
        .property("quarkus.http.port", port)
        .health_check(HttpHealthCheck::new(format!("http://localhost:{port}/health")))
        .log_naming(LogNaming::flat("process_lifecycle"))
        .log_root(logs.path())
        .startup_timeout(Duration::from_secs(15))
        .grace_period(Duration::from_secs(2))
        .build()
}

/// Poll an async condition for up to `wait`
pub async fn eventually<F, Fut>(wait: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + wait;
    poll_until(deadline, Duration::from_millis(50), |_| condition()).await
}
