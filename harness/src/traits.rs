//! Trait definitions with mockall annotations for testing
//!
//! The readiness signal of a managed process is injected through
//! [`HealthCheck`], so the process state machine can be exercised with a
//! mock instead of a real endpoint.

use std::time::Duration;

/// Readiness check for a spawned process.
///
/// Waits until the process reports ready or `timeout` elapses. Returns
/// pass/fail only; diagnosis relies on the process log file.
#[mockall::automock]
#[async_trait::async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self, timeout: Duration) -> bool;
}
