//! Process orchestration harness for integration tests
//!
//! Brings up a router, an optional auth provider and per-test capability
//! processes on dynamically allocated ports, waits for each to report ready
//! and tears everything down in dependency order.

pub mod clients;
pub mod config;
pub mod error;
pub mod profiles;
pub mod runtime;
pub mod scope;
pub mod traits;

// Re-export commonly used types
pub use config::{HarnessConfig, HarnessConfigBuilder};
pub use error::{HarnessError, HarnessResult};
pub use runtime::{CliExecutor, CliResult, LaunchSpec, PortAllocator, ProcessHandle, ProcessState};
pub use scope::{SuiteScope, TestContext, TestScope, TeardownReport};
pub use traits::HealthCheck;
