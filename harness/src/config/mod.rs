//! Configuration Management
//!
//! Harness configuration, its builder and the constants every component
//! falls back to.

pub mod builder;
pub mod harness;

pub use builder::HarnessConfigBuilder;
pub use harness::{find_artifact, AuthSettings, HarnessConfig};

use std::time::Duration;

// Environment variables read by `HarnessConfig::from_env`
pub const ENV_ARTIFACTS_DIR: &str = "HARNESS_ARTIFACTS_DIR";
pub const ENV_ROUTER_ARTIFACT: &str = "HARNESS_ROUTER_ARTIFACT";
pub const ENV_CAPABILITY_ARTIFACT: &str = "HARNESS_CAPABILITY_ARTIFACT";
pub const ENV_AUTH_ARTIFACT: &str = "HARNESS_AUTH_ARTIFACT";
pub const ENV_CLI_PATH: &str = "HARNESS_CLI_PATH";
pub const ENV_JAVA: &str = "HARNESS_JAVA";
pub const ENV_TIMEOUT: &str = "HARNESS_TIMEOUT";
pub const ENV_LOG_DIR: &str = "HARNESS_LOG_DIR";
pub const ENV_LOG_PROFILE: &str = "HARNESS_LOG_PROFILE";
pub const ENV_AUTH_REALM: &str = "HARNESS_AUTH_REALM";

// Defaults
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
pub const DEFAULT_CLI_PATH: &str = "wanaku";
pub const DEFAULT_JAVA: &str = "java";
pub const DEFAULT_LOG_DIR: &str = "target/logs";
pub const DEFAULT_LOG_PROFILE: &str = "default";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CLI_TIMEOUT: Duration = Duration::from_secs(30);
/// Largest startup timeout accepted from the environment
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_CAPABILITY_SETTLE: Duration = Duration::from_secs(1);

pub const ROUTER_ARTIFACT_PREFIX: &str = "wanaku-router";
pub const CAPABILITY_ARTIFACT_PREFIX: &str = "wanaku-tool-service-http";
pub const FAST_JAR_NAME: &str = "quarkus-run.jar";

// Health checks
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(100);
pub const HTTP_PROBE_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
pub const TCP_PROBE_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
pub const ROUTER_HEALTH_PATH: &str = "/q/health/ready";

// Router API paths
pub const ROUTER_API_BASE_PATH: &str = "/api/v1";
pub const ROUTER_TOOLS_PATH: &str = "/api/v1/tools";
pub const MCP_PATH: &str = "/mcp/";

// Port allocation
pub const PORT_ALLOCATION_RETRIES: u32 = 5;
pub const PORT_ALLOCATION_DELAY: Duration = Duration::from_millis(50);

// Process management
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
pub const FORCE_KILL_TIMEOUT: Duration = Duration::from_secs(5);
