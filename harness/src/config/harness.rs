//! Harness configuration
//!
//! Created once per suite and read-only afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::*;
use crate::error::{HarnessError, HarnessResult};

/// Identity provider settings used by the auth profile and client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub realm: String,
    /// Public client used to obtain MCP access tokens
    pub mcp_client_id: String,
    /// Confidential client the capability authenticates as
    pub service_client_id: String,
    pub service_client_secret: String,
    pub username: String,
    pub password: String,
    pub scope: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            realm: "wanaku".to_string(),
            mcp_client_id: "mcp-client".to_string(),
            service_client_id: "wanaku-service".to_string(),
            service_client_secret: "secret".to_string(),
            username: "test-user".to_string(),
            password: "test-password".to_string(),
            scope: "openid wanaku-mcp-client".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub artifacts_dir: PathBuf,
    pub router_artifact: Option<PathBuf>,
    pub capability_artifact: Option<PathBuf>,
    pub auth_artifact: Option<PathBuf>,
    pub cli_path: Option<PathBuf>,
    pub java: PathBuf,
    /// Startup timeout for every managed process
    pub default_timeout: Duration,
    pub grace_period: Duration,
    /// Pause after the capability is healthy so it can register
    pub capability_settle: Duration,
    pub log_dir: PathBuf,
    pub log_profile: String,
    pub router_args: Vec<String>,
    pub capability_args: Vec<String>,
    pub auth_args: Vec<String>,
    pub auth: AuthSettings,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            router_artifact: None,
            capability_artifact: None,
            auth_artifact: None,
            cli_path: None,
            java: PathBuf::from(DEFAULT_JAVA),
            default_timeout: DEFAULT_TIMEOUT,
            grace_period: GRACEFUL_SHUTDOWN_TIMEOUT,
            capability_settle: DEFAULT_CAPABILITY_SETTLE,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_profile: DEFAULT_LOG_PROFILE.to_string(),
            router_args: Vec::new(),
            capability_args: Vec::new(),
            auth_args: vec!["start-dev".to_string()],
            auth: AuthSettings::default(),
        }
    }
}

impl HarnessConfig {
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::new()
    }

    /// Load `.env` (if any), then read the `HARNESS_*` environment variables
    pub fn from_env() -> HarnessResult<Self> {
        // dotenv never overrides variables that are already set
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let artifacts_dir = var(ENV_ARTIFACTS_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACTS_DIR));

        let default_timeout = match var(ENV_TIMEOUT) {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_TIMEOUT,
        };

        let router_artifact = var(ENV_ROUTER_ARTIFACT)
            .map(PathBuf::from)
            .or_else(|| find_artifact(&artifacts_dir, ROUTER_ARTIFACT_PREFIX));
        let capability_artifact = var(ENV_CAPABILITY_ARTIFACT)
            .map(PathBuf::from)
            .or_else(|| find_artifact(&artifacts_dir, CAPABILITY_ARTIFACT_PREFIX));

        let mut builder = HarnessConfigBuilder::new()
            .artifacts_dir(artifacts_dir)
            .default_timeout(default_timeout);

        if let Some(path) = router_artifact {
            builder = builder.router_artifact(path);
        }
        if let Some(path) = capability_artifact {
            builder = builder.capability_artifact(path);
        }
        if let Some(path) = var(ENV_AUTH_ARTIFACT) {
            builder = builder.auth_artifact(path);
        }
        if let Some(path) = var(ENV_CLI_PATH) {
            builder = builder.cli_path(path);
        }
        if let Some(java) = var(ENV_JAVA) {
            builder = builder.java(java);
        }
        if let Some(dir) = var(ENV_LOG_DIR) {
            builder = builder.log_dir(dir);
        }
        if let Some(profile) = var(ENV_LOG_PROFILE) {
            builder = builder.log_profile(profile);
        }
        if let Some(realm) = var(ENV_AUTH_REALM) {
            builder = builder.auth_realm(realm);
        }

        let config = builder.build();
        debug!(
            "Harness configuration: router={:?}, capability={:?}, auth={:?}, timeout={}s",
            config.router_artifact,
            config.capability_artifact,
            config.auth_artifact,
            config.default_timeout.as_secs()
        );
        Ok(config)
    }

    /// Router artifact, only if it exists on disk
    pub fn existing_router_artifact(&self) -> Option<&Path> {
        existing(self.router_artifact.as_deref())
    }

    /// Capability artifact, only if it exists on disk
    pub fn existing_capability_artifact(&self) -> Option<&Path> {
        existing(self.capability_artifact.as_deref())
    }

    /// Auth provider artifact, only if it exists on disk
    pub fn existing_auth_artifact(&self) -> Option<&Path> {
        existing(self.auth_artifact.as_deref())
    }
}

fn existing(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| p.exists())
}

/// Seconds with every non-digit stripped (`"60s"` → 60)
fn parse_timeout(raw: &str) -> HarnessResult<Duration> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
        .filter(|timeout| *timeout <= MAX_TIMEOUT)
        .ok_or_else(|| HarnessError::config(ENV_TIMEOUT, raw))
}

/// Locate an artifact named `prefix*` in `dir`.
///
/// A fast-jar directory (`<prefix>*/quarkus-run.jar`) wins over a standalone
/// `<prefix>*.jar`. Entries are scanned in name order.
pub fn find_artifact(dir: &Path, prefix: &str) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(prefix))
                .unwrap_or(false)
        })
        .collect();
    entries.sort();

    let fast_jar = entries
        .iter()
        .filter(|path| path.is_dir())
        .map(|path| path.join(FAST_JAR_NAME))
        .find(|jar| jar.exists());
    if fast_jar.is_some() {
        return fast_jar;
    }

    entries
        .into_iter()
        .find(|path| path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("jar"))
}
