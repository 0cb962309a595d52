//! Harness Configuration Builder

use super::{AuthSettings, HarnessConfig};
use std::path::PathBuf;
use std::time::Duration;

pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: HarnessConfig::default(),
        }
    }

    /// Set the directory artifacts are discovered in
    pub fn artifacts_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.artifacts_dir = dir.into();
        self
    }

    pub fn router_artifact<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.router_artifact = Some(path.into());
        self
    }

    pub fn capability_artifact<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.capability_artifact = Some(path.into());
        self
    }

    pub fn auth_artifact<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.auth_artifact = Some(path.into());
        self
    }

    pub fn cli_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.cli_path = Some(path.into());
        self
    }

    /// Set the java binary used for `.jar` artifacts
    pub fn java<P: Into<PathBuf>>(mut self, java: P) -> Self {
        self.config.java = java.into();
        self
    }

    /// Set the startup timeout for every managed process
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    /// Set how long a stopping process may take before it is killed
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.config.grace_period = grace;
        self
    }

    pub fn capability_settle(mut self, settle: Duration) -> Self {
        self.config.capability_settle = settle;
        self
    }

    pub fn log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    pub fn log_profile<S: Into<String>>(mut self, profile: S) -> Self {
        self.config.log_profile = profile.into();
        self
    }

    /// Set extra arguments passed to the router after its launch flags
    pub fn router_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.router_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn capability_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.capability_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn auth_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.auth_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn auth_realm<S: Into<String>>(mut self, realm: S) -> Self {
        self.config.auth.realm = realm.into();
        self
    }

    pub fn auth_settings(mut self, auth: AuthSettings) -> Self {
        self.config.auth = auth;
        self
    }

    /// Build the configuration
    pub fn build(self) -> HarnessConfig {
        self.config
    }
}

impl Default for HarnessConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = HarnessConfigBuilder::new()
            .router_artifact("/opt/router")
            .grace_period(Duration::from_millis(500))
            .capability_settle(Duration::ZERO)
            .router_args(["router"])
            .auth_args(Vec::<String>::new())
            .auth_realm("test")
            .build();

        assert_eq!(config.router_artifact, Some(PathBuf::from("/opt/router")));
        assert_eq!(config.grace_period, Duration::from_millis(500));
        assert_eq!(config.capability_settle, Duration::ZERO);
        assert_eq!(config.router_args, vec!["router"]);
        assert!(config.auth_args.is_empty());
        assert_eq!(config.auth.realm, "test");
        assert_eq!(config.auth.mcp_client_id, "mcp-client");
    }
}
