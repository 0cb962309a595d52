//! Suite-scoped resources: router, optional auth provider, temp data dir

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::teardown::{Teardown, TeardownReport};
use crate::clients::AuthClient;
use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use crate::profiles::{auth_spec, local_base_url, router_spec, RouterPorts};
use crate::runtime::{PortAllocator, ProcessHandle};
use shared::logging::log_phase;
use shared::{component_debug, component_error, component_info, component_warn, Component};

/// Resources shared by every test of a suite.
///
/// A suite whose router artifact is missing is *skipped*: nothing is
/// started and every availability predicate is false.
#[derive(Debug)]
pub struct SuiteScope {
    config: HarnessConfig,
    suite_name: String,
    allocator: PortAllocator,
    skipped: bool,
    data_dir: Option<TempDir>,
    router_ports: Option<RouterPorts>,
    router: Option<ProcessHandle>,
    auth: Option<ProcessHandle>,
    auth_client: Option<AuthClient>,
}

impl SuiteScope {
    pub async fn create(config: HarnessConfig, suite_name: &str) -> HarnessResult<Self> {
        Self::create_with_allocator(config, suite_name, PortAllocator::new()).await
    }

    pub async fn create_with_allocator(
        config: HarnessConfig,
        suite_name: &str,
        allocator: PortAllocator,
    ) -> HarnessResult<Self> {
        log_phase(&Component::Harness, &format!("Setting up suite {suite_name}"));

        let router_artifact = config.existing_router_artifact().map(Path::to_path_buf);
        let mut suite = Self {
            config,
            suite_name: suite_name.to_string(),
            allocator,
            skipped: router_artifact.is_none(),
            data_dir: None,
            router_ports: None,
            router: None,
            auth: None,
            auth_client: None,
        };

        let Some(router_artifact) = router_artifact else {
            component_warn!(
                Component::Harness,
                "⏭️ Router artifact not found ({:?}), suite {} is skipped",
                suite.config.router_artifact,
                suite_name
            );
            return Ok(suite);
        };

        let data_dir = tempfile::Builder::new().prefix("harness-").tempdir()?;
        component_debug!(Component::Harness, "Data directory: {}", data_dir.path().display());
        suite.data_dir = Some(data_dir);

        suite.start_auth().await;

        if let Err(e) = suite.start_router(&router_artifact).await {
            component_error!(Component::Harness, "❌ Suite {} setup failed: {}", suite_name, e);
            suite.destroy().await;
            return Err(e);
        }

        component_info!(Component::Harness, "✅ Suite {} ready", suite_name);
        Ok(suite)
    }

    /// Best effort: any failure leaves the suite without authentication
    async fn start_auth(&mut self) {
        let Some(artifact) = self.config.existing_auth_artifact().map(Path::to_path_buf) else {
            if let Some(path) = &self.config.auth_artifact {
                component_warn!(
                    Component::Auth,
                    "Auth artifact {} not found, continuing without authentication",
                    path.display()
                );
            }
            return;
        };

        let port = match self.allocator.allocate() {
            Ok(port) => port,
            Err(e) => {
                component_warn!(Component::Auth, "⚠️ {}, continuing without authentication", e);
                return;
            }
        };

        let mut handle = ProcessHandle::new(auth_spec(&self.config, &artifact, port, &self.suite_name));
        if let Err(e) = handle.start().await {
            component_warn!(Component::Auth, "⚠️ {}, continuing without authentication", e);
            return;
        }

        match AuthClient::new(local_base_url(port), self.config.auth.clone()) {
            Ok(client) => {
                self.auth = Some(handle);
                self.auth_client = Some(client);
            }
            Err(e) => {
                component_warn!(Component::Auth, "⚠️ {}, continuing without authentication", e);
                handle.stop().await;
            }
        }
    }

    async fn start_router(&mut self, artifact: &Path) -> HarnessResult<()> {
        let ports = RouterPorts::allocate(&self.allocator)?;
        self.router_ports = Some(ports);

        let data_dir = self
            .data_dir
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
            .unwrap_or_else(std::env::temp_dir);

        component_debug!(
            Component::Router,
            "Router prepared with HTTP port {} and gRPC port {}",
            ports.http,
            ports.grpc
        );
        let mut handle = ProcessHandle::new(router_spec(&self.config, artifact, ports, &data_dir, &self.suite_name));
        let result = handle.start().await;
        self.router = Some(handle);
        result
    }

    /// Stop the router, then the auth provider, then remove the data dir
    pub async fn destroy(self) -> TeardownReport {
        log_phase(&Component::Harness, &format!("Tearing down suite {}", self.suite_name));

        let SuiteScope {
            router, auth, data_dir, ..
        } = self;

        Teardown::new(Component::Harness)
            .action("stop router", async move {
                if let Some(mut router) = router {
                    router.stop().await;
                }
            })
            .action("stop auth provider", async move {
                if let Some(mut auth) = auth {
                    auth.stop().await;
                }
            })
            .step("remove data directory", async move {
                if let Some(dir) = data_dir {
                    dir.close()?;
                }
                Ok(())
            })
            .run()
            .await
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub fn is_router_available(&mut self) -> bool {
        self.router.as_mut().map(ProcessHandle::is_running).unwrap_or(false)
    }

    pub fn is_auth_available(&mut self) -> bool {
        self.auth_client.is_some() && self.auth.as_mut().map(ProcessHandle::is_running).unwrap_or(false)
    }

    /// A capability can be started for a test
    pub fn is_capability_available(&mut self) -> bool {
        self.is_router_available() && self.config.existing_capability_artifact().is_some()
    }

    /// An MCP client can be connected for a test
    pub fn is_mcp_available(&mut self) -> bool {
        self.is_router_available()
    }

    pub fn is_full_stack_available(&mut self) -> bool {
        self.is_capability_available() && self.is_mcp_available()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn suite_name(&self) -> &str {
        &self.suite_name
    }

    pub fn allocator(&self) -> &PortAllocator {
        &self.allocator
    }

    pub fn router_ports(&self) -> Option<RouterPorts> {
        self.router_ports
    }

    pub fn router_base_url(&self) -> Option<String> {
        self.router_ports.map(|ports| ports.base_url())
    }

    pub fn router(&self) -> Option<&ProcessHandle> {
        self.router.as_ref()
    }

    pub fn auth_client(&self) -> Option<&AuthClient> {
        self.auth_client.as_ref()
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_ref().map(TempDir::path)
    }

    pub fn router_log_file(&self) -> Option<PathBuf> {
        self.router
            .as_ref()
            .and_then(|router| router.log_file().map(Path::to_path_buf))
    }
}
