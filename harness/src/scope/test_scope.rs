//! Test-scoped resources: capability process and clients
//!
//! A [`TestScope`] mutably borrows its [`SuiteScope`], so tests against one
//! suite run one at a time and the suite cannot be destroyed while a test
//! scope is alive.

use std::path::Path;

use super::context::TestContext;
use super::suite::SuiteScope;
use super::teardown::{Teardown, TeardownReport};
use crate::clients::{AuthClient, McpClient, RouterClient};
use crate::error::{HarnessError, HarnessResult};
use crate::profiles::{capability_spec, RouterCoordinates};
use crate::runtime::{ProcessHandle, ProcessState};
use shared::logging::log_phase;
use shared::{component_debug, component_error, component_warn, Component};

pub struct TestScope<'a> {
    suite: &'a mut SuiteScope,
    context: TestContext,
    router_client: Option<RouterClient>,
    mcp_client: Option<McpClient>,
    capability: Option<ProcessHandle>,
}

impl<'a> TestScope<'a> {
    /// Set up per-test resources against a running suite.
    ///
    /// A skipped suite yields an empty scope. A suite whose router is not
    /// running is an `IllegalState` error.
    pub async fn create(suite: &'a mut SuiteScope, context: TestContext) -> HarnessResult<TestScope<'a>> {
        if suite.is_skipped() {
            component_debug!(Component::Harness, "Suite skipped, empty scope for {}", context.display_name);
            return Ok(Self::empty(suite, context));
        }

        if !suite.is_router_available() {
            return Err(HarnessError::IllegalState {
                name: Component::Router.to_string(),
                state: suite.router().map(ProcessHandle::state).unwrap_or(ProcessState::Stopped),
                operation: "create a test scope against".to_string(),
            });
        }

        log_phase(&Component::Harness, &format!("Setting up test {}", context.display_name));

        let base_url = suite
            .router_base_url()
            .ok_or_else(|| HarnessError::client("router has no base URL"))?;

        let auth_available = suite.is_auth_available();
        let token = match suite.auth_client() {
            Some(auth) if auth_available => match auth.mcp_token().await {
                Ok(token) => Some(token),
                Err(e) => {
                    component_warn!(Component::Auth, "⚠️ Could not obtain MCP token: {}", e);
                    None
                }
            },
            _ => None,
        };

        let mut router_client = RouterClient::new(&base_url)?;
        router_client.set_access_token(token.clone());

        let mut scope = Self::empty(suite, context);
        scope.router_client = Some(router_client);
        scope.connect_mcp(&base_url, token).await;

        if let Err(e) = scope.start_capability().await {
            component_error!(
                Component::Capability,
                "❌ Test {} setup failed: {}",
                scope.context.display_name,
                e
            );
            scope.destroy().await;
            return Err(e);
        }

        Ok(scope)
    }

    fn empty(suite: &'a mut SuiteScope, context: TestContext) -> Self {
        Self {
            suite,
            context,
            router_client: None,
            mcp_client: None,
            capability: None,
        }
    }

    /// Best effort: the test runs without MCP when this fails
    async fn connect_mcp(&mut self, base_url: &str, token: Option<String>) {
        let mut client = match McpClient::new(base_url, token) {
            Ok(client) => client,
            Err(e) => {
                component_warn!(Component::Harness, "⚠️ MCP client unavailable: {}", e);
                return;
            }
        };

        match client.connect().await {
            Ok(_) => self.mcp_client = Some(client),
            Err(e) => component_warn!(Component::Harness, "⚠️ MCP client failed to connect: {}", e),
        }
    }

    async fn start_capability(&mut self) -> HarnessResult<()> {
        let Some(artifact) = self
            .suite
            .config()
            .existing_capability_artifact()
            .map(Path::to_path_buf)
        else {
            component_debug!(Component::Capability, "No capability artifact, not starting one");
            return Ok(());
        };

        let ports = self
            .suite
            .router_ports()
            .ok_or_else(|| HarnessError::client("router ports not allocated"))?;
        let grpc_port = self.suite.allocator().allocate()?;

        let credentials = if self.suite.is_auth_available() {
            self.suite.auth_client().map(AuthClient::service_credentials)
        } else {
            None
        };

        let config = self.suite.config();
        let spec = capability_spec(
            config,
            &artifact,
            grpc_port,
            &RouterCoordinates::local(ports.http, ports.grpc),
            credentials.as_ref(),
            self.context.log_naming(&config.log_profile),
        );
        let settle = config.capability_settle;

        let mut handle = ProcessHandle::new(spec);
        let result = handle.start().await;
        self.capability = Some(handle);
        result?;

        // give the capability time to register with the router
        tokio::time::sleep(settle).await;
        Ok(())
    }

    /// Stop the capability, disconnect MCP, clear router state
    pub async fn destroy(self) -> TeardownReport {
        log_phase(&Component::Harness, &format!("Tearing down test {}", self.context.display_name));

        let TestScope {
            router_client,
            mcp_client,
            capability,
            ..
        } = self;

        Teardown::new(Component::Harness)
            .action("stop capability", async move {
                if let Some(mut capability) = capability {
                    capability.stop().await;
                }
            })
            .step("disconnect MCP client", async move {
                match mcp_client {
                    Some(mut client) => client.disconnect().await,
                    None => Ok(()),
                }
            })
            .step("clear router state", async move {
                match router_client {
                    Some(client) => client.clear_all_tools().await,
                    None => Ok(()),
                }
            })
            .run()
            .await
    }

    pub fn context(&self) -> &TestContext {
        &self.context
    }

    pub fn suite(&self) -> &SuiteScope {
        &*self.suite
    }

    pub fn router_client(&self) -> Option<&RouterClient> {
        self.router_client.as_ref()
    }

    pub fn mcp_client(&self) -> Option<&McpClient> {
        self.mcp_client.as_ref()
    }

    pub fn mcp_client_mut(&mut self) -> Option<&mut McpClient> {
        self.mcp_client.as_mut()
    }

    pub fn capability(&self) -> Option<&ProcessHandle> {
        self.capability.as_ref()
    }

    pub fn is_router_available(&mut self) -> bool {
        self.suite.is_router_available()
    }

    pub fn is_auth_available(&mut self) -> bool {
        self.suite.is_auth_available()
    }

    pub fn is_capability_available(&mut self) -> bool {
        self.capability.as_mut().map(ProcessHandle::is_running).unwrap_or(false)
    }

    pub fn is_mcp_available(&self) -> bool {
        self.mcp_client.as_ref().map(McpClient::is_connected).unwrap_or(false)
    }

    pub fn is_full_stack_available(&mut self) -> bool {
        self.is_router_available() && self.is_capability_available() && self.is_mcp_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;

    #[tokio::test]
    async fn test_skipped_suite_gives_empty_scope() {
        let config = HarnessConfig::builder()
            .router_artifact("/definitely/not/here/router.jar")
            .build();
        let mut suite = SuiteScope::create(config, "SkippedSuite").await.unwrap();

        let mut scope = TestScope::create(&mut suite, TestContext::new("SkippedSuite", "noop"))
            .await
            .unwrap();
        assert!(scope.router_client().is_none());
        assert!(!scope.is_capability_available());
        assert!(!scope.is_mcp_available());
        assert!(!scope.is_full_stack_available());
        assert!(scope.destroy().await.is_clean());

        assert!(suite.destroy().await.is_clean());
    }
}
