//! Router profile

use std::path::Path;

use super::local_base_url;
use crate::config::{HarnessConfig, ROUTER_HEALTH_PATH};
use crate::error::HarnessResult;
use crate::runtime::{HttpHealthCheck, LaunchSpec, Launcher, LogNaming, PortAllocator};
use shared::Component;

/// Log file prefix for suite-scoped router logs
const LOG_PREFIX: &str = "wanaku";

/// Ports the router listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterPorts {
    pub http: u16,
    pub grpc: u16,
}

impl RouterPorts {
    /// Allocate two distinct ports
    pub fn allocate(allocator: &PortAllocator) -> HarnessResult<Self> {
        let ports = allocator.allocate_many(2)?;
        Ok(Self {
            http: ports[0],
            grpc: ports[1],
        })
    }

    pub fn base_url(&self) -> String {
        local_base_url(self.http)
    }

    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url(), ROUTER_HEALTH_PATH)
    }
}

/// Launch spec for the router, logging per suite under `router/`
pub fn router_spec(
    config: &HarnessConfig,
    artifact: &Path,
    ports: RouterPorts,
    data_dir: &Path,
    suite: &str,
) -> LaunchSpec {
    LaunchSpec::builder(Component::Router.as_str(), artifact)
        .launcher(Launcher::for_artifact(artifact, &config.java))
        .property("quarkus.http.port", ports.http)
        .property("quarkus.grpc.server.port", ports.grpc)
        .property("wanaku.data.dir", data_dir.display())
        .args(config.router_args.iter().cloned())
        .health_check(HttpHealthCheck::new(ports.health_url()))
        .log_naming(LogNaming::Component {
            prefix: Some(LOG_PREFIX.to_string()),
            suite: suite.to_string(),
        })
        .log_root(&config.log_dir)
        .startup_timeout(config.default_timeout)
        .grace_period(config.grace_period)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_router_spec_on_jvm() {
        let config = HarnessConfig::builder().java("/jdk/bin/java").log_dir("/logs").build();
        let ports = RouterPorts { http: 8080, grpc: 9190 };
        let spec = router_spec(
            &config,
            Path::new("/artifacts/wanaku-router/quarkus-run.jar"),
            ports,
            Path::new("/tmp/harness-x"),
            "CliSuite",
        );

        assert_eq!(spec.name, "router");
        let cmd = spec.command_line();
        assert_eq!(cmd.program, PathBuf::from("/jdk/bin/java"));
        assert!(cmd.args.contains(&"-Dquarkus.http.port=8080".to_string()));
        assert!(cmd.args.contains(&"-Dquarkus.grpc.server.port=9190".to_string()));
        assert!(cmd.args.contains(&"-Dwanaku.data.dir=/tmp/harness-x".to_string()));
        assert_eq!(cmd.working_dir, Some(PathBuf::from("/artifacts/wanaku-router")));
        assert_eq!(spec.log_root, PathBuf::from("/logs"));
        assert_eq!(ports.health_url(), "http://localhost:8080/q/health/ready");
    }

    #[test]
    fn test_router_spec_direct_uses_env() {
        let config = HarnessConfig::builder().router_args(["router"]).build();
        let ports = RouterPorts { http: 1234, grpc: 5678 };
        let spec = router_spec(&config, Path::new("/bin/router"), ports, Path::new("/data"), "s");

        let cmd = spec.command_line();
        assert_eq!(cmd.args, vec!["router"]);
        assert_eq!(cmd.env.get("QUARKUS_HTTP_PORT").map(String::as_str), Some("1234"));
        assert_eq!(cmd.env.get("QUARKUS_GRPC_SERVER_PORT").map(String::as_str), Some("5678"));
        assert_eq!(cmd.env.get("WANAKU_DATA_DIR").map(String::as_str), Some("/data"));
    }

    #[test]
    fn test_allocated_router_ports_differ() {
        let ports = RouterPorts::allocate(&PortAllocator::new()).unwrap();
        assert_ne!(ports.http, ports.grpc);
    }
}
