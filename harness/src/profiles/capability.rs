//! Capability profile
//!
//! The capability serves gRPC only and registers itself with the router's
//! HTTP API. Readiness is a TCP accept on its gRPC port.

use std::path::Path;

use super::LOCALHOST;
use crate::clients::OidcCredentials;
use crate::config::HarnessConfig;
use crate::runtime::{LaunchSpec, Launcher, LogNaming, TcpHealthCheck};
use shared::Component;

/// Where the capability finds the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterCoordinates {
    pub host: String,
    pub http_port: u16,
    pub grpc_port: u16,
}

impl RouterCoordinates {
    pub fn local(http_port: u16, grpc_port: u16) -> Self {
        Self {
            host: LOCALHOST.to_string(),
            http_port,
            grpc_port,
        }
    }

    pub fn registration_uri(&self) -> String {
        format!("http://{}:{}", self.host, self.http_port)
    }
}

pub fn capability_spec(
    config: &HarnessConfig,
    artifact: &Path,
    grpc_port: u16,
    router: &RouterCoordinates,
    credentials: Option<&OidcCredentials>,
    log_naming: LogNaming,
) -> LaunchSpec {
    let mut builder = LaunchSpec::builder(Component::Capability.as_str(), artifact)
        .launcher(Launcher::for_artifact(artifact, &config.java))
        // gRPC only
        .property("quarkus.http.port", 0)
        .property("quarkus.grpc.server.port", grpc_port)
        .property("wanaku.service.registration.uri", router.registration_uri())
        .property("wanaku.router.host", &router.host)
        .property("wanaku.router.port", router.grpc_port);

    if let Some(credentials) = credentials {
        builder = builder
            .property("quarkus.oidc-client.auth-server-url", &credentials.auth_server_url)
            .property("quarkus.oidc-client.client-id", &credentials.client_id)
            .property("quarkus.oidc-client.credentials.secret", &credentials.client_secret);
    }

    builder
        .property("wanaku.service.registration.delay-seconds", 0)
        .args(config.capability_args.iter().cloned())
        .health_check(TcpHealthCheck::new(LOCALHOST, grpc_port))
        .log_naming(log_naming)
        .log_root(&config.log_dir)
        .startup_timeout(config.default_timeout)
        .grace_period(config.grace_period)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property<'a>(spec: &'a LaunchSpec, key: &str) -> Option<&'a str> {
        spec.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_capability_points_at_router() {
        let config = HarnessConfig::default();
        let router = RouterCoordinates::local(8080, 9190);
        let spec = capability_spec(
            &config,
            Path::new("/bin/capability"),
            9300,
            &router,
            None,
            LogNaming::flat("t"),
        );

        assert_eq!(spec.name, "http-capability");
        assert_eq!(property(&spec, "quarkus.http.port"), Some("0"));
        assert_eq!(property(&spec, "quarkus.grpc.server.port"), Some("9300"));
        assert_eq!(
            property(&spec, "wanaku.service.registration.uri"),
            Some("http://localhost:8080")
        );
        assert_eq!(property(&spec, "wanaku.router.port"), Some("9190"));
        assert_eq!(property(&spec, "wanaku.service.registration.delay-seconds"), Some("0"));
        assert_eq!(property(&spec, "quarkus.oidc-client.client-id"), None);
    }

    #[test]
    fn test_capability_with_credentials() {
        let credentials = OidcCredentials {
            auth_server_url: "http://localhost:8543/realms/wanaku".to_string(),
            client_id: "wanaku-service".to_string(),
            client_secret: "secret".to_string(),
        };
        let spec = capability_spec(
            &HarnessConfig::default(),
            Path::new("/bin/capability"),
            9300,
            &RouterCoordinates::local(8080, 9190),
            Some(&credentials),
            LogNaming::flat("t"),
        );

        assert_eq!(
            property(&spec, "quarkus.oidc-client.auth-server-url"),
            Some("http://localhost:8543/realms/wanaku")
        );
        assert_eq!(property(&spec, "quarkus.oidc-client.credentials.secret"), Some("secret"));

        let cmd = spec.command_line();
        assert_eq!(
            cmd.env.get("QUARKUS_OIDC_CLIENT_CLIENT_ID").map(String::as_str),
            Some("wanaku-service")
        );
    }
}
