//! Identity provider profile

use std::path::Path;

use super::local_base_url;
use crate::config::HarnessConfig;
use crate::runtime::{HttpHealthCheck, LaunchSpec, Launcher, LogNaming};
use shared::Component;

/// `<base>/realms/<realm>`
pub fn realm_url(base_url: &str, realm: &str) -> String {
    format!("{}/realms/{}", base_url.trim_end_matches('/'), realm)
}

/// Launch spec for the auth provider; ready once its realm answers
pub fn auth_spec(config: &HarnessConfig, artifact: &Path, http_port: u16, suite: &str) -> LaunchSpec {
    let health_url = realm_url(&local_base_url(http_port), &config.auth.realm);

    LaunchSpec::builder(Component::Auth.as_str(), artifact)
        .launcher(Launcher::for_artifact(artifact, &config.java))
        .property("kc.http.port", http_port)
        .args(config.auth_args.iter().cloned())
        .health_check(HttpHealthCheck::new(health_url))
        .log_naming(LogNaming::component(suite))
        .log_root(&config.log_dir)
        .startup_timeout(config.default_timeout)
        .grace_period(config.grace_period)
        .build()
}
