//! Token client for the identity provider

use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::AuthSettings;
use crate::error::{HarnessError, HarnessResult};
use crate::profiles::realm_url;

const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client credentials a capability uses to authenticate to the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcCredentials {
    /// Realm URL, e.g. `http://localhost:8543/realms/wanaku`
    pub auth_server_url: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: String,
    settings: AuthSettings,
    client: reqwest::Client,
}

impl AuthClient {
    pub fn new<S: Into<String>>(base_url: S, settings: AuthSettings) -> HarnessResult<Self> {
        let client = reqwest::Client::builder().timeout(TOKEN_REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            settings,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn realm_url(&self) -> String {
        realm_url(&self.base_url, &self.settings.realm)
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/protocol/openid-connect/token", self.realm_url())
    }

    /// Access token for the configured test user
    pub async fn mcp_token(&self) -> HarnessResult<String> {
        self.token_for_user(&self.settings.username, &self.settings.password).await
    }

    /// Password grant against the MCP client
    pub async fn token_for_user(&self, username: &str, password: &str) -> HarnessResult<String> {
        let form = [
            ("grant_type", "password"),
            ("client_id", self.settings.mcp_client_id.as_str()),
            ("username", username),
            ("password", password),
            ("scope", self.settings.scope.as_str()),
        ];

        let response = self.client.post(self.token_endpoint()).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HarnessError::client(format!("Failed to get MCP token: {status} - {body}")));
        }

        let token: TokenResponse = response.json().await?;
        debug!("Obtained MCP token for user: {}", username);
        Ok(token.access_token)
    }

    pub fn service_credentials(&self) -> OidcCredentials {
        OidcCredentials {
            auth_server_url: self.realm_url(),
            client_id: self.settings.service_client_id.clone(),
            client_secret: self.settings.service_client_secret.clone(),
        }
    }
}
