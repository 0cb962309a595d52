//! REST client for the router's tool API
//!
//! - `POST /api/v1/tools/add` register a tool
//! - `GET /api/v1/tools/list` list tools
//! - `PUT /api/v1/tools/remove?tool={name}` remove a tool
//! - `DELETE /api/v1/tools?labelExpression={expr}` remove tools by label

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ROUTER_TOOLS_PATH;
use crate::error::{HarnessError, HarnessResult};

/// Label every harness-registered tool carries
pub const TEST_LABEL_EXPRESSION: &str = "test=true";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub tool_type: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

/// Body of `POST /api/v1/tools/add`
#[derive(Debug, Clone, Serialize)]
pub struct ToolRegistration {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub tool_type: String,
    pub uri: String,
    #[serde(rename = "inputSchema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    pub labels: BTreeMap<String, String>,
}

impl ToolRegistration {
    /// HTTP tool labelled `test=true` so teardown can find it
    pub fn http<N: Into<String>, U: Into<String>>(name: N, uri: U) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("test".to_string(), "true".to_string());

        Self {
            name: name.into(),
            description: String::new(),
            tool_type: "http".to_string(),
            uri: uri.into(),
            input_schema: None,
            labels,
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }
}

/// Unwrap the router's `{"data": …}` envelope; bare bodies pass through
fn unwrap_data(root: Value) -> Value {
    match root {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct RouterClient {
    base_url: String,
    client: reqwest::Client,
    access_token: Option<String>,
}

impl RouterClient {
    pub fn new<S: Into<String>>(base_url: S) -> HarnessResult<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            access_token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request (fluent API)
    pub fn with_access_token<S: Into<String>>(mut self, token: S) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn register_tool(&self, tool: &ToolRegistration) -> HarnessResult<ToolInfo> {
        debug!("Registering tool: {}", tool.name);

        let response = self
            .request(Method::POST, &format!("{ROUTER_TOOLS_PATH}/add"))
            .json(tool)
            .send()
            .await?;
        let status = response.status();

        match status {
            StatusCode::OK | StatusCode::CREATED => {
                let body: Value = response.json().await?;
                Ok(serde_json::from_value(unwrap_data(body))?)
            }
            StatusCode::CONFLICT => Err(HarnessError::client(format!("Tool '{}' already exists", tool.name))),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(HarnessError::client(format!("Failed to register tool: {status} - {body}")))
            }
        }
    }

    pub async fn list_tools(&self) -> HarnessResult<Vec<ToolInfo>> {
        let response = self
            .request(Method::GET, &format!("{ROUTER_TOOLS_PATH}/list"))
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(HarnessError::client(format!("Failed to list tools: {status}")));
        }

        match unwrap_data(response.json().await?) {
            data @ Value::Array(_) => Ok(serde_json::from_value(data)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Remove a tool by name. `Ok(false)` when the router does not know it.
    pub async fn remove_tool(&self, name: &str) -> HarnessResult<bool> {
        debug!("Removing tool: {}", name);

        let response = self
            .request(Method::PUT, &format!("{ROUTER_TOOLS_PATH}/remove"))
            .query(&[("tool", name)])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND => {
                debug!("Tool not found: {}", name);
                Ok(false)
            }
            status => Err(HarnessError::client(format!("Failed to remove tool: {status}"))),
        }
    }

    pub async fn tool_exists(&self, name: &str) -> HarnessResult<bool> {
        Ok(self.list_tools().await?.iter().any(|tool| tool.name == name))
    }

    /// Remove tools labelled `test=true`, then whatever is left one by one.
    ///
    /// Individual removal failures are logged and skipped.
    pub async fn clear_all_tools(&self) -> HarnessResult<()> {
        debug!("Clearing all tools");

        let response = self
            .request(Method::DELETE, ROUTER_TOOLS_PATH)
            .query(&[("labelExpression", TEST_LABEL_EXPRESSION)])
            .send()
            .await?;
        debug!("Clear by label response: {}", response.status());

        for tool in self.list_tools().await? {
            if let Err(e) = self.remove_tool(&tool.name).await {
                warn!("Failed to remove tool {}: {}", tool.name, e);
            }
        }

        debug!("All tools cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_data_envelope() {
        let wrapped = json!({"data": [{"name": "weather"}], "error": null});
        let tools: Vec<ToolInfo> = serde_json::from_value(unwrap_data(wrapped)).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "weather");
        assert_eq!(tools[0].tool_type, None);

        let bare = json!({"name": "x", "type": "http"});
        let tool: ToolInfo = serde_json::from_value(unwrap_data(bare)).unwrap();
        assert_eq!(tool.tool_type.as_deref(), Some("http"));
    }

    #[test]
    fn test_registration_is_labelled() {
        let body = serde_json::to_value(ToolRegistration::http("weather", "https://example.com/{city}")).unwrap();
        assert_eq!(body["type"], "http");
        assert_eq!(body["labels"]["test"], "true");
        assert!(body.get("inputSchema").is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = RouterClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
