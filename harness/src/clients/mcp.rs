//! Minimal MCP client over streamable HTTP (`/mcp/`)
//!
//! Speaks opaque JSON-RPC: callers pass a method and params and get the raw
//! `result` value back.

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::config::MCP_PATH;
use crate::error::{HarnessError, HarnessResult};

pub const SESSION_HEADER: &str = "Mcp-Session-Id";
pub const PROTOCOL_VERSION: &str = "2025-03-26";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct McpClient {
    endpoint: String,
    client: reqwest::Client,
    access_token: Option<String>,
    session_id: Option<String>,
    connected: bool,
    next_id: AtomicU64,
}

impl McpClient {
    pub fn new(base_url: &str, access_token: Option<String>) -> HarnessResult<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), MCP_PATH),
            client,
            access_token,
            session_id: None,
            connected: false,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Run the initialize handshake and keep the session id
    pub async fn connect(&mut self) -> HarnessResult<Value> {
        debug!("Connecting MCP client to {}", self.endpoint);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let message = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "initialize",
            "params": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "harness", "version": env!("CARGO_PKG_VERSION")},
            },
        });

        let response = self.post(&message).send().await?;
        self.session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let handshake = match read_result(response).await {
            Ok(result) => self
                .send_notification("notifications/initialized", json!({}))
                .await
                .map(|_| result),
            Err(e) => Err(e),
        };

        match handshake {
            Ok(result) => {
                self.connected = true;
                debug!("MCP client connected, session: {:?}", self.session_id);
                Ok(result)
            }
            Err(e) => {
                // the server may already hold a session for us
                if let Err(close) = self.end_session().await {
                    debug!("MCP session cleanup after failed connect: {}", close);
                }
                Err(e)
            }
        }
    }

    /// Send a JSON-RPC request and return its `result`
    pub async fn request(&self, method: &str, params: Value) -> HarnessResult<Value> {
        self.ensure_connected()?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let message = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        let response = self.post(&message).send().await?;
        read_result(response).await
    }

    /// Send a JSON-RPC notification (no response expected)
    pub async fn notify(&self, method: &str, params: Value) -> HarnessResult<()> {
        self.ensure_connected()?;
        self.send_notification(method, params).await
    }

    async fn send_notification(&self, method: &str, params: Value) -> HarnessResult<()> {
        let message = json!({"jsonrpc": "2.0", "method": method, "params": params});
        let response = self.post(&message).send().await?;
        if !response.status().is_success() {
            return Err(HarnessError::client(format!(
                "MCP notification {method} rejected: {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// End the session. Safe to call when not connected.
    pub async fn disconnect(&mut self) -> HarnessResult<()> {
        if !std::mem::take(&mut self.connected) {
            return Ok(());
        }
        self.end_session().await
    }

    async fn end_session(&mut self) -> HarnessResult<()> {
        self.connected = false;
        let Some(session_id) = self.session_id.take() else {
            return Ok(());
        };

        let response = self
            .authorized(self.client.delete(&self.endpoint))
            .header(SESSION_HEADER, session_id)
            .send()
            .await?;
        debug!("MCP session closed: {}", response.status());
        Ok(())
    }

    fn ensure_connected(&self) -> HarnessResult<()> {
        if !self.connected {
            return Err(HarnessError::client("MCP client is not connected"));
        }
        Ok(())
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn post(&self, message: &Value) -> RequestBuilder {
        let mut builder = self
            .authorized(self.client.post(&self.endpoint))
            .header(ACCEPT, HeaderValue::from_static("application/json, text/event-stream"))
            .json(message);
        if let Some(session_id) = self.session_id.as_deref() {
            builder = builder.header(SESSION_HEADER, session_id);
        }
        builder
    }
}

async fn read_result(response: Response) -> HarnessResult<Value> {
    let status = response.status();
    let is_event_stream = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("text/event-stream"))
        .unwrap_or(false);
    let body = response.text().await?;

    if !status.is_success() {
        return Err(HarnessError::client(format!("MCP request failed: {status} - {body}")));
    }

    let message = parse_message(&body, is_event_stream)?;
    if let Some(error) = message.get("error") {
        return Err(HarnessError::client(format!("MCP error: {error}")));
    }
    Ok(message.get("result").cloned().unwrap_or(Value::Null))
}

/// Decode a JSON-RPC message from a plain JSON body or the last `data:` event
fn parse_message(body: &str, is_event_stream: bool) -> HarnessResult<Value> {
    if !is_event_stream {
        return Ok(serde_json::from_str(body)?);
    }

    let data = body
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|data| !data.is_empty())
        .last()
        .ok_or_else(|| HarnessError::client("MCP event stream carried no data"))?;
    Ok(serde_json::from_str(data)?)
}
