//! Stand-in service for harness tests
//!
//! Plays one of the managed roles with just enough surface for the harness:
//! - `router`: readiness endpoints, the tool API and a JSON-RPC `/mcp/` endpoint
//! - `capability`: accepts TCP on its gRPC port and registers a tool
//! - `auth`: realm endpoint and a password-grant token endpoint
//!
//! Ports come from the same environment variables the profiles inject.

use anyhow::Context;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use clap::{Parser, ValueEnum};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use harness::clients::mcp::SESSION_HEADER;
use harness::clients::ToolRegistration;

const SESSION_ID: &str = "fake-session";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Role {
    Router,
    Capability,
    Auth,
}

#[derive(Parser, Debug)]
#[command(name = "fake-service")]
#[command(about = "Stand-in router / capability / auth process for harness tests")]
struct Args {
    role: Role,

    #[arg(long, env = "QUARKUS_HTTP_PORT")]
    http_port: Option<u16>,

    #[arg(long, env = "QUARKUS_GRPC_SERVER_PORT")]
    grpc_port: Option<u16>,

    #[arg(long, env = "KC_HTTP_PORT")]
    auth_port: Option<u16>,

    /// Router the capability registers with
    #[arg(long, env = "WANAKU_SERVICE_REGISTRATION_URI")]
    registration_uri: Option<String>,

    /// Keep running on SIGTERM so callers must escalate to SIGKILL
    #[arg(long, env = "FAKE_IGNORE_SIGTERM", value_parser = clap::builder::FalseyValueParser::new())]
    ignore_sigterm: bool,
}

/// In-memory tool registry of the fake router
#[derive(Clone, Default)]
struct RouterState {
    tools: Arc<Mutex<Vec<Value>>>,
}

impl RouterState {
    fn tools(&self) -> Vec<Value> {
        self.tools.lock().map(|tools| tools.clone()).unwrap_or_default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    shared::logging::init_tracing(None).context("failed to initialise tracing")?;

    if args.ignore_sigterm {
        ignore_sigterm()?;
    }

    tracing::info!("Starting fake {:?}", args.role);
    match args.role {
        Role::Router => {
            let port = args.http_port.context("QUARKUS_HTTP_PORT is required for the router role")?;
            serve_http(port, router_app()).await
        }
        Role::Capability => {
            let port = args
                .grpc_port
                .context("QUARKUS_GRPC_SERVER_PORT is required for the capability role")?;
            run_capability(port, args.registration_uri).await
        }
        Role::Auth => {
            let port = args.auth_port.context("KC_HTTP_PORT is required for the auth role")?;
            serve_http(port, auth_app()).await
        }
    }
}

#[cfg(unix)]
fn ignore_sigterm() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terms = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        while terms.recv().await.is_some() {
            tracing::warn!("Ignoring SIGTERM");
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn ignore_sigterm() -> anyhow::Result<()> {
    Ok(())
}

async fn serve_http(port: u16, app: Router) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn router_app() -> Router {
    Router::new()
        .route("/health", get(ok))
        .route("/q/health/ready", get(ok))
        .route("/api/v1/tools/list", get(list_tools))
        .route("/api/v1/tools/add", post(add_tool))
        .route("/api/v1/tools/remove", put(remove_tool))
        .route("/api/v1/tools", axum::routing::delete(remove_by_label))
        .route("/mcp/", post(mcp_message).delete(ok))
        .with_state(RouterState::default())
}

fn auth_app() -> Router {
    Router::new()
        .route("/realms/:realm", get(realm))
        .route("/realms/:realm/protocol/openid-connect/token", post(token))
}

async fn ok() -> &'static str {
    "OK"
}

async fn list_tools(State(state): State<RouterState>) -> Json<Value> {
    Json(json!({ "data": state.tools() }))
}

async fn add_tool(State(state): State<RouterState>, Json(tool): Json<Value>) -> Response {
    let Some(name) = tool.get("name").and_then(Value::as_str).map(str::to_string) else {
        return (StatusCode::BAD_REQUEST, "missing name").into_response();
    };
    let Ok(mut tools) = state.tools.lock() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    if tools.iter().any(|t| t.get("name").and_then(Value::as_str) == Some(name.as_str())) {
        return StatusCode::CONFLICT.into_response();
    }
    tools.push(tool.clone());
    (StatusCode::CREATED, Json(json!({ "data": tool }))).into_response()
}

async fn remove_tool(State(state): State<RouterState>, Query(query): Query<HashMap<String, String>>) -> StatusCode {
    let Some(name) = query.get("tool") else {
        return StatusCode::BAD_REQUEST;
    };
    let Ok(mut tools) = state.tools.lock() else {
        return StatusCode::INTERNAL_SERVER_ERROR;
    };
    let before = tools.len();
    tools.retain(|t| t.get("name").and_then(Value::as_str) != Some(name.as_str()));
    if tools.len() < before {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

/// `labelExpression=key=value`
async fn remove_by_label(State(state): State<RouterState>, Query(query): Query<HashMap<String, String>>) -> StatusCode {
    let Some((key, value)) = query.get("labelExpression").and_then(|expr| expr.split_once('=')) else {
        return StatusCode::BAD_REQUEST;
    };
    let Ok(mut tools) = state.tools.lock() else {
        return StatusCode::INTERNAL_SERVER_ERROR;
    };
    tools.retain(|t| t.pointer(&format!("/labels/{key}")).and_then(Value::as_str) != Some(value));
    StatusCode::OK
}

async fn mcp_message(State(state): State<RouterState>, Json(message): Json<Value>) -> Response {
    let Some(id) = message.get("id").cloned() else {
        return StatusCode::ACCEPTED.into_response();
    };

    let method = message.get("method").and_then(Value::as_str).unwrap_or_default();
    let body = match method {
        "initialize" => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "protocolVersion": harness::clients::mcp::PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "fake-router", "version": env!("CARGO_PKG_VERSION")},
            },
        }),
        "tools/list" => json!({"jsonrpc": "2.0", "id": id, "result": {"tools": state.tools()}}),
        other => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32601, "message": format!("Method not found: {other}")},
        }),
    };

    ([(SESSION_HEADER, SESSION_ID)], Json(body)).into_response()
}

async fn realm(Path(realm): Path<String>) -> Json<Value> {
    Json(json!({ "realm": realm }))
}

async fn token(Path(_realm): Path<String>) -> Json<Value> {
    Json(json!({
        "access_token": "fake-token",
        "token_type": "Bearer",
        "expires_in": 300,
    }))
}

async fn run_capability(port: u16, registration_uri: Option<String>) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Accepting connections on {}", addr);

    if let Some(uri) = registration_uri {
        tokio::spawn(register_tool(uri));
    }

    loop {
        let (socket, peer) = listener.accept().await?;
        tracing::debug!("Connection from {}", peer);
        drop(socket);
    }
}

async fn register_tool(router_uri: String) {
    let tool = ToolRegistration::http("fake-capability-tool", "http://localhost/fake")
        .with_description("Registered by the fake capability");
    let url = format!("{}/api/v1/tools/add", router_uri.trim_end_matches('/'));

    match reqwest::Client::new().post(&url).json(&tool).send().await {
        Ok(response) => tracing::info!("Registered tool with router: {}", response.status()),
        Err(e) => tracing::warn!("Tool registration failed: {}", e),
    }
}
