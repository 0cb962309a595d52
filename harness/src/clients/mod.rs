//! HTTP clients for the managed services

pub mod auth;
pub mod mcp;
pub mod router;

pub use auth::{AuthClient, OidcCredentials};
pub use mcp::McpClient;
pub use router::{RouterClient, ToolInfo, ToolRegistration};
