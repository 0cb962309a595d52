//! Launch profiles for the managed components
//!
//! Each profile turns harness configuration plus runtime coordinates (ports,
//! directories, credentials) into a [`LaunchSpec`](crate::runtime::LaunchSpec).

pub mod auth;
pub mod capability;
pub mod router;

pub use auth::{auth_spec, realm_url};
pub use capability::{capability_spec, RouterCoordinates};
pub use router::{router_spec, RouterPorts};

/// Host every managed process is reached on
pub const LOCALHOST: &str = "localhost";

/// `http://localhost:<port>`
pub fn local_base_url(port: u16) -> String {
    format!("http://{LOCALHOST}:{port}")
}
