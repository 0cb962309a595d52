//! Shared types for the process orchestration harness
//!
//! Contains the pieces every harness crate needs: component identity used as
//! a structured logging field, the tracing setup, and the shared error type.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
