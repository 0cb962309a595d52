//! Shared error types for the harness crates

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Unknown component: {name}")]
    UnknownComponent { name: String },

    #[error("Invalid log filter: {filter}")]
    InvalidLogFilter { filter: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
