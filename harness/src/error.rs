//! Harness-specific error types

use std::path::PathBuf;
use thiserror::Error;

use crate::runtime::process::ProcessState;
use shared::SharedError;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Failed to allocate a port after {attempts} attempts")]
    Allocation { attempts: u32 },

    #[error("{name} failed to start: {reason}{}", log_hint(.log_file))]
    StartupFailure {
        name: String,
        reason: String,
        log_file: Option<PathBuf>,
    },

    #[error("Cannot {operation} {name} while {state}")]
    IllegalState {
        name: String,
        state: ProcessState,
        operation: String,
    },

    #[error("Client error: {message}")]
    Client { message: String },

    #[error("Configuration error: {field} = {value}")]
    Config { field: String, value: String },

    #[error("Shared component error")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn log_hint(log_file: &Option<PathBuf>) -> String {
    match log_file {
        Some(path) => format!(". Check logs: {}", path.display()),
        None => String::new(),
    }
}

impl HarnessError {
    pub fn client<S: Into<String>>(message: S) -> Self {
        HarnessError::Client { message: message.into() }
    }

    pub fn config<F: Into<String>, V: Into<String>>(field: F, value: V) -> Self {
        HarnessError::Config {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Log file recorded by a startup failure, if any
    pub fn log_file(&self) -> Option<&PathBuf> {
        match self {
            HarnessError::StartupFailure { log_file, .. } => log_file.as_ref(),
            _ => None,
        }
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_failure_mentions_log_file() {
        let err = HarnessError::StartupFailure {
            name: "router".to_string(),
            reason: "failed health check".to_string(),
            log_file: Some(PathBuf::from("target/logs/router/r.log")),
        };

        let message = err.to_string();
        assert!(message.contains("router failed to start"));
        assert!(message.contains("Check logs: target/logs/router/r.log"));
        assert_eq!(err.log_file(), Some(&PathBuf::from("target/logs/router/r.log")));
    }

    #[test]
    fn test_illegal_state_message() {
        let err = HarnessError::IllegalState {
            name: "router".to_string(),
            state: ProcessState::Running,
            operation: "start".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot start router while running");
    }
}
