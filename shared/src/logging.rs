//! Shared logging utilities for consistent tracing across the harness

use crate::errors::{SharedError, SharedResult};
use crate::types::Component;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Build the default filter directive for a base level
pub fn default_filter(base_level: &str) -> String {
    format!("harness={base_level},fake_service={base_level},shared={base_level},reqwest=warn,hyper=warn")
}

/// Resolve the filter: `RUST_LOG` wins when set, otherwise the default directive
fn build_filter(log_level: Option<&str>) -> SharedResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directive = default_filter(log_level.unwrap_or("info"));
    EnvFilter::try_new(&directive).map_err(|_| SharedError::InvalidLogFilter { filter: directive })
}

/// Initialize the stdout tracing subscriber with an optional base level
pub fn init_tracing(log_level: Option<&str>) -> SharedResult<()> {
    use tracing_subscriber::fmt;

    let filter = build_filter(log_level)?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

/// Initialize tracing for tests; safe to call from every test
pub fn init_test_tracing() {
    use tracing_subscriber::fmt;

    let filter = build_filter(Some("debug")).unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for component-aware info logging
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware warning logging
#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware error logging
#[macro_export]
macro_rules! component_error {
    ($component:expr, $($arg:tt)*) => {
        tracing::error!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware debug logging
#[macro_export]
macro_rules! component_debug {
    ($component:expr, $($arg:tt)*) => {
        tracing::debug!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for scope banners ("=== Setting up ... ===")
pub fn log_phase(component: &Component, phase: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "=== {} ===",
        phase
    );
}

/// Contextual logging helper for swallowed teardown failures
pub fn log_suppressed(component: &Component, step: &str, error: &dyn std::fmt::Display) {
    warn!(
        component = %component,
        timestamp = format_timestamp(),
        error = %error,
        "⚠️ {} failed (suppressed): {}",
        step,
        error
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_harness_crates() {
        let filter = default_filter("debug");
        assert!(filter.contains("harness=debug"));
        assert!(filter.contains("shared=debug"));
        assert!(filter.contains("reqwest=warn"));
    }

    #[test]
    fn test_timestamp_format() {
        let ts = format_timestamp();
        // HH:MM:SS.mmm
        assert_eq!(ts.len(), 12);
        assert_eq!(&ts[2..3], ":");
        assert_eq!(&ts[8..9], ".");
    }

    #[test]
    fn test_init_test_tracing_is_repeatable() {
        init_test_tracing();
        init_test_tracing();
    }
}
