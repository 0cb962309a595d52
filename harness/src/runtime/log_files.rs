//! Process output log files
//!
//! Layout under the log root:
//!
//! ```text
//! target/logs/
//! ├── router/
//! │   └── wanaku-router-HttpToolCliSuite-2026-02-04_15-35-09.log
//! ├── http-capability/
//! │   └── HttpToolCliSuite/
//! │       └── should_register_tool-2026-02-04_15-35-12.log
//! └── adhoc_test-http-capability-2026-02-04_15-36-01.log
//! ```

use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// How a process's log file is named
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogNaming {
    /// Suite-scoped component: `<root>/<component>/<prefix>-<component>-<suite>-<ts>.log`
    Component { prefix: Option<String>, suite: String },
    /// Test-scoped with full context: `<root>/<profile>/<test_class>/<test_method>-<ts>.log`
    Hierarchical {
        profile: String,
        test_class: String,
        test_method: String,
    },
    /// Fallback when no hierarchical context exists: `<root>/<test_name>-<component>-<ts>.log`
    Flat { test_name: String },
}

impl LogNaming {
    pub fn component<S: Into<String>>(suite: S) -> Self {
        LogNaming::Component {
            prefix: None,
            suite: suite.into(),
        }
    }

    pub fn flat<S: Into<String>>(test_name: S) -> Self {
        LogNaming::Flat {
            test_name: test_name.into(),
        }
    }

    /// Compute the log path for `component` at time `now`
    pub fn resolve(&self, root: &Path, component: &str, now: DateTime<Local>) -> PathBuf {
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();

        match self {
            LogNaming::Component { prefix, suite } => {
                let stem = match prefix {
                    Some(prefix) => format!("{}-{}", sanitize_filename(prefix), sanitize_filename(component)),
                    None => sanitize_filename(component),
                };
                root.join(sanitize_filename(component))
                    .join(format!("{}-{}-{}.log", stem, sanitize_filename(suite), timestamp))
            }
            LogNaming::Hierarchical {
                profile,
                test_class,
                test_method,
            } => root
                .join(sanitize_filename(profile))
                .join(sanitize_filename(test_class))
                .join(format!("{}-{}.log", sanitize_filename(test_method), timestamp)),
            LogNaming::Flat { test_name } => root.join(format!(
                "{}-{}-{}.log",
                sanitize_filename(test_name),
                sanitize_filename(component),
                timestamp
            )),
        }
    }

    /// Resolve the path and create the file (and its directories)
    pub fn create(&self, root: &Path, component: &str) -> std::io::Result<(PathBuf, File)> {
        let path = self.resolve(root, component, Local::now());
        let file = create_log_file(&path)?;
        Ok((path, file))
    }
}

/// Open `path` for appending, creating parent directories as needed
pub fn create_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            debug!("Created log directory: {}", parent.display());
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    debug!("Created log file: {}", path.display());
    Ok(file)
}

/// Replace anything outside `[A-Za-z0-9.-]` with `_`
pub fn sanitize_filename(input: &str) -> String {
    if input.is_empty() {
        return "unknown".to_string();
    }
    input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}
