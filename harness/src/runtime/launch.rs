//! Launch specifications
//!
//! A [`LaunchSpec`] is plain data: what to run, how to configure it, how to
//! tell it is ready and where its output goes. One generic
//! [`ProcessHandle`](super::process::ProcessHandle) drives any spec.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::health::FnHealthCheck;
use super::log_files::LogNaming;
use crate::config::{DEFAULT_LOG_DIR, DEFAULT_TIMEOUT, GRACEFUL_SHUTDOWN_TIMEOUT};
use crate::traits::HealthCheck;

/// How the artifact is executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// Execute the artifact itself. Properties are passed as environment
    /// variables using the MicroProfile mapping (`a.b-c` → `A_B_C`).
    Direct,
    /// `java -Dkey=value… -jar <artifact file name> args…`, run from the
    /// artifact's directory (Quarkus fast-jar layout).
    Jvm { java: PathBuf },
}

impl Launcher {
    /// `.jar` artifacts run on the JVM, anything else directly
    pub fn for_artifact(artifact: &Path, java: &Path) -> Self {
        match artifact.extension().and_then(|ext| ext.to_str()) {
            Some("jar") => Launcher::Jvm { java: java.to_path_buf() },
            _ => Launcher::Direct,
        }
    }
}

/// Fully rendered command line, ready to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandLine {
    /// Shell-like rendering for logs
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Map a property key to its environment variable name
pub fn property_env_name(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

/// Launch specification for one managed process
#[derive(Clone)]
pub struct LaunchSpec {
    pub name: String,
    pub artifact: PathBuf,
    pub launcher: Launcher,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub properties: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
    pub health_check: Arc<dyn HealthCheck>,
    pub log_naming: LogNaming,
    pub log_root: PathBuf,
    pub startup_timeout: Duration,
    pub grace_period: Duration,
}

impl std::fmt::Debug for LaunchSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchSpec")
            .field("name", &self.name)
            .field("artifact", &self.artifact)
            .field("launcher", &self.launcher)
            .field("args", &self.args)
            .field("properties", &self.properties)
            .field("log_naming", &self.log_naming)
            .field("startup_timeout", &self.startup_timeout)
            .finish_non_exhaustive()
    }
}

impl LaunchSpec {
    /// Create a new builder
    pub fn builder<N: Into<String>, P: Into<PathBuf>>(name: N, artifact: P) -> LaunchSpecBuilder {
        LaunchSpecBuilder::new(name, artifact)
    }

    /// Render the command line. Pure; touches neither the filesystem nor the OS.
    pub fn command_line(&self) -> CommandLine {
        let mut env = self.env.clone();

        match &self.launcher {
            Launcher::Direct => {
                for (key, value) in &self.properties {
                    env.insert(property_env_name(key), value.clone());
                }

                CommandLine {
                    program: self.artifact.clone(),
                    args: self.args.clone(),
                    env,
                    working_dir: self.working_dir.clone(),
                }
            }
            Launcher::Jvm { java } => {
                let mut args: Vec<String> = self
                    .properties
                    .iter()
                    .map(|(key, value)| format!("-D{key}={value}"))
                    .collect();
                args.push("-jar".to_string());

                let jar_name = self
                    .artifact
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| self.artifact.display().to_string());
                args.push(jar_name);
                args.extend(self.args.iter().cloned());

                CommandLine {
                    program: java.clone(),
                    args,
                    env,
                    working_dir: self
                        .working_dir
                        .clone()
                        .or_else(|| self.artifact.parent().map(Path::to_path_buf)),
                }
            }
        }
    }
}

/// Builder for [`LaunchSpec`]
pub struct LaunchSpecBuilder {
    spec: LaunchSpec,
}

impl LaunchSpecBuilder {
    pub fn new<N: Into<String>, P: Into<PathBuf>>(name: N, artifact: P) -> Self {
        Self {
            spec: LaunchSpec {
                name: name.into(),
                artifact: artifact.into(),
                launcher: Launcher::Direct,
                args: Vec::new(),
                env: BTreeMap::new(),
                properties: Vec::new(),
                working_dir: None,
                health_check: Arc::new(FnHealthCheck::always()),
                log_naming: LogNaming::flat("unknown"),
                log_root: PathBuf::from(DEFAULT_LOG_DIR),
                startup_timeout: DEFAULT_TIMEOUT,
                grace_period: GRACEFUL_SHUTDOWN_TIMEOUT,
            },
        }
    }

    pub fn launcher(mut self, launcher: Launcher) -> Self {
        self.spec.launcher = launcher;
        self
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.spec.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.spec.env.insert(key.into(), value.into());
        self
    }

    /// Add a runtime property (`-D` flag on the JVM, env var otherwise)
    pub fn property<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.spec.properties.push((key.into(), value.to_string()));
        self
    }

    pub fn working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.spec.working_dir = Some(dir.into());
        self
    }

    pub fn health_check<H: HealthCheck + 'static>(mut self, check: H) -> Self {
        self.spec.health_check = Arc::new(check);
        self
    }

    pub fn shared_health_check(mut self, check: Arc<dyn HealthCheck>) -> Self {
        self.spec.health_check = check;
        self
    }

    pub fn log_naming(mut self, naming: LogNaming) -> Self {
        self.spec.log_naming = naming;
        self
    }

    pub fn log_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.spec.log_root = root.into();
        self
    }

    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.spec.startup_timeout = timeout;
        self
    }

    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.spec.grace_period = grace;
        self
    }

    pub fn build(self) -> LaunchSpec {
        self.spec
    }
}
