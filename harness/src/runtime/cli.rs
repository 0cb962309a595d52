//! One-shot CLI execution with captured output

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, warn};

use crate::config::{HarnessConfig, DEFAULT_CLI_PATH, DEFAULT_CLI_TIMEOUT, FORCE_KILL_TIMEOUT};

/// Exit code reported when the command never produced one
pub const NO_EXIT_CODE: i32 = -1;

/// Outcome of a single CLI invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CliResult {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout, followed by stderr on its own line when present
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    fn failed(stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: NO_EXIT_CODE,
            stdout: String::new(),
            stderr,
            duration,
        }
    }
}

impl fmt::Display for CliResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stdout: String = self.stdout.chars().take(100).collect();
        let ellipsis = if self.stdout.chars().count() > 100 { "..." } else { "" };
        write!(
            f,
            "CliResult{{exit_code={}, duration={}ms, stdout='{}{}'}}",
            self.exit_code,
            self.duration.as_millis(),
            stdout,
            ellipsis
        )
    }
}

/// Runs the product CLI as a child process
#[derive(Debug, Clone)]
pub struct CliExecutor {
    cli_path: PathBuf,
    java: PathBuf,
    env: BTreeMap<String, String>,
    timeout: Duration,
}

impl CliExecutor {
    pub fn new<P: Into<PathBuf>>(cli_path: P) -> Self {
        let mut env = BTreeMap::new();
        // line-editing CLIs only print to a real TTY unless told otherwise
        env.insert("TERM".to_string(), "dumb".to_string());

        Self {
            cli_path: cli_path.into(),
            java: PathBuf::from("java"),
            env,
            timeout: DEFAULT_CLI_TIMEOUT,
        }
    }

    /// Executor for the configured CLI path, falling back to `wanaku` on `PATH`
    pub fn from_config(config: &HarnessConfig) -> Self {
        let path = config
            .cli_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CLI_PATH));
        Self::new(path).with_java(config.java.clone())
    }

    /// Configure the per-command timeout (fluent API)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the java binary used for `.jar` CLIs (fluent API)
    pub fn with_java<P: Into<PathBuf>>(mut self, java: P) -> Self {
        self.java = java.into();
        self
    }

    /// Add an environment variable (fluent API)
    pub fn with_env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn cli_path(&self) -> &Path {
        &self.cli_path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Program, arguments and working directory for one invocation
    fn command_parts<S: AsRef<str>>(&self, args: &[S]) -> (PathBuf, Vec<String>, Option<PathBuf>) {
        let extra = args.iter().map(|a| a.as_ref().to_string());
        let is_jar = self.cli_path.extension().and_then(|e| e.to_str()) == Some("jar");

        if !is_jar {
            return (self.cli_path.clone(), extra.collect(), None);
        }

        let mut argv = vec!["-Djline.terminal=dumb".to_string(), "-jar".to_string()];
        let mut working_dir = None;

        let is_fast_jar = self.cli_path.file_name().and_then(|n| n.to_str()) == Some("quarkus-run.jar");
        if is_fast_jar {
            working_dir = self.cli_path.parent().map(Path::to_path_buf);
            argv.push("quarkus-run.jar".to_string());
        } else {
            argv.push(self.cli_path.display().to_string());
        }
        argv.extend(extra);

        (self.java.clone(), argv, working_dir)
    }

    /// Run the CLI with `args` and wait for it, bounded by the timeout.
    ///
    /// Never fails: spawn errors and timeouts come back as exit code `-1`.
    pub async fn execute<S: AsRef<str>>(&self, args: &[S]) -> CliResult {
        let (program, argv, working_dir) = self.command_parts(args);
        debug!(
            "Executing: {} {} (workdir: {:?})",
            program.display(),
            argv.join(" "),
            working_dir
        );

        let start = Instant::now();
        let mut cmd = Command::new(&program);
        cmd.args(&argv)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &working_dir {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("CLI execution failed: {}", e);
                return CliResult::failed(format!("Failed to run {}: {}", program.display(), e), start.elapsed());
            }
        };

        let mut stdout = tokio::spawn(read_all(child.stdout.take()));
        let mut stderr = tokio::spawn(read_all(child.stderr.take()));

        // output readers share the deadline: a background grandchild can keep the pipes open
        let outcome = timeout(self.timeout, async {
            let status = child.wait().await;
            let out = (&mut stdout).await.unwrap_or_default();
            let err = (&mut stderr).await.unwrap_or_default();
            (status, out, err)
        })
        .await;

        let (status, stdout, stderr) = match outcome {
            Ok((Ok(status), out, err)) => (status, out, err),
            Ok((Err(e), _, _)) => {
                error!("CLI wait failed: {}", e);
                return CliResult::failed(format!("Failed to wait for CLI: {e}"), start.elapsed());
            }
            Err(_) => {
                warn!("CLI timed out after {:?}, killing", self.timeout);
                let _ = child.start_kill();
                let _ = timeout(FORCE_KILL_TIMEOUT, child.wait()).await;
                stdout.abort();
                stderr.abort();
                return CliResult::failed(format!("Command timed out after {:?}", self.timeout), start.elapsed());
            }
        };

        let duration = start.elapsed();
        let exit_code = status.code().unwrap_or(NO_EXIT_CODE);
        debug!("CLI completed with exit code {} in {}ms", exit_code, duration.as_millis());

        CliResult {
            exit_code,
            stdout: trim_trailing_newlines(stdout),
            stderr: trim_trailing_newlines(stderr),
            duration,
        }
    }

    /// Whether the CLI can be run at all.
    ///
    /// Some CLIs exit non-zero for `--version` while working fine, so any
    /// output counts as available.
    pub async fn is_available(&self) -> bool {
        let result = self.execute(&["--version"]).await;
        if result.exit_code == NO_EXIT_CODE {
            return false;
        }
        result.is_success() || !result.combined_output().is_empty()
    }
}

async fn read_all<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        let _ = stream.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn trim_trailing_newlines(mut s: String) -> String {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_runs_directly() {
        let cli = CliExecutor::new("/usr/local/bin/wanaku");
        let (program, args, dir) = cli.command_parts(&["tools", "list"]);
        assert_eq!(program, PathBuf::from("/usr/local/bin/wanaku"));
        assert_eq!(args, vec!["tools", "list"]);
        assert_eq!(dir, None);
    }

    #[test]
    fn test_jar_runs_on_jvm() {
        let cli = CliExecutor::new("/opt/cli/wanaku-cli.jar");
        let (program, args, dir) = cli.command_parts(&["--version"]);
        assert_eq!(program, PathBuf::from("java"));
        assert_eq!(args, vec!["-Djline.terminal=dumb", "-jar", "/opt/cli/wanaku-cli.jar", "--version"]);
        assert_eq!(dir, None);
    }

    #[test]
    fn test_fast_jar_runs_from_its_directory() {
        let cli = CliExecutor::new("/opt/cli/quarkus-app/quarkus-run.jar").with_java("/jdk/bin/java");
        let (program, args, dir) = cli.command_parts(&["tools", "list"]);
        assert_eq!(program, PathBuf::from("/jdk/bin/java"));
        assert_eq!(args, vec!["-Djline.terminal=dumb", "-jar", "quarkus-run.jar", "tools", "list"]);
        assert_eq!(dir, Some(PathBuf::from("/opt/cli/quarkus-app")));
    }

    #[test]
    fn test_combined_output_and_display() {
        let result = CliResult {
            exit_code: 0,
            stdout: "x".repeat(150),
            stderr: "warning".to_string(),
            duration: Duration::from_millis(12),
        };
        assert!(result.is_success());
        assert!(result.combined_output().ends_with("\nwarning"));

        let shown = result.to_string();
        assert!(shown.contains("exit_code=0"));
        assert!(shown.contains("duration=12ms"));
        assert!(shown.contains(&format!("{}...", "x".repeat(100))));

        let quiet = CliResult { stderr: String::new(), ..result };
        assert_eq!(quiet.combined_output(), "x".repeat(150));
    }

    #[tokio::test]
    async fn test_execute_captures_output_and_env() {
        let cli = CliExecutor::new("/bin/sh");
        let result = cli.execute(&["-c", "echo term=$TERM; echo oops >&2; exit 3"]).await;

        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout, "term=dumb");
        assert_eq!(result.stderr, "oops");
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_execute_times_out() {
        let cli = CliExecutor::new("/bin/sh").with_timeout(Duration::from_millis(300));
        let start = Instant::now();
        let result = cli.execute(&["-c", "sleep 30"]).await;

        assert_eq!(result.exit_code, NO_EXIT_CODE);
        assert!(result.stderr.starts_with("Command timed out after"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_timeout_covers_inherited_pipes() {
        let cli = CliExecutor::new("/bin/sh").with_timeout(Duration::from_millis(500));
        let start = Instant::now();
        let result = cli.execute(&["-c", "sleep 4 & echo started"]).await;

        assert!(start.elapsed() < Duration::from_secs(3), "took {:?}", start.elapsed());
        assert_eq!(result.exit_code, NO_EXIT_CODE);
        assert_eq!(result.stderr, "Command timed out after 500ms");
    }

    #[tokio::test]
    async fn test_missing_cli_is_unavailable() {
        let cli = CliExecutor::new("/definitely/not/here/wanaku");
        let result = cli.execute(&["--version"]).await;
        assert_eq!(result.exit_code, NO_EXIT_CODE);
        assert!(!result.stderr.is_empty());
        assert!(!cli.is_available().await);
    }
}
