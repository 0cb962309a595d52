//! Harness command line
//!
//! Small operator tool around the harness library:
//! - allocate free ports
//! - probe HTTP and TCP readiness
//! - bring a suite up from environment configuration and hold it until Ctrl+C

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::time::Duration;

use harness::config::DEFAULT_TIMEOUT;
use harness::runtime::{wait_for_http, wait_for_port};
use harness::{HarnessConfig, PortAllocator, ProcessState, SuiteScope};

#[derive(Parser)]
#[command(name = "harness")]
#[command(about = "Process orchestration harness for integration tests")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Probe / startup timeout in seconds (startup defaults to HARNESS_TIMEOUT)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Enable verbose tracing output
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print free TCP ports, one per line
    AllocatePort {
        #[arg(long, default_value = "1")]
        count: usize,
    },
    /// Wait for a URL to answer 2xx
    ProbeHttp {
        #[arg(long)]
        url: String,
    },
    /// Wait for a TCP port to accept connections
    ProbeTcp {
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(long)]
        port: u16,
    },
    /// Start a suite from environment configuration and keep it running
    Up {
        #[arg(long, default_value = "manual")]
        suite: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    shared::logging::init_tracing(Some(level)).context("failed to initialise tracing")?;

    let timeout = args.timeout_secs.map(Duration::from_secs);
    let probe_timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);

    match args.command {
        Command::AllocatePort { count } => {
            for port in PortAllocator::new().allocate_many(count)? {
                println!("{port}");
            }
        }
        Command::ProbeHttp { url } => {
            if !wait_for_http(&url, probe_timeout).await {
                bail!("{url} not healthy within {}s", probe_timeout.as_secs());
            }
            tracing::info!("✅ {} is healthy", url);
        }
        Command::ProbeTcp { host, port } => {
            if !wait_for_port(&host, port, probe_timeout).await {
                bail!("{host}:{port} not accepting connections within {}s", probe_timeout.as_secs());
            }
            tracing::info!("✅ {}:{} is accepting connections", host, port);
        }
        Command::Up { suite } => run_suite(&suite, timeout).await?,
    }

    Ok(())
}

async fn run_suite(suite_name: &str, timeout: Option<Duration>) -> anyhow::Result<()> {
    let mut config = HarnessConfig::from_env()?;
    if let Some(timeout) = timeout {
        config.default_timeout = timeout;
    }

    let mut suite = SuiteScope::create(config, suite_name).await?;
    if suite.is_skipped() {
        bail!("no router artifact found; set HARNESS_ROUTER_ARTIFACT or HARNESS_ARTIFACTS_DIR");
    }

    if let Some(url) = suite.router_base_url() {
        tracing::info!("🚀 Router running at {}", url);
    }
    if let Some(log) = suite.router_log_file() {
        tracing::info!("📄 Router log: {}", log.display());
    }
    tracing::info!(
        "Authentication: {}",
        if suite.is_auth_available() { "enabled" } else { "disabled" }
    );
    tracing::info!("Press Ctrl+C to stop all services");

    tokio::signal::ctrl_c().await?;

    let router_state = suite.router().map(|router| router.state()).unwrap_or(ProcessState::Stopped);
    tracing::info!("🛑 Shutting down suite (router {})", router_state);

    let report = suite.destroy().await;
    for failure in &report.failures {
        tracing::warn!("Teardown: {}", failure);
    }

    tracing::info!("🏁 Suite {} stopped", suite_name);
    Ok(())
}
