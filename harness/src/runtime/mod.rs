//! Runtime primitives: ports, health probes, launch specs and process handles

pub mod cli;
pub mod health;
pub mod launch;
pub mod log_files;
pub mod ports;
pub mod process;

pub use cli::{CliExecutor, CliResult};
pub use health::{check_http, check_port, wait_for_http, wait_for_port, FnHealthCheck, HttpHealthCheck, TcpHealthCheck};
pub use launch::{CommandLine, LaunchSpec, LaunchSpecBuilder, Launcher};
pub use log_files::LogNaming;
pub use ports::{find_available_port, PortAllocator};
pub use process::{ProcessHandle, ProcessState};
