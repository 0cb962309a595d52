//! Dynamic port allocation
//!
//! Binds port 0, reads the OS-assigned port, releases it and re-validates it
//! is still bindable. The port is only guaranteed free at the instant of
//! return; whoever binds first afterwards owns it.

use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{PORT_ALLOCATION_DELAY, PORT_ALLOCATION_RETRIES};
use crate::error::{HarnessError, HarnessResult};

/// Finds ephemeral TCP ports for processes about to be spawned
#[derive(Debug, Clone)]
pub struct PortAllocator {
    bind_ip: Ipv4Addr,
    retries: u32,
    retry_delay: Duration,
}

impl PortAllocator {
    pub fn new() -> Self {
        Self {
            bind_ip: Ipv4Addr::UNSPECIFIED,
            retries: PORT_ALLOCATION_RETRIES,
            retry_delay: PORT_ALLOCATION_DELAY,
        }
    }

    /// Configure retry count (fluent API)
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Configure delay between attempts (fluent API)
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Configure the address ports are validated against (fluent API)
    pub fn with_bind_ip(mut self, ip: Ipv4Addr) -> Self {
        self.bind_ip = ip;
        self
    }

    /// Allocate one port, retrying when the OS hands the port to someone else
    /// between release and re-validation
    pub fn allocate(&self) -> HarnessResult<u16> {
        for attempt in 1..=self.retries {
            match self.allocate_once() {
                Ok(port) if self.is_available(port) => {
                    debug!("Allocated port {} on attempt {}", port, attempt);
                    return Ok(port);
                }
                Ok(port) => {
                    debug!("Port {} was taken before re-validation (attempt {})", port, attempt);
                }
                Err(e) => {
                    warn!("Port allocation attempt {} failed: {}", attempt, e);
                }
            }

            if attempt < self.retries {
                std::thread::sleep(self.retry_delay);
            }
        }

        Err(HarnessError::Allocation { attempts: self.retries })
    }

    /// Allocate `count` ports that are pairwise distinct.
    ///
    /// A port the OS hands out twice is drawn again, at most `retries` times in total.
    pub fn allocate_many(&self, count: usize) -> HarnessResult<Vec<u16>> {
        self.collect_distinct(count, || self.allocate())
    }

    fn collect_distinct<F>(&self, count: usize, mut draw: F) -> HarnessResult<Vec<u16>>
    where
        F: FnMut() -> HarnessResult<u16>,
    {
        let mut ports = Vec::with_capacity(count);
        let mut redraws = 0;
        while ports.len() < count {
            let port = draw()?;
            if !ports.contains(&port) {
                ports.push(port);
                continue;
            }

            redraws += 1;
            debug!("Port {} handed out twice (redraw {})", port, redraws);
            if redraws > self.retries {
                return Err(HarnessError::Allocation { attempts: redraws });
            }
        }
        Ok(ports)
    }

    /// Whether `port` can be bound right now
    pub fn is_available(&self, port: u16) -> bool {
        TcpListener::bind(SocketAddr::from((self.bind_ip, port))).is_ok()
    }

    fn allocate_once(&self) -> std::io::Result<u16> {
        let listener = TcpListener::bind(SocketAddr::from((self.bind_ip, 0)))?;
        let port = listener.local_addr()?.port();
        drop(listener);
        Ok(port)
    }
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocate a port with the default retry policy
pub fn find_available_port() -> HarnessResult<u16> {
    PortAllocator::new().allocate()
}
