//! Health probes
//!
//! Both variants are built on [`poll_until`]: evaluate a predicate until it
//! passes or a monotonic deadline elapses. Every attempt is bounded by the
//! time left, so a probe never overruns its deadline. There is no
//! cooperative cancellation; expiry of the deadline is the only way out.

use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error};

use crate::config::{DEFAULT_HEALTH_CHECK_INTERVAL, HTTP_PROBE_REQUEST_TIMEOUT, TCP_PROBE_CONNECT_TIMEOUT};
use crate::traits::HealthCheck;

/// Poll `predicate` until it returns true or `deadline` passes.
///
/// The predicate receives the budget left for the current attempt. It is
/// evaluated immediately, then every `interval`.
pub async fn poll_until<F, Fut>(deadline: Instant, interval: Duration, mut predicate: F) -> bool
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = bool>,
{
    loop {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }

        let remaining = deadline - now;
        if let Ok(true) = timeout(remaining, predicate(remaining)).await {
            return true;
        }

        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep(interval.min(deadline - now)).await;
    }
}

fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(HTTP_PROBE_REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

async fn http_attempt(client: &reqwest::Client, url: &str, budget: Duration) -> bool {
    match client.get(url).timeout(budget).send().await {
        Ok(response) => {
            let status = response.status();
            if !status.is_success() {
                debug!("Health check {} returned {}", url, status);
            }
            status.is_success()
        }
        Err(e) => {
            debug!("Health check {} failed: {}", url, e);
            false
        }
    }
}

/// Single HTTP health attempt: true on a 2xx response
pub async fn check_http(url: &str) -> bool {
    http_attempt(&default_http_client(), url, HTTP_PROBE_REQUEST_TIMEOUT).await
}

/// Wait for an HTTP endpoint to answer 2xx
pub async fn wait_for_http(url: &str, wait: Duration) -> bool {
    HttpHealthCheck::new(url).check(wait).await
}

async fn tcp_attempt(host: &str, port: u16, budget: Duration) -> bool {
    matches!(timeout(budget, TcpStream::connect((host, port))).await, Ok(Ok(_)))
}

/// Single TCP health attempt: true if a connection is accepted
pub async fn check_port(host: &str, port: u16) -> bool {
    tcp_attempt(host, port, TCP_PROBE_CONNECT_TIMEOUT).await
}

/// Wait for `host:port` to accept connections
pub async fn wait_for_port(host: &str, port: u16, wait: Duration) -> bool {
    TcpHealthCheck::new(host, port).check(wait).await
}

/// Polls a URL until it answers 2xx
#[derive(Debug, Clone)]
pub struct HttpHealthCheck {
    url: String,
    interval: Duration,
    client: reqwest::Client,
}

impl HttpHealthCheck {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            interval: DEFAULT_HEALTH_CHECK_INTERVAL,
            client: default_http_client(),
        }
    }

    /// Configure polling interval (fluent API)
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl HealthCheck for HttpHealthCheck {
    async fn check(&self, wait: Duration) -> bool {
        debug!("Waiting for health check: {} (timeout: {}s)", self.url, wait.as_secs());

        let deadline = Instant::now() + wait;
        let healthy = poll_until(deadline, self.interval, |remaining| {
            http_attempt(&self.client, &self.url, remaining.min(HTTP_PROBE_REQUEST_TIMEOUT))
        })
        .await;

        if healthy {
            debug!("Health check passed: {}", self.url);
        } else {
            error!("Health check timeout: {}", self.url);
        }
        healthy
    }
}

/// Polls a TCP port until it accepts a connection
#[derive(Debug, Clone)]
pub struct TcpHealthCheck {
    host: String,
    port: u16,
    interval: Duration,
}

impl TcpHealthCheck {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            interval: DEFAULT_HEALTH_CHECK_INTERVAL,
        }
    }

    /// Configure polling interval (fluent API)
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[async_trait::async_trait]
impl HealthCheck for TcpHealthCheck {
    async fn check(&self, wait: Duration) -> bool {
        debug!("Waiting for port {}:{} (timeout: {}s)", self.host, self.port, wait.as_secs());

        let deadline = Instant::now() + wait;
        let open = poll_until(deadline, self.interval, |remaining| {
            tcp_attempt(&self.host, self.port, remaining.min(TCP_PROBE_CONNECT_TIMEOUT))
        })
        .await;

        if open {
            debug!("Port {}:{} is available", self.host, self.port);
        } else {
            error!("Timeout waiting for port {}:{}", self.host, self.port);
        }
        open
    }
}

type CheckFn = dyn Fn(Duration) -> BoxFuture<'static, bool> + Send + Sync;

/// Adapts an async closure into a [`HealthCheck`]
#[derive(Clone)]
pub struct FnHealthCheck {
    check: Arc<CheckFn>,
}

impl FnHealthCheck {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Duration) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self {
            check: Arc::new(move |wait| Box::pin(f(wait))),
        }
    }

    /// A check that passes immediately
    pub fn always() -> Self {
        Self::new(|_| async { true })
    }
}

impl std::fmt::Debug for FnHealthCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHealthCheck").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl HealthCheck for FnHealthCheck {
    async fn check(&self, wait: Duration) -> bool {
        (self.check)(wait).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    /// Serve a fixed HTTP status line to every connection
    async fn serve_status(status: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let response = format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        port
    }

    fn unused_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_poll_until_succeeds_before_deadline() {
        let wait = Duration::from_millis(800);
        let start = Instant::now();
        let ready_at = start + wait / 2;

        let passed = poll_until(start + wait, Duration::from_millis(20), |_| async move {
            Instant::now() >= ready_at
        })
        .await;

        assert!(passed);
        assert!(start.elapsed() <= wait);
    }

    #[tokio::test]
    async fn test_poll_until_gives_up_at_deadline() {
        let attempts = AtomicU32::new(0);
        let wait = Duration::from_millis(200);
        let start = Instant::now();

        let passed = poll_until(start + wait, Duration::from_millis(20), |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { false }
        })
        .await;

        assert!(!passed);
        assert!(start.elapsed() >= wait);
        assert!(start.elapsed() < wait + Duration::from_millis(200));
        assert!(attempts.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_poll_until_bounds_slow_attempts() {
        let wait = Duration::from_millis(150);
        let start = Instant::now();

        let passed = poll_until(start + wait, Duration::from_millis(10), |_| async {
            sleep(Duration::from_secs(10)).await;
            true
        })
        .await;

        assert!(!passed);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_http_probe_accepts_2xx() {
        let port = serve_status("200 OK").await;
        let url = format!("http://127.0.0.1:{port}/health");

        assert!(check_http(&url).await);
        assert!(wait_for_http(&url, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_http_probe_rejects_non_2xx() {
        let port = serve_status("503 Service Unavailable").await;
        let url = format!("http://127.0.0.1:{port}/health");

        assert!(!check_http(&url).await);
        assert!(!wait_for_http(&url, Duration::from_millis(300)).await);
    }

    #[tokio::test]
    async fn test_tcp_probe_waits_for_late_listener() {
        let port = unused_port();
        let wait = Duration::from_secs(2);
        let start = Instant::now();

        let server = tokio::spawn(async move {
            sleep(wait / 2).await;
            let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
            // hold the listener long enough for the probe to connect
            let _ = timeout(Duration::from_secs(3), listener.accept()).await;
        });

        assert!(wait_for_port("127.0.0.1", port, wait).await);
        assert!(start.elapsed() <= wait);
        server.abort();
    }

    #[tokio::test]
    async fn test_tcp_probe_refused_port() {
        let port = unused_port();
        assert!(!check_port("127.0.0.1", port).await);
        assert!(!wait_for_port("127.0.0.1", port, Duration::from_millis(200)).await);
    }

    #[tokio::test]
    async fn test_fn_health_check_receives_timeout() {
        let check = FnHealthCheck::new(|wait| async move { wait == Duration::from_secs(7) });
        assert!(check.check(Duration::from_secs(7)).await);
        assert!(!check.check(Duration::from_secs(1)).await);
        assert!(FnHealthCheck::always().check(Duration::ZERO).await);
    }
}
