use std::sync::Arc;
use std::time::Duration;

use crate::codec::{DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_HEADER_BYTES};

/// Smallest accepted session buffer; anything below cannot hold a request line
const MIN_BUFFER_CAPACITY: usize = 256;

const DEFAULT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_MAX_REQUESTS: usize = 100;

const DEFAULT_SERVER_NAME: &str = concat!("aio-http/", env!("CARGO_PKG_VERSION"));

/// Per-session settings shared by every connection of a [`Server`](crate::server::Server).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use aio_http::server::SessionConfig;
///
/// let config = SessionConfig::default()
///     .with_keep_alive_timeout(Duration::from_secs(15))
///     .with_max_requests(1_000);
///
/// assert_eq!(config.buffer_capacity(), 8 * 1024);
/// assert_eq!(config.max_requests(), 1_000);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    buffer_capacity: usize,
    keep_alive_timeout: Duration,
    max_requests: usize,
    max_body_bytes: u64,
    server_name: Arc<str>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_MAX_HEADER_BYTES,
            keep_alive_timeout: DEFAULT_KEEP_ALIVE_TIMEOUT,
            max_requests: DEFAULT_MAX_REQUESTS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            server_name: Arc::from(DEFAULT_SERVER_NAME),
        }
    }
}

impl SessionConfig {
    /// Capacity of the session buffer. It bounds both the request head and
    /// the headers a handler may stage for its response.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(MIN_BUFFER_CAPACITY);
        self
    }

    /// Idle time allowed while waiting for request bytes. Also advertised in
    /// the `Keep-Alive` response header.
    pub fn with_keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.keep_alive_timeout = timeout;
        self
    }

    /// Requests served on one connection before it is closed.
    pub fn with_max_requests(mut self, max_requests: usize) -> Self {
        self.max_requests = max_requests.max(1);
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn with_server_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.server_name = name.into();
        self
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    pub fn keep_alive_timeout(&self) -> Duration {
        self.keep_alive_timeout
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn max_body_bytes(&self) -> u64 {
        self.max_body_bytes
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }
}
