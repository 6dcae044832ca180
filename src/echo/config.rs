use crate::security::UserAgentPolicy;
use std::net::SocketAddr;
use std::time::Duration;

/// Default development port of the echo endpoint
pub const DEFAULT_PORT: u16 = 5000;

/// Configuration for the header echo server
///
/// # Examples
///
/// ```rust
/// use headerecho::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig {
///     bind_addr: "127.0.0.1:8080".parse().unwrap(),
///     max_connections: 100,
///     read_timeout: Duration::from_secs(10),
///     ..Default::default()
/// };
/// assert_eq!(config.max_headers, 64);
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Network address to bind to
    pub bind_addr: SocketAddr,
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Initial read buffer size per connection
    pub buffer_size: usize,
    /// Largest request head (request line plus headers) accepted, in bytes
    pub max_request_head: usize,
    /// Largest number of header fields accepted in one request
    pub max_headers: usize,
    /// Idle time allowed while waiting for the next request bytes
    pub read_timeout: Duration,
    /// Write timeout for responses
    pub write_timeout: Duration,
    /// Value of the `Server` response header, omitted when `None`
    pub server_name: Option<String>,
    /// User-Agent admission rules applied to every request
    pub policy: UserAgentPolicy,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            max_connections: 100,
            buffer_size: 8192,
            max_request_head: 64 * 1024,
            max_headers: 64,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            server_name: Some(concat!("headerecho/", env!("CARGO_PKG_VERSION")).to_string()),
            policy: UserAgentPolicy::allow_all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_binds_development_port() {
        let config = HttpConfig::default();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert!(config.bind_addr.ip().is_loopback());
        assert!(config.policy.is_empty());
        assert!(config.server_name.unwrap().starts_with("headerecho/"));
    }
}
