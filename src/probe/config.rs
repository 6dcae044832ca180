use http::Uri;
use std::time::Duration;

/// Target probed when nothing else is configured
pub const DEFAULT_TARGET: &str = "https://127.0.0.1/";

/// Crawler User-Agents sent by the probe, in order
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
    "Mozilla/5.0 (compatible; bingbot/2.0; +http://www.bing.com/bingbot.htm)",
    "Mozilla/5.0 (compatible; Baiduspider/2.0; +http://www.baidu.com/search/spider.html)",
    "Mozilla/5.0 (compatible; YandexBot/3.0; +http://yandex.com/bots)",
    "rogerbot/1.0 (http://moz.com/help/guide/rogerbot-crawler)",
];

/// What to probe: one target and the User-Agents to send it
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub target: Uri,
    pub user_agents: Vec<String>,
}

impl ProbeConfig {
    pub fn new(target: Uri) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            target: Uri::from_static(DEFAULT_TARGET),
            user_agents: USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
        }
    }
}

/// Configuration for the probe's HTTP client
///
/// HTTPS targets are always reached with certificate validation disabled,
/// so self-signed development certificates are accepted.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Time allowed for TCP connect and, for HTTPS, the TLS handshake
    pub connect_timeout: Duration,
    /// Read timeout for each read from the server
    pub read_timeout: Duration,
    /// Write timeout for sending the request
    pub write_timeout: Duration,
    /// Buffer size for reading data
    pub buffer_size: usize,
    /// Maximum response size to prevent memory exhaustion
    pub max_response_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            buffer_size: 4096,
            max_response_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Builder for client configuration
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    pub fn max_response_size(mut self, size: usize) -> Self {
        self.config.max_response_size = size;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfigBuilder::new()
            .read_timeout(Duration::from_secs(60))
            .write_timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_millis(100))
            .buffer_size(2048)
            .max_response_size(1024 * 1024)
            .build();

        assert_eq!(config.read_timeout, Duration::from_secs(60));
        assert_eq!(config.write_timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_millis(100));
        assert_eq!(config.buffer_size, 2048);
        assert_eq!(config.max_response_size, 1024 * 1024);
    }

    #[test]
    fn test_default_probe_targets_local_https() {
        let config = ProbeConfig::default();
        assert_eq!(config.target.scheme_str(), Some("https"));
        assert_eq!(config.target.host(), Some("127.0.0.1"));
        assert_eq!(config.user_agents.len(), 5);
        assert!(config.user_agents[0].contains("Googlebot"));
        assert!(config.user_agents[4].starts_with("rogerbot"));
    }
}
