use crate::echo::codec::HttpCodecError;
use crate::probe::ProbeError;
use thiserror::Error;

/// Error types for the headerecho library
#[derive(Error, Debug)]
pub enum EchoError {
    /// Socket-level errors (bind, accept, connect, read, write)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or configuration errors
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Target URL could not be used for a request
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP framing errors on either side of the wire
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// User-Agent policy could not be loaded or compiled
    #[error("Policy error: {0}")]
    Policy(String),
}

impl From<HttpCodecError> for EchoError {
    fn from(err: HttpCodecError) -> Self {
        match err {
            HttpCodecError::Io(e) => EchoError::Io(e),
            other => EchoError::Protocol(other.to_string()),
        }
    }
}

impl From<ProbeError> for EchoError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::Io(e) => EchoError::Io(e),
            ProbeError::Tls(e) => EchoError::Tls(e),
            ProbeError::InvalidUrl(msg) => EchoError::InvalidUrl(msg),
            ProbeError::Timeout(msg) => EchoError::Timeout(msg),
            other => EchoError::Protocol(other.to_string()),
        }
    }
}

/// Result type for the headerecho library
pub type Result<T> = std::result::Result<T, EchoError>;

pub mod common;
pub mod echo;
pub mod probe;
pub mod security;

// Re-export main types for convenience
pub use common::EchoServerTrait;
pub use echo::{EchoedHeaders, HeaderEchoServer, HttpConfig};
pub use probe::{
    ClientConfig, ClientConfigBuilder, DEFAULT_TARGET, ProbeClient, ProbeConfig, ProbeResponse,
    USER_AGENTS, run_probe,
};
pub use security::UserAgentPolicy;
