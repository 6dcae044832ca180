//! User-Agent probe
//!
//! Sends one `GET` per entry of a fixed User-Agent list to a target URL and
//! reports each response on a writer. Requests are strictly sequential and a
//! transport failure ends the run.

pub mod client;
pub mod config;
pub mod response;
pub mod runner;
pub mod tls;


use std::io;

pub use client::ProbeClient;
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_TARGET, ProbeConfig, USER_AGENTS};
pub use response::ProbeResponse;
pub use runner::{run_probe, write_report};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Response too large: {size} bytes, max allowed: {max}")]
    ResponseTooLarge { size: usize, max: usize },
}
