use crate::Result;
use crate::probe::ProbeResponse;
use async_trait::async_trait;

/// Common trait for echo servers
///
/// Implemented by servers that can be run until stopped and
/// shut down from another task.
#[async_trait]
pub trait EchoServerTrait {
    /// Binds the configured address and serves until shut down
    async fn run(&self) -> Result<()>;

    /// Returns a shutdown signal sender that can be used to gracefully shutdown the server
    fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()>;
}

/// Sends a single probe request and returns the full response
///
/// The probe runner only depends on this trait, so the wire client can be
/// swapped for a recording fake in tests.
#[async_trait]
pub trait ProbeTransport {
    /// Issues one `GET` to `target` carrying the given User-Agent
    async fn get(&mut self, target: &http::Uri, user_agent: &str) -> Result<ProbeResponse>;
}
