use crate::common::EchoServerTrait;
use crate::echo::{HeaderEchoServer, HttpConfig};
use crate::{EchoError, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Starts a header echo server on an ephemeral loopback port for tests
///
/// Returns the server task, the address it listens on and the sender that
/// stops it. The listener is bound before this function returns, so clients
/// can connect immediately.
pub async fn spawn_test_server(
    config: HttpConfig,
) -> Result<(JoinHandle<Result<()>>, SocketAddr, broadcast::Sender<()>)> {
    let config = HttpConfig {
        bind_addr: "127.0.0.1:0"
            .parse()
            .map_err(|e| EchoError::Config(format!("Invalid test address: {e}")))?,
        read_timeout: Duration::from_secs(5),
        write_timeout: Duration::from_secs(5),
        ..config
    };

    let server = HeaderEchoServer::new(config);
    let listener = server.bind().await?;
    let addr = listener.local_addr()?;
    let shutdown = server.shutdown_signal();

    let handle = tokio::spawn(async move { server.serve(listener).await });

    Ok((handle, addr, shutdown))
}
