use super::codec::{HttpCodec, HttpCodecError};
use super::config::HttpConfig;
use super::router::{self, RouteContext};
use crate::common::EchoServerTrait;
use crate::{EchoError, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::Response;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::{signal, time::timeout};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{Instrument, debug, error, info, warn};

/// HTTP server whose root handler echoes the request headers as JSON
///
/// # Examples
///
/// ```no_run
/// use headerecho::{EchoServerTrait, HeaderEchoServer, HttpConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = HeaderEchoServer::new(HttpConfig::default());
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct HeaderEchoServer {
    config: HttpConfig,
    shutdown_signal: Arc<tokio::sync::broadcast::Sender<()>>,
}

/// Per-connection settings shared by all connection tasks
struct ConnectionContext {
    config: HttpConfig,
    routes: RouteContext,
}

impl HeaderEchoServer {
    pub fn new(config: HttpConfig) -> Self {
        let (shutdown_signal, _) = tokio::sync::broadcast::channel(1);
        Self {
            config,
            shutdown_signal: Arc::new(shutdown_signal),
        }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Binds the configured address without serving yet
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(EchoError::Io)
    }

    /// Serves connections from an already bound listener until shut down
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!(
            address = %local_addr,
            whitelist = self.config.policy.whitelist_len(),
            blacklist = self.config.policy.blacklist_len(),
            "Header echo server listening"
        );

        let context = Arc::new(ConnectionContext {
            routes: RouteContext::new(
                self.config.policy.clone(),
                self.config.server_name.as_deref(),
            ),
            config: self.config.clone(),
        });
        let slots = Arc::new(Semaphore::new(self.config.max_connections));
        let mut shutdown_rx = self.shutdown_signal.subscribe();

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            let Ok(permit) = slots.clone().try_acquire_owned() else {
                                warn!(%addr, limit = self.config.max_connections, "Connection rejected: limit reached");
                                continue;
                            };

                            let active = self.config.max_connections - slots.available_permits();
                            debug!(%addr, current = active, "Accepted connection");

                            let context = context.clone();
                            let span = tracing::info_span!("connection", %addr);

                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, addr, &context).instrument(span).await {
                                    error!(%addr, error = %e, "Error handling connection");
                                }
                                drop(permit);
                                debug!(%addr, "Connection closed");
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping server");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Received internal shutdown signal, stopping server");
                    break;
                }
            }
        }

        info!("Header echo server stopped");
        Ok(())
    }
}

/// Serves requests on one connection until the client closes it, asks for
/// `Connection: close`, goes idle past the read timeout or sends something
/// that cannot be framed.
async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    context: &ConnectionContext,
) -> Result<()> {
    let config = &context.config;
    let mut codec = HttpCodec::new(config.max_request_head, config.max_headers);
    let mut read_buf = BytesMut::with_capacity(config.buffer_size);

    loop {
        let head = match codec.decode(&mut read_buf) {
            Ok(Some(head)) => head,
            Ok(None) => {
                match timeout(config.read_timeout, stream.read_buf(&mut read_buf)).await {
                    Ok(Ok(0)) => {
                        if !read_buf.is_empty() {
                            debug!(%addr, pending = read_buf.len(), "Client closed connection mid-request");
                        }
                        break;
                    }
                    Ok(Ok(_)) => continue,
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_) => {
                        debug!(%addr, "Read timeout");
                        break;
                    }
                }
            }
            Err(HttpCodecError::Io(e)) => return Err(e.into()),
            Err(e) => {
                warn!(%addr, error = %e, "Rejecting request");
                let response = router::error_response(&e, &context.routes);
                write_response(&mut stream, &mut codec, response, config).await?;
                break;
            }
        };

        let keep_alive = head.keep_alive();
        let mut response = router::route(&head, &context.routes);
        if !keep_alive {
            response
                .headers_mut()
                .insert(http::header::CONNECTION, http::HeaderValue::from_static("close"));
        }

        info!(
            method = %head.method,
            target = %head.target,
            status = response.status().as_u16(),
            user_agent = %head.user_agent(),
            "Served request"
        );

        write_response(&mut stream, &mut codec, response, config).await?;

        if !keep_alive {
            break;
        }
    }

    let _ = stream.shutdown().await;
    Ok(())
}

async fn write_response(
    stream: &mut TcpStream,
    codec: &mut HttpCodec,
    response: Response<Bytes>,
    config: &HttpConfig,
) -> Result<()> {
    let mut out = BytesMut::new();
    codec.encode(response, &mut out)?;

    timeout(config.write_timeout, async {
        stream.write_all(&out).await?;
        stream.flush().await
    })
    .await
    .map_err(|_| EchoError::Timeout("Write timeout".to_string()))??;

    Ok(())
}

#[async_trait]
impl EchoServerTrait for HeaderEchoServer {
    /// Binds the configured address and serves until shut down
    async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Returns a shutdown signal sender that can be used to gracefully shutdown the server
    fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()> {
        self.shutdown_signal.as_ref().clone()
    }
}
