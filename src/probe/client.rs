use super::ProbeError;
use super::config::ClientConfig;
use super::response::{ProbeResponse, read_response};
use super::tls;
use crate::Result;
use crate::common::ProbeTransport;
use async_trait::async_trait;
use http::{HeaderValue, Uri};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::debug;

/// Where a request goes, resolved from its URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Target {
    pub secure: bool,
    /// Host without IPv6 brackets, as used for connecting and SNI
    pub host: String,
    pub port: u16,
    /// Value of the `Host` header
    pub authority: String,
    pub path: String,
}

impl TryFrom<&Uri> for Target {
    type Error = ProbeError;

    fn try_from(uri: &Uri) -> std::result::Result<Self, Self::Error> {
        let secure = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            Some(other) => {
                return Err(ProbeError::InvalidUrl(format!("unsupported scheme {other:?}")));
            }
            None => return Err(ProbeError::InvalidUrl(format!("{uri} has no scheme"))),
        };
        let host = uri
            .host()
            .ok_or_else(|| ProbeError::InvalidUrl(format!("{uri} has no host")))?;
        let authority = uri
            .authority()
            .map(|a| a.as_str().rsplit('@').next().unwrap_or(a.as_str()).to_string())
            .unwrap_or_else(|| host.to_string());
        let path = match uri.path_and_query().map(|p| p.as_str()) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => "/".to_string(),
        };

        Ok(Self {
            secure,
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port: uri.port_u16().unwrap_or(if secure { 443 } else { 80 }),
            authority,
            path,
        })
    }
}

/// Serializes the GET request sent for one probe
pub(crate) fn build_request(
    target: &Target,
    user_agent: &str,
) -> std::result::Result<Vec<u8>, ProbeError> {
    HeaderValue::from_str(user_agent)
        .map_err(|_| ProbeError::InvalidHeader(format!("User-Agent {user_agent:?}")))?;

    Ok(format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {authority}\r\n\
         User-Agent: {user_agent}\r\n\
         Accept: */*\r\n\
         Accept-Encoding: identity\r\n\
         Connection: close\r\n\
         \r\n",
        path = target.path,
        authority = target.authority,
    )
    .into_bytes())
}

/// HTTP/1.1 client used by the probe
///
/// Opens a fresh connection per request. HTTPS connections skip certificate
/// validation.
///
/// ```no_run
/// use headerecho::{ClientConfig, ProbeClient};
/// use headerecho::common::ProbeTransport;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut client = ProbeClient::new(ClientConfig::default())?;
///     let target = "https://127.0.0.1/".parse()?;
///     let response = client.get(&target, "Googlebot-Test").await?;
///     println!("{} {}", response.status, response.text());
///     Ok(())
/// }
/// ```
pub struct ProbeClient {
    config: ClientConfig,
    tls: TlsConnector,
}

impl ProbeClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            config,
            tls: tls::insecure_connector()?,
        })
    }

    /// Get client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn fetch(
        &self,
        uri: &Uri,
        user_agent: &str,
    ) -> std::result::Result<ProbeResponse, ProbeError> {
        let target = Target::try_from(uri)?;
        let request = build_request(&target, user_agent)?;

        let tcp = timeout(
            self.config.connect_timeout,
            TcpStream::connect((target.host.as_str(), target.port)),
        )
        .await
        .map_err(|_| ProbeError::Timeout(format!("connecting to {}", target.authority)))??;
        tcp.set_nodelay(true)?;
        debug!(authority = %target.authority, secure = target.secure, "Connected");

        if target.secure {
            let name = tls::server_name(&target.host)?;
            let mut stream = timeout(self.config.connect_timeout, self.tls.connect(name, tcp))
                .await
                .map_err(|_| ProbeError::Timeout(format!("TLS handshake with {}", target.authority)))??;
            self.exchange(&mut stream, &request).await
        } else {
            let mut stream = tcp;
            self.exchange(&mut stream, &request).await
        }
    }

    async fn exchange<S>(
        &self,
        stream: &mut S,
        request: &[u8],
    ) -> std::result::Result<ProbeResponse, ProbeError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        timeout(self.config.write_timeout, async {
            stream.write_all(request).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| ProbeError::Timeout("sending request".to_string()))??;

        read_response(stream, &self.config).await
    }
}

#[async_trait]
impl ProbeTransport for ProbeClient {
    async fn get(&mut self, target: &Uri, user_agent: &str) -> Result<ProbeResponse> {
        Ok(self.fetch(target, user_agent).await?)
    }
}
