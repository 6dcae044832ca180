use bytes::{Buf, BufMut, Bytes, BytesMut};
use http::header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{Method, Response, Version};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

#[derive(Debug, thiserror::Error)]
pub enum HttpCodecError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed request: {0}")]
    Malformed(String),
    #[error("Too many request headers (limit {0})")]
    TooManyHeaders(usize),
    #[error("Request head exceeds {0} bytes")]
    HeadTooLarge(usize),
    #[error("Transfer-Encoding request bodies are not supported")]
    UnsupportedTransferEncoding,
}

/// Parsed request line and header block of one HTTP/1.x request
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    /// Request target exactly as sent, query string included
    pub target: String,
    pub version: Version,
    /// Header fields in arrival order, names as spelled by the client
    pub headers: Vec<(String, Vec<u8>)>,
}

impl RequestHead {
    /// First value of the named header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// Target with the query string removed
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }

    /// The User-Agent header as text, or `""` when absent
    pub fn user_agent(&self) -> String {
        self.header("user-agent")
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .unwrap_or_default()
    }

    /// Whether the connection should stay open after this request
    pub fn keep_alive(&self) -> bool {
        let connection = self
            .header("connection")
            .map(|v| String::from_utf8_lossy(v).to_ascii_lowercase());
        let has_token = |token: &str| {
            connection
                .as_deref()
                .is_some_and(|v| v.split(',').any(|t| t.trim() == token))
        };

        match self.version {
            Version::HTTP_10 => has_token("keep-alive"),
            _ => !has_token("close"),
        }
    }

    fn content_length(&self) -> Result<usize, HttpCodecError> {
        match self.header("content-length") {
            None => Ok(0),
            Some(raw) => std::str::from_utf8(raw)
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .ok_or_else(|| HttpCodecError::Malformed("invalid Content-Length".to_string())),
        }
    }
}

/// Frames HTTP/1.x request heads off a byte stream and writes responses
///
/// Request bodies announced with `Content-Length` are skipped so that the
/// next request on a persistent connection starts at the right offset.
#[derive(Debug)]
pub struct HttpCodec {
    max_head: usize,
    max_headers: usize,
    body_remaining: usize,
}

impl HttpCodec {
    pub fn new(max_head: usize, max_headers: usize) -> Self {
        Self {
            max_head,
            max_headers,
            body_remaining: 0,
        }
    }

    /// Drops body bytes of the previous request that are already buffered
    fn skip_body(&mut self, src: &mut BytesMut) {
        let n = self.body_remaining.min(src.len());
        src.advance(n);
        self.body_remaining -= n;
    }
}

impl Decoder for HttpCodec {
    type Item = RequestHead;
    type Error = HttpCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.skip_body(src);
        if self.body_remaining > 0 || src.is_empty() {
            return Ok(None);
        }

        let mut headers = vec![httparse::EMPTY_HEADER; self.max_headers];
        let mut req = httparse::Request::new(&mut headers);

        let parsed_len = match req.parse(src) {
            Ok(httparse::Status::Complete(len)) => len,
            Ok(httparse::Status::Partial) => {
                if src.len() > self.max_head {
                    return Err(HttpCodecError::HeadTooLarge(self.max_head));
                }
                return Ok(None);
            }
            Err(httparse::Error::TooManyHeaders) => {
                return Err(HttpCodecError::TooManyHeaders(self.max_headers));
            }
            Err(e) => return Err(HttpCodecError::Malformed(e.to_string())),
        };

        if parsed_len > self.max_head {
            return Err(HttpCodecError::HeadTooLarge(self.max_head));
        }

        let method = req
            .method
            .ok_or_else(|| HttpCodecError::Malformed("missing method".to_string()))
            .and_then(|m| {
                Method::from_bytes(m.as_bytes())
                    .map_err(|e| HttpCodecError::Malformed(e.to_string()))
            })?;
        let target = req
            .path
            .ok_or_else(|| HttpCodecError::Malformed("missing request target".to_string()))?
            .to_string();
        let version = match req.version {
            Some(0) => Version::HTTP_10,
            _ => Version::HTTP_11,
        };
        let headers = req
            .headers
            .iter()
            .map(|h| (h.name.to_string(), h.value.to_vec()))
            .collect();

        let head = RequestHead {
            method,
            target,
            version,
            headers,
        };

        if head.header(TRANSFER_ENCODING.as_str()).is_some() {
            return Err(HttpCodecError::UnsupportedTransferEncoding);
        }
        self.body_remaining = head.content_length()?;

        src.advance(parsed_len);
        self.skip_body(src);

        Ok(Some(head))
    }
}

impl Encoder<Response<Bytes>> for HttpCodec {
    type Error = HttpCodecError;

    /// Writes status line, headers and body.
    ///
    /// A `Content-Length` already present on the response is kept as is,
    /// which is how `HEAD` responses advertise the size of the `GET` body
    /// they omit.
    fn encode(&mut self, item: Response<Bytes>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (parts, body) = item.into_parts();

        let status = parts.status;
        dst.put_slice(b"HTTP/1.1 ");
        dst.put_slice(status.as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(status.canonical_reason().unwrap_or("Unknown").as_bytes());
        dst.put_slice(b"\r\n");

        for (name, value) in parts.headers.iter() {
            dst.put_slice(name.as_str().as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        if !parts.headers.contains_key(CONTENT_LENGTH) {
            dst.put_slice(format!("content-length: {}\r\n", body.len()).as_bytes());
        }
        if !parts.headers.contains_key(CONNECTION) {
            dst.put_slice(b"connection: keep-alive\r\n");
        }
        dst.put_slice(b"\r\n");
        dst.put_slice(&body);

        Ok(())
    }
}
