use super::ProbeError;
use super::config::ClientConfig;
use bytes::{Buf, Bytes, BytesMut};
use http::StatusCode;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

const MAX_RESPONSE_HEADERS: usize = 64;

/// Status, headers and body of one probe request
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ProbeResponse {
    /// Body decoded as UTF-8, invalid sequences replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// First value of the named header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

struct ResponseHead {
    len: usize,
    status: StatusCode,
    headers: Vec<(String, String)>,
}

#[derive(Debug, PartialEq, Eq)]
enum BodyFraming {
    Empty,
    Length(usize),
    Chunked,
    UntilClose,
}

impl ResponseHead {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn framing(&self) -> Result<BodyFraming, ProbeError> {
        if self.status == StatusCode::NO_CONTENT || self.status == StatusCode::NOT_MODIFIED {
            return Ok(BodyFraming::Empty);
        }
        if let Some(te) = self.header("transfer-encoding") {
            if te
                .split(',')
                .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
            {
                return Ok(BodyFraming::Chunked);
            }
            return Ok(BodyFraming::UntilClose);
        }
        match self.header("content-length") {
            Some(raw) => raw.trim().parse().map(BodyFraming::Length).map_err(|_| {
                ProbeError::MalformedResponse(format!("invalid Content-Length {raw:?}"))
            }),
            None => Ok(BodyFraming::UntilClose),
        }
    }
}

fn parse_head(buf: &[u8]) -> Result<Option<ResponseHead>, ProbeError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_RESPONSE_HEADERS];
    let mut res = httparse::Response::new(&mut headers);

    let len = match res.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => return Err(ProbeError::MalformedResponse(e.to_string())),
    };

    let code = res
        .code
        .ok_or_else(|| ProbeError::MalformedResponse("missing status code".to_string()))?;
    let status = StatusCode::from_u16(code)
        .map_err(|e| ProbeError::MalformedResponse(e.to_string()))?;
    let headers = res
        .headers
        .iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();

    Ok(Some(ResponseHead {
        len,
        status,
        headers,
    }))
}

/// Decodes a complete `Transfer-Encoding: chunked` body.
///
/// Returns `Ok(None)` while the terminating chunk and trailer section have
/// not fully arrived.
pub(crate) fn decode_chunked(src: &[u8]) -> Result<Option<Bytes>, ProbeError> {
    let mut body = BytesMut::new();
    let mut pos = 0;

    loop {
        let (consumed, size) = match httparse::parse_chunk_size(&src[pos..]) {
            Ok(httparse::Status::Complete(parsed)) => parsed,
            Ok(httparse::Status::Partial) => return Ok(None),
            Err(_) => {
                return Err(ProbeError::MalformedResponse("invalid chunk size".to_string()));
            }
        };
        pos += consumed;

        if size == 0 {
            let trailer = &src[pos..];
            let done = trailer.starts_with(b"\r\n")
                || trailer.windows(4).any(|w| w == b"\r\n\r\n");
            return Ok(done.then(|| body.freeze()));
        }

        let end = usize::try_from(size)
            .ok()
            .and_then(|size| pos.checked_add(size))
            .ok_or_else(|| ProbeError::MalformedResponse("chunk too large".to_string()))?;
        if src.len() < end + 2 {
            return Ok(None);
        }
        if &src[end..end + 2] != b"\r\n" {
            return Err(ProbeError::MalformedResponse(
                "missing CRLF after chunk data".to_string(),
            ));
        }

        body.extend_from_slice(&src[pos..end]);
        pos = end + 2;
    }
}

/// Reads more bytes into `buf`, returning how many arrived (0 on EOF)
async fn read_some<S: AsyncRead + Unpin>(
    stream: &mut S,
    buf: &mut BytesMut,
    config: &ClientConfig,
) -> Result<usize, ProbeError> {
    buf.reserve(config.buffer_size);
    let n = match timeout(config.read_timeout, stream.read_buf(buf)).await {
        Ok(Ok(n)) => n,
        // TLS peers that close without close_notify
        Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => 0,
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProbeError::Timeout(format!(
                "no data from server within {:?}",
                config.read_timeout
            )));
        }
    };

    if buf.len() > config.max_response_size {
        return Err(ProbeError::ResponseTooLarge {
            size: buf.len(),
            max: config.max_response_size,
        });
    }
    Ok(n)
}

fn closed_early(what: &str) -> ProbeError {
    ProbeError::MalformedResponse(format!("connection closed before {what} was complete"))
}

/// Reads one full response from `stream`, skipping interim `1xx` responses.
pub(crate) async fn read_response<S: AsyncRead + Unpin>(
    stream: &mut S,
    config: &ClientConfig,
) -> Result<ProbeResponse, ProbeError> {
    let mut buf = BytesMut::with_capacity(config.buffer_size);

    let head = loop {
        match parse_head(&buf)? {
            Some(head) if head.status.is_informational() => buf.advance(head.len),
            Some(head) => break head,
            None => {
                if read_some(stream, &mut buf, config).await? == 0 {
                    return Err(closed_early("the response head"));
                }
            }
        }
    };
    buf.advance(head.len);

    let body = match head.framing()? {
        BodyFraming::Empty => Bytes::new(),
        BodyFraming::Length(len) => {
            if len > config.max_response_size {
                return Err(ProbeError::ResponseTooLarge {
                    size: len,
                    max: config.max_response_size,
                });
            }
            while buf.len() < len {
                if read_some(stream, &mut buf, config).await? == 0 {
                    return Err(closed_early("the body"));
                }
            }
            buf.truncate(len);
            buf.freeze()
        }
        BodyFraming::Chunked => loop {
            if let Some(body) = decode_chunked(&buf)? {
                break body;
            }
            if read_some(stream, &mut buf, config).await? == 0 {
                return Err(closed_early("the chunked body"));
            }
        },
        BodyFraming::UntilClose => {
            while read_some(stream, &mut buf, config).await? > 0 {}
            buf.freeze()
        }
    };

    Ok(ProbeResponse {
        status: head.status,
        headers: head.headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read(raw: &[u8]) -> Result<ProbeResponse, ProbeError> {
        let mut stream = raw;
        read_response(&mut stream, &ClientConfig::default()).await
    }

    #[tokio::test]
    async fn test_content_length_body() {
        let response = read(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello trailing")
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text(), "hello");
        assert_eq!(response.header("content-length"), Some("5"));
    }

    #[tokio::test]
    async fn test_chunked_body() {
        let response = read(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5;ext=1\r\npedia\r\n0\r\n\r\n",
        )
        .await
        .unwrap();

        assert_eq!(response.text(), "Wikipedia");
    }

    #[tokio::test]
    async fn test_body_until_close() {
        let response = read(b"HTTP/1.0 404 Not Found\r\n\r\nnot here").await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.text(), "not here");
    }

    #[tokio::test]
    async fn test_interim_response_is_skipped() {
        let response = read(b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 204 No Content\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_body_is_error() {
        let err = read(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort")
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_stream_is_error() {
        let err = read(b"").await.unwrap_err();
        assert!(matches!(err, ProbeError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_oversized_response_is_rejected() {
        let mut stream: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\n\r\n";
        let config = ClientConfig {
            max_response_size: 1024,
            ..Default::default()
        };
        let err = read_response(&mut stream, &config).await.unwrap_err();
        assert!(matches!(err, ProbeError::ResponseTooLarge { size: 4096, max: 1024 }));
    }

    #[test]
    fn test_decode_chunked_partial() {
        assert!(decode_chunked(b"4\r\nWi").unwrap().is_none());
        assert!(decode_chunked(b"4\r\nWiki\r\n0\r\n").unwrap().is_none());
        assert!(decode_chunked(b"zz\r\n").is_err());
        assert!(decode_chunked(b"4\r\nWikiXX").is_err());
    }

    #[test]
    fn test_decode_chunked_with_trailers() {
        let body = decode_chunked(b"3\r\nabc\r\n0\r\nX-Checksum: 1\r\n\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(&body[..], b"abc");
    }
}
