use super::codec::{HttpCodecError, RequestHead};
use super::headers::EchoedHeaders;
use crate::security::policy::{DENIED_BODY, UserAgentPolicy, Verdict};
use bytes::Bytes;
use http::header::{ALLOW, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HeaderValue, SERVER};
use http::{Method, Response, StatusCode};
use tracing::{error, warn};

const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";

/// Everything a request handler may read besides the request itself
#[derive(Debug, Clone)]
pub struct RouteContext {
    pub policy: UserAgentPolicy,
    pub server_name: Option<HeaderValue>,
}

impl RouteContext {
    pub fn new(policy: UserAgentPolicy, server_name: Option<&str>) -> Self {
        Self {
            policy,
            server_name: server_name.and_then(|name| HeaderValue::from_str(name).ok()),
        }
    }

    fn finish(&self, mut response: Response<Bytes>) -> Response<Bytes> {
        if let Some(name) = &self.server_name {
            response.headers_mut().insert(SERVER, name.clone());
        }
        response
    }
}

/// Dispatches a request to its handler and returns the response to send.
///
/// Only the root path is bound; it serves `GET`, `HEAD` and `OPTIONS`.
pub fn route(head: &RequestHead, ctx: &RouteContext) -> Response<Bytes> {
    let user_agent = head.user_agent();
    if let Verdict::Deny { reason } = ctx.policy.evaluate(&user_agent) {
        warn!(%user_agent, %reason, "Request denied by User-Agent policy");
        return ctx.finish(plain(StatusCode::FORBIDDEN, DENIED_BODY));
    }

    let response = match (head.path(), &head.method) {
        ("/", &Method::GET) => echo_headers(head),
        ("/", &Method::HEAD) => without_body(echo_headers(head)),
        ("/", &Method::OPTIONS) => allow(StatusCode::OK, Bytes::new()),
        ("/", method) => allow(
            StatusCode::METHOD_NOT_ALLOWED,
            Bytes::from(format!("Method {method} is not allowed for this URL.\n")),
        ),
        _ => plain(StatusCode::NOT_FOUND, "The requested URL was not found on the server.\n"),
    };

    ctx.finish(response)
}

/// Response for a request that could not be framed; the connection is closed after it.
pub fn error_response(err: &HttpCodecError, ctx: &RouteContext) -> Response<Bytes> {
    let status = match err {
        HttpCodecError::Malformed(_) => StatusCode::BAD_REQUEST,
        HttpCodecError::TooManyHeaders(_) | HttpCodecError::HeadTooLarge(_) => {
            StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
        }
        HttpCodecError::UnsupportedTransferEncoding => StatusCode::NOT_IMPLEMENTED,
        HttpCodecError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut response = plain(status, &format!("{err}\n"));
    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("close"));
    ctx.finish(response)
}

/// The echo handler: every request header as a JSON object.
fn echo_headers(head: &RequestHead) -> Response<Bytes> {
    match EchoedHeaders::from_head(head).to_json() {
        Ok(body) => build(StatusCode::OK, "application/json", Bytes::from(body)),
        // String-keyed maps always serialize
        Err(e) => {
            error!(error = %e, "Failed to render headers");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error\n")
        }
    }
}

fn without_body(response: Response<Bytes>) -> Response<Bytes> {
    let (mut parts, body) = response.into_parts();
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    Response::from_parts(parts, Bytes::new())
}

fn allow(status: StatusCode, body: Bytes) -> Response<Bytes> {
    let mut response = build(status, "text/plain; charset=utf-8", body);
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    response
}

fn plain(status: StatusCode, body: &str) -> Response<Bytes> {
    build(status, "text/plain; charset=utf-8", Bytes::from(body.to_string()))
}

fn build(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Bytes> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
