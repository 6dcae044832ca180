//! Header echo endpoint
//!
//! This module provides an HTTP/1.1 server whose root handler answers
//! `GET /` with a JSON object holding every header of the incoming request.

pub mod codec;
pub mod config;
pub mod headers;
pub mod router;
pub mod server;


pub use codec::{HttpCodec, HttpCodecError, RequestHead};
pub use config::{DEFAULT_PORT, HttpConfig};
pub use headers::EchoedHeaders;
pub use server::HeaderEchoServer;
