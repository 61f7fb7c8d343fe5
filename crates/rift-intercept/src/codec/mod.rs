//! Wire codecs: parse outbound bytes into requests and serialize canned
//! responses back into bytes.
//!
//! Two protocols are supported:
//! - `Http`: HTTP/1.x requests and responses
//! - `Raw`: opaque payloads; each write is one request and the response is
//!   just the body bytes

pub mod chunked;
pub mod request;
pub mod response;

pub use request::{split_target, ParsedRequest, RequestParser};

use bytes::Bytes;

use crate::error::Result;
use crate::response::Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    #[default]
    Http,
    Raw,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Raw => "raw",
        }
    }
}

/// Serialize a response for the given protocol.
pub fn encode_response(
    protocol: Protocol,
    response: &Response,
    version: &str,
    head_only: bool,
) -> Result<Bytes> {
    match protocol {
        Protocol::Http => response::serialize(response, version, head_only),
        Protocol::Raw => response.body_bytes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_response_is_body_only() {
        let response = Response::bytes("+PONG\r\n");
        let bytes = encode_response(Protocol::Raw, &response, "HTTP/1.1", false).unwrap();
        assert_eq!(bytes.as_ref(), b"+PONG\r\n");
    }

    #[test]
    fn test_http_response_has_status_line() {
        let bytes = encode_response(Protocol::Http, &Response::new(), "HTTP/1.0", false).unwrap();
        assert!(bytes.starts_with(b"HTTP/1.0 200 OK\r\n"));
    }
}
