//! Incremental HTTP/1.x request parser.
//!
//! Bytes arrive through [`RequestParser::feed`] in whatever pieces the client
//! writes them. A request is complete once its head is terminated and its
//! body is framed by `Content-Length` or chunked encoding. Bodies are kept
//! byte-for-byte; multipart and other structured payloads are never parsed.

use bytes::{Buf, Bytes, BytesMut};

use super::chunked;
use crate::error::{InterceptError, Result};
use crate::headers::Headers;
use crate::registry::Method;

/// A fully received request.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub method: Method,
    /// Request target as sent (`/path?query`)
    pub target: String,
    pub path: String,
    pub query: String,
    pub version: String,
    pub headers: Headers,
    pub body: Bytes,
}

struct Head {
    method: Method,
    target: String,
    path: String,
    query: String,
    version: String,
    headers: Headers,
    /// Bytes occupied by the request line, headers and blank line
    len: usize,
}

enum Framing {
    Length(usize),
    Chunked,
    /// No framing headers; body runs until the caller ends the send
    UntilClose,
}

#[derive(Debug, Default)]
pub struct RequestParser {
    buf: BytesMut,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes received but not yet part of a complete request.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Take the next complete request off the buffer, if there is one.
    pub fn parse(&mut self) -> Result<Option<ParsedRequest>> {
        let Some(head) = parse_head(&self.buf)? else {
            return Ok(None);
        };

        let after_head = &self.buf[head.len..];
        let (body, consumed) = match framing(&head.headers)? {
            Framing::Length(len) => {
                if after_head.len() < len {
                    return Ok(None);
                }
                (Bytes::copy_from_slice(&after_head[..len]), len)
            }
            Framing::Chunked => match chunked::decode(after_head)? {
                Some((body, consumed)) => (body, consumed),
                None => return Ok(None),
            },
            // Without framing, a head with nothing after it carries no body.
            // Trailing bytes wait for `finish`.
            Framing::UntilClose if after_head.is_empty() => (Bytes::new(), 0),
            Framing::UntilClose => return Ok(None),
        };

        self.buf.advance(head.len + consumed);
        Ok(Some(head.into_request(body)))
    }

    /// The caller signalled end-of-send: whatever follows the head is the body.
    /// Returns `Ok(None)` when nothing is buffered.
    pub fn finish(&mut self) -> Result<Option<ParsedRequest>> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        if let Some(request) = self.parse()? {
            return Ok(Some(request));
        }
        let Some(head) = parse_head(&self.buf)? else {
            return Err(InterceptError::MalformedRequest(
                "connection closed before request head was complete".to_string(),
            ));
        };
        if !matches!(framing(&head.headers)?, Framing::UntilClose) {
            return Err(InterceptError::MalformedRequest(
                "connection closed before request body was complete".to_string(),
            ));
        }
        let body = Bytes::copy_from_slice(&self.buf[head.len..]);
        self.buf.clear();
        Ok(Some(head.into_request(body)))
    }
}

impl Head {
    fn into_request(self, body: Bytes) -> ParsedRequest {
        ParsedRequest {
            method: self.method,
            target: self.target,
            path: self.path,
            query: self.query,
            version: self.version,
            headers: self.headers,
            body,
        }
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn malformed(msg: impl Into<String>) -> InterceptError {
    InterceptError::MalformedRequest(msg.into())
}

fn parse_head(buf: &[u8]) -> Result<Option<Head>> {
    let Some(len) = find_head_end(buf) else {
        return Ok(None);
    };
    let text = std::str::from_utf8(&buf[..len - 4])
        .map_err(|_| malformed("request head is not valid UTF-8"))?;
    let mut lines = text.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed(format!("invalid request line '{request_line}'")));
    };
    if !version.starts_with("HTTP/") {
        return Err(malformed(format!("unsupported protocol version '{version}'")));
    }
    let method: Method = method.parse()?;

    let mut headers = Headers::new();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            return Err(malformed(format!("invalid header line '{line}'")));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(malformed("empty header name"));
        }
        headers.insert(name, value.trim());
    }

    let (path, query) = split_target(target);

    Ok(Some(Head {
        method,
        target: target.to_string(),
        path,
        query,
        version: version.to_string(),
        headers,
        len,
    }))
}

/// Split a request target into path and query. Absolute-form targets
/// (`http://host/path`) are reduced to their path; fragments are dropped.
pub fn split_target(target: &str) -> (String, String) {
    let without_fragment = target.split('#').next().unwrap_or_default();
    let origin_form = match without_fragment.find("://") {
        Some(scheme_end) => {
            let rest = &without_fragment[scheme_end + 3..];
            match rest.find(['/', '?']) {
                Some(idx) => &rest[idx..],
                None => "/",
            }
        }
        None => without_fragment,
    };
    let (path, query) = origin_form.split_once('?').unwrap_or((origin_form, ""));
    let path = if path.is_empty() { "/" } else { path };
    (path.to_string(), query.to_string())
}

fn framing(headers: &Headers) -> Result<Framing> {
    if headers.has_token("transfer-encoding", "chunked") {
        return Ok(Framing::Chunked);
    }
    match headers.get("content-length") {
        Some(value) => value
            .trim()
            .parse::<usize>()
            .map(Framing::Length)
            .map_err(|_| malformed(format!("invalid Content-Length '{value}'"))),
        None => Ok(Framing::UntilClose),
    }
}
