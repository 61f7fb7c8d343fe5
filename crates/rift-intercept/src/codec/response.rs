//! Serialization of canned responses into HTTP/1.x bytes.

use bytes::{BufMut, Bytes, BytesMut};

use super::chunked;
use crate::error::Result;
use crate::response::Response;

/// Serialize `response` as `<version> <code> <reason>`, headers, blank line,
/// body. With `head_only` (answers to `HEAD`) the body is omitted but the
/// headers still describe it.
pub fn serialize(response: &Response, version: &str, head_only: bool) -> Result<Bytes> {
    let headers = response.headers()?;
    let body = if head_only {
        Bytes::new()
    } else if response.is_chunked() {
        chunked::encode(&response.body_bytes()?, chunked::DEFAULT_CHUNK_SIZE)
    } else {
        response.body_bytes()?
    };

    let mut out = BytesMut::with_capacity(128 + body.len());
    out.put_slice(format!("{} {} {}\r\n", version, response.status(), response.reason()).as_bytes());
    for (name, value) in headers.iter() {
        out.put_slice(name.as_bytes());
        out.put_slice(b": ");
        out.put_slice(value.as_bytes());
        out.put_slice(b"\r\n");
    }
    out.put_slice(b"\r\n");
    out.put_slice(&body);
    Ok(out.freeze())
}
