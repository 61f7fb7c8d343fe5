//! `Transfer-Encoding: chunked` framing.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{InterceptError, Result};

/// Chunk size used when framing response bodies.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Decode a chunked body from the start of `buf`.
///
/// Returns `Ok(None)` while the body is incomplete, otherwise the decoded
/// payload and the number of bytes of `buf` the framing occupied (trailers
/// included).
pub fn decode(buf: &[u8]) -> Result<Option<(Bytes, usize)>> {
    let mut out = BytesMut::new();
    let mut pos = 0;

    loop {
        let Some(line_len) = find_crlf(&buf[pos..]) else {
            return Ok(None);
        };
        let line = std::str::from_utf8(&buf[pos..pos + line_len])
            .map_err(|_| InterceptError::MalformedRequest("non-ASCII chunk size".to_string()))?;
        let size_str = line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_str, 16).map_err(|_| {
            InterceptError::MalformedRequest(format!("invalid chunk size '{size_str}'"))
        })?;
        pos += line_len + 2;

        if size == 0 {
            // Trailer section ends with an empty line
            loop {
                let Some(trailer_len) = find_crlf(&buf[pos..]) else {
                    return Ok(None);
                };
                pos += trailer_len + 2;
                if trailer_len == 0 {
                    return Ok(Some((out.freeze(), pos)));
                }
            }
        }

        let Some(end) = pos.checked_add(size).and_then(|end| end.checked_add(2)) else {
            return Err(InterceptError::MalformedRequest(
                "chunk size too large".to_string(),
            ));
        };
        if buf.len() < end {
            return Ok(None);
        }
        out.put_slice(&buf[pos..pos + size]);
        pos += size;
        if &buf[pos..pos + 2] != b"\r\n" {
            return Err(InterceptError::MalformedRequest(
                "chunk not terminated by CRLF".to_string(),
            ));
        }
        pos += 2;
    }
}

/// Frame `body` as chunks of at most `chunk_size` bytes followed by the
/// terminating zero-length chunk.
pub fn encode(body: &[u8], chunk_size: usize) -> Bytes {
    let chunk_size = chunk_size.max(1);
    let mut out = BytesMut::with_capacity(body.len() + 16 * (body.len() / chunk_size + 2));
    for chunk in body.chunks(chunk_size) {
        out.put_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        out.put_slice(chunk);
        out.put_slice(b"\r\n");
    }
    out.put_slice(b"0\r\n\r\n");
    out.freeze()
}
