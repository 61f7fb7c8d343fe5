//! Response bodies: eager bytes or a lazily read source.

use bytes::Bytes;
use parking_lot::Mutex;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{InterceptError, Result};

/// Body of a canned response.
///
/// `Lazy` wraps a reader that is consumed at most once; the bytes are cached
/// on first read and shared by every clone of the body.
#[derive(Clone)]
pub enum Body {
    Bytes(Bytes),
    Lazy(Arc<LazySource>),
}

enum LazyState {
    Pending(Box<dyn Read + Send>),
    Ready(Bytes),
    Released,
}

/// Read-once body source. After the first full read its content is cached.
pub struct LazySource {
    state: Mutex<LazyState>,
    size_hint: Option<u64>,
    content_type: Option<String>,
}

impl LazySource {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            state: Mutex::new(LazyState::Pending(Box::new(reader))),
            size_hint: None,
            content_type: None,
        }
    }

    pub fn with_size_hint(mut self, size: u64) -> Self {
        self.size_hint = Some(size);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read the source to completion (first call only) and return the cached bytes.
    pub fn read(&self) -> Result<Bytes> {
        let mut state = self.state.lock();
        match &mut *state {
            LazyState::Ready(bytes) => Ok(bytes.clone()),
            LazyState::Released => Err(InterceptError::ResourceReleased),
            LazyState::Pending(reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                debug!("Materialized lazy body ({} bytes)", buf.len());
                let bytes = Bytes::from(buf);
                *state = LazyState::Ready(bytes.clone());
                Ok(bytes)
            }
        }
    }

    /// Length without consuming the source when it is known up front.
    pub fn len(&self) -> Result<u64> {
        {
            let state = self.state.lock();
            match &*state {
                LazyState::Ready(bytes) => return Ok(bytes.len() as u64),
                LazyState::Released => return Err(InterceptError::ResourceReleased),
                LazyState::Pending(_) => {
                    if let Some(size) = self.size_hint {
                        return Ok(size);
                    }
                }
            }
        }
        self.read().map(|bytes| bytes.len() as u64)
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// Drop the underlying reader if it was never read. Cached bytes survive.
    pub fn release(&self) {
        let mut state = self.state.lock();
        if matches!(*state, LazyState::Pending(_)) {
            debug!("Releasing unread lazy body source");
            *state = LazyState::Released;
        }
    }

    pub fn is_materialized(&self) -> bool {
        matches!(*self.state.lock(), LazyState::Ready(_))
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

impl fmt::Debug for LazySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.lock() {
            LazyState::Pending(_) => "pending",
            LazyState::Ready(_) => "ready",
            LazyState::Released => "released",
        };
        f.debug_struct("LazySource")
            .field("state", &state)
            .field("size_hint", &self.size_hint)
            .field("content_type", &self.content_type)
            .finish()
    }
}

impl Body {
    pub fn empty() -> Self {
        Body::Bytes(Bytes::new())
    }

    /// Lazily read body from any reader.
    pub fn reader(reader: impl Read + Send + 'static) -> Self {
        Body::Lazy(Arc::new(LazySource::new(reader)))
    }

    /// Lazily read body from a file. The file is opened now, read on first use,
    /// and its content type is guessed from the extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let source = LazySource::new(file)
            .with_size_hint(size)
            .with_content_type(guess_content_type(path));
        Ok(Body::Lazy(Arc::new(source)))
    }

    /// Fully resolved body bytes. Identical on every call.
    pub fn bytes(&self) -> Result<Bytes> {
        match self {
            Body::Bytes(bytes) => Ok(bytes.clone()),
            Body::Lazy(source) => source.read(),
        }
    }

    pub fn len(&self) -> Result<u64> {
        match self {
            Body::Bytes(bytes) => Ok(bytes.len() as u64),
            Body::Lazy(source) => source.len(),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    pub fn release(&self) {
        if let Body::Lazy(source) = self {
            source.release();
        }
    }

    /// Content type implied by the body source (file bodies only).
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Body::Bytes(_) => None,
            Body::Lazy(source) => source.content_type(),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Body::Lazy(source) => f.debug_tuple("Lazy").field(source).finish(),
        }
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(Bytes::from(s))
    }
}

impl From<&[u8]> for Body {
    fn from(b: &[u8]) -> Self {
        Body::Bytes(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(b))
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Bytes(b)
    }
}

impl From<&serde_json::Value> for Body {
    fn from(value: &serde_json::Value) -> Self {
        Body::from(value.to_string())
    }
}

/// Content type for a file path, from its extension.
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    /// Reader that counts how many times it has been asked for data.
    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        reads: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.reads
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_string_body_is_utf8() {
        let body = Body::from("{\"a\": \"€\"}");
        assert_eq!(
            body.bytes().unwrap().as_ref(),
            b"{\"a\": \"\xe2\x82\xac\"}"
        );
        assert_eq!(body.len().unwrap(), 12);
    }

    #[test]
    fn test_lazy_body_read_once_then_cached() {
        let reads = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let body = Body::reader(CountingReader {
            inner: Cursor::new(b"payload".to_vec()),
            reads: reads.clone(),
        });
        let first = body.bytes().unwrap();
        let after_first = reads.load(std::sync::atomic::Ordering::SeqCst);
        let second = body.clone().bytes().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_ref(), b"payload");
        assert_eq!(
            reads.load(std::sync::atomic::Ordering::SeqCst),
            after_first
        );
    }

    #[test]
    fn test_release_before_read_fails() {
        let body = Body::reader(Cursor::new(b"data".to_vec()));
        body.release();
        assert!(matches!(
            body.bytes(),
            Err(InterceptError::ResourceReleased)
        ));
    }

    #[test]
    fn test_release_after_read_keeps_cache() {
        let body = Body::reader(Cursor::new(b"data".to_vec()));
        assert_eq!(body.bytes().unwrap().as_ref(), b"data");
        body.release();
        assert_eq!(body.bytes().unwrap().as_ref(), b"data");
    }

    #[test]
    fn test_file_body_uses_size_hint_and_content_type() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&[0x89, b'P', b'N', b'G', 0, 1, 2, 3]).unwrap();
        let body = Body::from_file(file.path()).unwrap();
        assert_eq!(body.content_type(), Some("image/png"));
        assert_eq!(body.len().unwrap(), 8);
        if let Body::Lazy(source) = &body {
            assert!(!source.is_materialized());
        }
        assert_eq!(body.bytes().unwrap().len(), 8);
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type(Path::new("a/b.JSON")), "application/json");
        assert_eq!(guess_content_type(Path::new("noext")), "application/octet-stream");
    }
}
