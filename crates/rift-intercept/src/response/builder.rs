use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::body::Body;
use super::{Response, Synthesis};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::headers::Headers;

/// Builder for [`Response`].
///
/// ```
/// use rift_intercept::Response;
///
/// let response = Response::builder()
///     .status(404)
///     .header("Content-Type", "application/json")
///     .body(r#"{"error": "not found"}"#)
///     .build();
/// assert_eq!(response.status(), 404);
/// ```
pub struct ResponseBuilder {
    status: u16,
    headers: Headers,
    body: Body,
    elapsed: Duration,
    clock: Arc<dyn Clock>,
    synthesis: Synthesis,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        ResponseBuilder {
            status: 200,
            headers: Headers::new(),
            body: Body::empty(),
            elapsed: Duration::ZERO,
            clock: Arc::new(SystemClock),
            synthesis: Synthesis::default(),
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn merge_headers<H, K, V>(mut self, headers: H) -> Self
    where
        H: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.extend(headers);
        self
    }

    pub fn content_type(self, content_type: impl Into<String>) -> Self {
        self.header("Content-Type", content_type)
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body; sets `Content-Type: application/json` unless already set.
    pub fn json(mut self, value: &serde_json::Value) -> Self {
        self.body = Body::from(value);
        if !self.headers.contains("content-type") {
            self.headers.insert("Content-Type", "application/json");
        }
        self
    }

    /// Lazily read file body.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        self.body = Body::from_file(path)?;
        Ok(self)
    }

    /// Reported round-trip time. Informational only; nothing ever sleeps on it.
    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub(crate) fn synthesis(mut self, synthesis: Synthesis) -> Self {
        self.synthesis = synthesis;
        self
    }

    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
            date: self.clock.now(),
            elapsed: self.elapsed,
            synthesis: self.synthesis,
        }
    }
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
