//! Canned replies handed out by registered entries.
//!
//! A [`Response`] never changes after it is built. The wire-level header set
//! is derived on demand by [`Response::headers`], which fills in the fixed
//! synthesized headers the caller left out.

mod body;
mod builder;

pub use body::{guess_content_type, Body, LazySource};
pub use builder::ResponseBuilder;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::clock::http_date;
use crate::config::{InterceptConfig, DEFAULT_CONTENT_TYPE, DEFAULT_SERVER_HEADER};
use crate::error::Result;
use crate::headers::Headers;

/// Parameters for synthesized headers that come from session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Synthesis {
    pub server: String,
    pub default_content_type: String,
}

impl Default for Synthesis {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER_HEADER.to_string(),
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

impl From<&InterceptConfig> for Synthesis {
    fn from(config: &InterceptConfig) -> Self {
        Self {
            server: config.server_header.clone(),
            default_content_type: config.default_content_type.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: Headers,
    body: Body,
    date: DateTime<Utc>,
    elapsed: Duration,
    synthesis: Synthesis,
}

impl Response {
    /// Empty `200` response.
    pub fn new() -> Self {
        ResponseBuilder::new().build()
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    pub fn with_status(status: u16) -> Self {
        ResponseBuilder::new().status(status).build()
    }

    /// `200` response with a UTF-8 text body.
    pub fn text(body: impl Into<String>) -> Self {
        let body: String = body.into();
        ResponseBuilder::new().body(body).build()
    }

    /// `200` response with a raw byte body.
    pub fn bytes(body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        ResponseBuilder::new().body(body).build()
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase for the status line.
    pub fn reason(&self) -> &'static str {
        hyper::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
    }

    /// Headers exactly as the caller supplied them.
    pub fn caller_headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Fully resolved body. Lazy sources are read once and cached.
    pub fn body_bytes(&self) -> Result<Bytes> {
        self.body.bytes()
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_chunked(&self) -> bool {
        self.headers.has_token("transfer-encoding", "chunked")
    }

    /// Final header set as emitted on the wire.
    ///
    /// Synthesized keys come first in fixed order (`Status`, `Date`,
    /// `Connection`, `Server`, `Content-Length`, `Content-Type`); a caller
    /// header with the same name takes that slot with its own casing and value.
    /// Remaining caller headers follow in insertion order. A caller-declared
    /// `Content-Length` is emitted verbatim even if it disagrees with the body.
    pub fn headers(&self) -> Result<Headers> {
        let mut out = Headers::new();

        let content_length = if self.is_chunked() || self.headers.contains("content-length") {
            None
        } else {
            Some(self.body.len()?.to_string())
        };
        let content_type = self
            .body
            .content_type()
            .unwrap_or(&self.synthesis.default_content_type)
            .to_string();
        let synthesized: [(&str, Option<String>); 6] = [
            ("Status", Some(self.status.to_string())),
            ("Date", Some(http_date(self.date))),
            ("Connection", Some("close".to_string())),
            ("Server", Some(self.synthesis.server.clone())),
            ("Content-Length", content_length),
            ("Content-Type", Some(content_type)),
        ];

        for (name, value) in synthesized {
            match self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
                Some((k, v)) => out.insert(k, v),
                None => {
                    if let Some(value) = value {
                        out.insert(name, value);
                    }
                }
            }
        }
        for (name, value) in self.headers.iter() {
            if !out.contains(name) {
                out.insert(name, value);
            }
        }
        Ok(out)
    }

    /// Release a never-read lazy body source.
    pub fn release(&self) {
        self.body.release();
    }

    pub(crate) fn apply_config(&mut self, config: &InterceptConfig) {
        self.synthesis = Synthesis::from(config);
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
