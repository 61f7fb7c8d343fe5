//! Type definitions for the entry registry.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use url::Url;

use super::query::{normalize_query, query_pairs};
use crate::codec::Protocol;
use crate::error::{InterceptError, Result};
use crate::headers::Headers;

// ============================================================================
// Method
// ============================================================================

/// Request method token. Always stored uppercase and compared case-sensitively
/// on that form, so `Method::new("get") == Method::GET`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Method(Cow<'static, str>);

impl Method {
    pub const GET: Method = Method(Cow::Borrowed("GET"));
    pub const POST: Method = Method(Cow::Borrowed("POST"));
    pub const PUT: Method = Method(Cow::Borrowed("PUT"));
    pub const DELETE: Method = Method(Cow::Borrowed("DELETE"));
    pub const HEAD: Method = Method(Cow::Borrowed("HEAD"));
    pub const OPTIONS: Method = Method(Cow::Borrowed("OPTIONS"));
    pub const PATCH: Method = Method(Cow::Borrowed("PATCH"));
    pub const CONNECT: Method = Method(Cow::Borrowed("CONNECT"));
    pub const TRACE: Method = Method(Cow::Borrowed("TRACE"));
    /// Pseudo-method recorded for opaque (non-HTTP) payloads.
    pub const RAW: Method = Method(Cow::Borrowed("RAW"));

    pub fn new(token: &str) -> Self {
        Method(Cow::Owned(token.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Method {
    type Err = InterceptError;

    /// Strict parse: the token must be non-empty and contain only HTTP token
    /// characters.
    fn from_str(s: &str) -> Result<Self> {
        let valid = !s.is_empty()
            && s
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
        if valid {
            Ok(Method::new(s))
        } else {
            Err(InterceptError::MalformedRequest(format!(
                "invalid method token '{s}'"
            )))
        }
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        Method::new(s)
    }
}

impl From<String> for Method {
    fn from(s: String) -> Self {
        Method::new(&s)
    }
}

impl From<&Method> for Method {
    fn from(m: &Method) -> Self {
        m.clone()
    }
}

// ============================================================================
// Scheme and Location
// ============================================================================

/// Transport tag of a registered URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
    /// Opaque byte protocol over TCP
    Tcp,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Tcp => "tcp",
        }
    }

    /// Parse scheme from URL scheme
    pub fn from_scheme(scheme: &str) -> std::result::Result<Self, String> {
        match scheme.to_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            "tcp" => Ok(Scheme::Tcp),
            _ => Err(format!("Unsupported scheme: {scheme}")),
        }
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            Scheme::Http => Some(80),
            Scheme::Https => Some(443),
            Scheme::Tcp => None,
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Scheme::Http | Scheme::Https => Protocol::Http,
            Scheme::Tcp => Protocol::Raw,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed registration URL: `scheme://host[:port][/path][?query][#fragment]`.
/// The fragment is discarded and the query is normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub query: String,
}

impl Location {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| InterceptError::parse(raw, e.to_string()))?;
        let scheme =
            Scheme::from_scheme(url.scheme()).map_err(|reason| InterceptError::parse(raw, reason))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| InterceptError::parse(raw, "missing host"))?
            .to_ascii_lowercase();
        let port = url
            .port()
            .or_else(|| scheme.default_port())
            .ok_or_else(|| InterceptError::parse(raw, "missing port"))?;
        let path = match url.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };
        let query = url.query().map(normalize_query).unwrap_or_default();

        Ok(Location {
            scheme,
            host,
            port,
            path,
            query,
        })
    }

    pub fn destination(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

impl FromStr for Location {
    type Err = InterceptError;

    fn from_str(s: &str) -> Result<Self> {
        Location::parse(s)
    }
}

// ============================================================================
// Request key and captured requests
// ============================================================================

/// What the matcher looks at for one outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestKey {
    pub method: Method,
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Normalized query (see [`normalize_query`])
    pub query: String,
}

impl RequestKey {
    pub fn new(method: impl Into<Method>, host: &str, port: u16, path: &str, query: &str) -> Self {
        Self {
            method: method.into(),
            host: host.to_ascii_lowercase(),
            port,
            path: if path.is_empty() { "/" } else { path }.to_string(),
            query: normalize_query(query),
        }
    }

    /// Key built from a URL, e.g. `RequestKey::from_url(Method::GET, "http://h/p?b=2&a=1")`.
    pub fn from_url(method: impl Into<Method>, url: &str) -> Result<Self> {
        let location = Location::parse(url)?;
        Ok(Self {
            method: method.into(),
            host: location.host,
            port: location.port,
            path: location.path,
            query: location.query,
        })
    }
}

/// An outbound request observed by the interceptor. Immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedRequest {
    pub protocol: Protocol,
    pub method: Method,
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Query string exactly as sent (not normalized)
    pub query: String,
    pub version: String,
    pub headers: Headers,
    pub body: Bytes,
    pub timestamp: DateTime<Utc>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Decoded query pairs, sorted.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        query_pairs(&self.query)
    }

    /// Body as UTF-8 text, if it is valid UTF-8.
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.host, self.port, &self.path, &self.query)
    }
}
