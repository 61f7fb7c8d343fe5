//! Error types for the interception engine.

use std::io;

/// Errors raised by registration, matching, protocol handling and the socket
/// interceptor.
#[derive(Debug, thiserror::Error)]
pub enum InterceptError {
    #[error("Invalid URL '{url}': {reason}")]
    Parse { url: String, reason: String },
    #[error("No entry registered for {method} {host}:{port}{path}")]
    NoMatch {
        method: String,
        host: String,
        port: u16,
        path: String,
    },
    #[error("Body source has already been released")]
    ResourceReleased,
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
    #[error("Interception is not active")]
    Inactive,
    #[error("Socket is not connected")]
    NotConnected,
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = InterceptError> = std::result::Result<T, E>;

impl InterceptError {
    pub(crate) fn parse(url: &str, reason: impl Into<String>) -> Self {
        InterceptError::Parse {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// The `io::ErrorKind` a real socket would report for this failure.
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            InterceptError::NoMatch { .. } => io::ErrorKind::ConnectionRefused,
            InterceptError::Inactive | InterceptError::NotConnected => io::ErrorKind::NotConnected,
            InterceptError::MalformedRequest(_) => io::ErrorKind::InvalidData,
            InterceptError::Io(e) => e.kind(),
            _ => io::ErrorKind::Other,
        }
    }
}

impl From<InterceptError> for io::Error {
    fn from(err: InterceptError) -> Self {
        match err {
            InterceptError::Io(e) => e,
            other => io::Error::new(other.io_kind(), other),
        }
    }
}
