//! Rift Intercept: in-memory socket interception for tests.
//!
//! Register expected requests and canned responses on a [`Session`], enter a
//! scope, and hand the code under test a [`MockTransport`] (or a
//! [`MockSocket`] / [`MockStream`] directly). Outbound bytes are parsed,
//! captured and answered without touching the network.
//!
//! ```
//! use std::io::{Read, Write};
//! use std::sync::Arc;
//! use rift_intercept::{Method, MockSocket, Session};
//!
//! let session = Arc::new(Session::new());
//! let _guard = session.enter();
//! session
//!     .single_register(Method::GET, "http://testme.org/hello", Some("world".into()), None, 200)
//!     .unwrap();
//!
//! let mut socket = MockSocket::new(Arc::clone(&session));
//! socket.connect(("testme.org", 80)).unwrap();
//! socket.write_all(b"GET /hello HTTP/1.1\r\nHost: testme.org\r\n\r\n").unwrap();
//!
//! let mut reply = String::new();
//! socket.read_to_string(&mut reply).unwrap();
//! assert!(reply.ends_with("world"));
//! assert_eq!(session.last_request().unwrap().path, "/hello");
//! ```

// ===== Core =====
pub mod clock;
pub mod config;
pub mod error;
pub mod headers;
pub mod registry;
pub mod response;

// ===== Wire and connections =====
pub mod codec;
pub mod socket;
pub mod transport;

// ===== Harness helpers =====
pub mod fixtures;
pub mod scope;

pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::Protocol;
pub use config::InterceptConfig;
pub use error::{InterceptError, Result};
pub use fixtures::Fixture;
pub use headers::Headers;
pub use registry::{CapturedRequest, Entry, EntryKind, Method, RequestKey, Session};
pub use response::{Body, Response, ResponseBuilder};
pub use scope::{with_mocking, MockGuard};
pub use socket::{MockSocket, MockStream};
pub use transport::{Connection, MockTransport, TcpTransport, Transport};
