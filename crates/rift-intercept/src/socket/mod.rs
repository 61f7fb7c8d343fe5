//! In-memory socket that answers outbound traffic from a [`Session`].
//!
//! A [`MockSocket`] never touches the network. Bytes written to it are parsed
//! as requests, recorded in the session's capture log and answered with the
//! matching entry's next response. The serialized response is queued and
//! handed back by [`MockSocket::recv`] / [`std::io::Read`].

mod stream;

pub use stream::MockStream;

use bytes::{Bytes, BytesMut};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::codec::{self, ParsedRequest, Protocol, RequestParser};
use crate::error::{InterceptError, Result};
use crate::headers::Headers;
use crate::registry::{CapturedRequest, Location, Method, RequestKey, Session};
use crate::response::Response;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Peer {
    host: String,
    port: u16,
}

#[derive(Debug)]
pub struct MockSocket {
    session: Arc<Session>,
    peer: Option<Peer>,
    protocol: Protocol,
    parser: RequestParser,
    /// Serialized responses not yet read by the caller
    outbound: BytesMut,
    /// Responses answered on this connection
    served: Vec<Response>,
    write_closed: bool,
    closed: bool,
    timeout: Option<Duration>,
}

impl MockSocket {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            peer: None,
            protocol: Protocol::Http,
            parser: RequestParser::new(),
            outbound: BytesMut::new(),
            served: Vec::new(),
            write_closed: false,
            closed: false,
            timeout: None,
        }
    }

    /// Connect to `(host, port)`. Succeeds immediately while the session is
    /// active. Connecting an already connected socket starts over with the
    /// new destination.
    pub fn connect(&mut self, (host, port): (&str, u16)) -> Result<()> {
        if !self.session.is_active() {
            return Err(InterceptError::Inactive);
        }
        let host = host.to_ascii_lowercase();
        self.protocol = self.session.destination_protocol(&host, port);
        debug!(
            "Intercepted connect to {}:{} ({})",
            host,
            port,
            self.protocol.as_str()
        );
        self.peer = Some(Peer { host, port });
        self.parser.clear();
        self.outbound.clear();
        self.write_closed = false;
        self.closed = false;
        Ok(())
    }

    /// Connect to the destination named by a URL (`http://host:port/...`).
    pub fn connect_url(&mut self, url: &str) -> Result<()> {
        let location = Location::parse(url)?;
        self.connect((location.host.as_str(), location.port))
    }

    pub fn peer(&self) -> Option<(&str, u16)> {
        self.peer.as_ref().map(|p| (p.host.as_str(), p.port))
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn is_connected(&self) -> bool {
        self.peer.is_some() && !self.closed
    }

    fn connected_peer(&self) -> Result<Peer> {
        match &self.peer {
            Some(peer) if !self.closed => Ok(peer.clone()),
            _ => Err(InterceptError::NotConnected),
        }
    }

    /// Accept outbound bytes. Every request completed by these bytes is
    /// captured, resolved and answered before this returns; a failure to
    /// parse or match is reported here.
    pub fn send(&mut self, data: &[u8]) -> Result<usize> {
        let peer = self.connected_peer()?;
        if self.write_closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write side is shut down").into());
        }
        if data.is_empty() {
            return Ok(0);
        }
        trace!("send {} bytes to {}:{}", data.len(), peer.host, peer.port);

        match self.protocol {
            Protocol::Raw => self.answer_raw(&peer, Bytes::copy_from_slice(data))?,
            Protocol::Http => {
                self.parser.feed(data);
                loop {
                    let parsed = match self.parser.parse() {
                        Ok(Some(parsed)) => parsed,
                        Ok(None) => break,
                        Err(e) => {
                            self.parser.clear();
                            return Err(e);
                        }
                    };
                    self.answer_http(&peer, parsed)?;
                }
            }
        }
        Ok(data.len())
    }

    /// Up to `max` bytes of queued response data. Empty when nothing is
    /// queued; never blocks.
    pub fn recv(&mut self, max: usize) -> Result<Bytes> {
        self.connected_peer()?;
        let n = max.min(self.outbound.len());
        Ok(self.outbound.split_to(n).freeze())
    }

    /// Signal end-of-send. A request whose body had no framing is completed
    /// with whatever followed its head.
    pub fn shutdown_write(&mut self) -> Result<()> {
        let peer = self.connected_peer()?;
        if self.write_closed {
            return Ok(());
        }
        self.write_closed = true;
        if self.protocol == Protocol::Http {
            let parsed = self.parser.finish().inspect_err(|_| self.parser.clear())?;
            if let Some(parsed) = parsed {
                self.answer_http(&peer, parsed)?;
            }
        }
        Ok(())
    }

    /// Stored for callers that set one; an intercepted socket never waits.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Close the connection, dropping queued bytes and releasing body sources
    /// of the responses served here. Later sends and receives fail with
    /// [`InterceptError::NotConnected`].
    ///
    /// A served response may be shared with its entry (a HEAD answer never
    /// reads the body), so its source is cached before the reader is dropped.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.parser.clear();
        self.outbound.clear();
        for response in self.served.drain(..) {
            if let Err(e) = response.body_bytes() {
                debug!("Body of served response unavailable at close: {}", e);
            }
            response.release();
        }
        if let Some(peer) = &self.peer {
            debug!("Closed intercepted connection to {}:{}", peer.host, peer.port);
        }
    }

    /// Response bytes waiting to be read.
    pub fn pending(&self) -> usize {
        self.outbound.len()
    }

    /// Number of requests answered on this connection.
    pub fn served(&self) -> usize {
        self.served.len()
    }

    pub(crate) fn is_write_closed(&self) -> bool {
        self.write_closed
    }

    pub(crate) fn has_partial_request(&self) -> bool {
        self.parser.buffered() > 0
    }

    fn answer_http(&mut self, peer: &Peer, parsed: ParsedRequest) -> Result<()> {
        let head_only = parsed.method == Method::HEAD;
        let key = RequestKey::new(
            parsed.method.clone(),
            &peer.host,
            peer.port,
            &parsed.path,
            &parsed.query,
        );

        self.session.record_request(CapturedRequest {
            protocol: Protocol::Http,
            method: parsed.method,
            host: peer.host.clone(),
            port: peer.port,
            path: parsed.path,
            query: parsed.query,
            version: parsed.version,
            headers: parsed.headers,
            body: parsed.body,
            timestamp: self.session.clock().now(),
        });

        let response = self.session.resolve(&key)?;
        let version = &self.session.config().http_version;
        let bytes = codec::encode_response(Protocol::Http, &response, version, head_only)?;
        self.outbound.extend_from_slice(&bytes);
        self.served.push(response);
        Ok(())
    }

    fn answer_raw(&mut self, peer: &Peer, payload: Bytes) -> Result<()> {
        self.session.record_request(CapturedRequest {
            protocol: Protocol::Raw,
            method: Method::RAW,
            host: peer.host.clone(),
            port: peer.port,
            path: "/".to_string(),
            query: String::new(),
            version: String::new(),
            headers: Headers::new(),
            body: payload,
            timestamp: self.session.clock().now(),
        });

        let key = RequestKey::new(Method::RAW, &peer.host, peer.port, "/", "");
        let response = self.session.resolve(&key)?;
        let bytes = codec::encode_response(Protocol::Raw, &response, "", false)?;
        self.outbound.extend_from_slice(&bytes);
        self.served.push(response);
        Ok(())
    }
}

impl io::Read for MockSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes = self.recv(buf.len())?;
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }
}

impl io::Write for MockSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.send(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MockSocket {
    fn drop(&mut self) {
        self.close();
    }
}
