//! Pluggable connection providers.
//!
//! Code that opens outbound connections takes a `&dyn Transport` instead of
//! calling `TcpStream::connect` directly. Production wires in
//! [`TcpTransport`]; tests hand out a [`MockTransport`] from an active
//! [`MockGuard`](crate::scope::MockGuard) and every connection is answered
//! from the session's registry.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::registry::Session;
use crate::socket::MockSocket;

/// A bidirectional byte stream opened by a [`Transport`].
pub trait Connection: Read + Write + Send {
    /// Signal that no more bytes will be written.
    fn shutdown_write(&mut self) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;
}

/// Opens outbound connections.
pub trait Transport: Send + Sync {
    fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> io::Result<Box<dyn Connection>>;
}

// ===== Real network =====

#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransport;

impl Transport for TcpTransport {
    fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> io::Result<Box<dyn Connection>> {
        let stream = match timeout {
            Some(timeout) => {
                let addr = (host, port).to_socket_addrs()?.next().ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::AddrNotAvailable,
                        format!("{host}:{port} did not resolve"),
                    )
                })?;
                let stream = TcpStream::connect_timeout(&addr, timeout)?;
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                stream
            }
            None => TcpStream::connect((host, port))?,
        };
        Ok(Box::new(stream))
    }
}

impl Connection for TcpStream {
    fn shutdown_write(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Write)
    }

    fn close(&mut self) -> io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

// ===== Interception =====

/// Transport whose connections are answered by a [`Session`].
#[derive(Debug, Clone)]
pub struct MockTransport {
    session: Arc<Session>,
}

impl MockTransport {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Like [`Transport::connect`] but returns the concrete socket.
    pub fn connect_socket(
        &self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> io::Result<MockSocket> {
        let mut socket = MockSocket::new(Arc::clone(&self.session));
        socket.set_timeout(timeout);
        socket.connect((host, port))?;
        Ok(socket)
    }
}

impl Transport for MockTransport {
    fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> io::Result<Box<dyn Connection>> {
        debug!("MockTransport connect {}:{}", host, port);
        Ok(Box::new(self.connect_socket(host, port, timeout)?))
    }
}

impl Connection for MockSocket {
    fn shutdown_write(&mut self) -> io::Result<()> {
        Ok(MockSocket::shutdown_write(self)?)
    }

    fn close(&mut self) -> io::Result<()> {
        MockSocket::close(self);
        Ok(())
    }
}
