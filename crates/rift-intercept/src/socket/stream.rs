//! Tokio adapter over [`MockSocket`].
//!
//! Lets async clients (hyper's HTTP/1 client through
//! `hyper_util::rt::TokioIo`, or anything else speaking `AsyncRead` /
//! `AsyncWrite`) run against an intercepted connection.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::MockSocket;
use crate::error::Result;
use crate::registry::Session;

/// Async view of an intercepted connection.
///
/// Reads park until a request has been answered. Once every served response
/// has been drained, the stream reports EOF, since synthesized responses
/// carry `Connection: close`.
#[derive(Debug)]
pub struct MockStream {
    socket: MockSocket,
    read_waker: Option<Waker>,
}

impl MockStream {
    pub fn new(socket: MockSocket) -> Self {
        Self {
            socket,
            read_waker: None,
        }
    }

    /// Open an intercepted connection to `(host, port)`.
    pub fn connect(session: Arc<Session>, host: &str, port: u16) -> Result<Self> {
        let mut socket = MockSocket::new(session);
        socket.connect((host, port))?;
        Ok(Self::new(socket))
    }

    pub fn socket(&self) -> &MockSocket {
        &self.socket
    }

    pub fn into_socket(self) -> MockSocket {
        self.socket
    }

    fn at_eof(&self) -> bool {
        !self.socket.is_connected()
            || self.socket.is_write_closed()
            || (self.socket.served() > 0 && !self.socket.has_partial_request())
    }

    fn wake_reader(&mut self) {
        if let Some(waker) = self.read_waker.take() {
            waker.wake();
        }
    }
}

impl From<MockSocket> for MockStream {
    fn from(socket: MockSocket) -> Self {
        Self::new(socket)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.socket.pending() == 0 {
            if !this.socket.is_connected() {
                return Poll::Ready(Err(io::ErrorKind::NotConnected.into()));
            }
            if this.at_eof() {
                return Poll::Ready(Ok(()));
            }
            this.read_waker = Some(cx.waker().clone());
            return Poll::Pending;
        }
        let bytes = this.socket.recv(buf.remaining())?;
        buf.put_slice(&bytes);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let result = this.socket.send(buf).map_err(io::Error::from);
        this.wake_reader();
        Poll::Ready(result)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let result = if this.socket.is_connected() {
            this.socket.shutdown_write().map_err(io::Error::from)
        } else {
            Ok(())
        };
        this.wake_reader();
        Poll::Ready(result)
    }
}
