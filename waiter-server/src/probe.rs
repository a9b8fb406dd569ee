//! Connection liveness derived from the accepted TCP stream.
//!
//! [`ProbedListener`] hands hyper a [`ProbedStream`] for every accepted
//! connection. The stream forwards all I/O unchanged and records when a read
//! hits EOF or a write/read fails, so handlers can ask whether the peer is
//! still there without touching the socket themselves. Hyper keeps polling
//! the read half while a response is pending, which is what surfaces a closed
//! peer during a long wait.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};

use axum::extract::connect_info::Connected;
use axum::serve::{IncomingStream, Listener};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, trace};
use waiter::core::liveness::{LivenessCheck, LivenessError};

/// Why the peer side of a connection is no longer usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closed {
    /// Orderly shutdown or reset by the peer.
    PeerGone,
    /// An I/O error unrelated to a normal disconnect.
    Failed(io::ErrorKind),
}

/// Shared, write-once view of a connection's state.
#[derive(Debug, Clone, Default)]
pub struct ConnectionProbe {
    closed: Arc<OnceLock<Closed>>,
}

impl ConnectionProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the peer closed or reset the connection.
    pub fn mark_peer_gone(&self) {
        let _ = self.closed.set(Closed::PeerGone);
    }

    fn record_error(&self, err: &io::Error) {
        let state = if is_disconnect(err.kind()) {
            Closed::PeerGone
        } else {
            Closed::Failed(err.kind())
        };
        let _ = self.closed.set(state);
    }
}

fn is_disconnect(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::NotConnected
    )
}

impl LivenessCheck for ConnectionProbe {
    async fn is_connected(&self) -> Result<bool, LivenessError> {
        match self.closed.get() {
            None => Ok(true),
            Some(Closed::PeerGone) => Ok(false),
            Some(Closed::Failed(kind)) => Err(io::Error::from(*kind).into()),
        }
    }
}

/// TCP stream that reports EOF and I/O errors to its [`ConnectionProbe`].
#[derive(Debug)]
pub struct ProbedStream {
    inner: TcpStream,
    probe: ConnectionProbe,
}

impl ProbedStream {
    pub fn new(inner: TcpStream) -> Self {
        Self {
            inner,
            probe: ConnectionProbe::new(),
        }
    }

    pub fn probe(&self) -> ConnectionProbe {
        self.probe.clone()
    }
}

impl AsyncRead for ProbedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let wants_bytes = buf.remaining() > 0;
        let filled_before = buf.filled().len();
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        match &poll {
            Poll::Ready(Ok(())) if wants_bytes && buf.filled().len() == filled_before => {
                trace!("peer closed read half");
                this.probe.mark_peer_gone();
            }
            Poll::Ready(Err(err)) => {
                debug!(error = %err, "connection read failed");
                this.probe.record_error(err);
            }
            _ => {}
        }
        poll
    }
}

impl AsyncWrite for ProbedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Err(err)) = &poll {
            debug!(error = %err, "connection write failed");
            this.probe.record_error(err);
        }
        poll
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_write_vectored(cx, bufs);
        if let Poll::Ready(Err(err)) = &poll {
            this.probe.record_error(err);
        }
        poll
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Listener that wraps every accepted connection in a [`ProbedStream`].
#[derive(Debug)]
pub struct ProbedListener {
    inner: TcpListener,
}

impl ProbedListener {
    pub fn new(inner: TcpListener) -> Self {
        Self { inner }
    }
}

impl Listener for ProbedListener {
    type Io = ProbedStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        let (stream, addr) = Listener::accept(&mut self.inner).await;
        trace!(peer = %addr, "accepted connection");
        (ProbedStream::new(stream), addr)
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        Listener::local_addr(&self.inner)
    }
}

/// Per-connection info exposed to handlers through `ConnectInfo`.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    pub addr: SocketAddr,
    pub probe: ConnectionProbe,
}

impl Connected<IncomingStream<'_, ProbedListener>> for PeerInfo {
    fn connect_info(stream: IncomingStream<'_, ProbedListener>) -> Self {
        Self {
            addr: *stream.remote_addr(),
            probe: stream.io().probe(),
        }
    }
}
