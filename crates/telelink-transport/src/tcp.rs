use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Result, TransportError};
use crate::traits::{ByteSource, StreamSource};

/// A serial bridge reachable over TCP.
///
/// Radio receivers are commonly exposed through a serial-to-TCP bridge. The
/// connection is opened once here; reconnect policy belongs to the caller.
#[derive(Debug)]
pub struct TcpSource {
    peer: SocketAddr,
    stream: StreamSource<TcpStream>,
}

impl TcpSource {
    /// Connect to `addr` and apply `read_timeout` to every subsequent read.
    pub fn connect(addr: impl ToSocketAddrs, read_timeout: Duration) -> Result<Self> {
        let peer = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TransportError::Resolve("no address".to_string()))?;

        let stream = TcpStream::connect_timeout(&peer, read_timeout.max(Duration::from_secs(1)))
            .map_err(|source| TransportError::Connect { addr: peer, source })?;
        Self::from_stream(stream, read_timeout)
    }

    /// Wrap an already-connected stream.
    pub fn from_stream(stream: TcpStream, read_timeout: Duration) -> Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_read_timeout(Some(read_timeout))?;
        stream.set_nodelay(true)?;
        tracing::debug!(%peer, timeout_ms = read_timeout.as_millis() as u64, "bridge connected");
        Ok(Self {
            peer,
            stream: StreamSource::new(stream),
        })
    }

    /// Remote address of the bridge.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl ByteSource for TcpSource {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        self.stream.read(n)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.get_ref() {
            // The peer may already be gone.
            let _ = stream.shutdown(Shutdown::Both);
        }
        tracing::debug!(peer = %self.peer, "bridge closed");
        self.stream.close()
    }
}
