use std::net::SocketAddr;

/// Errors that can occur while pulling bytes from a link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No byte arrived within the configured read timeout.
    #[error("read timed out")]
    Timeout,

    /// The link reached end-of-stream or was closed.
    #[error("link closed")]
    Closed,

    /// Failed to connect to a bridge address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// The bridge address could not be resolved.
    #[error("failed to resolve {0}")]
    Resolve(String),

    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// True for the normal "no data yet" condition.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
