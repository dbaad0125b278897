use telelink_transport::TransportError;

/// Outcomes of a framing attempt that did not yield a payload.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// No data arrived within the link's read timeout. Not a framing fault.
    #[error("read timed out")]
    Timeout,

    /// The declared length byte was not 32.
    #[error("bad frame length {found} (expected 32)")]
    BadLength { found: u8 },

    /// The link went quiet or closed partway through a frame.
    #[error("short read ({got} of {expected} bytes)")]
    ShortRead { expected: usize, got: usize },

    /// The trailing XOR byte disagrees with the payload.
    #[error("checksum mismatch (frame 0x{expected:02X}, computed 0x{computed:02X})")]
    ChecksumMismatch { expected: u8, computed: u8 },

    /// A payload handed to the encoder was not exactly 32 bytes.
    #[error("invalid payload size ({size} bytes, expected 32)")]
    InvalidPayloadSize { size: usize },

    /// A scan consumed its byte budget without finding a start marker.
    /// Not a framing fault; the bytes are counted as discarded.
    #[error("no start marker in {scanned} bytes")]
    NoSync { scanned: usize },

    /// The link reached end of stream between frames.
    #[error("link closed")]
    Closed,

    /// Any other transport failure.
    #[error("frame transport error: {0}")]
    Transport(TransportError),
}

impl From<TransportError> for FrameError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => FrameError::Timeout,
            TransportError::Closed => FrameError::Closed,
            other => FrameError::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
