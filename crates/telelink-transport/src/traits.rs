use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};

use crate::error::{Result, TransportError};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// A link that yields bytes on demand.
///
/// `read(n)` returns between 1 and `n` bytes. Fewer than `n` means the link
/// went quiet or closed partway through; the caller decides what a short
/// read means. When nothing at all arrived, the call fails with
/// [`TransportError::Timeout`] (link quiet) or [`TransportError::Closed`]
/// (end of stream). Reads must never block past the link's own timeout.
pub trait ByteSource {
    /// Read up to `n` bytes.
    fn read(&mut self, n: usize) -> Result<Bytes>;

    /// Release the link. Subsequent reads fail with `Closed`.
    fn close(&mut self) -> Result<()>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        (**self).read(n)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Adapts any `Read` stream into a [`ByteSource`].
///
/// Reads are pulled in chunks and buffered, so single-byte scanning does not
/// cost one syscall per byte. `TimedOut`/`WouldBlock` from the inner stream
/// map to [`TransportError::Timeout`]; a zero-length read maps to `Closed`.
pub struct StreamSource<R> {
    inner: Option<R>,
    buf: BytesMut,
}

impl<R: Read> StreamSource<R> {
    /// Wrap a stream.
    pub fn new(inner: R) -> Self {
        Self {
            inner: Some(inner),
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Number of bytes buffered but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream, if still open.
    pub fn get_ref(&self) -> Option<&R> {
        self.inner.as_ref()
    }

    /// Consume the source and return the inner stream, if still open.
    pub fn into_inner(self) -> Option<R> {
        self.inner
    }

    /// Pull one chunk from the inner stream. `Ok(0)` means end of stream.
    fn fill(&mut self) -> Result<usize> {
        let inner = self.inner.as_mut().ok_or(TransportError::Closed)?;
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match inner.read(&mut chunk) {
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock =>
                {
                    return Err(TransportError::Timeout)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<R: Read> ByteSource for StreamSource<R> {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        if n == 0 {
            return Ok(Bytes::new());
        }

        let mut ended = None;
        while self.buf.len() < n {
            match self.fill() {
                Ok(0) => {
                    ended = Some(TransportError::Closed);
                    break;
                }
                Ok(_) => {}
                Err(TransportError::Timeout) => {
                    ended = Some(TransportError::Timeout);
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        if self.buf.is_empty() {
            return Err(ended.unwrap_or(TransportError::Closed));
        }

        let take = n.min(self.buf.len());
        Ok(self.buf.split_to(take).freeze())
    }

    fn close(&mut self) -> Result<()> {
        self.inner = None;
        self.buf.clear();
        Ok(())
    }
}

impl<R> std::fmt::Debug for StreamSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSource")
            .field("open", &self.inner.is_some())
            .field("buffered", &self.buf.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn reads_exact_counts_from_cursor() {
        let mut source = StreamSource::new(Cursor::new(vec![1u8, 2, 3, 4, 5]));

        assert_eq!(source.read(1).unwrap().as_ref(), &[1]);
        assert_eq!(source.read(3).unwrap().as_ref(), &[2, 3, 4]);
        assert_eq!(source.buffered(), 1);
    }

    #[test]
    fn short_read_at_end_of_stream() {
        let mut source = StreamSource::new(Cursor::new(vec![9u8, 8]));
        let got = source.read(4).unwrap();
        assert_eq!(got.as_ref(), &[9, 8]);

        let err = source.read(1).unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn empty_stream_is_closed() {
        let mut source = StreamSource::new(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(source.read(1), Err(TransportError::Closed)));
    }

    #[test]
    fn timeout_without_data_is_reported() {
        let mut source = StreamSource::new(QuietThenData {
            quiet: 1,
            bytes: vec![0xAA],
        });
        let err = source.read(1).unwrap_err();
        assert!(err.is_timeout());

        assert_eq!(source.read(1).unwrap().as_ref(), &[0xAA]);
    }

    #[test]
    fn timeout_after_partial_data_returns_short_read() {
        let mut source = StreamSource::new(DataThenQuiet {
            bytes: Some(vec![1, 2, 3]),
        });
        let got = source.read(8).unwrap();
        assert_eq!(got.as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn interrupted_read_retries() {
        let mut source = StreamSource::new(InterruptedThenData {
            interrupted: false,
            bytes: vec![7],
        });
        assert_eq!(source.read(1).unwrap().as_ref(), &[7]);
    }

    #[test]
    fn close_releases_stream() {
        let mut source = StreamSource::new(Cursor::new(vec![1u8, 2, 3]));
        source.close().unwrap();
        assert!(source.get_ref().is_none());
        assert!(matches!(source.read(1), Err(TransportError::Closed)));
    }

    #[test]
    fn boxed_source_delegates() {
        let mut source: Box<dyn ByteSource> =
            Box::new(StreamSource::new(Cursor::new(vec![5u8, 6])));
        assert_eq!(source.read(2).unwrap().as_ref(), &[5, 6]);
        source.close().unwrap();
    }

    struct QuietThenData {
        quiet: usize,
        bytes: Vec<u8>,
    }

    impl Read for QuietThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.quiet > 0 {
                self.quiet -= 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            let n = self.bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[..n]);
            self.bytes.drain(..n);
            Ok(n)
        }
    }

    struct DataThenQuiet {
        bytes: Option<Vec<u8>>,
    }

    impl Read for DataThenQuiet {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.bytes.take() {
                Some(bytes) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                None => Err(std::io::Error::from(ErrorKind::TimedOut)),
            }
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = self.bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[..n]);
            self.bytes.drain(..n);
            Ok(n)
        }
    }
}
