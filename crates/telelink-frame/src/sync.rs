use std::time::Instant;

use telelink_transport::{ByteSource, TransportError};

use crate::codec::{xor_checksum, ValidPayload, PAYLOAD_LEN, SOF1, SOF2};
use crate::error::{FrameError, Result};
use crate::stats::FrameStats;

/// Bytes examined per attempt before giving control back to the caller.
pub const SCAN_LIMIT: usize = 64;

/// Extracts validated payloads from a noisy byte stream.
///
/// Bytes that do not start a frame are skipped silently. A length or
/// checksum fault discards the frame and scanning resumes from the next
/// unread byte; nothing is retried. Every attempt updates [`FrameStats`].
pub struct FrameSynchronizer<S> {
    source: S,
    stats: FrameStats,
    /// A `SOF1` was consumed but its `SOF2` has not been read yet.
    pending_sof: bool,
}

impl<S: ByteSource> FrameSynchronizer<S> {
    /// Create a synchronizer over a byte source.
    pub fn new(source: S) -> Self {
        Self {
            source,
            stats: FrameStats::default(),
            pending_sof: false,
        }
    }

    /// Attempt to read the next frame.
    ///
    /// Returns `Err(FrameError::Timeout)` when the link is quiet between
    /// frames, `Err(FrameError::NoSync)` after [`SCAN_LIMIT`] bytes without a
    /// start marker, and `Err(FrameError::Closed)` at end of stream.
    pub fn next_payload(&mut self) -> Result<ValidPayload> {
        let result = self.read_frame();
        match &result {
            Ok(_) => self.stats.record_valid(Instant::now()),
            Err(err) => {
                if !matches!(
                    err,
                    FrameError::Timeout | FrameError::Closed | FrameError::NoSync { .. }
                ) {
                    tracing::debug!(error = %err, "frame dropped");
                }
                self.stats.record_error(err);
            }
        }
        result
    }

    /// Counters accumulated since construction or the last reset.
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Count a validated payload the decoder rejected.
    pub fn record_decode_failure(&mut self) {
        self.stats.record_decode_failure();
    }

    /// Start a fresh session's counters.
    pub fn reset_stats(&mut self) {
        self.stats = FrameStats::default();
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consume the synchronizer and return the inner source.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Release the underlying source.
    pub fn close(&mut self) -> Result<()> {
        self.source.close().map_err(FrameError::from)
    }

    fn read_frame(&mut self) -> Result<ValidPayload> {
        self.scan_for_start()?;

        let declared = self.read_in_frame(1)?[0];
        if usize::from(declared) != PAYLOAD_LEN {
            return Err(FrameError::BadLength { found: declared });
        }

        let body = self.read_in_frame(PAYLOAD_LEN)?;
        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(&body);

        let expected = self.read_in_frame(1)?[0];
        let computed = xor_checksum(&payload);
        if expected != computed {
            return Err(FrameError::ChecksumMismatch { expected, computed });
        }

        Ok(ValidPayload::new(payload))
    }

    /// Consume bytes until `SOF1 SOF2` has been read, or give up after
    /// [`SCAN_LIMIT`] bytes. A pending `SOF1` carries over to the next attempt.
    fn scan_for_start(&mut self) -> Result<()> {
        let mut scanned = 0usize;
        loop {
            if scanned >= SCAN_LIMIT {
                return Err(FrameError::NoSync { scanned });
            }
            if !self.pending_sof {
                let byte = self.read_byte()?;
                scanned += 1;
                if byte != SOF1 {
                    self.stats.bytes_discarded += 1;
                    continue;
                }
                self.pending_sof = true;
                continue;
            }

            // A timeout here keeps `pending_sof` so the marker survives a quiet gap.
            let byte = self.read_byte()?;
            scanned += 1;
            if byte == SOF2 {
                self.pending_sof = false;
                return Ok(());
            }

            self.stats.bytes_discarded += 1;
            // `AA AA 55`: the second `AA` may be the real start.
            self.pending_sof = byte == SOF1;
            if !self.pending_sof {
                self.stats.bytes_discarded += 1;
            }
        }
    }

    fn read_byte(&mut self) -> Result<u8> {
        let bytes = self.source.read(1)?;
        bytes.first().copied().ok_or(FrameError::Timeout)
    }

    /// Read exactly `n` bytes after the start marker; anything less is a short read.
    fn read_in_frame(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            match self.source.read(n - out.len()) {
                Ok(chunk) if chunk.is_empty() => break,
                Ok(chunk) => out.extend_from_slice(&chunk),
                Err(TransportError::Timeout | TransportError::Closed) => break,
                Err(err) => return Err(FrameError::Transport(err)),
            }
        }
        if out.len() < n {
            return Err(FrameError::ShortRead {
                expected: n,
                got: out.len(),
            });
        }
        Ok(out)
    }
}

impl<S> std::fmt::Debug for FrameSynchronizer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSynchronizer")
            .field("stats", &self.stats)
            .field("pending_sof", &self.pending_sof)
            .finish()
    }
}
