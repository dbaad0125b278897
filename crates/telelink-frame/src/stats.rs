use std::time::{Duration, Instant};

use crate::error::FrameError;

/// Running counters for one reception session.
///
/// Reset only when a new session starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames that passed length and checksum validation.
    pub frames_received: u64,
    pub checksum_failures: u64,
    pub length_failures: u64,
    /// Frames cut off by the link going quiet or closing.
    pub short_reads: u64,
    /// Validated payloads the decoder could not interpret.
    pub decode_failures: u64,
    /// Reads that found no data. Normal on a quiet link.
    pub timeouts: u64,
    pub transport_errors: u64,
    /// Scanning noise skipped while looking for a start marker.
    pub bytes_discarded: u64,
    pub last_valid_at: Option<Instant>,
}

impl FrameStats {
    /// Record a validated frame.
    pub fn record_valid(&mut self, at: Instant) {
        self.frames_received = self.frames_received.saturating_add(1);
        self.last_valid_at = Some(at);
    }

    /// Record a framing attempt that produced no payload.
    pub fn record_error(&mut self, err: &FrameError) {
        let counter = match err {
            FrameError::Timeout => &mut self.timeouts,
            FrameError::BadLength { .. } => &mut self.length_failures,
            FrameError::ChecksumMismatch { .. } => &mut self.checksum_failures,
            FrameError::ShortRead { .. } => &mut self.short_reads,
            FrameError::InvalidPayloadSize { .. } => &mut self.decode_failures,
            FrameError::Transport(_) => &mut self.transport_errors,
            // Noise is already counted byte by byte.
            FrameError::NoSync { .. } | FrameError::Closed => return,
        };
        *counter = counter.saturating_add(1);
    }

    pub fn record_decode_failure(&mut self) {
        self.decode_failures = self.decode_failures.saturating_add(1);
    }

    /// Checksum plus length failures.
    pub fn validation_failures(&self) -> u64 {
        self.checksum_failures.saturating_add(self.length_failures)
    }

    /// Time since the last valid frame, or `None` if none arrived yet.
    pub fn since_last_valid(&self, now: Instant) -> Option<Duration> {
        self.last_valid_at.map(|at| now.saturating_duration_since(at))
    }
}
