use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// First start-of-frame byte.
pub const SOF1: u8 = 0xAA;

/// Second start-of-frame byte.
pub const SOF2: u8 = 0x55;

/// Fixed payload size. Also the only accepted value of the length byte.
pub const PAYLOAD_LEN: usize = 32;

/// Frame header: SOF1 (1) + SOF2 (1) + length (1) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Total wire size: header + payload + checksum.
pub const FRAME_LEN: usize = HEADER_SIZE + PAYLOAD_LEN + 1;

/// A payload that passed length and checksum validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidPayload([u8; PAYLOAD_LEN]);

impl ValidPayload {
    pub(crate) fn new(bytes: [u8; PAYLOAD_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw payload bytes.
    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }

    /// Consume and return the raw payload bytes.
    pub fn into_inner(self) -> [u8; PAYLOAD_LEN] {
        self.0
    }
}

impl AsRef<[u8]> for ValidPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Bitwise XOR of every byte.
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬──────┬──────────┬──────────────────┬──────────┐
/// │ SOF1 │ SOF2 │ Length   │ Payload          │ Checksum │
/// │ 0xAA │ 0x55 │ 0x20     │ (32 bytes)       │ XOR8     │
/// └──────┴──────┴──────────┴──────────────────┴──────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() != PAYLOAD_LEN {
        return Err(FrameError::InvalidPayloadSize {
            size: payload.len(),
        });
    }
    dst.reserve(FRAME_LEN);
    dst.put_u8(SOF1);
    dst.put_u8(SOF2);
    dst.put_u8(PAYLOAD_LEN as u8);
    dst.put_slice(payload);
    dst.put_u8(xor_checksum(payload));
    Ok(())
}
