//! Start-marker framing and payload decoding for radio telemetry links.
//!
//! Every frame on the wire is:
//! - A 2-byte start marker (`AA 55`) for stream synchronization
//! - A 1-byte declared length (always 32)
//! - A 32-byte payload
//! - A 1-byte XOR of the payload bytes
//!
//! [`FrameSynchronizer`] turns a noisy byte stream into validated payloads and
//! keeps [`FrameStats`]; [`PayloadDecoder`] reads a payload under the
//! configured [`PayloadLayout`].

pub mod channel;
pub mod codec;
pub mod error;
pub mod payload;
pub mod stats;
pub mod sync;

pub use channel::{
    is_known, ACCUMULATOR, DRIVER_INPUTS, GPS, IMU_FRONT, IMU_REAR, INVERTER_STATUS,
    KNOWN_CHANNELS, POWERTRAIN, SUSPENSION, WATER_TEMPS,
};
pub use codec::{
    encode_frame, xor_checksum, ValidPayload, FRAME_LEN, HEADER_SIZE, PAYLOAD_LEN, SOF1, SOF2,
};
pub use error::{FrameError, Result};
pub use payload::{
    encode_legacy, encode_new, FormatTag, NormalizedRecord, PayloadDecoder, PayloadLayout,
    VALUE_COUNT,
};
pub use stats::FrameStats;
pub use sync::{FrameSynchronizer, SCAN_LIMIT};
