//! Property tests for framing and payload round-trips.

use std::io::Cursor;

use bytes::BytesMut;
use proptest::prelude::*;
use telelink_frame::{
    encode_frame, encode_new, FrameError, FrameSynchronizer, PayloadDecoder, PayloadLayout,
    FRAME_LEN, PAYLOAD_LEN,
};
use telelink_transport::StreamSource;

fn payload_strategy() -> impl Strategy<Value = [u8; PAYLOAD_LEN]> {
    prop::array::uniform32(any::<u8>())
}

/// Noise bytes that can never form or complete a start marker.
fn noise_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        any::<u8>().prop_filter("not a marker byte", |b| *b != 0xAA && *b != 0x55),
        0..16,
    )
}

fn synchronizer(bytes: Vec<u8>) -> FrameSynchronizer<StreamSource<Cursor<Vec<u8>>>> {
    FrameSynchronizer::new(StreamSource::new(Cursor::new(bytes)))
}

proptest! {
    /// A well-formed frame yields its payload unchanged.
    #[test]
    fn valid_frame_returns_payload(payload in payload_strategy()) {
        let mut wire = BytesMut::new();
        encode_frame(&payload, &mut wire).unwrap();

        let mut sync = synchronizer(wire.to_vec());
        let got = sync.next_payload().unwrap();
        prop_assert_eq!(got.as_bytes(), &payload);
    }

    /// Flipping any single bit of the checksum byte is always detected.
    #[test]
    fn checksum_bit_flip_is_rejected(payload in payload_strategy(), bit in 0u8..8) {
        let mut wire = BytesMut::new();
        encode_frame(&payload, &mut wire).unwrap();
        wire[FRAME_LEN - 1] ^= 1 << bit;

        let mut sync = synchronizer(wire.to_vec());
        let is_checksum_mismatch = matches!(
            sync.next_payload(),
            Err(FrameError::ChecksumMismatch { .. })
        );
        prop_assert!(is_checksum_mismatch);
        prop_assert_eq!(sync.stats().frames_received, 0);
    }

    /// N frames separated by noise yield exactly N payloads, in order.
    #[test]
    fn frames_between_noise_are_all_extracted(
        frames in prop::collection::vec((noise_strategy(), payload_strategy()), 0..12),
        trailing in noise_strategy(),
    ) {
        let mut wire = BytesMut::new();
        for (noise, payload) in &frames {
            wire.extend_from_slice(noise);
            encode_frame(payload, &mut wire).unwrap();
        }
        wire.extend_from_slice(&trailing);

        let mut sync = synchronizer(wire.to_vec());
        let mut extracted = Vec::new();
        loop {
            match sync.next_payload() {
                Ok(payload) => extracted.push(payload.into_inner()),
                Err(FrameError::Closed) => break,
                Err(FrameError::NoSync { .. }) => continue,
                Err(err) => prop_assert!(false, "unexpected error: {err}"),
            }
        }

        let expected: Vec<[u8; PAYLOAD_LEN]> = frames.iter().map(|(_, p)| *p).collect();
        prop_assert_eq!(extracted, expected);
        prop_assert_eq!(sync.stats().validation_failures(), 0);
    }

    /// NEW-layout encode then decode is exact, floats bit-for-bit.
    #[test]
    fn new_layout_round_trip(
        channel_id in any::<u16>(),
        sequence in any::<u16>(),
        bits in prop::array::uniform7(any::<u32>()),
    ) {
        let values = bits.map(f32::from_bits);
        let payload = encode_new(channel_id, sequence, &values);

        let record = PayloadDecoder::new(PayloadLayout::New).decode(&payload).unwrap();
        prop_assert_eq!(record.channel_id, channel_id);
        prop_assert_eq!(record.sequence, Some(sequence));
        prop_assert_eq!(record.values.map(f32::to_bits), bits);
    }
}
