//! Synthetic frames for bench runs without a car.
//!
//! Cycles through every channel in the table, one frame each, with values
//! sweeping deterministically across each field's plausible range. Output
//! is reproducible: the same layout and frame count always yield the same
//! bytes.

use bytes::{Bytes, BytesMut};
use telelink_frame::{
    encode_frame, encode_legacy, encode_new, FormatTag, NormalizedRecord, PayloadLayout,
    ACCUMULATOR, DRIVER_INPUTS, FRAME_LEN, GPS, IMU_FRONT, IMU_REAR, INVERTER_STATUS,
    KNOWN_CHANNELS, POWERTRAIN, SUSPENSION, VALUE_COUNT, WATER_TEMPS,
};

/// Sweep period in channel cycles.
const PERIOD: u64 = 64;

/// Generator of plausible telemetry frames.
#[derive(Debug, Clone)]
pub struct Simulator {
    format: FormatTag,
    index: u64,
}

impl Simulator {
    /// `Auto` generates NEW-layout frames.
    pub fn new(layout: PayloadLayout) -> Self {
        let format = match layout {
            PayloadLayout::Legacy => FormatTag::Legacy,
            PayloadLayout::New | PayloadLayout::Auto => FormatTag::New,
        };
        Self { format, index: 0 }
    }

    pub fn format(&self) -> FormatTag {
        self.format
    }

    /// Frames produced so far.
    pub fn produced(&self) -> u64 {
        self.index
    }

    /// The next record, before encoding.
    pub fn next_record(&mut self) -> NormalizedRecord {
        let slot = (self.index % KNOWN_CHANNELS.len() as u64) as usize;
        let cycle = self.index / KNOWN_CHANNELS.len() as u64;
        let channel_id = KNOWN_CHANNELS[slot];
        let sequence = match self.format {
            FormatTag::New => Some((self.index & 0xFFFF) as u16),
            FormatTag::Legacy => None,
        };
        self.index += 1;

        NormalizedRecord {
            channel_id,
            sequence,
            values: values_for(channel_id, self.format, cycle),
            format: self.format,
        }
    }

    /// Append the next complete frame (`AA 55 20 <payload> XOR`) to `dst`.
    pub fn write_frame(&mut self, dst: &mut BytesMut) -> telelink_frame::Result<()> {
        let record = self.next_record();
        let payload = match record.format {
            FormatTag::New => {
                encode_new(record.channel_id, record.sequence.unwrap_or(0), &record.values)
            }
            FormatTag::Legacy => encode_legacy(record.channel_id, &record.values),
        };
        encode_frame(&payload, dst)
    }
}

impl Iterator for Simulator {
    type Item = Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = BytesMut::with_capacity(FRAME_LEN);
        self.write_frame(&mut buf).ok()?;
        Some(buf.freeze())
    }
}

/// Triangle wave over `[min, max]`, offset by `phase` cycles.
fn sweep(cycle: u64, phase: u64, min: f32, max: f32) -> f32 {
    let pos = (cycle + phase) % PERIOD;
    let half = PERIOD / 2;
    let up = if pos < half { pos } else { PERIOD - pos };
    min + (max - min) * (up as f32 / half as f32)
}

fn values_for(channel_id: u16, format: FormatTag, cycle: u64) -> [f32; VALUE_COUNT] {
    let s = |phase: u64, min: f32, max: f32| sweep(cycle, phase, min, max);
    match channel_id {
        IMU_REAR if format == FormatTag::New => [
            s(0, 300.0, 400.0),
            s(4, 0.0, 80.0),
            s(8, 0.0, 10000.0),
            s(12, 0.0, 400.0),
            s(16, 2.5, 4.2),
            s(20, 0.0, 4095.0),
            s(24, 0.0, 4095.0),
        ],
        IMU_REAR | IMU_FRONT => [
            s(0, -10.0, 10.0),
            s(8, -10.0, 10.0),
            s(16, -10.0, 10.0),
            s(24, -100.0, 100.0),
            s(32, -100.0, 100.0),
            s(40, -100.0, 100.0),
            0.0,
        ],
        POWERTRAIN => [
            s(0, 20.0, 100.0),
            s(3, 20.0, 100.0),
            s(6, 20.0, 100.0),
            s(9, 20.0, 100.0),
            s(12, 300.0, 400.0),
            s(15, 0.0, 80.0),
            s(18, 0.0, 10000.0),
        ],
        DRIVER_INPUTS => [
            s(0, 0.0, 400.0),
            s(2, 0.0, 500.0),
            s(0, 0.0, 100.0),
            s(32, 0.0, 100.0),
            0.0,
            0.0,
            0.0,
        ],
        ACCUMULATOR => [
            s(0, 0.0, 500.0),
            s(10, 2.5, 4.2),
            s(20, 20.0, 60.0),
            0.0,
            0.0,
            0.0,
            0.0,
        ],
        GPS => [
            s(0, 0.0, 200.0),
            41.57 + s(5, 0.0, 0.001),
            2.26 + s(9, 0.0, 0.001),
            s(13, 100.0, 140.0),
            0.0,
            0.0,
            0.0,
        ],
        SUSPENSION => [
            s(0, 0.0, 100.0),
            s(16, 0.0, 100.0),
            s(32, 0.0, 100.0),
            s(48, 0.0, 100.0),
            0.0,
            0.0,
            0.0,
        ],
        WATER_TEMPS => [
            s(0, 20.0, 60.0),
            s(4, 25.0, 70.0),
            s(8, 20.0, 60.0),
            s(12, 25.0, 70.0),
            0.0,
            0.0,
            0.0,
        ],
        INVERTER_STATUS => [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        _ => [0.0; VALUE_COUNT],
    }
}
